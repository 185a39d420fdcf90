/*
 * Turns the text typed into the search box into the set of file-name
 * patterns the script browser should show, plus whether the tree should be
 * expanded. The computation is pure and cheap enough to run per keystroke;
 * coalescing rapid input is the caller's job (see `FilterDebouncer`).
 */
use std::collections::BTreeSet;

/// Script extensions the browser recognizes, without the leading dot.
pub const SCRIPT_EXTENSIONS: [&str; 2] = ["py", "mel"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub patterns: BTreeSet<String>,
    pub should_expand: bool,
}

/// Glob patterns shown when no filter is active (`*.py`, `*.mel`).
pub fn default_patterns() -> BTreeSet<String> {
    SCRIPT_EXTENSIONS
        .iter()
        .map(|ext| format!("*.{ext}"))
        .collect()
}

/*
 * Drops every character outside the 7-bit ASCII range. The browser widgets
 * this feeds have historically choked on such input, and saved queries rely
 * on the stripped form.
 */
pub fn normalize_query(query: &str) -> String {
    query.chars().filter(|c| c.is_ascii()).collect()
}

/*
 * Computes the visible-name patterns for a raw query.
 *
 * An empty (normalized) query yields the default extension patterns and a
 * collapsed tree. Otherwise each comma-separated term, with its spaces
 * removed, yields `*term*.py` and `*term*.mel`; empty terms are discarded.
 * A query made only of commas and spaces therefore yields an empty set with
 * the tree expanded, so nothing is shown.
 */
pub fn compute_patterns(query: &str) -> FilterResult {
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        return FilterResult {
            patterns: default_patterns(),
            should_expand: false,
        };
    }

    let patterns = normalized
        .split(',')
        .map(|term| term.replace(' ', ""))
        .filter(|term| !term.is_empty())
        .flat_map(|term| {
            SCRIPT_EXTENSIONS
                .iter()
                .map(move |ext| format!("*{term}*.{ext}"))
        })
        .collect();

    FilterResult {
        patterns,
        should_expand: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_query_returns_default_collapsed() {
        let result = compute_patterns("");
        assert_eq!(result.patterns, set(&["*.py", "*.mel"]));
        assert!(!result.should_expand);
    }

    #[test]
    fn test_comma_separated_terms() {
        let result = compute_patterns("foo, bar");
        assert_eq!(
            result.patterns,
            set(&["*foo*.py", "*foo*.mel", "*bar*.py", "*bar*.mel"])
        );
        assert!(result.should_expand);
    }

    #[test]
    fn test_only_separators_yields_empty_set() {
        let result = compute_patterns(",, ,");
        assert!(result.patterns.is_empty());
        assert!(result.should_expand);
    }

    #[test]
    fn test_interior_spaces_are_removed() {
        let result = compute_patterns("rig ging");
        assert_eq!(result.patterns, set(&["*rigging*.py", "*rigging*.mel"]));
    }

    #[test]
    fn test_non_ascii_is_stripped_before_matching() {
        for (raw, ascii) in [
            ("fö,bär", "f,br"),
            ("ünïcode", "ncode"),
            ("skin, 権", "skin, "),
            ("日本", ""),
        ] {
            assert_eq!(compute_patterns(raw), compute_patterns(ascii), "query {raw:?}");
        }
    }

    #[test]
    fn test_query_of_only_non_ascii_is_the_default_view() {
        let result = compute_patterns("ßüñ");
        assert_eq!(result.patterns, default_patterns());
        assert!(!result.should_expand);
    }

    #[test]
    fn test_duplicate_terms_collapse() {
        let result = compute_patterns("anim,anim");
        assert_eq!(result.patterns.len(), 2);
    }
}
