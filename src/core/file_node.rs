/*
 * The script folder as a tree of `FileNode`s, and the name-pattern view of
 * it that the browser shows. Scanning uses `walkdir`; pattern matching uses
 * `glob::Pattern` with case-insensitive matching, which is how the browser
 * interprets the patterns produced by `tree_filter::compute_patterns`.
 *
 * Directories are never hidden by name patterns, only files are.
 */
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum FileTreeError {
    Walk(walkdir::Error),
    Pattern(glob::PatternError),
    InvalidPath(PathBuf),
}

impl From<walkdir::Error> for FileTreeError {
    fn from(err: walkdir::Error) -> Self {
        FileTreeError::Walk(err)
    }
}

impl From<glob::PatternError> for FileTreeError {
    fn from(err: glob::PatternError) -> Self {
        FileTreeError::Pattern(err)
    }
}

impl std::fmt::Display for FileTreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileTreeError::Walk(e) => write!(f, "Directory walk error: {e}"),
            FileTreeError::Pattern(e) => write!(f, "Invalid name pattern: {e}"),
            FileTreeError::InvalidPath(p) => write!(f, "Invalid path: {p:?}"),
        }
    }
}

impl std::error::Error for FileTreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileTreeError::Walk(e) => Some(e),
            FileTreeError::Pattern(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FileTreeError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    pub children: Vec<FileNode>, // Only populated for directories
}

impl FileNode {
    pub fn new(path: PathBuf, name: String, is_dir: bool) -> Self {
        FileNode {
            path,
            name,
            is_dir,
            children: Vec::new(),
        }
    }
}

/*
 * Scans `root` recursively. Directories come before files at every level,
 * then entries are ordered by name.
 */
pub fn scan_script_tree(root: &Path) -> Result<Vec<FileNode>> {
    if !root.is_dir() {
        return Err(FileTreeError::InvalidPath(root.to_path_buf()));
    }
    log::debug!("FileTree: Scanning {root:?}");
    let nodes = scan_children(root)?;
    log::debug!("FileTree: Found {} top-level entries in {root:?}", nodes.len());
    Ok(nodes)
}

fn scan_children(dir: &Path) -> Result<Vec<FileNode>> {
    let mut nodes = Vec::new();
    for entry_result in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry_result?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().is_dir();
        let mut node = FileNode::new(entry.path().to_path_buf(), name, is_dir);
        if is_dir {
            node.children = scan_children(entry.path())?;
        }
        nodes.push(node);
    }
    nodes.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(nodes)
}

/*
 * Compiled form of a name-pattern set. A file is visible when any pattern
 * matches its name, ignoring case. An empty set shows no files at all.
 */
#[derive(Debug, Clone)]
pub struct NameFilter {
    patterns: Vec<Pattern>,
}

impl NameFilter {
    pub fn new(patterns: &BTreeSet<String>) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(NameFilter { patterns })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(file_name, options))
    }

    /// Returns the subset of `nodes` visible under this filter.
    pub fn apply(&self, nodes: &[FileNode]) -> Vec<FileNode> {
        nodes
            .iter()
            .filter_map(|node| {
                if node.is_dir {
                    let mut dir = FileNode::new(node.path.clone(), node.name.clone(), true);
                    dir.children = self.apply(&node.children);
                    Some(dir)
                } else if self.matches(&node.name) {
                    Some(node.clone())
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Counts the files (not directories) in a tree.
pub fn count_files(nodes: &[FileNode]) -> usize {
    nodes
        .iter()
        .map(|n| if n.is_dir { count_files(&n.children) } else { 1 })
        .sum()
}
