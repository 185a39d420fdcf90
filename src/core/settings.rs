/*
 * Persists the panel's user preferences (active script folder, double-click
 * behavior) across sessions. Values live in one INI file per host identity,
 * so Maya and MotionBuilder never share settings:
 *
 *   [script_tree]
 *   folder_path=/home/artist/Documents/ScriptTree/Maya/Scripts
 *   double_click_action=Edit Script on Double-Click
 *
 * Keys are namespaced as `section/name`. A key without a section goes to
 * `[General]`. The file is re-read on every `get` and rewritten and synced on
 * every `set`, because the host application may be killed at any moment.
 *
 * Values are stored escaped (`\\`, `\n`, `\r`, `\"`) and quoted when they
 * carry leading or trailing whitespace, so any string reads back unchanged and
 * a value can never start a new line or section.
 */
use super::path_utils;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const SETTINGS_APP_NAME: &str = "ScriptTree";
pub const KEY_FOLDER_PATH: &str = "script_tree/folder_path";
pub const KEY_DOUBLE_CLICK_ACTION: &str = "script_tree/double_click_action";

const GENERAL_SECTION: &str = "General";

#[derive(Debug)]
pub enum SettingsError {
    Io(io::Error),
    NoConfigDirectory,
}

impl From<io::Error> for SettingsError {
    fn from(err: io::Error) -> Self {
        SettingsError::Io(err)
    }
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "Settings I/O error: {e}"),
            SettingsError::NoConfigDirectory => {
                write!(f, "Could not determine configuration directory for settings")
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/*
 * What a double click on a script in the tree does. Stored with the same
 * text the menu shows.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DoubleClickAction {
    RunOnDoubleClick,
    #[default]
    EditOnDoubleClick,
}

impl DoubleClickAction {
    pub const ALL: [DoubleClickAction; 2] = [
        DoubleClickAction::RunOnDoubleClick,
        DoubleClickAction::EditOnDoubleClick,
    ];

    pub fn as_setting_str(self) -> &'static str {
        match self {
            DoubleClickAction::RunOnDoubleClick => "Run Script on Double-Click",
            DoubleClickAction::EditOnDoubleClick => "Edit Script on Double-Click",
        }
    }

    // Unknown or stale values read as the default.
    pub fn from_setting_str(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|action| action.as_setting_str() == value)
            .unwrap_or_default()
    }
}

pub trait SettingsStoreOperations {
    /// Returns the stored value for `key`, or `default` if it is not set.
    fn get(&self, key: &str, default: &str) -> String;
    /// Stores `value` under `key` and makes it durable before returning.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

pub struct IniSettingsStore {
    file_path: PathBuf,
}

impl IniSettingsStore {
    pub fn new(file_path: PathBuf) -> Self {
        IniSettingsStore { file_path }
    }

    /*
     * Opens the store for one host identity, e.g. `script_tree_maya`, in the
     * application's local configuration directory.
     */
    pub fn for_identity(settings_name: &str) -> Result<Self> {
        let config_dir = path_utils::get_base_app_config_local_dir(SETTINGS_APP_NAME)
            .ok_or(SettingsError::NoConfigDirectory)?;
        let file_path = config_dir.join(format!("{settings_name}.ini"));
        log::debug!("IniSettingsStore: Using settings file {file_path:?}");
        Ok(Self::new(file_path))
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn load_sections(&self) -> io::Result<Sections> {
        match fs::read_to_string(&self.file_path) {
            Ok(contents) => Ok(parse_ini(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Sections::new()),
            Err(e) => Err(e),
        }
    }
}

impl SettingsStoreOperations for IniSettingsStore {
    fn get(&self, key: &str, default: &str) -> String {
        let sections = match self.load_sections() {
            Ok(sections) => sections,
            Err(e) => {
                log::warn!(
                    "IniSettingsStore: Could not read {:?}, using default for '{key}': {e}",
                    self.file_path
                );
                return default.to_string();
            }
        };
        let (section, name) = split_key(key);
        sections
            .get(section)
            .and_then(|entries| entries.get(name))
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        log::trace!("IniSettingsStore: Setting '{key}' = '{value}'");
        let mut sections = self.load_sections()?;
        let (section, name) = split_key(key);
        sections
            .entry(section.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&self.file_path)?;
        file.write_all(render_ini(&sections).as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

type Sections = BTreeMap<String, BTreeMap<String, String>>;

fn split_key(key: &str) -> (&str, &str) {
    match key.split_once('/') {
        Some((section, name)) if !section.is_empty() => (section, name),
        _ => (GENERAL_SECTION, key.trim_start_matches('/')),
    }
}

fn parse_ini(contents: &str) -> Sections {
    let mut sections = Sections::new();
    let mut current = GENERAL_SECTION.to_string();
    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = section.trim().to_string();
            continue;
        }
        match line.split_once('=') {
            Some((name, value)) => {
                sections
                    .entry(current.clone())
                    .or_default()
                    .insert(name.trim().to_string(), unescape_value(value));
            }
            None => log::warn!("IniSettingsStore: Skipping malformed line '{line}'"),
        }
    }
    sections
}

fn render_ini(sections: &Sections) -> String {
    let mut out = String::new();
    for (section, entries) in sections {
        if entries.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{section}]\n"));
        for (name, value) in entries {
            out.push_str(&format!("{name}={}\n", escape_value(value)));
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '"' => escaped.push_str("\\\""),
            _ => escaped.push(c),
        }
    }
    let padded = value.starts_with(char::is_whitespace) || value.ends_with(char::is_whitespace);
    if padded {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

// Inverse of `escape_value`. Unknown escapes are kept as written.
fn unescape_value(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed);
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => value.push('\\'),
            Some('n') => value.push('\n'),
            Some('r') => value.push('\r'),
            Some('"') => value.push('"'),
            Some(other) => {
                value.push('\\');
                value.push(other);
            }
            None => value.push('\\'),
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> IniSettingsStore {
        IniSettingsStore::new(dir.join("script_tree_maya.ini"))
    }

    #[test]
    fn test_get_missing_file_returns_default() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert_eq!(store.get(KEY_FOLDER_PATH, "/default"), "/default");
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.set(KEY_FOLDER_PATH, "/home/artist/scripts").unwrap();

        assert_eq!(store.get(KEY_FOLDER_PATH, "/default"), "/home/artist/scripts");
        assert_eq!(store.get(KEY_DOUBLE_CLICK_ACTION, "fallback"), "fallback");
    }

    #[test]
    fn test_set_overwrites_and_preserves_other_keys() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.set(KEY_FOLDER_PATH, "/one").unwrap();
        store
            .set(
                KEY_DOUBLE_CLICK_ACTION,
                DoubleClickAction::RunOnDoubleClick.as_setting_str(),
            )
            .unwrap();
        store.set(KEY_FOLDER_PATH, "/two").unwrap();

        assert_eq!(store.get(KEY_FOLDER_PATH, ""), "/two");
        assert_eq!(
            store.get(KEY_DOUBLE_CLICK_ACTION, ""),
            "Run Script on Double-Click"
        );
    }

    #[test]
    fn test_values_are_visible_to_a_fresh_store() {
        let dir = tempdir().unwrap();
        store_in(dir.path()).set("window/layout", "abc=def").unwrap();

        let reopened = store_in(dir.path());
        assert_eq!(reopened.get("window/layout", ""), "abc=def");
    }

    #[test]
    fn test_file_is_ini_formatted() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.set(KEY_FOLDER_PATH, "C:\\Scripts").unwrap();
        store.set("plain_key", "1").unwrap();

        let contents = fs::read_to_string(store.file_path()).unwrap();
        assert!(contents.contains("[script_tree]\nfolder_path=C:\\\\Scripts\n"));
        assert!(contents.contains("[General]\nplain_key=1\n"));
    }

    #[test]
    fn test_padded_values_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.set(KEY_FOLDER_PATH, " /path/with space ").unwrap();
        store.set("script_tree/trailing", "/trailing ").unwrap();
        store.set("script_tree/quoted", "\"already quoted\"").unwrap();

        assert_eq!(store.get(KEY_FOLDER_PATH, ""), " /path/with space ");
        assert_eq!(store.get("script_tree/trailing", ""), "/trailing ");
        assert_eq!(store.get("script_tree/quoted", ""), "\"already quoted\"");
    }

    #[test]
    fn test_multi_line_values_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.set("script_tree/notes", "line1\nline2\r\nC:\\n").unwrap();

        assert_eq!(store.get("script_tree/notes", ""), "line1\nline2\r\nC:\\n");
        let contents = fs::read_to_string(store.file_path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_value_cannot_inject_keys() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.set(KEY_FOLDER_PATH, "/scripts").unwrap();

        store.set("script_tree/a", "line1\n[evil]\nb=2\nfolder_path=/elsewhere").unwrap();

        assert_eq!(store.get(KEY_FOLDER_PATH, ""), "/scripts");
        assert_eq!(store.get("evil/b", "none"), "none");
        assert_eq!(
            store.get("script_tree/a", ""),
            "line1\n[evil]\nb=2\nfolder_path=/elsewhere"
        );
    }

    #[test]
    fn test_hosts_do_not_share_settings() {
        let dir = tempdir().unwrap();
        let maya = IniSettingsStore::new(dir.path().join("script_tree_maya.ini"));
        let mobu = IniSettingsStore::new(dir.path().join("script_tree_motionbuilder.ini"));

        maya.set(KEY_FOLDER_PATH, "/maya").unwrap();

        assert_eq!(mobu.get(KEY_FOLDER_PATH, "/unset"), "/unset");
    }

    #[test]
    fn test_double_click_action_parsing() {
        assert_eq!(
            DoubleClickAction::from_setting_str("Run Script on Double-Click"),
            DoubleClickAction::RunOnDoubleClick
        );
        assert_eq!(
            DoubleClickAction::from_setting_str("garbage"),
            DoubleClickAction::EditOnDoubleClick
        );
        assert_eq!(DoubleClickAction::default(), DoubleClickAction::EditOnDoubleClick);
    }

    #[test]
    fn test_parse_ignores_comments_and_malformed_lines() {
        let sections = parse_ini("; comment\n[a]\nx = 1\nnot a pair\n# other\ny=a\\q\n");
        assert_eq!(sections["a"]["x"], "1");
        assert_eq!(sections["a"]["y"], "a\\q");
        assert_eq!(sections["a"].len(), 2);
    }
}
