/*
 * This module consolidates the core, platform-agnostic logic of the Script
 * Tree panel: the search-box filter index, the backup policy, the persisted
 * settings store, the per-host folder layout, the file tree model, the
 * external text search and the boundary to the host's script editor
 * (`ScriptEditorHost`). Trait seams (`BackupOperations`,
 * `SettingsStoreOperations`, `ScriptEditorHost`) let the panel logic be
 * tested with mocks.
 */
pub mod backup;
pub mod editor_host;
pub mod file_node;
pub mod host;
pub mod path_utils;
pub mod script_search;
pub mod settings;
pub mod tree_filter;

pub use backup::{BackupOperations, CoreBackupManager};
pub use editor_host::{
    HostError, LocalEditorHost, ScriptEditorHost, ShortcutBinding, create_editor_host,
};
pub use file_node::{FileNode, NameFilter, count_files, scan_script_tree};
pub use host::{HostKind, detect_host};
pub use path_utils::ScriptTreeLayout;
pub use settings::{
    DoubleClickAction, IniSettingsStore, KEY_DOUBLE_CLICK_ACTION, KEY_FOLDER_PATH,
    SettingsStoreOperations,
};
pub use tree_filter::{FilterResult, compute_patterns};
