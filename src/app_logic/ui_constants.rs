/*
 * Shared constants of the Script Tree panel: window text, dialog strings,
 * the debounce delay of the search box and the shortcut table. The shortcut
 * table is used both for the main menu and for the bindings attached to the
 * host's script editor once the host is ready.
 */

use crate::core::ShortcutBinding;
use crate::platform_layer::types::MenuAction;
use std::time::Duration;

pub const WINDOW_TEXT: &str = "Script Tree";

// Quiet time after the last search-box edit before the tree is re-filtered.
pub const USER_INPUT_FILTER_DELAY: Duration = Duration::from_millis(200);

pub const SCRIPT_FILE_FILTER_SPEC: &str = "Script File (*.py *.mel)";
pub const SAVE_FILE_FILTER_SPEC: &str = "Python File (*.py);;MEL File (*.mel)";

pub const BACKUP_TREE_TITLE: &str = "Backup ScriptTree?";
pub const BACKUP_TREE_PROMPT: &str = "This will make a local copy of the entire script tree folder";

pub const SEARCH_DIALOG_TITLE: &str = "Search ScriptTree";
pub const SEARCH_DIALOG_PROMPT: &str = "Search the entire ScriptTree folder for a specific string";

/// File menu entries: (action, shortcut, text).
pub const FILE_MENU_ACTIONS: [(MenuAction, ShortcutBinding); 7] = [
    (MenuAction::NewScript, binding("Ctrl+N", "New Script")),
    (MenuAction::OpenScript, binding("Ctrl+O", "Open Script")),
    (MenuAction::SaveScript, binding("Ctrl+S", "Save Script")),
    (MenuAction::SaveScriptAs, binding("Ctrl+Shift+S", "Save Script as...")),
    (MenuAction::CloseScript, binding("Ctrl+W", "Close Script")),
    (MenuAction::ReopenClosedScript, binding("Ctrl+Shift+T", "Reopen closed Script")),
    (MenuAction::ReloadScript, binding("F5", "Reload Script")),
];

pub const EDIT_MENU_ACTIONS: [(MenuAction, ShortcutBinding); 1] = [(
    MenuAction::FindInScriptTree,
    binding("Ctrl+Shift+F", "Find in ScriptTree"),
)];

const fn binding(shortcut: &'static str, text: &'static str) -> ShortcutBinding {
    ShortcutBinding { shortcut, text }
}

/// Every action that has a keyboard shortcut.
pub fn shortcut_actions() -> impl Iterator<Item = &'static (MenuAction, ShortcutBinding)> {
    FILE_MENU_ACTIONS.iter().chain(EDIT_MENU_ACTIONS.iter())
}

pub fn shortcut_bindings() -> Vec<ShortcutBinding> {
    shortcut_actions().map(|(_, b)| b.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shortcuts_are_unique() {
        let mut seen = HashSet::new();
        for (_, b) in shortcut_actions() {
            assert!(seen.insert(b.shortcut.to_lowercase()), "duplicate {}", b.shortcut);
        }
    }

    #[test]
    fn test_bindings_cover_file_and_edit_menus() {
        let bindings = shortcut_bindings();
        assert_eq!(bindings.len(), FILE_MENU_ACTIONS.len() + EDIT_MENU_ACTIONS.len());
        assert!(
            shortcut_actions()
                .any(|(action, b)| *action == MenuAction::ReopenClosedScript
                    && b.shortcut == "Ctrl+Shift+T")
        );
    }
}
