use super::filter_debounce::FilterDebouncer;
use super::panel_ui_state::PanelUiState;
use super::ui_constants;
use crate::core::script_search::{self, SEARCH_PLACEHOLDER};
use crate::core::{
    BackupOperations, DoubleClickAction, HostError, HostKind, KEY_DOUBLE_CLICK_ACTION,
    KEY_FOLDER_PATH, ScriptEditorHost, ScriptTreeLayout, SettingsStoreOperations,
    compute_patterns,
};
use crate::platform_layer::{
    AppEvent, MenuAction, MenuItemConfig, MessageSeverity, PlatformCommand, PlatformEventHandler,
    TreeItemId,
};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/*
 * Multi-step flows waiting for a dialog answer from the platform layer.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingAction {
    OpeningScript,
    SavingScript,
    ChoosingFolder,
    ConfirmingTreeBackup,
    SearchingScripts,
}

/*
 * The Script Tree panel controller. It receives `AppEvent`s from the platform
 * layer, drives the filter index, backup policy, settings store and the
 * host's script editor, and enqueues `PlatformCommand`s in response.
 *
 * All collaborators sit behind traits so the controller can be exercised
 * with mocks (see `handler_tests.rs`).
 */
pub struct ScriptTreeLogic {
    pub(crate) host_kind: HostKind,
    pub(crate) layout: ScriptTreeLayout,
    pub(crate) settings: Box<dyn SettingsStoreOperations>,
    pub(crate) backup: Box<dyn BackupOperations>,
    pub(crate) editor: Box<dyn ScriptEditorHost>,
    pub(crate) ui_state: PanelUiState,
    pub(crate) debouncer: FilterDebouncer,
    // Paths of closed tabs, most recent last. `None` for untitled tabs.
    pub(crate) recently_closed: Vec<Option<PathBuf>>,
    pub(crate) pending_action: Option<PendingAction>,
    pub(crate) shortcuts_hook_ran: bool,
    command_queue: VecDeque<PlatformCommand>,
}

impl ScriptTreeLogic {
    pub fn new(
        host_kind: HostKind,
        layout: ScriptTreeLayout,
        settings: Box<dyn SettingsStoreOperations>,
        backup: Box<dyn BackupOperations>,
        editor: Box<dyn ScriptEditorHost>,
    ) -> Self {
        let initial_folder = layout.default_script_folder.clone();
        ScriptTreeLogic {
            host_kind,
            layout,
            settings,
            backup,
            editor,
            ui_state: PanelUiState::new(initial_folder),
            debouncer: FilterDebouncer::new(ui_constants::USER_INPUT_FILTER_DELAY),
            recently_closed: Vec::new(),
            pending_action: None,
            shortcuts_hook_ran: false,
            command_queue: VecDeque::new(),
        }
    }

    fn enqueue(&mut self, command: PlatformCommand) {
        self.command_queue.push_back(command);
    }

    fn show_message(&mut self, severity: MessageSeverity, text: String) {
        self.enqueue(PlatformCommand::ShowMessage {
            title: ui_constants::WINDOW_TEXT.to_string(),
            text,
            severity,
        });
    }

    fn report_host_error(&mut self, context: &str, error: HostError) {
        log::warn!("ScriptTreeLogic: {context} failed: {error}");
        self.show_message(MessageSeverity::Warning, format!("{context} failed: {error}"));
    }

    pub(crate) fn double_click_action(&self) -> DoubleClickAction {
        let stored = self.settings.get(
            KEY_DOUBLE_CLICK_ACTION,
            DoubleClickAction::default().as_setting_str(),
        );
        DoubleClickAction::from_setting_str(&stored)
    }

    fn build_main_menu(&self) -> Vec<MenuItemConfig> {
        fn item(action: MenuAction, text: &str, shortcut: Option<&'static str>) -> MenuItemConfig {
            MenuItemConfig {
                action: Some(action),
                text: text.to_string(),
                shortcut,
                checked: None,
                children: Vec::new(),
            }
        }
        fn submenu(text: &str, children: Vec<MenuItemConfig>) -> MenuItemConfig {
            MenuItemConfig {
                action: None,
                text: text.to_string(),
                shortcut: None,
                checked: None,
                children,
            }
        }

        let file_items = ui_constants::FILE_MENU_ACTIONS
            .iter()
            .map(|(action, b)| item(*action, b.text, Some(b.shortcut)))
            .collect();
        let edit_items = ui_constants::EDIT_MENU_ACTIONS
            .iter()
            .map(|(action, b)| item(*action, b.text, Some(b.shortcut)))
            .collect();

        let current = self.double_click_action();
        let mut script_items = vec![
            item(MenuAction::RunScript, "Run Script", None),
            item(MenuAction::EditScript, "Edit Script", None),
        ];
        for choice in DoubleClickAction::ALL {
            let mut radio = item(
                MenuAction::SetDoubleClickAction(choice),
                choice.as_setting_str(),
                None,
            );
            radio.checked = Some(choice == current);
            script_items.push(radio);
        }
        script_items.extend([
            item(MenuAction::SetFolder, "Set Script Folder", None),
            item(MenuAction::CopyPath, "Copy path", None),
            item(MenuAction::ShowInExplorer, "Show in explorer", None),
            item(MenuAction::OpenBackupFolder, "Open backup folder", None),
            item(MenuAction::BackupScriptTree, "Backup Script Tree", None),
        ]);

        vec![
            submenu("File", file_items),
            submenu("Edit", edit_items),
            submenu("Script", script_items),
        ]
    }

    fn refresh_menu(&mut self) {
        let menu_items = self.build_main_menu();
        self.enqueue(PlatformCommand::CreateMainMenu { menu_items });
    }

    /*
     * Rebuilds the visible tree from the cached scan and the active filter,
     * then expands or collapses it to match the filter state.
     */
    fn refresh_tree_view(&mut self) {
        let items = self.ui_state.build_visible_tree();
        self.enqueue(PlatformCommand::PopulateTreeView { items });
        if self.ui_state.filter.should_expand {
            self.enqueue(PlatformCommand::ExpandAllTreeItems);
        } else {
            self.enqueue(PlatformCommand::CollapseAllTreeItems);
        }
    }

    fn rescan_and_refresh(&mut self) {
        self.ui_state.rescan();
        self.refresh_tree_view();
    }

    // --- Event handlers ---

    fn on_panel_created(&mut self) {
        let default_folder = self.layout.default_script_folder.to_string_lossy().into_owned();
        let folder = self.settings.get(KEY_FOLDER_PATH, &default_folder);
        log::debug!("ScriptTreeLogic: Starting with script folder '{folder}'");

        self.enqueue(PlatformCommand::SetWindowTitle {
            title: format!("{} - {}", ui_constants::WINDOW_TEXT, self.host_kind),
        });
        self.refresh_menu();
        self.set_script_folder(PathBuf::from(folder));
    }

    /*
     * Attaches the shortcut table to the host's script editor. This hook runs
     * once; when the host has no script editor widget nothing happens and it
     * is not retried.
     */
    fn on_host_ready(&mut self) {
        if self.shortcuts_hook_ran {
            log::trace!("ScriptTreeLogic: Host ready hook already ran, ignoring.");
            return;
        }
        self.shortcuts_hook_ran = true;
        let bindings = ui_constants::shortcut_bindings();
        if self.editor.attach_shortcuts(&bindings) {
            log::debug!(
                "ScriptTreeLogic: Attached {} shortcuts to the host script editor.",
                bindings.len()
            );
        } else {
            log::debug!("ScriptTreeLogic: No host script editor widget, shortcuts not attached.");
        }
    }

    fn on_filter_text_changed(&mut self, text: String) {
        self.debouncer.input(text, Instant::now());
    }

    fn on_timer_tick(&mut self, now: Instant) {
        if let Some(text) = self.debouncer.poll(now) {
            self.apply_filter(&text);
        }
    }

    pub(crate) fn apply_filter(&mut self, query: &str) {
        self.ui_state.filter = compute_patterns(query);
        log::trace!(
            "ScriptTreeLogic: Filter '{query}' -> {:?}",
            self.ui_state.filter.patterns
        );
        self.refresh_tree_view();
    }

    fn on_tree_item_selected(&mut self, item_id: TreeItemId) {
        self.ui_state.selected_path = self.ui_state.path_for_item(item_id).map(Path::to_path_buf);
        if self.ui_state.selected_path.is_none() {
            log::warn!("ScriptTreeLogic: Selection of unknown tree item {item_id:?}");
        }
    }

    /*
     * Double click dispatch. The preference is read back from the settings
     * store on every click so a change takes effect immediately.
     */
    fn on_tree_item_double_clicked(&mut self, item_id: TreeItemId) {
        self.on_tree_item_selected(item_id);
        let Some(path) = self.ui_state.selected_path.clone() else {
            return;
        };
        match self.double_click_action() {
            DoubleClickAction::RunOnDoubleClick => self.run_script(&path),
            DoubleClickAction::EditOnDoubleClick => self.open_script(&path),
        }
    }

    fn on_menu_action(&mut self, action: MenuAction) {
        log::debug!("ScriptTreeLogic: Menu action {action:?}");
        match action {
            MenuAction::NewScript => {
                let content = self.host_kind.default_script_content();
                if let Err(e) = self.editor.new_tab(content) {
                    self.report_host_error("New script", e);
                }
            }
            MenuAction::OpenScript => {
                self.pending_action = Some(PendingAction::OpeningScript);
                self.enqueue(PlatformCommand::ShowOpenFileDialog {
                    title: "Open Script".to_string(),
                    filter_spec: ui_constants::SCRIPT_FILE_FILTER_SPEC.to_string(),
                    initial_dir: Some(self.ui_state.script_folder.clone()),
                });
            }
            MenuAction::SaveScript => self.save_selected_tab(false),
            MenuAction::SaveScriptAs => self.save_selected_tab(true),
            MenuAction::CloseScript => self.close_selected_tab(),
            MenuAction::ReopenClosedScript => self.reopen_recently_closed(),
            MenuAction::ReloadScript => {
                if let Err(e) = self.editor.reload_tab() {
                    self.report_host_error("Reload script", e);
                }
            }
            MenuAction::FindInScriptTree => {
                let selected_text = self.editor.selected_text();
                let default_text = if selected_text.is_empty() {
                    SEARCH_PLACEHOLDER.to_string()
                } else {
                    selected_text
                };
                self.pending_action = Some(PendingAction::SearchingScripts);
                self.enqueue(PlatformCommand::ShowInputDialog {
                    title: ui_constants::SEARCH_DIALOG_TITLE.to_string(),
                    prompt: ui_constants::SEARCH_DIALOG_PROMPT.to_string(),
                    default_text: Some(default_text),
                });
            }
            MenuAction::RunScript => {
                if let Some(path) = self.ui_state.selected_path.clone() {
                    self.run_script(&path);
                }
            }
            MenuAction::EditScript => {
                if let Some(path) = self.ui_state.selected_path.clone() {
                    self.open_script(&path);
                }
            }
            MenuAction::SetDoubleClickAction(choice) => {
                if let Err(e) = self
                    .settings
                    .set(KEY_DOUBLE_CLICK_ACTION, choice.as_setting_str())
                {
                    log::error!("ScriptTreeLogic: Failed to store double-click preference: {e}");
                    self.show_message(
                        MessageSeverity::Warning,
                        format!("Could not save the double-click preference: {e}"),
                    );
                }
                self.refresh_menu();
            }
            MenuAction::SetFolder => {
                self.pending_action = Some(PendingAction::ChoosingFolder);
                self.enqueue(PlatformCommand::ShowFolderPickerDialog {
                    title: "Choose Script Folder".to_string(),
                    initial_dir: Some(self.ui_state.script_folder.clone()),
                });
            }
            MenuAction::CopyPath => {
                if let Some(path) = &self.ui_state.selected_path {
                    let text = path.to_string_lossy().into_owned();
                    self.enqueue(PlatformCommand::SetClipboardText { text });
                }
            }
            MenuAction::ShowInExplorer => {
                if let Some(path) = self.ui_state.selected_path.clone() {
                    self.enqueue(PlatformCommand::OpenInFileManager { path });
                }
            }
            MenuAction::OpenBackupFolder => {
                let Some(selected) = self.ui_state.selected_path.clone() else {
                    return;
                };
                let mut folder = self.backup.backup_folder_for_script(&selected);
                if !folder.exists() {
                    folder = self.backup.script_backup_root().to_path_buf();
                }
                self.enqueue(PlatformCommand::OpenInFileManager { path: folder });
            }
            MenuAction::BackupScriptTree => {
                self.pending_action = Some(PendingAction::ConfirmingTreeBackup);
                self.enqueue(PlatformCommand::ShowConfirmationDialog {
                    title: ui_constants::BACKUP_TREE_TITLE.to_string(),
                    prompt: ui_constants::BACKUP_TREE_PROMPT.to_string(),
                });
            }
        }
    }

    /*
     * Takes the pending action if it matches `expected`. Dialog answers that
     * arrive without the matching request are dropped.
     */
    fn take_pending(&mut self, expected: PendingAction) -> bool {
        if self.pending_action == Some(expected) {
            self.pending_action = None;
            true
        } else {
            log::warn!(
                "ScriptTreeLogic: Dialog result for {expected:?} while pending is {:?}, ignoring.",
                self.pending_action
            );
            false
        }
    }

    fn on_file_open_dialog_completed(&mut self, result: Option<PathBuf>) {
        if !self.take_pending(PendingAction::OpeningScript) {
            return;
        }
        if let Some(path) = result {
            self.open_script(&path);
        }
    }

    fn on_file_save_dialog_completed(&mut self, result: Option<PathBuf>) {
        if !self.take_pending(PendingAction::SavingScript) {
            return;
        }
        if let Some(path) = result {
            self.finish_save(&path);
        }
    }

    fn on_folder_picker_dialog_completed(&mut self, path: Option<PathBuf>) {
        if !self.take_pending(PendingAction::ChoosingFolder) {
            return;
        }
        if let Some(path) = path {
            self.set_script_folder(path);
        }
    }

    fn on_confirmation_dialog_completed(&mut self, confirmed: bool) {
        if !self.take_pending(PendingAction::ConfirmingTreeBackup) || !confirmed {
            return;
        }
        self.backup_script_tree();
    }

    fn on_input_dialog_completed(&mut self, text: Option<String>) {
        if !self.take_pending(PendingAction::SearchingScripts) {
            return;
        }
        match text {
            Some(needle) if !needle.is_empty() => self.search_script_tree(&needle),
            _ => {}
        }
    }

    // --- Actions ---

    pub(crate) fn open_script(&mut self, path: &Path) {
        if path.is_dir() {
            return;
        }
        match self.editor.open_tab(path) {
            Ok(()) => log::info!("Opened: {}", path.display()),
            Err(e) => self.report_host_error("Open script", e),
        }
    }

    /*
     * Runs a script through the host. Only Python is supported; MEL scripts
     * are reported and skipped, other files are ignored.
     */
    pub(crate) fn run_script(&mut self, path: &Path) {
        if path.is_dir() {
            return;
        }
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("py") => match self.editor.run_script(path) {
                Ok(()) => log::info!("Executed: {}", path.display()),
                Err(e) => self.report_host_error("Run script", e),
            },
            Some("mel") => {
                log::warn!("Running MEL scripts is not supported: {}", path.display());
            }
            _ => log::debug!("ScriptTreeLogic: Not a runnable script: {path:?}"),
        }
    }

    fn save_selected_tab(&mut self, prompt_path: bool) {
        match self.editor.selected_path() {
            Some(path) if !prompt_path => self.finish_save(&path),
            _ => {
                self.pending_action = Some(PendingAction::SavingScript);
                self.enqueue(PlatformCommand::ShowSaveFileDialog {
                    title: "Save Script".to_string(),
                    filter_spec: ui_constants::SAVE_FILE_FILTER_SPEC.to_string(),
                    initial_dir: Some(self.ui_state.script_folder.clone()),
                });
            }
        }
    }

    // Backs up whatever is on disk first; a failed backup never blocks the save.
    fn finish_save(&mut self, path: &Path) {
        self.backup.backup_file(path);
        match self.editor.save_tab(path) {
            Ok(()) => {
                if path.starts_with(&self.ui_state.script_folder) {
                    self.rescan_and_refresh();
                }
            }
            Err(e) => self.report_host_error("Save script", e),
        }
    }

    fn close_selected_tab(&mut self) {
        let closing_path = self.editor.selected_path();
        match self.editor.close_tab() {
            Ok(()) => self.recently_closed.push(closing_path),
            Err(e) => self.report_host_error("Close script", e),
        }
    }

    fn reopen_recently_closed(&mut self) {
        let Some(entry) = self.recently_closed.pop() else {
            log::trace!("ScriptTreeLogic: No recently closed script to reopen.");
            return;
        };
        // Untitled tabs have no path to reopen.
        if let Some(path) = entry {
            self.open_script(&path);
        }
    }

    /*
     * Makes `folder` the active script folder: creates it if missing,
     * persists it and re-populates the tree.
     */
    pub(crate) fn set_script_folder(&mut self, folder: PathBuf) {
        if !folder.exists() {
            if let Err(e) = fs::create_dir_all(&folder) {
                log::error!("ScriptTreeLogic: Could not create script folder {folder:?}: {e}");
                self.show_message(
                    MessageSeverity::Error,
                    format!("Could not create script folder {}: {e}", folder.display()),
                );
                return;
            }
            log::info!("Created script folder: {}", folder.display());
        }

        if let Err(e) = self
            .settings
            .set(KEY_FOLDER_PATH, &folder.to_string_lossy())
        {
            log::error!("ScriptTreeLogic: Failed to store script folder: {e}");
        }

        self.enqueue(PlatformCommand::SetFolderText {
            text: folder.to_string_lossy().into_owned(),
        });
        self.ui_state.script_folder = folder;
        self.ui_state.selected_path = None;
        self.rescan_and_refresh();
    }

    fn backup_script_tree(&mut self) {
        let source = self.ui_state.script_folder.clone();
        match self.backup.backup_tree(&source) {
            Ok(record) => self.show_message(
                MessageSeverity::Information,
                format!(
                    "ScriptTree folder saved: {}",
                    record.destination_folder.display()
                ),
            ),
            Err(e) => {
                log::error!("ScriptTreeLogic: Tree backup of {source:?} failed: {e}");
                self.show_message(MessageSeverity::Error, format!("Backup failed: {e}"));
            }
        }
    }

    fn search_script_tree(&mut self, needle: &str) {
        let folder = self.ui_state.script_folder.clone();
        match script_search::search_scripts(&folder, needle) {
            Ok(output) => {
                if !output.success {
                    log::debug!("ScriptTreeLogic: Search for '{needle}' matched nothing.");
                }
                log::info!("Search Results:\n{}", output.text);
                self.enqueue(PlatformCommand::ShowSearchResults {
                    title: format!("Search results for '{needle}'"),
                    text: output.text,
                });
            }
            Err(e) => {
                log::error!("ScriptTreeLogic: Could not run search tool: {e}");
                self.show_message(
                    MessageSeverity::Error,
                    format!("Could not run the search tool: {e}"),
                );
            }
        }
    }
}

impl PlatformEventHandler for ScriptTreeLogic {
    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::PanelCreated => self.on_panel_created(),
            AppEvent::HostReady => self.on_host_ready(),
            AppEvent::FilterTextChanged { text } => self.on_filter_text_changed(text),
            AppEvent::TimerTick { now } => self.on_timer_tick(now),
            AppEvent::TreeItemSelected { item_id } => self.on_tree_item_selected(item_id),
            AppEvent::TreeItemDoubleClicked { item_id } => {
                self.on_tree_item_double_clicked(item_id)
            }
            AppEvent::MenuActionClicked { action } => self.on_menu_action(action),
            AppEvent::FileOpenDialogCompleted { result } => {
                self.on_file_open_dialog_completed(result)
            }
            AppEvent::FileSaveDialogCompleted { result } => {
                self.on_file_save_dialog_completed(result)
            }
            AppEvent::FolderPickerDialogCompleted { path } => {
                self.on_folder_picker_dialog_completed(path)
            }
            AppEvent::ConfirmationDialogCompleted { confirmed } => {
                self.on_confirmation_dialog_completed(confirmed)
            }
            AppEvent::InputDialogCompleted { text } => self.on_input_dialog_completed(text),
            AppEvent::CloseRequested => self.enqueue(PlatformCommand::QuitApplication),
        }
    }

    fn on_quit(&mut self) {
        log::debug!(
            "ScriptTreeLogic: Quitting with {} recently closed entries discarded.",
            self.recently_closed.len()
        );
    }

    fn try_dequeue_command(&mut self) -> Option<PlatformCommand> {
        self.command_queue.pop_front()
    }

    fn next_timer_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }
}
