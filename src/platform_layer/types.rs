/*
 * This module defines the data types used for communication between the
 * application logic and the platform layer: identifiers for tree items,
 * menu descriptions, platform-agnostic events (`AppEvent`), commands for the
 * platform layer (`PlatformCommand`), message severities and semantic menu
 * actions (`MenuAction`). It also defines the `PlatformEventHandler` trait
 * that the application logic implements.
 */

use crate::core::DoubleClickAction;
use std::path::PathBuf;
use std::time::Instant;

// An opaque identifier for an item within the script tree view.
//
// Generated by the application logic each time the tree is rebuilt; the
// platform layer only echoes it back in selection and double-click events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeItemId(pub u64);

/*
 * Logical menu and shortcut actions of the panel. The platform layer maps
 * these to whatever native menu entries or key bindings it has.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuAction {
    NewScript,
    OpenScript,
    SaveScript,
    SaveScriptAs,
    CloseScript,
    ReopenClosedScript,
    ReloadScript,
    FindInScriptTree,
    RunScript,
    EditScript,
    SetDoubleClickAction(DoubleClickAction),
    SetFolder,
    CopyPath,
    ShowInExplorer,
    OpenBackupFolder,
    BackupScriptTree,
}

// Describes a single item to be displayed in the script tree view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItemDescriptor {
    pub id: TreeItemId,
    pub text: String,
    pub is_folder: bool,
    pub children: Vec<TreeItemDescriptor>,
}

/*
 * Configuration for a single menu item. Entries that only open a submenu
 * have `action: None`; radio-style entries carry `checked: Some(_)`.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemConfig {
    pub action: Option<MenuAction>,
    pub text: String,
    pub shortcut: Option<&'static str>,
    pub checked: Option<bool>,
    pub children: Vec<MenuItemConfig>,
}

// --- Events from Platform to App Logic ---

#[derive(Debug, Clone)]
pub enum AppEvent {
    // The panel has been created and is ready to be populated.
    PanelCreated,
    // The host application finished its own initialization.
    HostReady,
    // The search box text changed (one event per edit).
    FilterTextChanged {
        text: String,
    },
    // Periodic tick from the event loop, used to fire pending timers.
    TimerTick {
        now: Instant,
    },
    TreeItemSelected {
        item_id: TreeItemId,
    },
    TreeItemDoubleClicked {
        item_id: TreeItemId,
    },
    MenuActionClicked {
        action: MenuAction,
    },
    FileOpenDialogCompleted {
        result: Option<PathBuf>,
    },
    FileSaveDialogCompleted {
        result: Option<PathBuf>,
    },
    FolderPickerDialogCompleted {
        path: Option<PathBuf>,
    },
    ConfirmationDialogCompleted {
        confirmed: bool,
    },
    InputDialogCompleted {
        text: Option<String>,
    },
    CloseRequested,
}

// Defines the severity of a message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageSeverity {
    Information,
    Warning,
    Error,
}

// Commands from the application logic to the platform layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCommand {
    SetWindowTitle {
        title: String,
    },
    CreateMainMenu {
        menu_items: Vec<MenuItemConfig>,
    },
    SetFolderText {
        text: String,
    },
    PopulateTreeView {
        items: Vec<TreeItemDescriptor>,
    },
    ExpandAllTreeItems,
    CollapseAllTreeItems,
    ShowOpenFileDialog {
        title: String,
        filter_spec: String,
        initial_dir: Option<PathBuf>,
    },
    ShowSaveFileDialog {
        title: String,
        filter_spec: String,
        initial_dir: Option<PathBuf>,
    },
    ShowFolderPickerDialog {
        title: String,
        initial_dir: Option<PathBuf>,
    },
    ShowConfirmationDialog {
        title: String,
        prompt: String,
    },
    ShowInputDialog {
        title: String,
        prompt: String,
        default_text: Option<String>,
    },
    ShowMessage {
        title: String,
        text: String,
        severity: MessageSeverity,
    },
    ShowSearchResults {
        title: String,
        text: String,
    },
    SetClipboardText {
        text: String,
    },
    OpenInFileManager {
        path: PathBuf,
    },
    QuitApplication,
}

// --- Trait for App Logic to Handle Events ---

pub trait PlatformEventHandler {
    // Handles one event and enqueues the resulting `PlatformCommand`s.
    fn handle_event(&mut self, event: AppEvent);

    // Called when the event loop is about to exit.
    fn on_quit(&mut self) {}

    // Dequeues a single pending command; the run loop drains this after every event.
    fn try_dequeue_command(&mut self) -> Option<PlatformCommand>;

    /*
     * The earliest instant at which the handler wants a `TimerTick`, if any.
     * The platform layer must deliver a tick no earlier than this.
     */
    fn next_timer_deadline(&self) -> Option<Instant>;
}
