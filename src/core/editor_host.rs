/*
 * The boundary to the host application's tab-based script editor. The panel
 * logic only talks to `ScriptEditorHost`; which host backs it is decided once
 * at startup by `create_editor_host(detect_host())`.
 *
 * `LocalEditorHost` is the adapter shipped with this crate. It keeps the tab
 * sessions itself (path + text buffer), reads and writes the files on disk,
 * and runs Python scripts with the system interpreter. MEL tabs exist only
 * when the host kind is Maya.
 */
use super::host::HostKind;
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;

pub const PYTHON_INTERPRETER_ENV_VAR: &str = "SCRIPT_TREE_PYTHON";

#[derive(Debug)]
pub enum HostError {
    Io(io::Error),
    NoTabSelected,
    UnsupportedScriptType(PathBuf),
    ScriptFailed { path: PathBuf, status: Option<i32> },
}

impl From<io::Error> for HostError {
    fn from(err: io::Error) -> Self {
        HostError::Io(err)
    }
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostError::Io(e) => write!(f, "Script editor I/O error: {e}"),
            HostError::NoTabSelected => write!(f, "No script editor tab is selected"),
            HostError::UnsupportedScriptType(p) => {
                write!(f, "The host cannot handle this script type: {p:?}")
            }
            HostError::ScriptFailed { path, status } => match status {
                Some(code) => write!(f, "Script {path:?} exited with status {code}"),
                None => write!(f, "Script {path:?} was terminated"),
            },
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HostError::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HostError>;

/// A keyboard shortcut and the menu text of the action it triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutBinding {
    pub shortcut: &'static str,
    pub text: &'static str,
}

pub trait ScriptEditorHost {
    /// Opens `path` in a tab, or switches to (and reloads) its existing tab.
    fn open_tab(&mut self, path: &Path) -> Result<()>;
    /// Creates an untitled tab holding `content` and selects it.
    fn new_tab(&mut self, content: &str) -> Result<()>;
    /// Writes the selected tab to `path` and renames the tab after it.
    fn save_tab(&mut self, path: &Path) -> Result<()>;
    /// Executes a Python script file in the host.
    fn run_script(&mut self, path: &Path) -> Result<()>;
    fn close_tab(&mut self) -> Result<()>;
    /// Re-reads the selected tab's file from disk.
    fn reload_tab(&mut self) -> Result<()>;
    /// File path of the selected tab; `None` for untitled tabs or no tab.
    fn selected_path(&self) -> Option<PathBuf>;
    fn selected_text(&self) -> String;
    /*
     * Registers the panel's shortcuts on the host's script-editor widget.
     * Returns false when that widget does not exist.
     */
    fn attach_shortcuts(&mut self, bindings: &[ShortcutBinding]) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabLanguage {
    Python,
    Mel,
}

impl TabLanguage {
    pub fn for_path(path: &Path) -> Option<TabLanguage> {
        match path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .as_deref()
        {
            Some("py") => Some(TabLanguage::Python),
            Some("mel") => Some(TabLanguage::Mel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditorTab {
    pub path: Option<PathBuf>,
    pub language: TabLanguage,
    pub text: String,
}

impl EditorTab {
    pub fn label(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => match self.language {
                TabLanguage::Python => "Python".to_string(),
                TabLanguage::Mel => "MEL".to_string(),
            },
        }
    }
}

pub struct LocalEditorHost {
    kind: HostKind,
    python_interpreter: String,
    tabs: Vec<EditorTab>,
    selected: Option<usize>,
    selection: String,
    script_editor_present: bool,
    attached_shortcuts: Vec<ShortcutBinding>,
}

impl LocalEditorHost {
    pub fn new(kind: HostKind, python_interpreter: String) -> Self {
        LocalEditorHost {
            kind,
            python_interpreter,
            tabs: Vec::new(),
            selected: None,
            selection: String::new(),
            script_editor_present: true,
            attached_shortcuts: Vec::new(),
        }
    }

    pub fn tabs(&self) -> &[EditorTab] {
        &self.tabs
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn select_tab(&mut self, index: usize) -> bool {
        if index < self.tabs.len() {
            self.selected = Some(index);
            true
        } else {
            false
        }
    }

    /// Replaces the text highlighted in the editor.
    pub fn set_selected_text(&mut self, text: &str) {
        self.selection = text.to_string();
    }

    /// Appends a line to the selected tab's buffer.
    pub fn append_line(&mut self, line: &str) -> Result<()> {
        let tab = self.selected_tab_mut()?;
        if !tab.text.is_empty() && !tab.text.ends_with('\n') {
            tab.text.push('\n');
        }
        tab.text.push_str(line);
        tab.text.push('\n');
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn attached_shortcuts(&self) -> &[ShortcutBinding] {
        &self.attached_shortcuts
    }

    #[cfg(test)]
    pub(crate) fn set_script_editor_present(&mut self, present: bool) {
        self.script_editor_present = present;
    }

    fn selected_tab_mut(&mut self) -> Result<&mut EditorTab> {
        let index = self.selected.ok_or(HostError::NoTabSelected)?;
        self.tabs.get_mut(index).ok_or(HostError::NoTabSelected)
    }

    fn language_for(&self, path: &Path) -> Result<TabLanguage> {
        match TabLanguage::for_path(path) {
            Some(TabLanguage::Mel) if !self.kind.supports_mel_tabs() => {
                Err(HostError::UnsupportedScriptType(path.to_path_buf()))
            }
            Some(language) => Ok(language),
            None => Err(HostError::UnsupportedScriptType(path.to_path_buf())),
        }
    }
}

impl ScriptEditorHost for LocalEditorHost {
    fn open_tab(&mut self, path: &Path) -> Result<()> {
        if let Some(index) = self
            .tabs
            .iter()
            .position(|tab| tab.path.as_deref() == Some(path))
        {
            self.selected = Some(index);
            return self.reload_tab();
        }

        let language = self.language_for(path)?;
        let text = fs::read_to_string(path)?;
        self.tabs.push(EditorTab {
            path: Some(path.to_path_buf()),
            language,
            text,
        });
        self.selected = Some(self.tabs.len() - 1);
        log::debug!("LocalEditorHost: Opened tab for {path:?}");
        Ok(())
    }

    fn new_tab(&mut self, content: &str) -> Result<()> {
        self.tabs.push(EditorTab {
            path: None,
            language: TabLanguage::Python,
            text: content.to_string(),
        });
        self.selected = Some(self.tabs.len() - 1);
        Ok(())
    }

    fn save_tab(&mut self, path: &Path) -> Result<()> {
        let tab = self.selected_tab_mut()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &tab.text)?;
        tab.path = Some(path.to_path_buf());
        if let Some(language) = TabLanguage::for_path(path) {
            tab.language = language;
        }
        log::info!("LocalEditorHost: Saved: {}", path.display());
        Ok(())
    }

    fn run_script(&mut self, path: &Path) -> Result<()> {
        if TabLanguage::for_path(path) != Some(TabLanguage::Python) {
            return Err(HostError::UnsupportedScriptType(path.to_path_buf()));
        }
        let mut command = Command::new(&self.python_interpreter);
        command.arg(path);
        if let Some(parent) = path.parent() {
            command.current_dir(parent);
        }
        let status = command.status()?;
        if status.success() {
            Ok(())
        } else {
            Err(HostError::ScriptFailed {
                path: path.to_path_buf(),
                status: status.code(),
            })
        }
    }

    fn close_tab(&mut self) -> Result<()> {
        let index = self.selected.ok_or(HostError::NoTabSelected)?;
        if index >= self.tabs.len() {
            return Err(HostError::NoTabSelected);
        }
        self.tabs.remove(index);
        self.selected = if self.tabs.is_empty() {
            None
        } else {
            Some(index.min(self.tabs.len() - 1))
        };
        Ok(())
    }

    fn reload_tab(&mut self) -> Result<()> {
        let tab = self.selected_tab_mut()?;
        if let Some(path) = tab.path.clone() {
            tab.text = fs::read_to_string(&path)?;
            log::debug!("LocalEditorHost: Reloaded {path:?}");
        }
        Ok(())
    }

    fn selected_path(&self) -> Option<PathBuf> {
        self.selected
            .and_then(|index| self.tabs.get(index))
            .and_then(|tab| tab.path.clone())
    }

    fn selected_text(&self) -> String {
        self.selection.clone()
    }

    fn attach_shortcuts(&mut self, bindings: &[ShortcutBinding]) -> bool {
        if !self.script_editor_present {
            return false;
        }
        self.attached_shortcuts.extend_from_slice(bindings);
        true
    }
}

pub fn default_python_interpreter() -> String {
    std::env::var(PYTHON_INTERPRETER_ENV_VAR).unwrap_or_else(|_| {
        if cfg!(target_os = "windows") {
            "python".to_string()
        } else {
            "python3".to_string()
        }
    })
}

/*
 * A shared editor handle. The panel logic owns one handle while the front-end
 * keeps another to show and edit tab buffers.
 */
impl<T: ScriptEditorHost + ?Sized> ScriptEditorHost for Rc<RefCell<T>> {
    fn open_tab(&mut self, path: &Path) -> Result<()> {
        self.borrow_mut().open_tab(path)
    }
    fn new_tab(&mut self, content: &str) -> Result<()> {
        self.borrow_mut().new_tab(content)
    }
    fn save_tab(&mut self, path: &Path) -> Result<()> {
        self.borrow_mut().save_tab(path)
    }
    fn run_script(&mut self, path: &Path) -> Result<()> {
        self.borrow_mut().run_script(path)
    }
    fn close_tab(&mut self) -> Result<()> {
        self.borrow_mut().close_tab()
    }
    fn reload_tab(&mut self) -> Result<()> {
        self.borrow_mut().reload_tab()
    }
    fn selected_path(&self) -> Option<PathBuf> {
        self.borrow().selected_path()
    }
    fn selected_text(&self) -> String {
        self.borrow().selected_text()
    }
    fn attach_shortcuts(&mut self, bindings: &[ShortcutBinding]) -> bool {
        self.borrow_mut().attach_shortcuts(bindings)
    }
}

/// Creates the script-editor adapter for the detected host.
pub fn create_editor_host(kind: HostKind) -> Rc<RefCell<LocalEditorHost>> {
    log::debug!("EditorHost: Creating script editor adapter for {kind}");
    Rc::new(RefCell::new(LocalEditorHost::new(
        kind,
        default_python_interpreter(),
    )))
}
