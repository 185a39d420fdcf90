/*
 * A line-driven front-end for the Script Tree panel. It stands in for the
 * host's dock widget: every line read from the input becomes an `AppEvent`,
 * and every `PlatformCommand` the handler enqueues is rendered as text on the
 * output. Dialogs are answered inline on the next input line(s).
 *
 * The panel has no event loop of its own, so timers are serviced between
 * input lines: before blocking on the next line the console sleeps until the
 * handler's next deadline and delivers a `TimerTick`.
 */
use super::error::Result as PlatformResult;
use super::types::{
    AppEvent, MenuAction, MenuItemConfig, MessageSeverity, PlatformCommand, PlatformEventHandler,
    TreeItemDescriptor, TreeItemId,
};
use crate::core::path_utils::open_path_in_file_manager;
use crate::core::{LocalEditorHost, ScriptEditorHost};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;
use std::time::Instant;

const HELP_TEXT: &str = "\
Tree:    ls | filter <text> | select <n> | open <n>
Menu:    menu | <shortcut, e.g. Ctrl+S> | <menu text, e.g. Copy path>
Editor:  tabs | tab <n> | show | append <line> | seltext <text>
Other:   help | quit";

pub struct ConsolePlatform<R: BufRead, W: Write> {
    input: R,
    output: W,
    tree: Vec<TreeItemDescriptor>,
    expanded: bool,
    menu: Vec<MenuItemConfig>,
    folder_text: String,
    clipboard: Option<String>,
    editor: Option<Rc<RefCell<LocalEditorHost>>>,
    quit_requested: bool,
}

impl<R: BufRead, W: Write> ConsolePlatform<R, W> {
    pub fn new(input: R, output: W) -> Self {
        ConsolePlatform {
            input,
            output,
            tree: Vec::new(),
            expanded: false,
            menu: Vec::new(),
            folder_text: String::new(),
            clipboard: None,
            editor: None,
            quit_requested: false,
        }
    }

    /// Gives the console direct access to the editor tabs (`tabs`, `append`, ...).
    pub fn with_editor(mut self, editor: Rc<RefCell<LocalEditorHost>>) -> Self {
        self.editor = Some(editor);
        self
    }

    #[cfg(test)]
    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    /*
     * Runs the panel until the handler asks to quit or the input ends. The
     * panel-created and host-ready notifications are delivered first, in
     * that order.
     */
    pub fn run(&mut self, handler: &mut dyn PlatformEventHandler) -> PlatformResult<()> {
        self.dispatch(handler, AppEvent::PanelCreated)?;
        self.dispatch(handler, AppEvent::HostReady)?;

        while !self.quit_requested {
            self.fire_due_timers(handler)?;
            write!(self.output, "> ")?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                log::debug!("ConsolePlatform: Input closed.");
                self.dispatch(handler, AppEvent::CloseRequested)?;
                break;
            };
            if let Some(event) = self.interpret_line(&line)? {
                self.dispatch(handler, event)?;
            }
        }

        handler.on_quit();
        log::debug!("ConsolePlatform: Event loop exited cleanly.");
        Ok(())
    }

    /*
     * Sends `event` and executes the resulting commands. Commands that need
     * an answer (dialogs) produce follow-up events, which are dispatched
     * after the current batch has drained.
     */
    fn dispatch(
        &mut self,
        handler: &mut dyn PlatformEventHandler,
        event: AppEvent,
    ) -> PlatformResult<()> {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            log::trace!("ConsolePlatform: Dispatching {event:?}");
            handler.handle_event(event);
            while let Some(command) = handler.try_dequeue_command() {
                if let Some(follow_up) = self.execute_command(command)? {
                    pending.push_back(follow_up);
                }
            }
        }
        Ok(())
    }

    fn fire_due_timers(&mut self, handler: &mut dyn PlatformEventHandler) -> PlatformResult<()> {
        while let Some(deadline) = handler.next_timer_deadline() {
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
            self.dispatch(handler, AppEvent::TimerTick { now: Instant::now() })?;
            if handler.next_timer_deadline() == Some(deadline) {
                log::warn!("ConsolePlatform: Timer deadline not consumed by tick, dropping it.");
                break;
            }
        }
        Ok(())
    }

    fn read_line(&mut self) -> PlatformResult<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn prompt(&mut self, text: &str) -> PlatformResult<Option<String>> {
        write!(self.output, "{text}: ")?;
        self.output.flush()?;
        self.read_line()
    }

    fn interpret_line(&mut self, line: &str) -> PlatformResult<Option<AppEvent>> {
        let trimmed = line.trim();
        let (word, rest) = match trimmed.split_once(' ') {
            Some((word, rest)) => (word, rest.trim()),
            None => (trimmed, ""),
        };

        let command = word.to_ascii_lowercase();
        let event = match command.as_str() {
            "" => None,
            "help" | "?" => {
                writeln!(self.output, "{HELP_TEXT}")?;
                None
            }
            "quit" | "exit" => Some(AppEvent::CloseRequested),
            "ls" => {
                writeln!(self.output, "Folder: {}", self.folder_text)?;
                self.render_tree()?;
                None
            }
            "menu" => {
                self.render_menu()?;
                None
            }
            // Everything after the command word, spaces included.
            "filter" => Some(AppEvent::FilterTextChanged {
                text: trimmed.get(word.len()..).unwrap_or("").trim_start().to_string(),
            }),
            "select" | "open" => match rest.parse::<u64>() {
                Ok(n) if command == "select" => Some(AppEvent::TreeItemSelected {
                    item_id: TreeItemId(n),
                }),
                Ok(n) => Some(AppEvent::TreeItemDoubleClicked {
                    item_id: TreeItemId(n),
                }),
                Err(_) => {
                    writeln!(self.output, "Expected an item number, got '{rest}'")?;
                    None
                }
            },
            "tabs" | "tab" | "show" | "append" | "seltext" => {
                self.editor_command(&command, rest)?;
                None
            }
            _ => match self.menu_action_for(trimmed) {
                Some(action) => Some(AppEvent::MenuActionClicked { action }),
                None => {
                    writeln!(self.output, "Unknown command '{trimmed}'. Type 'help'.")?;
                    None
                }
            },
        };
        Ok(event)
    }

    // Matches a typed shortcut or menu text against the current menu.
    fn menu_action_for(&self, typed: &str) -> Option<MenuAction> {
        fn find(items: &[MenuItemConfig], typed: &str) -> Option<MenuAction> {
            items.iter().find_map(|item| {
                let hit = item
                    .shortcut
                    .is_some_and(|s| s.eq_ignore_ascii_case(typed))
                    || item.text.eq_ignore_ascii_case(typed);
                match item.action {
                    Some(action) if hit => Some(action),
                    _ => find(&item.children, typed),
                }
            })
        }
        find(&self.menu, typed)
    }

    fn editor_command(&mut self, word: &str, rest: &str) -> PlatformResult<()> {
        let Some(editor) = self.editor.clone() else {
            writeln!(self.output, "No editor tabs available in this session.")?;
            return Ok(());
        };
        let mut editor = editor.borrow_mut();
        match word {
            "tabs" => {
                if editor.tabs().is_empty() {
                    writeln!(self.output, "(no open tabs)")?;
                }
                let selected = editor.selected_index();
                for (index, tab) in editor.tabs().iter().enumerate() {
                    let marker = if selected == Some(index) { '*' } else { ' ' };
                    writeln!(self.output, "{marker} {index}: {}", tab.label())?;
                }
            }
            "tab" => match rest.parse::<usize>() {
                Ok(index) if editor.select_tab(index) => {}
                _ => writeln!(self.output, "No tab '{rest}'")?,
            },
            "show" => match editor.selected_index().and_then(|i| editor.tabs().get(i)) {
                Some(tab) => writeln!(self.output, "--- {} ---\n{}", tab.label(), tab.text)?,
                None => writeln!(self.output, "No tab selected")?,
            },
            "append" => {
                if let Err(e) = editor.append_line(rest) {
                    writeln!(self.output, "Cannot append: {e}")?;
                }
            }
            _ => {
                editor.set_selected_text(rest);
                log::trace!(
                    "ConsolePlatform: Selected text is now '{}'",
                    editor.selected_text()
                );
            }
        }
        Ok(())
    }

    fn execute_command(&mut self, command: PlatformCommand) -> PlatformResult<Option<AppEvent>> {
        log::trace!("ConsolePlatform: Executing {command:?}");
        let follow_up = match command {
            PlatformCommand::SetWindowTitle { title } => {
                writeln!(self.output, "== {title} ==")?;
                None
            }
            PlatformCommand::CreateMainMenu { menu_items } => {
                self.menu = menu_items;
                None
            }
            PlatformCommand::SetFolderText { text } => {
                writeln!(self.output, "Folder: {text}")?;
                self.folder_text = text;
                None
            }
            PlatformCommand::PopulateTreeView { items } => {
                self.tree = items;
                None
            }
            PlatformCommand::ExpandAllTreeItems => {
                self.expanded = true;
                self.render_tree()?;
                None
            }
            PlatformCommand::CollapseAllTreeItems => {
                self.expanded = false;
                self.render_tree()?;
                None
            }
            PlatformCommand::ShowOpenFileDialog {
                title,
                filter_spec,
                initial_dir,
            } => {
                let result = self.ask_path(&format!("{title} [{filter_spec}]"), initial_dir)?;
                Some(AppEvent::FileOpenDialogCompleted { result })
            }
            PlatformCommand::ShowSaveFileDialog {
                title,
                filter_spec,
                initial_dir,
            } => {
                let result = self.ask_path(&format!("{title} [{filter_spec}]"), initial_dir)?;
                Some(AppEvent::FileSaveDialogCompleted { result })
            }
            PlatformCommand::ShowFolderPickerDialog { title, initial_dir } => {
                let path = self.ask_path(&title, initial_dir)?;
                Some(AppEvent::FolderPickerDialogCompleted { path })
            }
            PlatformCommand::ShowConfirmationDialog { title, prompt } => {
                let answer = self.prompt(&format!("{title}\n{prompt} [y/N]"))?;
                let confirmed = answer.is_some_and(|a| {
                    matches!(a.trim().to_ascii_lowercase().as_str(), "y" | "yes")
                });
                Some(AppEvent::ConfirmationDialogCompleted { confirmed })
            }
            PlatformCommand::ShowInputDialog {
                title,
                prompt,
                default_text,
            } => {
                let default_text = default_text.unwrap_or_default();
                let text = self
                    .prompt(&format!("{title}\n{prompt} [{default_text}]"))?
                    .map(|answer| {
                        if answer.trim().is_empty() {
                            default_text
                        } else {
                            answer
                        }
                    });
                Some(AppEvent::InputDialogCompleted { text })
            }
            PlatformCommand::ShowMessage {
                title,
                text,
                severity,
            } => {
                let tag = match severity {
                    MessageSeverity::Information => "Info",
                    MessageSeverity::Warning => "Warning",
                    MessageSeverity::Error => "Error",
                };
                writeln!(self.output, "[{tag}] {title}: {text}")?;
                None
            }
            PlatformCommand::ShowSearchResults { title, text } => {
                writeln!(self.output, "--- {title} ---")?;
                if text.is_empty() {
                    writeln!(self.output, "(no matches)")?;
                } else {
                    writeln!(self.output, "{}", text.trim_end())?;
                }
                None
            }
            PlatformCommand::SetClipboardText { text } => {
                writeln!(self.output, "Copied: {text}")?;
                self.clipboard = Some(text);
                None
            }
            PlatformCommand::OpenInFileManager { path } => {
                if let Err(e) = open_path_in_file_manager(&path) {
                    log::warn!("ConsolePlatform: Could not open {path:?} in file manager: {e}");
                    writeln!(self.output, "Could not open {}: {e}", path.display())?;
                }
                None
            }
            PlatformCommand::QuitApplication => {
                self.quit_requested = true;
                None
            }
        };
        Ok(follow_up)
    }

    // Empty input cancels; relative answers are taken relative to `initial_dir`.
    fn ask_path(
        &mut self,
        title: &str,
        initial_dir: Option<PathBuf>,
    ) -> PlatformResult<Option<PathBuf>> {
        let hint = initial_dir
            .as_deref()
            .map(Path::display)
            .map(|d| format!(" (relative to {d})"))
            .unwrap_or_default();
        let Some(answer) = self.prompt(&format!("{title}{hint}, empty to cancel"))? else {
            return Ok(None);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        let path = PathBuf::from(answer);
        Ok(Some(match initial_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        }))
    }

    fn render_tree(&mut self) -> PlatformResult<()> {
        if self.tree.is_empty() {
            writeln!(self.output, "(no scripts)")?;
            return Ok(());
        }
        let mut lines = Vec::new();
        collect_tree_lines(&self.tree, 0, self.expanded, &mut lines);
        for line in lines {
            writeln!(self.output, "{line}")?;
        }
        Ok(())
    }

    fn render_menu(&mut self) -> PlatformResult<()> {
        let mut lines = Vec::new();
        collect_menu_lines(&self.menu, 0, &mut lines);
        for line in lines {
            writeln!(self.output, "{line}")?;
        }
        Ok(())
    }
}

fn collect_tree_lines(
    items: &[TreeItemDescriptor],
    depth: usize,
    expanded: bool,
    lines: &mut Vec<String>,
) {
    for item in items {
        let indent = "  ".repeat(depth);
        if item.is_folder {
            let marker = if expanded { '-' } else { '+' };
            lines.push(format!("{indent}{marker} [{}] {}/", item.id.0, item.text));
            if expanded {
                collect_tree_lines(&item.children, depth + 1, expanded, lines);
            }
        } else {
            lines.push(format!("{indent}  [{}] {}", item.id.0, item.text));
        }
    }
}

fn collect_menu_lines(items: &[MenuItemConfig], depth: usize, lines: &mut Vec<String>) {
    for item in items {
        let indent = "  ".repeat(depth);
        let check = match item.checked {
            Some(true) => "(*) ",
            Some(false) => "( ) ",
            None => "",
        };
        let shortcut = item.shortcut.map(|s| format!("  {s}")).unwrap_or_default();
        lines.push(format!("{indent}{check}{}{shortcut}", item.text));
        collect_menu_lines(&item.children, depth + 1, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DoubleClickAction, HostKind};
    use std::io::Cursor;

    /*
     * Records every event and answers them from a script of commands keyed
     * by the event's position.
     */
    #[derive(Default)]
    struct RecordingHandler {
        events: Vec<AppEvent>,
        scripted: Vec<(usize, Vec<PlatformCommand>)>,
        queue: VecDeque<PlatformCommand>,
        deadline: Option<Instant>,
        quit_called: bool,
    }

    impl PlatformEventHandler for RecordingHandler {
        fn handle_event(&mut self, event: AppEvent) {
            if matches!(event, AppEvent::TimerTick { .. }) {
                self.deadline = None;
            }
            if matches!(event, AppEvent::CloseRequested) {
                self.queue.push_back(PlatformCommand::QuitApplication);
            }
            let index = self.events.len();
            self.events.push(event);
            for (at, commands) in &self.scripted {
                if *at == index {
                    self.queue.extend(commands.iter().cloned());
                }
            }
        }
        fn on_quit(&mut self) {
            self.quit_called = true;
        }
        fn try_dequeue_command(&mut self) -> Option<PlatformCommand> {
            self.queue.pop_front()
        }
        fn next_timer_deadline(&self) -> Option<Instant> {
            self.deadline
        }
    }

    fn console(input: &str) -> ConsolePlatform<Cursor<Vec<u8>>, Vec<u8>> {
        ConsolePlatform::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output_of(platform: ConsolePlatform<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(platform.into_output()).unwrap()
    }

    fn save_menu() -> Vec<MenuItemConfig> {
        vec![MenuItemConfig {
            action: None,
            text: "File".to_string(),
            shortcut: None,
            checked: None,
            children: vec![
                MenuItemConfig {
                    action: Some(MenuAction::SaveScript),
                    text: "Save Script".to_string(),
                    shortcut: Some("Ctrl+S"),
                    checked: None,
                    children: Vec::new(),
                },
                MenuItemConfig {
                    action: Some(MenuAction::SetDoubleClickAction(
                        DoubleClickAction::RunOnDoubleClick,
                    )),
                    text: "Run Script on Double-Click".to_string(),
                    shortcut: None,
                    checked: Some(false),
                    children: Vec::new(),
                },
            ],
        }]
    }

    fn sample_tree() -> Vec<TreeItemDescriptor> {
        vec![TreeItemDescriptor {
            id: TreeItemId(1),
            text: "rig".to_string(),
            is_folder: true,
            children: vec![TreeItemDescriptor {
                id: TreeItemId(2),
                text: "arm.py".to_string(),
                is_folder: false,
                children: Vec::new(),
            }],
        }]
    }

    #[test]
    fn test_lines_become_events() {
        let mut handler = RecordingHandler {
            scripted: vec![(0, vec![PlatformCommand::CreateMainMenu {
                menu_items: save_menu(),
            }])],
            ..Default::default()
        };
        let mut platform = console(
            "filter rig, arm\nselect 2\nopen 2\nctrl+s\nrun script on double-click\nquit\n",
        );

        platform.run(&mut handler).unwrap();

        assert!(matches!(handler.events[0], AppEvent::PanelCreated));
        assert!(matches!(handler.events[1], AppEvent::HostReady));
        assert!(matches!(
            &handler.events[2],
            AppEvent::FilterTextChanged { text } if text == "rig, arm"
        ));
        assert!(matches!(
            handler.events[3],
            AppEvent::TreeItemSelected { item_id: TreeItemId(2) }
        ));
        assert!(matches!(
            handler.events[4],
            AppEvent::TreeItemDoubleClicked { item_id: TreeItemId(2) }
        ));
        assert!(matches!(
            handler.events[5],
            AppEvent::MenuActionClicked { action: MenuAction::SaveScript }
        ));
        assert!(matches!(
            handler.events[6],
            AppEvent::MenuActionClicked {
                action: MenuAction::SetDoubleClickAction(DoubleClickAction::RunOnDoubleClick)
            }
        ));
        assert!(matches!(handler.events[7], AppEvent::CloseRequested));
        assert_eq!(handler.events.len(), 8);
        assert!(handler.quit_called);
    }

    #[test]
    fn test_end_of_input_requests_close() {
        let mut handler = RecordingHandler::default();
        let mut platform = console("");

        platform.run(&mut handler).unwrap();

        assert!(matches!(handler.events.last(), Some(AppEvent::CloseRequested)));
    }

    #[test]
    fn test_dialog_answers_are_read_inline() {
        let mut handler = RecordingHandler {
            scripted: vec![(0, vec![
                PlatformCommand::ShowConfirmationDialog {
                    title: "Backup?".to_string(),
                    prompt: "Copy everything".to_string(),
                },
                PlatformCommand::ShowInputDialog {
                    title: "Search".to_string(),
                    prompt: "Text".to_string(),
                    default_text: Some("SEARCH STRING".to_string()),
                },
                PlatformCommand::ShowSaveFileDialog {
                    title: "Save".to_string(),
                    filter_spec: "*.py".to_string(),
                    initial_dir: Some(PathBuf::from("/scripts")),
                },
            ])],
            ..Default::default()
        };
        let mut platform = console("yes\n\nnew_tool.py\n");

        platform.run(&mut handler).unwrap();

        assert!(matches!(
            handler.events[1],
            AppEvent::ConfirmationDialogCompleted { confirmed: true }
        ));
        assert!(matches!(
            &handler.events[2],
            AppEvent::InputDialogCompleted { text: Some(t) } if t == "SEARCH STRING"
        ));
        assert!(matches!(
            &handler.events[3],
            AppEvent::FileSaveDialogCompleted { result: Some(p) }
                if p == &PathBuf::from("/scripts/new_tool.py")
        ));
    }

    #[test]
    fn test_tree_rendering_follows_expand_state() {
        let mut platform = console("");
        platform
            .execute_command(PlatformCommand::PopulateTreeView {
                items: sample_tree(),
            })
            .unwrap();
        platform
            .execute_command(PlatformCommand::CollapseAllTreeItems)
            .unwrap();
        platform
            .execute_command(PlatformCommand::ExpandAllTreeItems)
            .unwrap();

        let output = output_of(platform);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, vec!["+ [1] rig/", "- [1] rig/", "    [2] arm.py"]);
    }

    #[test]
    fn test_due_timer_is_ticked_before_reading() {
        let mut handler = RecordingHandler {
            deadline: Some(Instant::now()),
            ..Default::default()
        };
        let mut platform = console("quit\n");

        platform.run(&mut handler).unwrap();

        assert!(matches!(handler.events[2], AppEvent::TimerTick { .. }));
        assert_eq!(handler.deadline, None);
    }

    #[test]
    fn test_clipboard_and_editor_commands() {
        let editor = Rc::new(RefCell::new(LocalEditorHost::new(
            HostKind::Maya,
            "python3".to_string(),
        )));
        editor.borrow_mut().new_tab("import pymel.core as pm").unwrap();
        let mut handler = RecordingHandler {
            scripted: vec![(0, vec![PlatformCommand::SetClipboardText {
                text: "/scripts/a.py".to_string(),
            }])],
            ..Default::default()
        };
        let mut platform =
            console("append pm.ls()\nseltext pm.ls\ntabs\nquit\n").with_editor(Rc::clone(&editor));

        platform.run(&mut handler).unwrap();

        assert_eq!(platform.clipboard(), Some("/scripts/a.py"));
        assert_eq!(editor.borrow().tabs()[0].text, "import pymel.core as pm\npm.ls()\n");
        assert_eq!(editor.borrow().selected_text(), "pm.ls");
        assert!(output_of(platform).contains("* 0: Python"));
    }
}
