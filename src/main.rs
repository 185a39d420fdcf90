mod app_logic;
mod core;
mod platform_layer;

use crate::app_logic::ScriptTreeLogic;
use crate::core::path_utils::get_base_app_config_local_dir;
use crate::core::settings::SETTINGS_APP_NAME;
use crate::core::{
    CoreBackupManager, IniSettingsStore, ScriptTreeLayout, create_editor_host, detect_host,
};
use crate::platform_layer::{ConsolePlatform, PlatformError, PlatformResult};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::rc::Rc;
use std::sync::Once;

const LOG_LEVEL_ENV_VAR: &str = "SCRIPT_TREE_LOG";
const LOG_FILE_NAME: &str = "script_tree.log";
const BATCH_FLAG: &str = "--batch";

static LOGGING_INIT: Once = Once::new();

/*
 * Installs the process logger: terminal output on stderr at the level named
 * by `SCRIPT_TREE_LOG` (default `info`), plus a debug-level log file in the
 * application's config directory when one is available. Safe to call more
 * than once; only the first call has an effect.
 */
pub fn initialize_logging() {
    LOGGING_INIT.call_once(|| {
        let term_level = std::env::var(LOG_LEVEL_ENV_VAR)
            .ok()
            .and_then(|value| value.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);
        let config = ConfigBuilder::new()
            .set_thread_level(LevelFilter::Off)
            .set_target_level(LevelFilter::Off)
            .build();

        let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
            term_level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )];
        if !cfg!(test) {
            if let Some(log_file) = get_base_app_config_local_dir(SETTINGS_APP_NAME)
                .map(|dir| dir.join(LOG_FILE_NAME))
                .and_then(|path| {
                    OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path)
                        .ok()
                })
            {
                loggers.push(WriteLogger::new(LevelFilter::Debug, config, log_file));
            }
        }

        if let Err(e) = CombinedLogger::init(loggers) {
            eprintln!("Failed to initialize logger: {e}");
        }
    });
}

/*
 * The panel needs an interactive terminal to stand in for the host's UI.
 * Without one (and without `--batch` for scripted input) it refuses to start.
 */
fn ensure_ui_environment(batch: bool) -> PlatformResult<()> {
    if batch || io::stdin().is_terminal() {
        return Ok(());
    }
    Err(PlatformError::InitializationFailed(format!(
        "Script Tree needs an interactive terminal. Pass {BATCH_FLAG} to read commands from a pipe."
    )))
}

fn run() -> PlatformResult<()> {
    let host_kind = detect_host();
    let layout = ScriptTreeLayout::for_host(host_kind);
    log::info!(
        "Script Tree starting for {host_kind}, scripts under {:?}",
        layout.host_folder
    );

    let settings_name = host_kind.settings_name();
    let settings = IniSettingsStore::for_identity(&settings_name).unwrap_or_else(|e| {
        let fallback = layout.host_folder.join(format!("{settings_name}.ini"));
        log::warn!("Main: No config directory ({e}), keeping settings in {fallback:?}");
        IniSettingsStore::new(fallback)
    });
    log::debug!("Main: Settings file is {:?}", settings.file_path());

    let backup = CoreBackupManager::new(
        layout.script_backup_folder.clone(),
        layout.tree_backup_folder.clone(),
    );
    let editor = create_editor_host(host_kind);

    let mut logic = ScriptTreeLogic::new(
        host_kind,
        layout,
        Box::new(settings),
        Box::new(backup),
        Box::new(Rc::clone(&editor)),
    );

    let stdin = io::stdin();
    let mut platform = ConsolePlatform::new(stdin.lock(), io::stdout()).with_editor(editor);
    platform.run(&mut logic)
}

fn main() {
    initialize_logging();

    let batch = std::env::args().skip(1).any(|arg| arg == BATCH_FLAG);
    if let Err(e) = ensure_ui_environment(batch) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = run() {
        log::error!("Main: Script Tree stopped: {e}");
        std::process::exit(1);
    }
}
