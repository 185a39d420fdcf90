/*
 * This module provides utility functions for path manipulation, focusing on
 * the per-host folder layout of Script Tree (script folder, backup folders)
 * and the application's configuration directory. It also knows how to hand a
 * path to the operating system's file manager.
 */
use super::host::HostKind;
use directories::{BaseDirs, ProjectDirs, UserDirs};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const SCRIPT_TREE_FOLDER_NAME: &str = "ScriptTree";
pub const DEFAULT_SCRIPT_FOLDER_NAME: &str = "Scripts";
pub const SCRIPT_BACKUP_FOLDER_NAME: &str = "ScriptTree_ScriptBackup";
pub const TREE_BACKUP_FOLDER_NAME: &str = "ScriptTree_TreeBackup";

/*
 * The folder layout used for one host application:
 *
 *   <documents>/ScriptTree/<Host>/Scripts                  default script folder
 *   <documents>/ScriptTree/<Host>/ScriptTree_ScriptBackup  per-file backups
 *   <documents>/ScriptTree/<Host>/ScriptTree_TreeBackup    whole-tree snapshots
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTreeLayout {
    pub host_folder: PathBuf,
    pub default_script_folder: PathBuf,
    pub script_backup_folder: PathBuf,
    pub tree_backup_folder: PathBuf,
}

impl ScriptTreeLayout {
    pub fn under(documents_dir: &Path, host: HostKind) -> Self {
        let host_folder = documents_dir
            .join(SCRIPT_TREE_FOLDER_NAME)
            .join(host.display_name());
        ScriptTreeLayout {
            default_script_folder: host_folder.join(DEFAULT_SCRIPT_FOLDER_NAME),
            script_backup_folder: host_folder.join(SCRIPT_BACKUP_FOLDER_NAME),
            tree_backup_folder: host_folder.join(TREE_BACKUP_FOLDER_NAME),
            host_folder,
        }
    }

    pub fn for_host(host: HostKind) -> Self {
        Self::under(&user_documents_dir(), host)
    }
}

/*
 * Resolves the user's documents folder. Falls back to `<home>/Documents`
 * when the platform has no notion of one (common on headless Linux), and to
 * the current directory when not even a home directory is known.
 */
pub fn user_documents_dir() -> PathBuf {
    if let Some(documents) =
        UserDirs::new().and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
    {
        return documents;
    }
    match BaseDirs::new() {
        Some(base) => base.home_dir().join("Documents"),
        None => {
            log::warn!("PathUtils: No home directory found, using current directory.");
            PathBuf::from(".")
        }
    }
}

/*
 * Retrieves the application's primary local configuration directory,
 * creating it if necessary. Returns `None` when no suitable location can be
 * determined or created.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Attempting to get base app config local dir for '{app_name}'");
    ProjectDirs::from("", "", app_name).and_then(|proj_dirs| {
        let config_path = proj_dirs.config_local_dir();
        if !config_path.exists() {
            if let Err(e) = fs::create_dir_all(config_path) {
                log::error!(
                    "PathUtils: Failed to create base app config directory {config_path:?}: {e}"
                );
                return None;
            }
            log::debug!("PathUtils: Created base app config directory: {config_path:?}");
        }
        Some(config_path.to_path_buf())
    })
}

/// Returns the file stem as text, or an empty string for paths without one.
pub fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns the extension including its leading dot, or an empty string.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/*
 * Opens `path` in the platform's file manager. On Windows the item is
 * selected inside its parent folder; elsewhere the path itself is opened.
 */
pub fn open_path_in_file_manager(path: &Path) -> io::Result<()> {
    log::debug!("PathUtils: Opening {path:?} in file manager");
    let mut command = file_manager_command(path);
    command.spawn().map(|_| ())
}

fn file_manager_command(path: &Path) -> Command {
    if cfg!(target_os = "windows") {
        let mut command = Command::new("explorer");
        if path.is_dir() {
            command.arg(path);
        } else {
            command.arg(format!("/select,{}", path.display()));
        }
        command
    } else if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(path);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    }
}
