/*
 * Backup policy for the script tree. Two independent operations live here:
 *
 * - Copy-on-save: before a script is overwritten, the current file is copied
 *   to `<script_backup_root>/<stem>/<stem>_BACKUP_<unix_secs><ext>`. This
 *   must never get in the way of the save, so every failure is logged and
 *   swallowed.
 * - Tree snapshot: on explicit request the whole script folder is copied to
 *   `<tree_backup_root>/ScriptTree_BACKUP_<unix_secs>/`. The user is waiting
 *   on this one, so failures are returned to the caller.
 *
 * Timestamps have one-second granularity. Two snapshots in the same second
 * land in the same directory; this is accepted.
 */
use super::path_utils::{dotted_extension, file_stem_string};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use walkdir::WalkDir;

pub const BACKUP_NAME_MARKER: &str = "_BACKUP_";
pub const TREE_SNAPSHOT_PREFIX: &str = "ScriptTree_BACKUP_";

#[derive(Debug)]
pub enum BackupError {
    Io(io::Error),
    Walk(walkdir::Error),
    InvalidSource(PathBuf),
}

impl From<io::Error> for BackupError {
    fn from(err: io::Error) -> Self {
        BackupError::Io(err)
    }
}

impl From<walkdir::Error> for BackupError {
    fn from(err: walkdir::Error) -> Self {
        BackupError::Walk(err)
    }
}

impl std::fmt::Display for BackupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupError::Io(e) => write!(f, "Backup I/O error: {e}"),
            BackupError::Walk(e) => write!(f, "Error while walking script tree: {e}"),
            BackupError::InvalidSource(p) => write!(f, "Not a folder, cannot back up: {p:?}"),
        }
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackupError::Io(e) => Some(e),
            BackupError::Walk(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshotRecord {
    pub source_folder: PathBuf,
    pub destination_folder: PathBuf,
    pub timestamp: i64,
}

pub trait BackupOperations {
    /*
     * Copies `script_path` into its backup folder. Returns `None` when there
     * was nothing to back up or the copy failed (the failure is logged).
     */
    fn backup_file(&self, script_path: &Path) -> Option<BackupRecord>;

    /*
     * Snapshots the whole `source_folder` into a fresh timestamped directory.
     * Errors propagate; a failed snapshot may leave a partial copy behind.
     */
    fn backup_tree(&self, source_folder: &Path) -> Result<TreeSnapshotRecord>;

    /// The folder holding the backups of `script_path`. Does not touch the disk.
    fn backup_folder_for_script(&self, script_path: &Path) -> PathBuf;

    fn script_backup_root(&self) -> &Path;
}

pub struct CoreBackupManager {
    script_backup_root: PathBuf,
    tree_backup_root: PathBuf,
}

impl CoreBackupManager {
    pub fn new(script_backup_root: PathBuf, tree_backup_root: PathBuf) -> Self {
        CoreBackupManager {
            script_backup_root,
            tree_backup_root,
        }
    }

    pub(crate) fn backup_file_at(
        &self,
        script_path: &Path,
        timestamp: i64,
    ) -> Option<BackupRecord> {
        if !script_path.exists() {
            log::trace!("BackupManager: {script_path:?} does not exist yet, nothing to back up.");
            return None;
        }

        match self.copy_to_backup(script_path, timestamp) {
            Ok(record) => {
                log::debug!(
                    "BackupManager: Backed up {:?} to {:?}",
                    record.original_path,
                    record.backup_path
                );
                Some(record)
            }
            Err(e) => {
                log::error!("BackupManager: Failed to back up {script_path:?}: {e}");
                None
            }
        }
    }

    fn copy_to_backup(&self, script_path: &Path, timestamp: i64) -> Result<BackupRecord> {
        let stem = file_stem_string(script_path);
        let backup_file_name = format!(
            "{stem}{BACKUP_NAME_MARKER}{timestamp}{}",
            dotted_extension(script_path)
        );
        let backup_dir = self.backup_folder_for_script(script_path);
        fs::create_dir_all(&backup_dir)?;

        let backup_path = backup_dir.join(backup_file_name);
        copy_file_preserving_mtime(script_path, &backup_path)?;

        Ok(BackupRecord {
            original_path: script_path.to_path_buf(),
            backup_path,
            timestamp,
        })
    }

    pub(crate) fn backup_tree_at(
        &self,
        source_folder: &Path,
        timestamp: i64,
    ) -> Result<TreeSnapshotRecord> {
        if !source_folder.is_dir() {
            return Err(BackupError::InvalidSource(source_folder.to_path_buf()));
        }
        let destination_folder = self
            .tree_backup_root
            .join(format!("{TREE_SNAPSHOT_PREFIX}{timestamp}"));

        copy_directory(source_folder, &destination_folder)?;

        log::info!("BackupManager: ScriptTree folder saved: {destination_folder:?}");
        Ok(TreeSnapshotRecord {
            source_folder: source_folder.to_path_buf(),
            destination_folder,
            timestamp,
        })
    }
}

impl BackupOperations for CoreBackupManager {
    fn backup_file(&self, script_path: &Path) -> Option<BackupRecord> {
        self.backup_file_at(script_path, unix_timestamp_now())
    }

    fn backup_tree(&self, source_folder: &Path) -> Result<TreeSnapshotRecord> {
        self.backup_tree_at(source_folder, unix_timestamp_now())
    }

    fn backup_folder_for_script(&self, script_path: &Path) -> PathBuf {
        self.script_backup_root.join(file_stem_string(script_path))
    }

    fn script_backup_root(&self) -> &Path {
        &self.script_backup_root
    }
}

pub fn unix_timestamp_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/*
 * Copies the file bytes and carries the source's modification time over to
 * the copy. `fs::copy` alone keeps permissions but not timestamps.
 */
fn copy_file_preserving_mtime(source: &Path, destination: &Path) -> io::Result<()> {
    let modified = fs::metadata(source)?.modified()?;
    fs::copy(source, destination)?;
    File::options()
        .write(true)
        .open(destination)?
        .set_modified(modified)
}

/*
 * Recursively copies every file and directory below `source` into
 * `destination`, creating directories as needed. Stops at the first error.
 * The destination may lie inside `source`; its subtree is never walked.
 */
fn copy_directory(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)?;

    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !entry.path().starts_with(destination));
    for entry_result in walker {
        let entry = entry_result?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| BackupError::InvalidSource(entry.path().to_path_buf()))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            copy_file_preserving_mtime(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io::Write;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn manager_in(root: &Path) -> CoreBackupManager {
        CoreBackupManager::new(root.join("script_backup"), root.join("tree_backup"))
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn relative_files(root: &Path) -> BTreeSet<PathBuf> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
            .collect()
    }

    #[test]
    fn test_backup_file_missing_source_is_noop() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());

        let result = manager.backup_file(&dir.path().join("never_saved.py"));

        assert!(result.is_none());
        assert!(!dir.path().join("script_backup").exists());
    }

    #[test]
    fn test_backup_file_creates_one_timestamped_copy() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());
        let script = dir.path().join("scripts").join("build_arm.py");
        write_file(&script, "print('arm')\n");

        let record = manager
            .backup_file_at(&script, 1_700_000_000)
            .expect("backup should be created");

        let expected_dir = dir.path().join("script_backup").join("build_arm");
        assert_eq!(
            record.backup_path,
            expected_dir.join("build_arm_BACKUP_1700000000.py")
        );
        assert_eq!(fs::read_dir(&expected_dir).unwrap().count(), 1);
        assert_eq!(fs::read_to_string(&record.backup_path).unwrap(), "print('arm')\n");
        assert_eq!(fs::read_to_string(&script).unwrap(), "print('arm')\n");
    }

    #[test]
    fn test_backup_file_preserves_modification_time() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());
        let script = dir.path().join("old.mel");
        write_file(&script, "polySphere;");
        let old_time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        File::options()
            .write(true)
            .open(&script)
            .unwrap()
            .set_modified(old_time)
            .unwrap();

        let record = manager.backup_file_at(&script, 42).unwrap();

        let copied_time = fs::metadata(&record.backup_path).unwrap().modified().unwrap();
        assert_eq!(copied_time, old_time);
    }

    #[test]
    fn test_backup_file_failure_is_swallowed() {
        let dir = tempdir().unwrap();
        // A file where the backup root directory should be makes create_dir_all fail.
        let blocker = dir.path().join("script_backup");
        write_file(&blocker, "not a directory");
        let manager = manager_in(dir.path());
        let script = dir.path().join("tool.py");
        write_file(&script, "pass");

        assert!(manager.backup_file(&script).is_none());
        assert_eq!(fs::read_to_string(&script).unwrap(), "pass");
    }

    #[test]
    fn test_backup_folder_for_script_uses_stem() {
        let manager = CoreBackupManager::new(PathBuf::from("/b/scripts"), PathBuf::from("/b/tree"));
        assert_eq!(
            manager.backup_folder_for_script(Path::new("/s/sub/skin_tools.py")),
            PathBuf::from("/b/scripts/skin_tools")
        );
    }

    #[test]
    fn test_backup_tree_mirrors_source() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());
        let source = dir.path().join("Scripts");
        write_file(&source.join("a.py"), "a");
        write_file(&source.join("rig").join("b.mel"), "b");
        write_file(&source.join("rig").join("deep").join("c.txt"), "c");
        fs::create_dir_all(source.join("empty")).unwrap();
        let before = relative_files(&source);

        let record = manager.backup_tree_at(&source, 1_700_000_000).unwrap();

        assert_eq!(
            record.destination_folder,
            dir.path()
                .join("tree_backup")
                .join("ScriptTree_BACKUP_1700000000")
        );
        assert_eq!(relative_files(&record.destination_folder), before);
        assert!(record.destination_folder.join("empty").is_dir());
        assert_eq!(relative_files(&source), before);
        assert_eq!(
            fs::read_to_string(record.destination_folder.join("rig").join("b.mel")).unwrap(),
            "b"
        );
    }

    #[test]
    fn test_backup_tree_distinct_timestamps_do_not_overlap() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());
        let source = dir.path().join("Scripts");
        write_file(&source.join("a.py"), "a");

        let first = manager.backup_tree_at(&source, 100).unwrap();
        let second = manager.backup_tree_at(&source, 102).unwrap();

        assert_ne!(first.destination_folder, second.destination_folder);
        assert!(!first.destination_folder.starts_with(&second.destination_folder));
        assert!(!second.destination_folder.starts_with(&first.destination_folder));
        assert_eq!(relative_files(&first.destination_folder).len(), 1);
        assert_eq!(relative_files(&second.destination_folder).len(), 1);
    }

    #[test]
    fn test_backup_tree_root_inside_source_is_not_copied() {
        let dir = tempdir().unwrap();
        let host_folder = dir.path().join("Maya");
        let manager = CoreBackupManager::new(
            host_folder.join("ScriptTree_ScriptBackup"),
            host_folder.join("ScriptTree_TreeBackup"),
        );
        write_file(&host_folder.join("Scripts").join("a.py"), "a");
        write_file(&host_folder.join("notes.txt"), "n");
        let before = relative_files(&host_folder);

        let record = manager.backup_tree_at(&host_folder, 7).unwrap();

        assert_eq!(relative_files(&record.destination_folder), before);
        assert!(
            !record
                .destination_folder
                .join("ScriptTree_TreeBackup")
                .join("ScriptTree_BACKUP_7")
                .exists()
        );
    }

    #[test]
    fn test_backup_tree_missing_source_is_error() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());

        let result = manager.backup_tree(&dir.path().join("nope"));

        assert!(matches!(result, Err(BackupError::InvalidSource(_))));
    }
}
