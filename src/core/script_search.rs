/*
 * "Find in ScriptTree": a recursive text search over the script folder,
 * delegated to the platform's command-line search tool (`findstr` on
 * Windows, `grep` elsewhere). Only the combined stdout/stderr text is kept;
 * it is shown to the user as-is.
 */
use std::io;
use std::path::Path;
use std::process::{Command, Output};

pub const SEARCH_PLACEHOLDER: &str = "SEARCH STRING";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutput {
    pub text: String,
    pub success: bool,
}

/// Builds the search command for `needle`, run from inside `root_folder`.
pub fn build_search_command(root_folder: &Path, needle: &str) -> Command {
    let mut command = if cfg!(target_os = "windows") {
        let mut command = Command::new("findstr");
        command.args(["/s", "/n", needle, "*.py", "*.mel"]);
        command
    } else {
        let mut command = Command::new("grep");
        command.args([
            "-r",
            "-n",
            "--include=*.py",
            "--include=*.mel",
            "--",
            needle,
            ".",
        ]);
        command
    };
    command.current_dir(root_folder);
    command
}

/*
 * Runs the search and returns stdout followed by stderr. A non-zero exit is
 * not an error here: both tools exit with 1 when nothing matched.
 */
pub fn search_scripts(root_folder: &Path, needle: &str) -> io::Result<SearchOutput> {
    log::info!("ScriptSearch: Searching {root_folder:?} for '{needle}'");
    let output = build_search_command(root_folder, needle).output()?;
    Ok(combine_output(&output))
}

fn combine_output(output: &Output) -> SearchOutput {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    SearchOutput {
        text,
        success: output.status.success(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_search_finds_text_in_scripts_only() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("rig")).unwrap();
        fs::write(dir.path().join("rig").join("arm.py"), "import os\nbuild_arm()\n").unwrap();
        fs::write(dir.path().join("leg.mel"), "build_leg;\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "build_arm in notes\n").unwrap();

        let result = search_scripts(dir.path(), "build_arm").unwrap();

        assert!(result.success);
        assert!(result.text.contains("arm.py:2:build_arm()"), "{}", result.text);
        assert!(!result.text.contains("notes.txt"));
    }

    #[test]
    fn test_search_without_match_is_not_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "pass\n").unwrap();

        let result = search_scripts(dir.path(), "does_not_exist").unwrap();

        assert!(!result.success);
        assert!(result.text.is_empty());
    }
}
