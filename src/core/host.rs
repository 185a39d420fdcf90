/*
 * Identifies which host application the panel is running inside. The host
 * identity decides the on-disk layout (`<Documents>/ScriptTree/<HostName>`),
 * the settings file name, and which script-editor adapter is created. It is
 * detected once at startup; nothing downstream branches on environment
 * variables again.
 */
use std::fmt;

pub const HOST_OVERRIDE_ENV_VAR: &str = "SCRIPT_TREE_HOST";
pub const MAYA_LOCATION_ENV_VAR: &str = "MAYA_LOCATION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    Maya,
    MotionBuilder,
}

impl HostKind {
    /// Display name, also used as a folder name below the documents directory.
    pub fn display_name(self) -> &'static str {
        match self {
            HostKind::Maya => "Maya",
            HostKind::MotionBuilder => "Motionbuilder",
        }
    }

    /// Identity used to scope the persisted settings (`script_tree_maya`).
    pub fn settings_name(self) -> String {
        format!("script_tree_{}", self.display_name().to_lowercase())
    }

    /// Content placed in a freshly created tab.
    pub fn default_script_content(self) -> &'static str {
        match self {
            HostKind::Maya => "import pymel.core as pm",
            HostKind::MotionBuilder => "",
        }
    }

    // Only Maya has a MEL executer tab type.
    pub fn supports_mel_tabs(self) -> bool {
        matches!(self, HostKind::Maya)
    }

    pub fn parse(text: &str) -> Option<HostKind> {
        match text.trim().to_ascii_lowercase().as_str() {
            "maya" => Some(HostKind::Maya),
            "motionbuilder" | "mobu" => Some(HostKind::MotionBuilder),
            _ => None,
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/*
 * Determines the active host from the process environment. An explicit
 * `SCRIPT_TREE_HOST` wins; otherwise the presence of `MAYA_LOCATION` means
 * Maya, and anything else is treated as MotionBuilder.
 */
pub fn detect_host() -> HostKind {
    let override_value = std::env::var(HOST_OVERRIDE_ENV_VAR).ok();
    let maya_location = std::env::var_os(MAYA_LOCATION_ENV_VAR);
    let kind = detect_host_from(override_value.as_deref(), maya_location.is_some());
    log::debug!("HostDetection: Active host is {kind}");
    kind
}

fn detect_host_from(override_value: Option<&str>, maya_location_present: bool) -> HostKind {
    if let Some(value) = override_value {
        match HostKind::parse(value) {
            Some(kind) => return kind,
            None => log::warn!(
                "HostDetection: Ignoring unknown {HOST_OVERRIDE_ENV_VAR} value '{value}'"
            ),
        }
    }
    if maya_location_present {
        HostKind::Maya
    } else {
        HostKind::MotionBuilder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_takes_precedence() {
        assert_eq!(
            detect_host_from(Some("MotionBuilder"), true),
            HostKind::MotionBuilder
        );
        assert_eq!(detect_host_from(Some(" maya "), false), HostKind::Maya);
    }

    #[test]
    fn test_unknown_override_falls_back_to_environment() {
        assert_eq!(detect_host_from(Some("houdini"), true), HostKind::Maya);
        assert_eq!(
            detect_host_from(Some("houdini"), false),
            HostKind::MotionBuilder
        );
    }

    #[test]
    fn test_settings_name_is_scoped_per_host() {
        assert_eq!(HostKind::Maya.settings_name(), "script_tree_maya");
        assert_eq!(
            HostKind::MotionBuilder.settings_name(),
            "script_tree_motionbuilder"
        );
    }
}
