use crate::util::expand_tilde;
use std::path::PathBuf;

pub const ENV_CSCOPE_DIR: &str = "CSCOPE_DIR";
pub const ENV_CONFIG_NAME: &str = "CSCOPE_CONFIG";
pub const ENV_UPDATE_ON_START: &str = "CSCOPE_UPDATE_ON_START";
pub const ENV_MAP_KEYS: &str = "CSCOPE_MAP_KEYS";
pub const ENV_CSCOPE_PROGRAM: &str = "CSCOPE_PROGRAM";
pub const ENV_FIND_PROGRAM: &str = "CSCOPE_FIND_PROGRAM";
pub const ENV_CHECK_EXIT: &str = "CSCOPE_CHECK_EXIT";

pub const DEFAULT_CSCOPE_DIR: &str = "~/.cscope";
pub const DEFAULT_CONFIG_NAME: &str = "cscope.cfg";

/// Tool-wide knobs. Read from the environment; the CLI overrides individual
/// fields from its flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base directory holding one workspace per project.
    pub cscope_dir: PathBuf,
    /// Descriptor file name looked up in the working directory.
    pub config_name: String,
    pub update_on_start: bool,
    pub map_keys: bool,
    pub cscope_program: String,
    pub find_program: String,
    /// Treat a non-zero exit of `find`/`cscope` as a failed step.
    pub check_exit_status: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cscope_dir: expand_tilde(DEFAULT_CSCOPE_DIR),
            config_name: DEFAULT_CONFIG_NAME.to_string(),
            update_on_start: false,
            map_keys: false,
            cscope_program: "cscope".to_string(),
            find_program: "find".to_string(),
            check_exit_status: true,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            cscope_dir: text(ENV_CSCOPE_DIR)
                .map(|dir| expand_tilde(&dir))
                .unwrap_or(defaults.cscope_dir),
            config_name: text(ENV_CONFIG_NAME).unwrap_or(defaults.config_name),
            update_on_start: lookup(ENV_UPDATE_ON_START)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.update_on_start),
            map_keys: lookup(ENV_MAP_KEYS)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.map_keys),
            cscope_program: text(ENV_CSCOPE_PROGRAM).unwrap_or(defaults.cscope_program),
            find_program: text(ENV_FIND_PROGRAM).unwrap_or(defaults.find_program),
            check_exit_status: lookup(ENV_CHECK_EXIT)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.check_exit_status),
        }
    }
}

/// A set variable counts as enabled unless it spells out a false value.
fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
