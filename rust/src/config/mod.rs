pub mod descriptor;
pub mod settings;

pub use descriptor::ProjectConfig;
pub use settings::Settings;

use crate::error::{CscopeError, Result};
use crate::util::{absolutize, expand_tilde};
use std::path::{Path, PathBuf};

/// Picks the descriptor to load: the explicit argument when given, otherwise
/// `<cwd>/<config_name>`. Either way it must be an existing file.
pub fn resolve_config_path(arg: Option<&str>, cwd: &Path, settings: &Settings) -> Result<PathBuf> {
    let candidate = match arg {
        Some(raw) => absolutize(expand_tilde(raw), cwd),
        None => cwd.join(&settings.config_name),
    };
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(CscopeError::ConfigNotFound(candidate))
    }
}
