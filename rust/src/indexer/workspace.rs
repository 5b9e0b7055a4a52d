use crate::error::{CscopeError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const FILE_LIST_NAME: &str = "cscope.files";
pub const INDEX_NAME: &str = "cscope.out";
pub const LOCK_NAME: &str = "update.lock";

/// Per-project directory `<base_dir>/<project_name>/` holding the generated
/// artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexWorkspace {
    base_dir: PathBuf,
    project_name: String,
}

impl IndexWorkspace {
    pub fn new(base_dir: impl Into<PathBuf>, project_name: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            project_name: project_name.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn dir(&self) -> PathBuf {
        self.base_dir.join(&self.project_name)
    }

    pub fn file_list_path(&self) -> PathBuf {
        self.dir().join(FILE_LIST_NAME)
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir().join(INDEX_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir().join(LOCK_NAME)
    }

    pub fn exists(&self) -> bool {
        self.dir().is_dir()
    }

    /// Creates the base and project directories. Existing directories are
    /// left alone.
    pub fn create(&self) -> Result<()> {
        for dir in [self.base_dir.clone(), self.dir()] {
            if dir.is_dir() {
                continue;
            }
            create_dir(&dir).map_err(|source| CscopeError::WorkspaceCreateError {
                path: dir.clone(),
                source,
            })?;
            log::debug!("Created {}", dir.display());
        }
        Ok(())
    }

    /// Deletes the project directory and everything in it. A missing
    /// directory is not an error.
    pub fn remove(&self) -> Result<()> {
        let dir = self.dir();
        if !dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&dir).map_err(|source| CscopeError::WorkspaceRemoveError {
            path: dir.clone(),
            source,
        })?;
        log::info!("Removed {}", dir.display());
        Ok(())
    }
}

#[cfg(unix)]
fn create_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o755).create(dir)
}

#[cfg(not(unix))]
fn create_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}
