use crate::error::{CscopeError, Result};
use crate::host::QueryHost;
use std::path::{Path, PathBuf};

/// What a session transition asked the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Added(PathBuf),
    Reset,
    Detached(PathBuf),
}

/// Whether the host is attached to the index. Inactive until the first
/// index is seen; adding twice is invalid for the host, so later refreshes
/// reset instead.
#[derive(Debug, Default)]
pub struct IndexSession {
    attached: Option<PathBuf>,
}

impl IndexSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.attached.is_some()
    }

    pub fn index(&self) -> Option<&Path> {
        self.attached.as_deref()
    }

    /// Attach to or refresh `index`. Does nothing while the index file does
    /// not exist.
    pub fn refresh<H>(&mut self, index: &Path, host: &mut H) -> Result<Option<SessionEvent>>
    where
        H: QueryHost + ?Sized,
    {
        if !index.is_file() {
            log::debug!("No index at {}, session unchanged", index.display());
            return Ok(None);
        }

        if self.attached.is_some() {
            host.reset_connections().map_err(CscopeError::Host)?;
            return Ok(Some(SessionEvent::Reset));
        }

        host.add_connection(index).map_err(CscopeError::Host)?;
        self.attached = Some(index.to_path_buf());
        log::info!("Session active on {}", index.display());
        Ok(Some(SessionEvent::Added(index.to_path_buf())))
    }

    /// Detach from the current index and return to inactive.
    pub fn deactivate<H>(&mut self, host: &mut H) -> Result<Option<SessionEvent>>
    where
        H: QueryHost + ?Sized,
    {
        let Some(index) = self.attached.clone() else {
            return Ok(None);
        };
        host.kill_connection(&index).map_err(CscopeError::Host)?;
        self.attached = None;
        log::info!("Session detached from {}", index.display());
        Ok(Some(SessionEvent::Detached(index)))
    }
}
