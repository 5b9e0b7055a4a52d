// Update lock: at most one update per project workspace.
//
// The lock is `<workspace>/update.lock` holding the owner's pid. The record
// is written to a private file first and hard-linked into place, so a lock
// that exists is always complete. A lock left behind by a dead process is
// replaced; an unreadable one only once it is older than a grace period.

use crate::error::{CscopeError, Result};
use crate::indexer::workspace::{IndexWorkspace, LOCK_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// How long an unreadable lock is still assumed to belong to a live update.
pub const UNREADABLE_LOCK_GRACE: Duration = Duration::from_secs(30);

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
    pub project: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

/// Held for the duration of an update; the lock file is removed on drop.
#[derive(Debug)]
pub struct UpdateLock {
    path: PathBuf,
}

impl UpdateLock {
    pub fn acquire(workspace: &IndexWorkspace) -> Result<Self> {
        let path = workspace.lock_path();
        let record = LockRecord {
            project: workspace.project_name().to_string(),
            pid: std::process::id(),
            started_at: Utc::now(),
        };
        let body = serde_json::to_vec(&record).map_err(|e| lock_error(&path, e))?;

        let scratch = workspace.dir().join(format!(
            "{}.{}.{}",
            LOCK_NAME,
            record.pid,
            SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&scratch, &body).map_err(|e| lock_error(&scratch, e))?;
        let published = publish(&scratch, &path, workspace);
        if let Err(e) = fs::remove_file(&scratch) {
            log::warn!("Failed to remove {}: {}", scratch.display(), e);
        }
        published?;

        log::debug!("Acquired update lock {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(path: &Path) -> Option<LockRecord> {
        read_record(path)
    }
}

impl Drop for UpdateLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            // Removed along with the workspace.
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to release update lock {}: {}", self.path.display(), e),
        }
    }
}

/// Links the complete record at `scratch` to `path`. The second pass only
/// happens after clearing a stale lock.
fn publish(scratch: &Path, path: &Path, workspace: &IndexWorkspace) -> Result<()> {
    for _ in 0..2 {
        match fs::hard_link(scratch, path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                match read_record(path) {
                    Some(existing) if is_process_running(existing.pid) => {
                        return Err(CscopeError::UpdateInProgress {
                            project: existing.project,
                            pid: Some(existing.pid),
                        });
                    }
                    Some(existing) => {
                        log::info!("Clearing stale update lock from dead process {}", existing.pid);
                    }
                    None if is_recent(path) => {
                        return Err(CscopeError::UpdateInProgress {
                            project: workspace.project_name().to_string(),
                            pid: None,
                        });
                    }
                    None => log::warn!("Corrupted update lock, removing {}", path.display()),
                }
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(lock_error(path, e)),
                }
            }
            Err(e) => return Err(lock_error(path, e)),
        }
    }
    Err(lock_error(path, "lock keeps reappearing"))
}

fn read_record(path: &Path) -> Option<LockRecord> {
    let body = fs::read(path).ok()?;
    serde_json::from_slice(&body).ok()
}

/// Modified within the grace period. A missing file or an unknown mtime
/// counts as old.
fn is_recent(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map_or(false, |age| age < UNREADABLE_LOCK_GRACE)
}

fn lock_error(path: &Path, e: impl std::fmt::Display) -> CscopeError {
    CscopeError::LockError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

#[cfg(target_os = "linux")]
fn is_process_running(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn is_process_running(_pid: u32) -> bool {
    true
}
