//! Project context: the configured project, its workspace, the index session
//! and the host, threaded through every command.
//!
//! ```text
//! Unconfigured --start--> Configured --update--> Indexed --refresh--> SessionActive
//!                                                      ^                  |
//!                                                      +---- teardown ----+
//! ```

use crate::config::{resolve_config_path, ProjectConfig, Settings};
use crate::error::{CscopeError, Result};
use crate::host::QueryHost;
use crate::indexer::{
    FileListOutcome, FileSetCommand, IndexBuilder, IndexOutcome, IndexWorkspace, UpdateLock,
};
use crate::keymap::query_mappings;
use crate::session::{IndexSession, SessionEvent};
use crate::util::{absolutize, sha256_file};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Unconfigured,
    Configured,
    Indexed,
    SessionActive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Unconfigured => "unconfigured",
            Stage::Configured => "configured",
            Stage::Indexed => "indexed",
            Stage::SessionActive => "session active",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Configured {
    config_path: PathBuf,
    config: ProjectConfig,
    workspace: IndexWorkspace,
    file_set: FileSetCommand,
}

/// Result of `start`, including the follow-up actions the settings asked for.
#[derive(Debug)]
pub struct StartOutcome {
    pub config_path: PathBuf,
    pub workspace: PathBuf,
    pub update: Option<Result<UpdateReport>>,
    pub mapped_keys: Option<Result<usize>>,
}

/// Each step of an update succeeds or fails on its own.
#[derive(Debug)]
pub struct UpdateReport {
    pub file_list: Result<FileListOutcome>,
    pub index: Result<IndexOutcome>,
    pub session: Result<Option<SessionEvent>>,
}

impl UpdateReport {
    pub fn is_success(&self) -> bool {
        self.file_list.is_ok() && self.index.is_ok() && self.session.is_ok()
    }

    /// Status lines for the failed steps.
    pub fn failures(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Err(e) = &self.file_list {
            out.push(format!("Couldn't update cscope.files: {}", e));
        }
        if let Err(e) = &self.index {
            out.push(format!("Couldn't update cscope.out: {}", e));
        }
        if let Err(e) = &self.session {
            out.push(format!("Couldn't refresh cscope connection: {}", e));
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactStatus {
    pub path: PathBuf,
    pub bytes: u64,
    pub modified: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ArtifactStatus {
    /// `text` artifacts also get a line count and a digest.
    fn probe(path: PathBuf, text: bool) -> Option<Self> {
        let meta = fs::metadata(&path).ok().filter(|m| m.is_file())?;
        let (lines, sha256) = if text {
            let lines = fs::read(&path)
                .ok()
                .map(|bytes| bytes.iter().filter(|b| **b == b'\n').count());
            (lines, sha256_file(&path).ok())
        } else {
            (None, None)
        };
        Some(Self {
            bytes: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Local>::from),
            lines,
            sha256,
            path,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub stage: Stage,
    pub project: Option<String>,
    pub config_path: Option<PathBuf>,
    pub root_path: Option<PathBuf>,
    pub library_paths: Vec<PathBuf>,
    pub file_patterns: Vec<String>,
    pub workspace: Option<PathBuf>,
    pub file_set_command: Option<String>,
    pub file_list: Option<ArtifactStatus>,
    pub index: Option<ArtifactStatus>,
    pub session_index: Option<PathBuf>,
    pub keys_mapped: bool,
}

pub struct ProjectContext<H: QueryHost> {
    settings: Settings,
    host: H,
    configured: Option<Configured>,
    session: IndexSession,
    keys_mapped: bool,
}

impl<H: QueryHost> ProjectContext<H> {
    pub fn new(settings: Settings, host: H) -> Self {
        Self {
            settings,
            host,
            configured: None,
            session: IndexSession::new(),
            keys_mapped: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn config(&self) -> Option<&ProjectConfig> {
        self.configured.as_ref().map(|c| &c.config)
    }

    pub fn workspace(&self) -> Option<&IndexWorkspace> {
        self.configured.as_ref().map(|c| &c.workspace)
    }

    pub fn file_set(&self) -> &FileSetCommand {
        static NOT_READY: FileSetCommand = FileSetCommand::NotReady;
        self.configured
            .as_ref()
            .map(|c| &c.file_set)
            .unwrap_or(&NOT_READY)
    }

    pub fn session(&self) -> &IndexSession {
        &self.session
    }

    pub fn stage(&self) -> Stage {
        match &self.configured {
            None => Stage::Unconfigured,
            Some(_) if self.session.is_active() => Stage::SessionActive,
            Some(c) if c.workspace.index_path().is_file() => Stage::Indexed,
            Some(_) => Stage::Configured,
        }
    }

    /// Loads the descriptor, prepares the workspace and the file discovery
    /// command. On failure the previous state is kept and no workspace is
    /// created.
    pub fn configure(&mut self, config_arg: Option<&str>, cwd: &Path) -> Result<PathBuf> {
        self.load_project(config_arg, cwd, true)
    }

    /// Same as `configure` without creating the workspace, for commands that
    /// only look at it.
    pub fn inspect(&mut self, config_arg: Option<&str>, cwd: &Path) -> Result<PathBuf> {
        self.load_project(config_arg, cwd, false)
    }

    fn load_project(
        &mut self,
        config_arg: Option<&str>,
        cwd: &Path,
        create_workspace: bool,
    ) -> Result<PathBuf> {
        let config_path = resolve_config_path(config_arg, cwd, &self.settings)?;
        let config = ProjectConfig::load(&config_path)?;

        let base_dir = absolutize(self.settings.cscope_dir.clone(), cwd);
        let workspace = IndexWorkspace::new(base_dir, config.name.clone());
        if create_workspace {
            workspace.create()?;
        }

        let file_set = FileSetCommand::build(&config, &self.settings.find_program);
        log::debug!("cscope_debug: {}", file_set.spec()?);

        if let Some(attached) = self.session.index() {
            if attached != workspace.index_path() {
                self.session.deactivate(&mut self.host)?;
            }
        }

        log::info!(
            "Project '{}' at {} using {}",
            config.name,
            config.root_path.display(),
            workspace.dir().display()
        );
        self.configured = Some(Configured {
            config_path: config_path.clone(),
            config,
            workspace,
            file_set,
        });
        Ok(config_path)
    }

    /// `configure`, then the initial update and key mappings when the
    /// settings enable them.
    pub fn start(&mut self, config_arg: Option<&str>, cwd: &Path) -> Result<StartOutcome> {
        let config_path = self.configure(config_arg, cwd)?;
        let workspace = self
            .workspace()
            .map(IndexWorkspace::dir)
            .unwrap_or_default();

        let update = self.settings.update_on_start.then(|| self.update());
        let mapped_keys = self.settings.map_keys.then(|| self.map_keys());

        Ok(StartOutcome {
            config_path,
            workspace,
            update,
            mapped_keys,
        })
    }

    /// Regenerates `cscope.files` and `cscope.out`, then attaches or resets
    /// the session. Fails outright only when no project is configured or
    /// another update holds the lock.
    pub fn update(&mut self) -> Result<UpdateReport> {
        let configured = self
            .configured
            .as_ref()
            .ok_or(CscopeError::FileListNotReady)?;
        let builder = IndexBuilder::from_settings(&self.settings);

        // The workspace may have been deleted since `start`. If it cannot be
        // brought back, the file list step carries the error.
        let (lock, file_list) = match configured.workspace.create() {
            Ok(()) => {
                let lock = UpdateLock::acquire(&configured.workspace)?;
                let file_list =
                    builder.build_file_list(&configured.file_set, &configured.workspace);
                (Some(lock), file_list)
            }
            Err(e) => (None, Err(e)),
        };
        if let Err(e) = &file_list {
            log::warn!("{}", e);
        }
        let index = builder.build_index(&configured.workspace);
        if let Err(e) = &index {
            log::warn!("{}", e);
        }
        drop(lock);

        let session = self
            .session
            .refresh(&configured.workspace.index_path(), &mut self.host);

        Ok(UpdateReport {
            file_list,
            index,
            session,
        })
    }

    /// Registers the query shortcuts once; later calls register nothing.
    pub fn map_keys(&mut self) -> Result<usize> {
        if self.keys_mapped {
            return Ok(0);
        }
        let mappings = query_mappings();
        for mapping in &mappings {
            self.host.map_key(mapping).map_err(CscopeError::Host)?;
        }
        self.keys_mapped = true;
        Ok(mappings.len())
    }

    /// Detaches the session. With `remove_workspace` the project directory
    /// is deleted as well and the context goes back to unconfigured.
    /// A running update makes the removal fail before anything is detached.
    pub fn teardown(&mut self, remove_workspace: bool) -> Result<Option<SessionEvent>> {
        let lock = match &self.configured {
            Some(configured) if remove_workspace && configured.workspace.exists() => {
                Some(UpdateLock::acquire(&configured.workspace)?)
            }
            _ => None,
        };

        let event = self.session.deactivate(&mut self.host)?;
        if remove_workspace {
            if let Some(configured) = &self.configured {
                configured.workspace.remove()?;
            }
            self.configured = None;
        }
        drop(lock);
        Ok(event)
    }

    pub fn status(&self) -> StatusReport {
        let configured = self.configured.as_ref();
        StatusReport {
            stage: self.stage(),
            project: configured.map(|c| c.config.name.clone()),
            config_path: configured.map(|c| c.config_path.clone()),
            root_path: configured.map(|c| c.config.root_path.clone()),
            library_paths: configured
                .map(|c| c.config.library_paths.clone())
                .unwrap_or_default(),
            file_patterns: configured
                .map(|c| c.config.file_patterns.clone())
                .unwrap_or_default(),
            workspace: configured.map(|c| c.workspace.dir()),
            file_set_command: configured
                .and_then(|c| c.file_set.spec().ok())
                .map(|spec| spec.to_string()),
            file_list: configured
                .and_then(|c| ArtifactStatus::probe(c.workspace.file_list_path(), true)),
            index: configured.and_then(|c| ArtifactStatus::probe(c.workspace.index_path(), false)),
            session_index: self.session.index().map(Path::to_path_buf),
            keys_mapped: self.keys_mapped,
        }
    }
}
