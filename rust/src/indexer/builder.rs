use crate::config::Settings;
use crate::error::{CscopeError, Result};
use crate::indexer::command::{CommandSpec, FileSetCommand};
use crate::indexer::workspace::IndexWorkspace;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Output, Stdio};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListOutcome {
    pub path: PathBuf,
    pub entries: usize,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOutcome {
    pub path: PathBuf,
    pub bytes: u64,
    pub exit_code: Option<i32>,
}

/// Runs the two external steps of an update: file discovery into
/// `cscope.files`, then `cscope` into `cscope.out`.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    cscope_program: String,
    check_exit_status: bool,
}

impl IndexBuilder {
    pub fn new(cscope_program: impl Into<String>, check_exit_status: bool) -> Self {
        Self {
            cscope_program: cscope_program.into(),
            check_exit_status,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.cscope_program.clone(), settings.check_exit_status)
    }

    /// `cscope -q -R -b -i <cscope.files> -f <cscope.out>`
    ///
    /// `-R` is passed even though `-i` makes the list authoritative; cscope
    /// ignores it in that combination.
    pub fn index_command(&self, workspace: &IndexWorkspace) -> CommandSpec {
        CommandSpec::new(&self.cscope_program)
            .arg("-q")
            .arg("-R")
            .arg("-b")
            .arg("-i")
            .arg(workspace.file_list_path())
            .arg("-f")
            .arg(workspace.index_path())
    }

    /// Runs the file discovery command with stdout truncating `cscope.files`.
    pub fn build_file_list(
        &self,
        file_set: &FileSetCommand,
        workspace: &IndexWorkspace,
    ) -> Result<FileListOutcome> {
        let spec = file_set.spec()?;
        let path = workspace.file_list_path();
        log::debug!("cscope.files command: {}", spec);

        let file = File::create(&path).map_err(|source| CscopeError::FileListWriteError {
            path: path.clone(),
            source,
        })?;

        let output = spec
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| CscopeError::FileListCommandError {
                command: spec.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(reason) = self.exit_failure(spec, &output) {
            return Err(CscopeError::FileListCommandError {
                command: spec.to_string(),
                reason,
            });
        }

        let entries = count_lines(&path).map_err(|source| CscopeError::FileListWriteError {
            path: path.clone(),
            source,
        })?;
        log::info!("Wrote {} entries to {}", entries, path.display());

        Ok(FileListOutcome {
            path,
            entries,
            exit_code: output.status.code(),
        })
    }

    /// Runs the indexer over an existing `cscope.files`.
    pub fn build_index(&self, workspace: &IndexWorkspace) -> Result<IndexOutcome> {
        let file_list = workspace.file_list_path();
        if !file_list.is_file() {
            return Err(CscopeError::IndexFileListMissing(file_list));
        }

        let spec = self.index_command(workspace);
        log::debug!("cscope.out command: {}", spec);

        let output = spec
            .to_command()
            .current_dir(workspace.dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| CscopeError::IndexBuildError {
                command: spec.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(reason) = self.exit_failure(&spec, &output) {
            return Err(CscopeError::IndexBuildError {
                command: spec.to_string(),
                reason,
            });
        }

        let path = workspace.index_path();
        let bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        log::info!("Built {} ({} bytes)", path.display(), bytes);

        Ok(IndexOutcome {
            path,
            bytes,
            exit_code: output.status.code(),
        })
    }

    /// Reason to fail the step, if its exit status counts as a failure.
    fn exit_failure(&self, spec: &CommandSpec, output: &Output) -> Option<String> {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if output.status.success() {
            if !stderr.is_empty() {
                log::debug!("{}: {}", spec.program.to_string_lossy(), stderr);
            }
            return None;
        }

        let mut reason = format!("exited with {}", output.status);
        if !stderr.is_empty() {
            reason.push_str(": ");
            reason.push_str(stderr);
        }
        if self.check_exit_status {
            Some(reason)
        } else {
            log::warn!("Ignoring failure of '{}': {}", spec, reason);
            None
        }
    }
}

fn count_lines(path: &std::path::Path) -> std::io::Result<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for line in reader.split(b'\n') {
        line?;
        count += 1;
    }
    Ok(count)
}
