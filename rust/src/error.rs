use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CscopeError>;

#[derive(Error, Debug)]
pub enum CscopeError {
    #[error("'{0}' does not exist")]
    ConfigNotFound(PathBuf),

    #[error("Error reading file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing file '{path}': line {line}: unrecognized '{text}'")]
    ConfigSyntax {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("Error parsing file '{path}': option '{field}' appears more than once")]
    ConfigDuplicateField { path: PathBuf, field: String },

    #[error("Error parsing file '{path}': no option '{field}'")]
    ConfigMissingField { path: PathBuf, field: &'static str },

    #[error("Project name '{0}' cannot be used as a directory name")]
    ConfigInvalidName(String),

    #[error("Project path: '{0}' does not exist")]
    ConfigPathNotFound(PathBuf),

    #[error("Couldn't setup cscope directory '{path}': {source}")]
    WorkspaceCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't remove cscope directory '{path}': {source}")]
    WorkspaceRemoveError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't setup cscope.files: Command not ready")]
    FileListNotReady,

    #[error("Couldn't setup cscope.files: '{path}': {source}")]
    FileListWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't setup cscope.files: '{command}': {reason}")]
    FileListCommandError { command: String, reason: String },

    #[error("Couldn't setup cscope.out: '{0}' not ready")]
    IndexFileListMissing(PathBuf),

    #[error("Couldn't setup cscope.out: '{command}': {reason}")]
    IndexBuildError { command: String, reason: String },

    #[error(
        "Another update of '{project}' is running{}",
        .pid.map(|pid| format!(" (pid {})", pid)).unwrap_or_default()
    )]
    UpdateInProgress { project: String, pid: Option<u32> },

    #[error("Update lock '{path}': {reason}")]
    LockError { path: PathBuf, reason: String },

    #[error("Query host error: {0}")]
    Host(#[source] std::io::Error),
}
