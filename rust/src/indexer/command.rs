use crate::config::ProjectConfig;
use crate::error::{CscopeError, Result};
use crate::util::shell_quote;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::Command;

/// A program plus its argument list, kept as data until something runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn push(&mut self, arg: impl AsRef<OsStr>) {
        self.args.push(arg.as_ref().to_os_string());
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

/// The file discovery command for a project, or an explicit marker that no
/// project has been configured yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FileSetCommand {
    #[default]
    NotReady,
    Ready(CommandSpec),
}

impl FileSetCommand {
    /// `find <libs>... <root> -name <p1> -o -name <p2> ...`
    ///
    /// Library paths are passed as extra starting points ahead of the root
    /// and get no expression of their own.
    pub fn build(config: &ProjectConfig, find_program: &str) -> Self {
        let mut spec = CommandSpec::new(find_program);
        for lib in &config.library_paths {
            spec.push(lib);
        }
        spec.push(&config.root_path);
        for (i, pattern) in config.file_patterns.iter().enumerate() {
            if i > 0 {
                spec.push("-o");
            }
            spec.push("-name");
            spec.push(pattern);
        }
        FileSetCommand::Ready(spec)
    }

    pub fn from_config(config: Option<&ProjectConfig>, find_program: &str) -> Self {
        match config {
            Some(config) => Self::build(config, find_program),
            None => FileSetCommand::NotReady,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, FileSetCommand::Ready(_))
    }

    pub fn spec(&self) -> Result<&CommandSpec> {
        match self {
            FileSetCommand::Ready(spec) => Ok(spec),
            FileSetCommand::NotReady => Err(CscopeError::FileListNotReady),
        }
    }
}
