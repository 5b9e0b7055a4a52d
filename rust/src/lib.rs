pub mod config;
pub mod error;
pub mod host;
pub mod indexer;
pub mod keymap;
pub mod project;
pub mod serve;
pub mod session;
pub mod util;

// Re-export main types and functions
pub use config::{resolve_config_path, ProjectConfig, Settings};
pub use error::{CscopeError, Result};
pub use host::{ConsoleHost, ExCommandHost, QueryHost};
pub use indexer::{CommandSpec, FileSetCommand, IndexBuilder, IndexWorkspace};
pub use project::{ProjectContext, Stage, StartOutcome, StatusReport, UpdateReport};
pub use session::{IndexSession, SessionEvent};
