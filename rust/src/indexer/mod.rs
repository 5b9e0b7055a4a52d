// Index generation: file discovery command, workspace layout, external runs.

pub mod builder;
pub mod command;
pub mod lock;
pub mod workspace;

pub use builder::{FileListOutcome, IndexBuilder, IndexOutcome};
pub use command::{CommandSpec, FileSetCommand};
pub use lock::{LockRecord, UpdateLock};
pub use workspace::{IndexWorkspace, FILE_LIST_NAME, INDEX_NAME, LOCK_NAME};
