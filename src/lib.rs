// Branch Publish - push a directory of files to a branch of a git remote
// This exposes the core components for the binary, integration and embedding

pub mod cache;
pub mod config;
pub mod error;
pub mod external;
pub mod files;
pub mod git;
pub mod publish;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{PublishOptions, User};
pub use error::{CommandError, GitError, ProcessError, PublishError};
pub use external::{CommandExecutor, ProcessCommandExecutor};
pub use git::{Checkout, CloneOptions, CommitOutcome, IndexState, PathList, RefProbe, Repository};
pub use publish::{before_add, BeforeAddHook, PublishReport, Publisher};
pub use telemetry::{generate_correlation_id, init_telemetry, LogFormat};
