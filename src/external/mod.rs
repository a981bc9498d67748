//! External tool abstractions
//!
//! This module provides the trait-based seam over spawned processes, so the
//! repository layer can be driven by a real `git` binary or by a mock.

pub mod command;
#[cfg(test)]
pub(crate) mod test_support;

pub use command::{CommandError, CommandExecutor, ProcessCommandExecutor, ProcessError};
