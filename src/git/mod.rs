//! Git operations module
//!
//! This module provides the repository handle that drives an external `git`
//! executable, and the factory that clones or reuses its working directory.

pub mod clone;
pub mod repository;

pub use clone::CloneOptions;
pub use repository::{Checkout, CommitOutcome, IndexState, PathList, RefProbe, Repository};
