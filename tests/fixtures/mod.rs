/// Shared fixtures for integration tests that drive a real git binary
pub mod git_harness;
