//! Scripted command executor for unit tests.
//!
//! Records every invocation and answers from a per-argument-vector script,
//! defaulting to empty successful output for anything unscripted.

use super::command::{CommandError, CommandExecutor};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn line(&self) -> String {
        self.args.join(" ")
    }
}

#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, VecDeque<Result<String, CommandError>>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the argument vector `args`. Repeated calls for
    /// the same vector queue responses in order; the last one sticks.
    pub fn expect_command(self, args: &[&str], response: Result<String, CommandError>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(args.join(" "))
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::line).collect()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<String, CommandError> {
        self.calls.lock().unwrap().push(Invocation {
            program: program.to_string(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
        });

        let key = args.join(" ");
        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Ok(String::new())),
            Some(queue) => queue.front().cloned().unwrap_or(Ok(String::new())),
            None => Ok(String::new()),
        }
    }
}
