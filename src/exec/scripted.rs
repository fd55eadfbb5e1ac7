//! Scripted CommandRunner for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::{BinaryOutput, CommandRunner, ExecError, ExecOptions, ExecOutput};

type Handler = Box<dyn Fn(&[String], Option<&[u8]>) -> Result<Vec<u8>, ExecError> + Send + Sync>;

/// Canned response for a matched invocation
pub struct Reply(Handler);

impl Reply {
    pub fn text(stdout: &str) -> Self {
        let stdout = stdout.to_string();
        Reply(Box::new(move |_, _| Ok(stdout.clone().into_bytes())))
    }

    pub fn bytes(stdout: &[u8]) -> Self {
        let stdout = stdout.to_vec();
        Reply(Box::new(move |_, _| Ok(stdout.clone())))
    }

    pub fn fail(code: i32, stderr: &str) -> Self {
        let stderr = stderr.to_string();
        Reply(Box::new(move |_, _| {
            Err(ExecError::Failed {
                program: "scripted".to_string(),
                code: Some(code),
                stderr: stderr.clone(),
            })
        }))
    }

    pub fn timeout() -> Self {
        Reply(Box::new(|_, _| {
            Err(ExecError::Timeout {
                program: "scripted".to_string(),
                timeout: Duration::from_secs(10),
            })
        }))
    }

    pub fn with<F>(handler: F) -> Self
    where
        F: Fn(&[String], Option<&[u8]>) -> Result<Vec<u8>, ExecError> + Send + Sync + 'static,
    {
        Reply(Box::new(handler))
    }
}

struct Rule {
    program: String,
    matcher: Box<dyn Fn(&[String]) -> bool + Send + Sync>,
    reply: Reply,
}

/// CommandRunner that answers from registered rules and records every call
/// Unmatched invocations behave like a missing program
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    tools: HashMap<String, PathBuf>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
    inputs: Mutex<Vec<Vec<u8>>>,
    which_calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `which(name)` resolve to `path`
    pub fn with_tool(mut self, name: &str, path: &str) -> Self {
        self.tools.insert(name.to_string(), PathBuf::from(path));
        self
    }

    /// Register a reply for `program` when `matcher` accepts the arguments
    pub fn on<M>(&self, program: &str, matcher: M, reply: Reply)
    where
        M: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.rules.lock().unwrap().push(Rule {
            program: program.to_string(),
            matcher: Box::new(matcher),
            reply,
        });
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded invocations of `program`
    pub fn call_count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| program_matches(p, program))
            .count()
    }

    /// Bytes piped to stdin, one entry per binary call that had input
    pub fn inputs(&self) -> Vec<Vec<u8>> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn which_calls(&self, program: &str) -> usize {
        self.which_calls
            .lock()
            .unwrap()
            .get(program)
            .copied()
            .unwrap_or(0)
    }

    fn dispatch(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> Result<Vec<u8>, ExecError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.clone()));
        if let Some(input) = stdin {
            self.inputs.lock().unwrap().push(input.to_vec());
        }

        let rules = self.rules.lock().unwrap();
        let rule = rules
            .iter()
            .find(|r| program_matches(program, &r.program) && (r.matcher)(&args));
        match rule {
            Some(rule) => (rule.reply.0)(&args, stdin),
            None => Err(ExecError::NotFound {
                program: program.to_string(),
            }),
        }
    }
}

fn program_matches(invoked: &str, registered: &str) -> bool {
    invoked == registered
        || Path::new(invoked)
            .file_name()
            .is_some_and(|name| name == registered)
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        _options: &ExecOptions,
    ) -> Result<ExecOutput, ExecError> {
        let stdout = self.dispatch(program, args, None)?;
        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::new(),
        })
    }

    async fn run_binary(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
        _options: &ExecOptions,
    ) -> Result<BinaryOutput, ExecError> {
        let stdout = self.dispatch(program, args, stdin)?;
        Ok(BinaryOutput {
            stdout,
            stderr: String::new(),
        })
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        *self
            .which_calls
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_insert(0) += 1;
        self.tools.get(program).cloned()
    }
}
