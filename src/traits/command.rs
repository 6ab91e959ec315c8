use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Trait for running external programs (aws, cdk, test suites), allowing for mocking in tests
///
/// `env` entries are added on top of the inherited process environment.
pub trait CommandExecutor: Send + Sync {
    /// Execute a program with arguments and capture its output
    fn execute(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        working_dir: &Path,
    ) -> Result<Output>;

    /// Execute a program with inherited stdio and return its exit code
    fn execute_interactive(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        working_dir: &Path,
    ) -> Result<i32>;

    /// Execute a shell command line (cmd on Windows, sh on Unix) and capture its output
    fn execute_shell(&self, command: &str, env: &[(&str, &str)], working_dir: &Path)
        -> Result<Output>;

    /// Check whether a program is installed by running `<program> --version`
    fn is_available(&self, program: &str) -> bool {
        self.execute(program, &["--version"], &[], Path::new("."))
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

/// Real command executor using std::process::Command
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        working_dir: &Path,
    ) -> Result<Output> {
        tracing::debug!(program, arg_count = args.len(), "running external command");

        Command::new(program)
            .args(args)
            .envs(env.iter().copied())
            .current_dir(working_dir)
            .output()
            .with_context(|| format!("Failed to run '{}'", program))
    }

    fn execute_interactive(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        working_dir: &Path,
    ) -> Result<i32> {
        tracing::debug!(program, arg_count = args.len(), "running external command interactively");

        let mut child = Command::new(program)
            .args(args)
            .envs(env.iter().copied())
            .current_dir(working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to run '{}'", program))?;

        let status = child.wait()?;
        Ok(status.code().unwrap_or(-1))
    }

    fn execute_shell(
        &self,
        command: &str,
        env: &[(&str, &str)],
        working_dir: &Path,
    ) -> Result<Output> {
        tracing::debug!("running shell command");

        #[cfg(target_os = "windows")]
        let mut shell = {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        };

        #[cfg(not(target_os = "windows"))]
        let mut shell = {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };

        shell
            .envs(env.iter().copied())
            .current_dir(working_dir)
            .output()
            .with_context(|| format!("Failed to run shell command: {}", command))
    }
}

/// A recorded call made against `MockCommandExecutor`
#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

#[cfg(test)]
impl Invocation {
    /// Program and arguments joined by single spaces
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted response, consumed by the first invocation whose command line starts with `prefix`
#[cfg(test)]
#[derive(Clone, Debug)]
pub struct MockCommandResult {
    pub prefix: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[cfg(test)]
impl MockCommandResult {
    pub fn ok(prefix: &str, stdout: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(prefix: &str, exit_code: i32, stderr: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

/// Mock command executor for testing
///
/// Unscripted invocations succeed with empty output.
#[cfg(test)]
pub struct MockCommandExecutor {
    responses: std::sync::Mutex<Vec<MockCommandResult>>,
    invocations: std::sync::Mutex<Vec<Invocation>>,
}

#[cfg(test)]
impl MockCommandExecutor {
    pub fn new() -> Self {
        Self::with_outputs(Vec::new())
    }

    pub fn with_outputs(outputs: Vec<MockCommandResult>) -> Self {
        Self {
            responses: std::sync::Mutex::new(outputs),
            invocations: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn add_output(&self, output: MockCommandResult) {
        self.responses.lock().unwrap().push(output);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Whether any recorded command line starts with `prefix`
    pub fn was_invoked(&self, prefix: &str) -> bool {
        self.invocations()
            .iter()
            .any(|i| i.command_line().starts_with(prefix))
    }

    fn respond(&self, program: &str, args: &[&str], env: &[(&str, &str)]) -> MockCommandResult {
        let invocation = Invocation {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let line = invocation.command_line();
        self.invocations.lock().unwrap().push(invocation);

        let mut responses = self.responses.lock().unwrap();
        match responses.iter().position(|r| line.starts_with(&r.prefix)) {
            Some(index) => responses.remove(index),
            None => MockCommandResult::ok(&line, ""),
        }
    }
}

#[cfg(test)]
impl Default for MockCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl CommandExecutor for MockCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        _working_dir: &Path,
    ) -> Result<Output> {
        let result = self.respond(program, args, env);
        Ok(Output {
            status: create_exit_status(result.exit_code),
            stdout: result.stdout.into_bytes(),
            stderr: result.stderr.into_bytes(),
        })
    }

    fn execute_interactive(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        _working_dir: &Path,
    ) -> Result<i32> {
        Ok(self.respond(program, args, env).exit_code)
    }

    fn execute_shell(
        &self,
        command: &str,
        env: &[(&str, &str)],
        _working_dir: &Path,
    ) -> Result<Output> {
        let result = self.respond(command, &[], env);
        Ok(Output {
            status: create_exit_status(result.exit_code),
            stdout: result.stdout.into_bytes(),
            stderr: result.stderr.into_bytes(),
        })
    }
}

#[cfg(test)]
fn create_exit_status(code: i32) -> std::process::ExitStatus {
    // ExitStatus has no public constructor; build one from a raw wait status
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }
}
