//! Process runner with output capture and a polling timeout.
//! （擷取輸出並以輪詢方式限時的程序執行器。）

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Errors that may surface while spawning or waiting on a process.
/// （啟動或等待外部程序時可能發生的錯誤。）
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read process output: {0}")]
    Output(std::io::Error),
    #[error("failed to poll process status: {0}")]
    Poll(std::io::Error),
    #[error("failed to terminate process: {0}")]
    Kill(std::io::Error),
}

/// Program, arguments and limits for one external invocation.
/// （單次外部呼叫的程式、參數與限制。）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl RunSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// The process is killed once it runs longer than `timeout`.
    /// （程序執行超過時限即被終止。）
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout.max(Duration::from_millis(1)));
        self
    }
}

/// Captured outcome of a finished (or killed) process.
/// （已結束或被終止之程序的擷取結果。）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
    pub timed_out: bool,
}

impl RunResult {
    pub fn success(&self) -> bool {
        !self.timed_out && matches!(self.exit_code, Some(0))
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Spawns [`RunSpec`]s and waits on them.
/// （啟動 [`RunSpec`] 並等待其結束。）
pub struct RunExecutor;

impl RunExecutor {
    /// Runs the command, capturing stdout and stderr.
    /// （執行指令並擷取標準輸出與錯誤輸出。）
    pub fn execute(spec: &RunSpec) -> Result<RunResult, RunError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &spec.env {
            command.env(key, value);
        }
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| RunError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let mut timed_out = false;
        let status = match spec.timeout {
            Some(timeout) => loop {
                if let Some(status) = child.try_wait().map_err(RunError::Poll)? {
                    break status;
                }
                if start.elapsed() >= timeout {
                    child.kill().map_err(RunError::Kill)?;
                    timed_out = true;
                    break child.wait().map_err(RunError::Poll)?;
                }
                thread::sleep(Duration::from_millis(10));
            },
            None => child.wait().map_err(RunError::Poll)?,
        };

        // A killed child may leave descendants holding the pipes open; their readers are detached.
        let (stdout, stderr) = if timed_out {
            (Vec::new(), Vec::new())
        } else {
            (collect(stdout)?, collect(stderr)?)
        };

        Ok(RunResult {
            exit_code: status.code(),
            stdout,
            stderr,
            duration: start.elapsed(),
            timed_out,
        })
    }
}

/// Pipes are read on their own threads so a chatty child never blocks on a full pipe.
/// （管線由獨立執行緒讀取，輸出量大的子程序不會因管線滿載而阻塞。）
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        pipe.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>, RunError> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| {
                RunError::Output(io::Error::new(io::ErrorKind::Other, "output reader panicked"))
            })?
            .map_err(RunError::Output),
        None => Ok(Vec::new()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::str;
    use tempfile::tempdir;

    #[test]
    fn captures_stdout_and_environment() {
        let spec = RunSpec::new("sh")
            .with_args(["-c", "printf '%s' \"$ODINSENSE_TEST\""])
            .with_env("ODINSENSE_TEST", "hello");

        let result = RunExecutor::execute(&spec).expect("command should execute");
        assert!(result.success());
        assert_eq!(str::from_utf8(&result.stdout).unwrap(), "hello");
        assert!(result.stderr.is_empty());
    }

    #[test]
    fn runs_in_working_directory() {
        let temp = tempdir().unwrap();
        let spec = RunSpec::new("sh")
            .with_args(["-c", "pwd"])
            .with_working_dir(temp.path());

        let result = RunExecutor::execute(&spec).unwrap();
        let reported = str::from_utf8(&result.stdout).unwrap().trim_end();
        assert_eq!(
            std::fs::canonicalize(reported).unwrap(),
            std::fs::canonicalize(temp.path()).unwrap()
        );
    }

    #[test]
    fn kills_process_after_timeout() {
        let spec = RunSpec::new("sh")
            .with_args(["-c", "sleep 2"])
            .with_timeout(Duration::from_millis(100));

        let result = RunExecutor::execute(&spec).unwrap();
        assert!(result.timed_out);
        assert!(!result.success());
    }

    #[test]
    fn large_output_does_not_stall_until_timeout() {
        let spec = RunSpec::new("sh")
            .with_args(["-c", "head -c 200000 /dev/zero | tr '\\0' a"])
            .with_timeout(Duration::from_secs(5));

        let result = RunExecutor::execute(&spec).unwrap();
        assert!(!result.timed_out);
        assert!(result.success());
        assert_eq!(result.stdout.len(), 200_000);
        assert!(result.stdout.iter().all(|&byte| byte == b'a'));
        assert!(result.duration < Duration::from_secs(5));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = RunExecutor::execute(&RunSpec::new("odinsense-no-such-binary")).unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
    }
}
