//! External command launcher for project builds.
//! （專案建置使用的外部指令啟動器。）
//!
//! Commands are described by a serialisable [`RunSpec`] and either launched in
//! the background with their output appended to a [`LogSink`], or executed to
//! completion with captured output and an optional timeout.
//! 指令以可序列化的 [`RunSpec`] 描述，可在背景啟動並將輸出附加至 [`LogSink`]，
//! 或同步執行至結束並擷取輸出，支援逾時限制。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that may surface while preparing or executing a command.
/// （準備或執行指令時有可能發生的錯誤。）
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn process: {0}")]
    Spawn(io::Error),
    #[error("failed to open log sink {path}: {source}")]
    LogSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read process output: {0}")]
    Output(io::Error),
    #[error("failed to poll process status: {0}")]
    Poll(io::Error),
    #[error("failed to terminate process: {0}")]
    Kill(io::Error),
}

/// Serializable command specification.
/// （可序列化的指令設定資料結構。）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Human readable form shown in logs; defaults to program and args.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// The whole process group is killed once this elapses.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RunSpec {
    /// Creates a new command pointing at the given program.
    /// （以指定的程式建立指令設定。）
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            label: None,
            working_dir: None,
            env: BTreeMap::new(),
            timeout_ms: None,
        }
    }

    /// Runs `command` through the platform shell (`sh -c` or `cmd /C`).
    /// （透過平台預設的 shell 執行整段指令字串。）
    pub fn shell(command: impl Into<String>) -> Self {
        let command = command.into();
        let (program, flag) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        let mut spec = Self::new(program).with_args([flag.to_string(), command.clone()]);
        spec.label = Some(command);
        spec
    }

    /// Adds multiple arguments at once.
    /// （一次加入多個參數。）
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Registers an environment variable override.
    /// （設定環境變數覆寫值。）
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the working directory.
    /// （設定指令執行的工作目錄。）
    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// Applies a timeout to blocking execution.
    /// （設定同步執行時的逾時限制。）
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_millis().clamp(1, u128::from(u64::MAX)) as u64;
        self.timeout_ms = Some(millis);
        self
    }

    /// The command as it should appear in logs and messages.
    pub fn display(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None if self.args.is_empty() => self.program.clone(),
            None => format!("{} {}", self.program, self.args.join(" ")),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.stdin(Stdio::null());
        for (key, value) in &self.env {
            command.env(key, value);
        }
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        // Own process group, so a timeout reaches the shell's children too.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
    }
}

/// Result information produced by a command execution.
/// （指令執行完成後的結果資訊。）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration_ms: u128,
    pub timed_out: bool,
}

impl RunResult {
    /// Indicates whether the command exited successfully (code `0`).
    /// （判斷指令是否以 0 代表成功結束。）
    pub fn success(&self) -> bool {
        !self.timed_out && matches!(self.exit_code, Some(0))
    }
}

/// Named, append-only file that receives a command's output.
/// （接收指令輸出的具名附加式日誌檔。）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<File, RunError> {
        let wrap = |source| RunError::LogSink {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(wrap)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(wrap)
    }

    fn write_header(&self, file: &mut File, spec: &RunSpec) -> Result<(), RunError> {
        writeln!(file, "$ {}", spec.display()).map_err(|source| RunError::LogSink {
            path: self.path.clone(),
            source,
        })
    }

    /// Appends a finished run (command, output and status) to the log.
    /// （將已完成的執行結果寫入日誌。）
    pub fn record(&self, spec: &RunSpec, result: &RunResult) -> Result<(), RunError> {
        let mut file = self.open()?;
        self.write_header(&mut file, spec)?;
        let status = match (result.timed_out, result.exit_code) {
            (true, _) => "timed out".to_string(),
            (false, Some(code)) => format!("exit code {code}"),
            (false, None) => "terminated by signal".to_string(),
        };
        file.write_all(&result.stdout)
            .and_then(|_| file.write_all(&result.stderr))
            .and_then(|_| writeln!(file, "[{status} after {} ms]", result.duration_ms))
            .map_err(|source| RunError::LogSink {
                path: self.path.clone(),
                source,
            })
    }
}

/// A background process started by [`RunExecutor::launch`].
/// （由 [`RunExecutor::launch`] 啟動的背景進程。）
#[derive(Debug)]
pub struct LaunchedProcess {
    pid: u32,
    log_path: PathBuf,
}

impl LaunchedProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// Executes commands according to the provided specification.
/// （依照設定執行指令的主要元件。）
pub struct RunExecutor;

impl RunExecutor {
    /// Starts the command without waiting, streaming stdout and stderr into `sink`.
    /// （不等待結束即啟動指令，並將標準輸出與錯誤輸出導向 `sink`。）
    pub fn launch(spec: &RunSpec, sink: &LogSink) -> Result<LaunchedProcess, RunError> {
        let mut file = sink.open()?;
        sink.write_header(&mut file, spec)?;
        let stderr = file.try_clone().map_err(|source| RunError::LogSink {
            path: sink.path.clone(),
            source,
        })?;

        let mut command = spec.command();
        command.stdout(Stdio::from(file));
        command.stderr(Stdio::from(stderr));
        let child = command.spawn().map_err(RunError::Spawn)?;
        info!(
            pid = child.id(),
            command = %spec.display(),
            log = %sink.path.display(),
            "launched process"
        );
        Ok(LaunchedProcess {
            pid: child.id(),
            log_path: sink.path.clone(),
        })
    }

    /// Runs the provided command to completion and captures output.
    /// （執行指定指令至結束並擷取輸出。）
    pub fn execute(spec: &RunSpec) -> Result<RunResult, RunError> {
        let mut command = spec.command();
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = command.spawn().map_err(RunError::Spawn)?;
        debug!(pid = child.id(), command = %spec.display(), "executing process");

        // Drain pipes concurrently so a chatty child cannot block on a full pipe.
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let timeout_duration = spec.timeout_ms.map(Duration::from_millis);
        let mut timed_out = false;
        let status = match timeout_duration {
            Some(timeout) => loop {
                if let Some(status) = child.try_wait().map_err(RunError::Poll)? {
                    break status;
                }
                if start.elapsed() >= timeout {
                    debug!(pid = child.id(), ?timeout, "killing timed out process group");
                    kill_process_group(&mut child).map_err(RunError::Kill)?;
                    timed_out = true;
                    break child.wait().map_err(RunError::Poll)?;
                }
                thread::sleep(Duration::from_millis(15));
            },
            None => child.wait().map_err(RunError::Poll)?,
        };
        let duration = start.elapsed();

        Ok(RunResult {
            exit_code: status.code(),
            stdout: join_reader(stdout_reader)?,
            stderr: join_reader(stderr_reader)?,
            duration_ms: duration.as_millis(),
            timed_out,
        })
    }
}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg only sends a signal; the group id is the child's own pid.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        return Ok(());
    }
    // The group may already be gone; fall back to the direct child.
    child.kill()
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    child.kill()
}

type Reader = thread::JoinHandle<io::Result<Vec<u8>>>;

fn spawn_reader<R>(pipe: Option<R>) -> Reader
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn join_reader(reader: Reader) -> Result<Vec<u8>, RunError> {
    reader
        .join()
        .map_err(|_| RunError::Output(io::Error::new(io::ErrorKind::Other, "reader panicked")))?
        .map_err(RunError::Output)
}
