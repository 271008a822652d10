use stackrun::{Error, Result, RunResult, StreamSender, TIMEOUT_EXIT_CODE};
use std::{
  path::{Path, PathBuf},
  process::Stdio,
  time::Duration,
};
use tokio::{
  io::{AsyncBufReadExt, BufReader},
  process::Command as Cmd,
};

/// A process to be executed by the runner.
#[derive(Debug, Clone)]
pub struct Command {
  pub program: String,
  pub args: Vec<String>,
  pub current_dir: Option<PathBuf>,
  pub envs: Vec<(String, String)>,
}

impl Command {
  /// Runs `script` through the platform shell.
  pub fn new(script: impl Into<String>) -> Self {
    if cfg!(target_os = "windows") {
      Self::program("powershell.exe")
        .arg("-NoProfile")
        .arg("-NonInteractive")
        .arg("-Command")
        .arg(script)
    } else {
      Self::program("sh").arg("-c").arg(script)
    }
  }

  /// Runs `program` directly, without a shell in between.
  pub fn program(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: vec![],
      current_dir: None,
      envs: vec![],
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.envs.push((key.into(), value.into()));
    self
  }

  pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.current_dir = Some(dir.as_ref().to_path_buf());
    self
  }

  /// Captures stdout. A non-zero exit is an error carrying stderr.
  pub async fn exec(&self) -> Result<String> {
    let output = self.build_command().output().await.map_err(|err| {
      Error::internal_runtime_error(format!("Failed to spawn `{}`: {}", self.program, err))
    })?;

    if output.status.success() {
      return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    Err(Error::internal_runtime_error(stderr))
  }

  /// Runs attached to the current terminal and returns the exit code.
  pub async fn status(&self) -> Result<i32> {
    let status = self
      .build_command()
      .stdin(Stdio::inherit())
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit())
      .status()
      .await
      .map_err(|err| {
        Error::internal_runtime_error(format!("Failed to spawn `{}`: {}", self.program, err))
      })?;

    Ok(status.code().unwrap_or(1))
  }

  /// Streams stdout and stderr lines into `sender` and ends the stream with
  /// the exit code. A process still running after `timeout` is killed.
  pub async fn run(&self, sender: StreamSender, timeout: Option<Duration>) -> Result<RunResult> {
    let mut child = self
      .build_command()
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|err| {
        Error::internal_runtime_error(format!("Failed to spawn `{}`: {}", self.program, err))
      })?;

    let out = child.stdout.take().ok_or_else(|| {
      Error::internal_runtime_error("Failed to get stdout from child process")
    })?;
    let err = child.stderr.take().ok_or_else(|| {
      Error::internal_runtime_error("Failed to get stderr from child process")
    })?;

    let mut lines = BufReader::new(out).lines();
    let mut errors = BufReader::new(err).lines();

    let wait = async {
      let mut stdout_closed = false;
      let mut stderr_closed = false;

      while !(stdout_closed && stderr_closed) {
        tokio::select! {
          line = lines.next_line(), if !stdout_closed => {
            match line {
              Ok(Some(line)) => sender.log(line),
              Ok(None) => stdout_closed = true,
              Err(err) => {
                sender.error(err.to_string());
                stdout_closed = true;
              }
            }
          }
          error = errors.next_line(), if !stderr_closed => {
            match error {
              Ok(Some(error)) => sender.error(error),
              Ok(None) => stderr_closed = true,
              Err(err) => {
                sender.error(err.to_string());
                stderr_closed = true;
              }
            }
          }
        }
      }

      child.wait().await
    };

    let status = match timeout {
      Some(timeout) => tokio::time::timeout(timeout, wait).await.ok(),
      None => Some(wait.await),
    };

    let result = match status {
      Some(status) => {
        let status = status.map_err(|err| {
          Error::internal_runtime_error(format!("Failed to wait for child process: {}", err))
        })?;

        match status.code() {
          Some(0) => RunResult::Succeeded,
          Some(exit_code) => RunResult::Failed { exit_code },
          None => RunResult::Failed { exit_code: 1 },
        }
      }
      None => {
        if let Err(err) = child.kill().await {
          log::error!("Failed to kill timed out process: {}", err);
        }
        sender.error(format!("Timed out after {:?}", timeout.unwrap_or_default()));

        RunResult::Failed {
          exit_code: TIMEOUT_EXIT_CODE,
        }
      }
    };

    sender.end(result.clone());

    Ok(result)
  }

  fn build_command(&self) -> Cmd {
    let mut command = Cmd::new(&self.program);
    command.args(&self.args);

    if let Some(dir) = &self.current_dir {
      command.current_dir(dir);
    }

    for (key, value) in &self.envs {
      command.env(key, value);
    }

    command
  }
}
