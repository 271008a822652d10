use crate::executors::{Executor, HostExecutor};
use stackrun::{stream, Context, Error, Result, RunResponse, RunResult, Runner};
use std::{path::PathBuf, sync::Arc};

/// Runs pipeline steps on the host, each in a fresh shell.
pub struct StackRunner {
  executor: Arc<dyn Executor>,
}

impl StackRunner {
  pub fn builder() -> StackRunnerBuilder {
    StackRunnerBuilder::new()
  }
}

#[async_trait::async_trait]
impl Runner for StackRunner {
  async fn run(&self, ctx: Context) -> RunResponse {
    let (sender, receiver) = stream();
    let executor = self.executor.clone();

    tokio::spawn(async move {
      if let Err(err) = executor.execute(ctx, sender.clone()).await {
        log::error!("StackRunner: execute error: {}", err);
        sender.error(err.to_string());
      }

      if !sender.is_ended() {
        sender.end(RunResult::Failed { exit_code: 1 });
      }
    });

    Ok(receiver)
  }
}

#[derive(Default)]
pub struct StackRunnerBuilder {
  working_directory: Option<PathBuf>,
  repository: Option<String>,
}

impl StackRunnerBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Root for step working directories. Defaults to the current directory.
  pub fn working_directory(mut self, working_directory: impl Into<PathBuf>) -> Self {
    self.working_directory = Some(working_directory.into());
    self
  }

  /// Repository cloned by `checkout` steps into an empty working directory.
  pub fn repository(mut self, repository: impl Into<String>) -> Self {
    self.repository = Some(repository.into());
    self
  }

  pub fn build(self) -> Result<StackRunner> {
    let working_directory = match self.working_directory {
      Some(dir) => dir,
      None => std::env::current_dir().map_err(|err| {
        Error::init_error(format!("StackRunnerBuilder: working_directory is required: {}", err))
      })?,
    };

    Ok(StackRunner {
      executor: Arc::new(HostExecutor {
        working_directory,
        repository: self.repository,
      }),
    })
  }
}
