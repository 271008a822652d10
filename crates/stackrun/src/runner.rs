use crate::{stream::StreamReceiver, Context, WorkflowLogType};
pub use tokio_stream::{Stream, StreamExt};

#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
  Succeeded,
  Failed { exit_code: i32 },
  Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Log {
  pub log_type: WorkflowLogType,
  pub message: String,
}

impl Log {
  pub fn log(message: impl Into<String>) -> Self {
    Self {
      log_type: WorkflowLogType::Log,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      log_type: WorkflowLogType::Error,
      message: message.into(),
    }
  }

  pub fn is_error(&self) -> bool {
    self.log_type == WorkflowLogType::Error
  }
}

pub type RunResponse = crate::Result<StreamReceiver>;

/// # Runner
/// Executes a single step. `run` should only schedule the work and hand back
/// a `StreamReceiver`; the step itself runs on a separate task and reports its
/// logs and final `RunResult` through the paired `StreamSender`.
///
/// ## Example
///
/// ```rust
/// struct Runner;
///
/// #[stackrun::async_trait]
/// impl stackrun::Runner for Runner {
///   async fn run(&self, ctx: stackrun::Context) -> stackrun::RunResponse {
///     let (tx, rx) = stackrun::stream();
///
///     tokio::task::spawn(async move {
///       tx.log(ctx.command.run);
///       tx.end(stackrun::RunResult::Succeeded);
///     });
///
///     Ok(rx)
///   }
/// }
/// ```
#[async_trait::async_trait]
pub trait Runner: Send + Sync {
  async fn run(&self, ctx: Context) -> RunResponse;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_log() {
    let log = Log::log("test");
    assert_eq!(log.log_type, WorkflowLogType::Log);
    assert_eq!(log.message, "test");
    assert!(!log.is_error());

    let log = Log::error("test");
    assert_eq!(log.log_type, WorkflowLogType::Error);
    assert!(log.is_error());
  }
}
