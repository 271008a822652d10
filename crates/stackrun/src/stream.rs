use super::{Log, RunResult};
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc, task::Waker};
use tokio_stream::Stream;

/// Exit code reported for steps killed after their timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 123;

#[derive(Default)]
struct SharedState {
  /// Logs not yet taken by the receiver
  logs: VecDeque<Log>,
  result: Option<RunResult>,
  waker: Option<Waker>,
}

impl SharedState {
  fn wake(&mut self) {
    if let Some(waker) = self.waker.take() {
      waker.wake();
    }
  }
}

pub struct StreamReceiver {
  state: Arc<Mutex<SharedState>>,
}

impl StreamReceiver {
  pub fn result(&self) -> Option<RunResult> {
    self.state.lock().result.clone()
  }
}

impl Stream for StreamReceiver {
  type Item = Log;

  fn poll_next(
    self: std::pin::Pin<&mut Self>,
    cx: &mut std::task::Context<'_>,
  ) -> std::task::Poll<Option<Self::Item>> {
    let mut state = self.state.lock();

    if let Some(log) = state.logs.pop_front() {
      return std::task::Poll::Ready(Some(log));
    }

    if state.result.is_some() {
      return std::task::Poll::Ready(None);
    }

    state.waker = Some(cx.waker().clone());

    std::task::Poll::Pending
  }
}

#[derive(Clone)]
pub struct StreamSender {
  state: Arc<Mutex<SharedState>>,
}

impl StreamSender {
  fn push(&self, log: Log) {
    let mut state = self.state.lock();
    if state.result.is_some() {
      log::trace!("Dropping log after the stream ended: {}", log.message);
      return;
    }

    state.logs.push_back(log);
    state.wake();
  }

  pub fn log(&self, message: impl Into<String>) {
    self.push(Log::log(message))
  }

  pub fn error(&self, message: impl Into<String>) {
    self.push(Log::error(message))
  }

  pub fn succeeded(&self) {
    self.end(RunResult::Succeeded)
  }

  pub fn cancelled(&self) {
    self.end(RunResult::Cancelled)
  }

  pub fn failed(&self, exit_code: i32) {
    self.end(RunResult::Failed { exit_code })
  }

  pub fn timeout(&self) {
    self.end(RunResult::Failed {
      exit_code: TIMEOUT_EXIT_CODE,
    })
  }

  /// Only the first result is kept.
  pub fn end(&self, result: RunResult) {
    let mut state = self.state.lock();
    if state.result.is_none() {
      state.result = Some(result);
    }

    state.wake();
  }

  pub fn is_ended(&self) -> bool {
    self.state.lock().result.is_some()
  }
}

pub fn stream() -> (StreamSender, StreamReceiver) {
  let state = Arc::new(Mutex::new(SharedState::default()));

  let sender = StreamSender {
    state: state.clone(),
  };
  let receiver = StreamReceiver { state };

  (sender, receiver)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio_stream::StreamExt;

  #[tokio::test]
  async fn test_stream() {
    let (sender, mut receiver) = stream();

    sender.log("test");
    sender.error("error");
    sender.succeeded();

    let mut logs = Vec::new();
    while let Some(log) = receiver.next().await {
      logs.push(log);
    }

    assert_eq!(logs, vec![Log::log("test"), Log::error("error")]);
    assert_eq!(receiver.result().unwrap(), RunResult::Succeeded);
  }

  #[tokio::test]
  async fn test_stream_from_task() {
    let (sender, mut receiver) = stream();

    tokio::spawn(async move {
      for i in 0..3 {
        sender.log(format!("line {}", i));
        tokio::task::yield_now().await;
      }
      sender.failed(2);
      sender.log("ignored");
    });

    let mut logs = Vec::new();
    while let Some(log) = receiver.next().await {
      logs.push(log.message);
    }

    assert_eq!(logs, vec!["line 0", "line 1", "line 2"]);
    assert_eq!(
      receiver.result().unwrap(),
      RunResult::Failed { exit_code: 2 }
    );
  }

  #[tokio::test]
  async fn test_consumed_logs_are_released() {
    let (sender, mut receiver) = stream();

    for i in 0..1000 {
      sender.log(format!("line {}", i));
    }
    assert_eq!(receiver.state.lock().logs.len(), 1000);

    for i in 0..1000 {
      let log = receiver.next().await.unwrap();
      assert_eq!(log.message, format!("line {}", i));
    }
    assert!(receiver.state.lock().logs.is_empty());

    sender.log("tail");
    sender.succeeded();

    assert_eq!(receiver.next().await.unwrap().message, "tail");
    assert!(receiver.next().await.is_none());
    assert!(receiver.state.lock().logs.is_empty());
  }

  #[test]
  fn test_first_result_wins() {
    let (sender, receiver) = stream();

    sender.timeout();
    sender.succeeded();

    assert!(sender.is_ended());
    assert_eq!(
      receiver.result().unwrap(),
      RunResult::Failed {
        exit_code: TIMEOUT_EXIT_CODE
      }
    );
  }
}
