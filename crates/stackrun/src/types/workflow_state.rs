use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
  Pending,
  Queued,
  InProgress,
  Succeeded,
  Failed,
  Cancelled,
  Skipped,
}

impl WorkflowState {
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      WorkflowState::Succeeded
        | WorkflowState::Failed
        | WorkflowState::Cancelled
        | WorkflowState::Skipped
    )
  }

  pub fn is_in_progress(&self) -> bool {
    matches!(self, WorkflowState::InProgress)
  }

  /// Failed or cancelled, i.e. halts everything after it.
  pub fn is_halting(&self) -> bool {
    matches!(self, WorkflowState::Failed | WorkflowState::Cancelled)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_is_terminal() {
    assert!(!WorkflowState::Pending.is_terminal());
    assert!(!WorkflowState::Queued.is_terminal());
    assert!(!WorkflowState::InProgress.is_terminal());
    assert!(WorkflowState::Succeeded.is_terminal());
    assert!(WorkflowState::Failed.is_terminal());
    assert!(WorkflowState::Cancelled.is_terminal());
    assert!(WorkflowState::Skipped.is_terminal());
  }

  #[test]
  fn test_is_halting() {
    assert!(WorkflowState::Failed.is_halting());
    assert!(WorkflowState::Cancelled.is_halting());
    assert!(!WorkflowState::Skipped.is_halting());
    assert!(!WorkflowState::Succeeded.is_halting());
  }
}
