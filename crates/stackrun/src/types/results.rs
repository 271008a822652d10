use crate::{JobId, StepId, WorkflowId, WorkflowState};
use serde::{Deserialize, Serialize};

pub type Time = chrono::DateTime<chrono::Utc>;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StepRunResult {
  pub id: StepId,
  pub state: WorkflowState,
  pub exit_code: Option<i32>,
  pub started_at: Option<Time>,
  pub completed_at: Option<Time>,
}

impl StepRunResult {
  pub fn skipped(id: StepId) -> Self {
    StepRunResult {
      id,
      state: WorkflowState::Skipped,
      exit_code: None,
      started_at: None,
      completed_at: None,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JobRunResult {
  pub id: JobId,
  pub state: WorkflowState,
  pub started_at: Option<Time>,
  pub completed_at: Option<Time>,
  pub steps: Vec<StepRunResult>,
}

impl JobRunResult {
  /// The step that halted the job, if any.
  pub fn failed_step(&self) -> Option<&StepRunResult> {
    self.steps.iter().find(|step| step.state.is_halting())
  }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WorkflowRunResult {
  pub id: WorkflowId,
  pub state: WorkflowState,
  pub started_at: Option<Time>,
  pub completed_at: Option<Time>,
  /// Job results in execution order
  pub jobs: Vec<(String, JobRunResult)>,
}

impl WorkflowRunResult {
  pub fn job(&self, key: &str) -> Option<&JobRunResult> {
    self
      .jobs
      .iter()
      .find(|(job_key, _)| job_key == key)
      .map(|(_, job)| job)
  }

  pub fn exit_code(&self) -> i32 {
    if self.state == WorkflowState::Succeeded {
      return 0;
    }

    self
      .jobs
      .iter()
      .find_map(|(_, job)| job.failed_step())
      .and_then(|step| step.exit_code)
      .filter(|code| *code != 0)
      .unwrap_or(1)
  }
}
