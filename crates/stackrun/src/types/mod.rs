mod context;
mod envs;
mod error;
mod id;
mod ordered_map;
mod results;
mod workflow_state;
mod workflow_state_event;

pub use context::*;
pub use envs::*;
pub use error::*;
pub use id::*;
pub use ordered_map::*;
pub use results::*;
pub use workflow_state::*;
pub use workflow_state_event::*;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowLogType {
  Error,
  #[default]
  Log,
}

impl std::fmt::Display for WorkflowLogType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      WorkflowLogType::Error => write!(f, "error"),
      WorkflowLogType::Log => write!(f, "log"),
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct WorkflowLog {
  pub step_id: StepId,
  pub log_type: WorkflowLogType,
  pub message: String,
  pub time: chrono::DateTime<chrono::Utc>,
}

impl WorkflowLog {
  pub fn is_error(&self) -> bool {
    self.log_type == WorkflowLogType::Error
  }
}
