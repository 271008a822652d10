use crate::{Command, CommandKind, EnvironmentVariables, StepId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Step {
  pub id: StepId,
  pub name: String,
  pub kind: CommandKind,
  pub run: String,
  pub environments: EnvironmentVariables,
  pub working_directory: Option<String>,
  pub timeout: Duration,
}

impl From<Step> for Command {
  fn from(val: Step) -> Self {
    Command {
      id: val.id,
      name: val.name,
      kind: val.kind,
      run: val.run,
      environments: val.environments,
      working_directory: val.working_directory,
      timeout: val.timeout,
    }
  }
}
