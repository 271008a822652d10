use crate::{EnvironmentVariables, StepId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
  /// Fetch the project sources into the working directory
  Checkout,
  #[default]
  Run,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Command {
  pub id: StepId,
  pub name: String,
  pub kind: CommandKind,
  pub run: String,
  pub environments: EnvironmentVariables,
  pub working_directory: Option<String>,
  pub timeout: Duration,
}

impl Command {
  pub fn is_checkout(&self) -> bool {
    self.kind == CommandKind::Checkout
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
  pub id: StepId,
  pub command: Command,
}
