use super::{parser::WorkflowParser, Workflow};
use crate::{Error, Id, Result, UserConfig};

#[derive(Default)]
pub struct WorkflowBuilder {
  id: Option<Id>,
  config: Option<String>,
  workflow: Option<String>,
}

impl WorkflowBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn id(mut self, id: impl Into<Id>) -> Self {
    self.id = Some(id.into());
    self
  }

  pub fn config(mut self, config: impl Into<String>) -> Self {
    self.config = Some(config.into());
    self
  }

  /// Workflow to run. Defaults to the first declared one.
  pub fn workflow(mut self, workflow: impl Into<String>) -> Self {
    self.workflow = Some(workflow.into());
    self
  }

  pub fn build(self) -> Result<Workflow> {
    let config = self
      .config
      .ok_or_else(|| Error::init_error("Workflow config is required"))?;

    let config = UserConfig::try_from(config)?;
    let id = self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let parser = WorkflowParser {
      id,
      config,
      workflow: self.workflow,
    };

    parser.parse()
  }
}
