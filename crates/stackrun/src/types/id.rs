use crate::Error;
use serde::{Deserialize, Serialize};

pub type Id = String;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Hash, Eq, Default)]
pub struct WorkflowId(Id);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Hash, Eq, Default)]
pub struct JobId(Id, Id);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Hash, Eq, Default)]
pub struct StepId(Id, Id, usize);

impl WorkflowId {
  pub fn new(id: impl Into<String>) -> Self {
    WorkflowId(id.into())
  }

  pub fn inner(&self) -> Id {
    self.0.clone()
  }
}

impl JobId {
  pub fn new(workflow_id: impl Into<String>, job_key: impl Into<String>) -> Self {
    JobId(workflow_id.into(), job_key.into())
  }

  pub fn workflow_id(&self) -> WorkflowId {
    WorkflowId(self.0.clone())
  }

  pub fn job_key(&self) -> Id {
    self.1.clone()
  }
}

impl StepId {
  pub fn new(workflow_id: impl Into<String>, job_key: impl Into<String>, number: usize) -> Self {
    StepId(workflow_id.into(), job_key.into(), number)
  }

  pub fn workflow_id(&self) -> WorkflowId {
    WorkflowId(self.0.clone())
  }

  pub fn job_id(&self) -> JobId {
    JobId(self.0.clone(), self.1.clone())
  }

  pub fn job_key(&self) -> Id {
    self.1.clone()
  }

  pub fn step_number(&self) -> usize {
    self.2
  }
}

impl std::fmt::Display for WorkflowId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl std::fmt::Display for JobId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.0, self.1)
  }
}

impl std::fmt::Display for StepId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}/{}", self.0, self.1, self.2)
  }
}

impl TryFrom<&str> for StepId {
  type Error = Error;

  fn try_from(value: &str) -> Result<Self, Self::Error> {
    let parts: Vec<&str> = value.split('/').collect();
    if parts.len() != 3 {
      Err(Error::internal_runtime_error(
        "StepId must be in the format of <workflow_id>/<job_key>/<step_number>",
      ))
    } else {
      let step_number = parts[2]
        .parse::<usize>()
        .map_err(|_| Error::internal_runtime_error("Step number must be a number"))?;
      Ok(StepId(
        parts[0].to_string(),
        parts[1].to_string(),
        step_number,
      ))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_step_id() {
    let step_id = StepId::new("workflow", "job", 1);
    assert_eq!(step_id.workflow_id(), WorkflowId::new("workflow"));
    assert_eq!(step_id.job_id(), JobId::new("workflow", "job"));
    assert_eq!(step_id.job_key(), "job".to_string());
    assert_eq!(step_id.step_number(), 1);
  }

  #[test]
  fn test_to_string() {
    assert_eq!(WorkflowId::new("test").to_string(), "test");
    assert_eq!(JobId::new("workflow", "job").to_string(), "workflow/job");
    assert_eq!(
      StepId::new("workflow", "job", 1).to_string(),
      "workflow/job/1"
    );
  }

  #[test]
  fn test_step_id_try_from() {
    let step_id = StepId::try_from("workflow/job/1").unwrap();
    assert_eq!(step_id, StepId::new("workflow", "job", 1));

    assert!(StepId::try_from("").is_err());
    assert!(StepId::try_from("workflow/job").is_err());
    assert!(StepId::try_from("workflow/job/x").is_err());
  }
}
