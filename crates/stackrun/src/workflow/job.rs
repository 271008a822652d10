use super::Step;
use crate::{
  ExecutionContext, JobId, JobRunResult, Machine, StepRunResult, WorkflowState,
  WorkflowStateEvent,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Job {
  pub id: JobId,
  pub machine: Option<Machine>,
  pub steps: Vec<Step>,
}

impl Job {
  pub async fn run(&self, ctx: ExecutionContext) -> JobRunResult {
    let started_at = chrono::Utc::now();
    let mut job_state = WorkflowState::InProgress;

    ctx.on_state_change(WorkflowStateEvent::JobStateUpdated {
      id: self.id.clone(),
      state: job_state.clone(),
    });

    let mut steps = Vec::new();

    for step in self.steps.iter().cloned() {
      if job_state.is_halting() {
        log::trace!("Step {} is skipped", step.id);

        ctx.on_state_change(WorkflowStateEvent::StepStateUpdated {
          id: step.id.clone(),
          state: WorkflowState::Skipped,
        });

        steps.push(StepRunResult::skipped(step.id));
        continue;
      }

      let result = ctx.run(step.into()).await;

      if result.state.is_halting() {
        job_state = result.state.clone();
      }

      steps.push(result);
    }

    if job_state.is_in_progress() {
      job_state = WorkflowState::Succeeded;
    }

    ctx.on_state_change(WorkflowStateEvent::JobStateUpdated {
      id: self.id.clone(),
      state: job_state.clone(),
    });

    let result = JobRunResult {
      id: self.id.clone(),
      state: job_state,
      started_at: Some(started_at),
      completed_at: Some(chrono::Utc::now()),
      steps,
    };

    ctx.on_job_completed(result.clone());

    result
  }

  /// Marks the job and all of its steps as skipped without running anything.
  pub fn skip(&self, ctx: &ExecutionContext) -> JobRunResult {
    log::trace!("Job {} is skipped", self.id);

    let steps = self
      .steps
      .iter()
      .map(|step| {
        ctx.on_state_change(WorkflowStateEvent::StepStateUpdated {
          id: step.id.clone(),
          state: WorkflowState::Skipped,
        });

        StepRunResult::skipped(step.id.clone())
      })
      .collect();

    ctx.on_state_change(WorkflowStateEvent::JobStateUpdated {
      id: self.id.clone(),
      state: WorkflowState::Skipped,
    });

    let result = JobRunResult {
      id: self.id.clone(),
      state: WorkflowState::Skipped,
      started_at: None,
      completed_at: None,
      steps,
    };

    ctx.on_job_completed(result.clone());

    result
  }
}
