mod builder;
mod job;
mod parser;
mod step;

pub use builder::WorkflowBuilder;
pub use job::Job;
pub use step::Step;

use crate::{ExecutionContext, WorkflowId, WorkflowRunResult, WorkflowState, WorkflowStateEvent};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Workflow {
  pub id: WorkflowId,
  pub name: String,
  /// Jobs in execution order
  pub jobs: Vec<Job>,
}

impl Workflow {
  pub fn builder() -> WorkflowBuilder {
    WorkflowBuilder::new()
  }

  /// Runs jobs one after another. Once a job fails, the rest are skipped.
  pub async fn run(&self, ctx: ExecutionContext) -> WorkflowRunResult {
    let started_at = chrono::Utc::now();
    let mut workflow_state = WorkflowState::InProgress;

    ctx.on_state_change(WorkflowStateEvent::WorkflowStateUpdated {
      id: self.id.clone(),
      state: workflow_state.clone(),
    });

    let mut jobs = Vec::new();
    for job in &self.jobs {
      let result = if workflow_state.is_halting() {
        job.skip(&ctx)
      } else {
        job.run(ctx.clone()).await
      };

      if result.state.is_halting() {
        workflow_state = result.state.clone();
      }

      jobs.push((job.id.job_key(), result));
    }

    if workflow_state.is_in_progress() {
      workflow_state = WorkflowState::Succeeded;
    }

    ctx.on_state_change(WorkflowStateEvent::WorkflowStateUpdated {
      id: self.id.clone(),
      state: workflow_state.clone(),
    });

    let result = WorkflowRunResult {
      id: self.id.clone(),
      state: workflow_state,
      started_at: Some(started_at),
      completed_at: Some(chrono::Utc::now()),
      jobs,
    };

    log::info!(
      "Workflow {} ({}) finished with state {:?}",
      self.name,
      self.id,
      result.state
    );

    ctx.on_workflow_completed(result.clone());

    result
  }
}
