mod builder;

pub use self::builder::ExecutionContextBuilder;
use crate::{
  Command, Context, JobRunResult, PluginManager, RunResult, Runner, StepRunResult, StreamExt,
  WorkflowLog, WorkflowLogType, WorkflowRunResult, WorkflowState, WorkflowStateEvent,
  TIMEOUT_EXIT_CODE,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct ExecutionContext {
  runner: Arc<Box<dyn Runner>>,
  plugin_manager: PluginManager,
}

impl ExecutionContext {
  pub fn builder() -> ExecutionContextBuilder {
    ExecutionContextBuilder::new()
  }

  pub async fn run(&self, command: Command) -> StepRunResult {
    let step_id = command.id.clone();
    let timeout = command.timeout;

    let started_at = chrono::Utc::now();
    self.on_state_change(WorkflowStateEvent::StepStateUpdated {
      id: step_id.clone(),
      state: WorkflowState::InProgress,
    });

    let mut receiver = match self
      .runner
      .run(Context {
        id: step_id.clone(),
        command,
      })
      .await
    {
      Ok(receiver) => receiver,
      Err(err) => {
        let completed_at = chrono::Utc::now();
        log::error!("Step {} failed to start: {}", step_id, err);

        self.on_log(WorkflowLog {
          step_id: step_id.clone(),
          log_type: WorkflowLogType::Error,
          message: err.to_string(),
          time: completed_at,
        });

        return self.complete_step(StepRunResult {
          id: step_id,
          state: WorkflowState::Failed,
          exit_code: Some(1),
          started_at: Some(started_at),
          completed_at: Some(completed_at),
        });
      }
    };

    let consume = async {
      while let Some(log) = receiver.next().await {
        self.on_log(WorkflowLog {
          step_id: step_id.clone(),
          log_type: log.log_type,
          message: log.message,
          time: chrono::Utc::now(),
        });
      }
    };

    let outcome = tokio::time::timeout(timeout, consume).await;
    let result = match outcome {
      Ok(()) => receiver.result(),
      Err(_) => {
        self.on_log(WorkflowLog {
          step_id: step_id.clone(),
          log_type: WorkflowLogType::Error,
          message: format!("Step timed out after {}", humantime::format_duration(timeout)),
          time: chrono::Utc::now(),
        });

        Some(RunResult::Failed {
          exit_code: TIMEOUT_EXIT_CODE,
        })
      }
    };

    let completed_at = chrono::Utc::now();
    let duration = completed_at - started_at;

    let (state, exit_code) = match result {
      Some(RunResult::Succeeded) => (WorkflowState::Succeeded, Some(0)),
      Some(RunResult::Failed { exit_code }) => (WorkflowState::Failed, Some(exit_code)),
      Some(RunResult::Cancelled) => (WorkflowState::Cancelled, None),
      None => {
        log::error!("Runner ended step {} without a result", step_id);
        (WorkflowState::Failed, Some(1))
      }
    };

    log::info!(
      "Step {} finished with state {:?} in {} seconds",
      step_id,
      state,
      duration.num_seconds()
    );

    self.complete_step(StepRunResult {
      id: step_id,
      state,
      exit_code,
      started_at: Some(started_at),
      completed_at: Some(completed_at),
    })
  }

  fn complete_step(&self, result: StepRunResult) -> StepRunResult {
    self.on_state_change(WorkflowStateEvent::StepStateUpdated {
      id: result.id.clone(),
      state: result.state.clone(),
    });
    self.on_step_completed(result.clone());

    result
  }

  pub fn on_state_change(&self, event: WorkflowStateEvent) {
    self.plugin_manager.on_state_change(event);
  }

  pub fn on_log(&self, log: WorkflowLog) {
    self.plugin_manager.on_log(log);
  }

  pub fn on_step_completed(&self, result: StepRunResult) {
    self.plugin_manager.on_step_completed(result);
  }

  pub fn on_job_completed(&self, result: JobRunResult) {
    self.plugin_manager.on_job_completed(result);
  }

  pub fn on_workflow_completed(&self, result: WorkflowRunResult) {
    self.plugin_manager.on_workflow_completed(result);
  }
}
