use stackrun::{
  stream, Context, Error, RunResult, Runner, StackRun, Workflow, WorkflowState, TIMEOUT_EXIT_CODE,
};
use std::time::Duration;

struct DelayRunner {
  delay: Duration,
}

#[stackrun::async_trait]
impl Runner for DelayRunner {
  async fn run(&self, _ctx: Context) -> stackrun::RunResponse {
    let (sender, receiver) = stream();
    let delay = self.delay;

    tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      sender.end(RunResult::Succeeded);
    });

    Ok(receiver)
  }
}

struct BrokenRunner;

#[stackrun::async_trait]
impl Runner for BrokenRunner {
  async fn run(&self, _ctx: Context) -> stackrun::RunResponse {
    Err(Error::internal_runtime_error("docker daemon is not running"))
  }
}

async fn run(config: &str, runner: impl Runner + 'static) -> stackrun::WorkflowRunResult {
  let stackrun = StackRun::builder().runner(runner).build().unwrap();
  let workflow = Workflow::builder().config(config).build().unwrap();

  workflow.run(stackrun.execution_context().unwrap()).await
}

#[stackrun_test::test]
async fn test_step_within_timeout() {
  let config = r#"
jobs:
  test:
    steps:
      - run:
          command: sleep
          timeout: 2s
"#;

  let result = run(
    config,
    DelayRunner {
      delay: Duration::from_millis(50),
    },
  )
  .await;

  assert_eq!(result.state, WorkflowState::Succeeded);
}

#[stackrun_test::test]
async fn test_step_timeout() {
  let config = r#"
jobs:
  test:
    steps:
      - run:
          command: sleep
          timeout: 100ms
      - run: echo after
"#;

  let result = run(
    config,
    DelayRunner {
      delay: Duration::from_secs(5),
    },
  )
  .await;

  assert_eq!(result.state, WorkflowState::Failed);
  assert_eq!(result.exit_code(), TIMEOUT_EXIT_CODE);

  let job = result.job("test").unwrap();
  assert_eq!(job.steps[0].exit_code, Some(TIMEOUT_EXIT_CODE));
  assert_eq!(job.steps[1].state, WorkflowState::Skipped);
}

#[stackrun_test::test]
async fn test_runner_start_failure() {
  let result = run("jobs:\n  test:\n    steps:\n      - run: make\n", BrokenRunner).await;

  let step = &result.job("test").unwrap().steps[0];
  assert_eq!(step.state, WorkflowState::Failed);
  assert_eq!(step.exit_code, Some(1));
  assert_eq!(result.exit_code(), 1);
}

#[test]
fn test_builder_requires_runner() {
  assert_eq!(
    StackRun::builder().build().err().unwrap(),
    Error::init_error("Runner is required")
  );
}
