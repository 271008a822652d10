use parking_lot::Mutex;
use stackrun::{
  compose::{ComposeFile, ProjectOptions},
  PluginBuilder, StackRun, Workflow, WorkflowRunResult, WorkflowState, TIMEOUT_EXIT_CODE,
};
use stackrun_runner::{ComposeEngine, StackRunner};
use std::sync::Arc;
use tempfile::TempDir;

fn workspace() -> TempDir {
  tempfile::tempdir().unwrap()
}

async fn run(config: &str, runner: StackRunner) -> (WorkflowRunResult, Vec<String>) {
  let logs = Arc::new(Mutex::new(vec![]));
  let collected = logs.clone();

  let stackrun = StackRun::builder()
    .runner(runner)
    .plugin(
      PluginBuilder::new("collect-logs")
        .on_log(move |log| collected.lock().push(log.message))
        .build(),
    )
    .build()
    .unwrap();

  let workflow = Workflow::builder().config(config).build().unwrap();
  let result = workflow.run(stackrun.execution_context().unwrap()).await;

  let logs = logs.lock().clone();
  (result, logs)
}

#[stackrun_test::test]
async fn test_pipeline_on_host() {
  let tmp = workspace();
  let dir = tmp.path();
  std::fs::write(dir.join("manage.py"), "").unwrap();

  let config = r#"
jobs:
  build:
    steps:
      - checkout
      - run:
          name: Create empty env file
          command: touch .env
      - run:
          name: Tests
          environment:
            DB_HOST: db
          command: |
            test -f .env
            echo "tests against $DB_HOST"
"#;

  let runner = StackRunner::builder().working_directory(dir).build().unwrap();
  let (result, logs) = run(config, runner).await;

  assert_eq!(result.state, WorkflowState::Succeeded);
  assert_eq!(result.exit_code(), 0);
  assert!(dir.join(".env").exists());
  assert!(logs.contains(&"tests against db".to_string()));
}

#[stackrun_test::test]
async fn test_failing_step_skips_the_rest() {
  let tmp = workspace();
  let dir = tmp.path();

  let config = r#"
jobs:
  build:
    steps:
      - run: echo "3 tests failed" && exit 3
      - run: echo lint
"#;

  let runner = StackRunner::builder().working_directory(dir).build().unwrap();
  let (result, logs) = run(config, runner).await;

  assert_eq!(result.exit_code(), 3);

  let job = result.job("build").unwrap();
  assert_eq!(job.steps[0].state, WorkflowState::Failed);
  assert_eq!(job.steps[1].state, WorkflowState::Skipped);
  assert!(!logs.contains(&"lint".to_string()));
}

#[stackrun_test::test]
async fn test_checkout_without_repository() {
  let tmp = workspace();
  let dir = tmp.path();

  let config = r#"
jobs:
  build:
    steps:
      - checkout
      - run: echo never
"#;

  let runner = StackRunner::builder().working_directory(dir).build().unwrap();
  let (result, logs) = run(config, runner).await;

  assert_eq!(result.state, WorkflowState::Failed);
  assert_eq!(result.exit_code(), 1);
  assert!(logs.contains(&"No repository configured to check out".to_string()));
}

#[stackrun_test::test]
async fn test_step_working_directory() {
  let tmp = workspace();
  let dir = tmp.path();

  let config = r#"
jobs:
  build:
    working_directory: project
    steps:
      - run: pwd
"#;

  let runner = StackRunner::builder().working_directory(dir).build().unwrap();
  let (result, logs) = run(config, runner).await;

  assert_eq!(result.state, WorkflowState::Succeeded);
  assert!(dir.join("project").is_dir());
  assert!(logs[0].ends_with("project"));
}

#[stackrun_test::test]
async fn test_step_timeout() {
  let tmp = workspace();
  let dir = tmp.path();

  let config = r#"
jobs:
  build:
    steps:
      - run:
          command: sleep 5
          timeout: 300ms
"#;

  let runner = StackRunner::builder().working_directory(dir).build().unwrap();
  let (result, _) = run(config, runner).await;

  assert_eq!(result.exit_code(), TIMEOUT_EXIT_CODE);
}

#[stackrun_test::test(docker)]
async fn test_compose_run() {
  let tmp = workspace();
  let dir = tmp.path();
  let compose = ComposeFile::try_from(
    r#"
services:
  cache:
    image: alpine:3
    command: sleep 30
  app:
    image: alpine:3
    command: sh -c "test -n \"$GREETING\" && echo $GREETING"
    environment:
      - GREETING=hello
    depends_on:
      - cache
"#,
  )
  .unwrap();

  let project = ProjectOptions::new(dir).name("stackruntest");
  let engine = ComposeEngine::new();

  let run = compose.plan_run(&project, "app", None).unwrap();
  let result = engine.execute(&run).await;

  let down = compose.plan_down(&project, true).unwrap();
  engine.execute(&down).await.unwrap();

  result.unwrap();
}
