use super::{job::Job, Step, Workflow};
use crate::{
  user_config::parse_timeout, CommandKind, Id, JobId, Result, StepId, UserConfig, UserMachine,
  UserStep, WorkflowId, CHECKOUT_STEP,
};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

pub struct WorkflowParser {
  pub id: Id,
  pub config: UserConfig,
  pub workflow: Option<String>,
}

impl WorkflowParser {
  pub fn parse(self) -> Result<Workflow> {
    let id = self.id;
    let (name, job_keys) = self.config.workflow_jobs(self.workflow.as_deref())?;

    let mut jobs = Vec::new();
    for key in job_keys {
      let Some(user_job) = self.config.jobs.get(&key) else {
        continue;
      };

      let job_environments = user_job.environment.clone().unwrap_or_default();

      let mut steps = Vec::new();
      for (idx, user_step) in user_job.steps.iter().enumerate() {
        let step_id = StepId::new(id.clone(), key.clone(), idx);

        let step = match user_step {
          UserStep::Builtin(builtin) if builtin == CHECKOUT_STEP => Step {
            id: step_id,
            name: "Checkout code".to_string(),
            kind: CommandKind::Checkout,
            environments: job_environments.clone(),
            working_directory: user_job.working_directory.clone(),
            timeout: DEFAULT_TIMEOUT,
            ..Default::default()
          },
          UserStep::Builtin(builtin) => {
            return Err(crate::Error::unsupported_feature(format!(
              "Step `{}` in job `{}` is not supported",
              builtin, key
            )));
          }
          UserStep::Run { run } => {
            let options = run.options();

            let timeout = match &options.timeout {
              Some(timeout) => parse_timeout(timeout)?,
              None => DEFAULT_TIMEOUT,
            };

            let mut environments = job_environments.clone();
            environments.extend(options.environment.unwrap_or_default());

            let name = options.name.unwrap_or_else(|| {
              options
                .command
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or_default()
                .to_string()
            });

            Step {
              id: step_id,
              name,
              kind: CommandKind::Run,
              run: options.command,
              environments,
              working_directory: options
                .working_directory
                .or_else(|| user_job.working_directory.clone()),
              timeout,
            }
          }
        };

        steps.push(step);
      }

      jobs.push(Job {
        id: JobId::new(id.clone(), key.clone()),
        machine: user_job.machine.as_ref().and_then(UserMachine::machine),
        steps,
      });
    }

    Ok(Workflow {
      id: WorkflowId::new(id),
      name,
      jobs,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{EnvironmentVariable, Error};

  fn parse(yaml: &str, workflow: Option<&str>) -> Result<Workflow> {
    let config = UserConfig::try_from(yaml)?;

    WorkflowParser {
      id: "test-id".to_string(),
      config,
      workflow: workflow.map(|w| w.to_string()),
    }
    .parse()
  }

  #[test]
  fn test_parse() {
    let yaml = r#"
jobs:
  test-job:
    working_directory: project
    environment:
      STAGE: ci
      LEVEL: 1
    steps:
      - checkout
      - run:
          name: Test Step
          timeout: 10m
          environment:
            LEVEL: 2
          command: echo "Hello World"
      - run: |
          make lint
          make test
"#;

    let workflow = parse(yaml, None).unwrap();

    assert_eq!(workflow.id, WorkflowId::new("test-id"));
    assert_eq!(workflow.name, "default");
    assert_eq!(workflow.jobs.len(), 1);

    let job = &workflow.jobs[0];
    assert_eq!(job.id, JobId::new("test-id", "test-job"));
    assert_eq!(job.steps.len(), 3);

    let checkout = &job.steps[0];
    assert_eq!(checkout.name, "Checkout code");
    assert_eq!(checkout.kind, CommandKind::Checkout);
    assert_eq!(checkout.working_directory.as_deref(), Some("project"));

    let step = &job.steps[1];
    assert_eq!(step.id, StepId::new("test-id", "test-job", 1));
    assert_eq!(step.name, "Test Step");
    assert_eq!(step.timeout, Duration::from_secs(600));
    assert_eq!(step.run, "echo \"Hello World\"");
    assert_eq!(
      step.environments.get("STAGE").unwrap(),
      &EnvironmentVariable::String("ci".to_string())
    );
    assert_eq!(
      step.environments.get("LEVEL").unwrap(),
      &EnvironmentVariable::Number(2.0)
    );

    let step = &job.steps[2];
    assert_eq!(step.name, "make lint");
    assert_eq!(step.timeout, DEFAULT_TIMEOUT);
    assert_eq!(
      step.environments.get("LEVEL").unwrap(),
      &EnvironmentVariable::Number(1.0)
    );
  }

  #[test]
  fn test_workflow_order() {
    let yaml = r#"
jobs:
  deploy:
    steps:
      - run: make deploy
  build:
    steps:
      - run: make
workflows:
  release:
    jobs:
      - build
      - deploy:
          requires: [build]
"#;

    let workflow = parse(yaml, Some("release")).unwrap();
    let keys: Vec<String> = workflow.jobs.iter().map(|job| job.id.job_key()).collect();

    assert_eq!(workflow.name, "release");
    assert_eq!(keys, vec!["build", "deploy"]);

    assert_eq!(
      parse(yaml, Some("nightly")).unwrap_err(),
      Error::config_error("Workflow `nightly` is not defined")
    );
  }
}
