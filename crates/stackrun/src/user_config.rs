use crate::{EnvironmentVariables, Error, OrderedMap, Result};
use serde::{
  de::{self, MapAccess, Visitor},
  ser::SerializeMap,
  Deserialize, Deserializer, Serialize, Serializer,
};
use std::fmt;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Machine {
  pub image: String,
  #[serde(default)]
  pub docker_layer_caching: bool,
}

pub const DEFAULT_MACHINE_IMAGE: &str = "default";

/// `machine: true`, `machine: false` or a machine description.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum UserMachine {
  Enabled(bool),
  Options(Machine),
}

impl UserMachine {
  pub fn machine(&self) -> Option<Machine> {
    match self {
      UserMachine::Enabled(true) => Some(Machine {
        image: DEFAULT_MACHINE_IMAGE.to_string(),
        docker_layer_caching: false,
      }),
      UserMachine::Enabled(false) => None,
      UserMachine::Options(machine) => Some(machine.clone()),
    }
  }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct UserRunOptions {
  pub name: Option<String>,
  #[serde(default)]
  pub command: String,
  pub environment: Option<EnvironmentVariables>,
  pub working_directory: Option<String>,
  pub timeout: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum UserRun {
  Command(String),
  Options(UserRunOptions),
}

impl UserRun {
  pub fn options(&self) -> UserRunOptions {
    match self {
      UserRun::Command(command) => UserRunOptions {
        command: command.clone(),
        ..Default::default()
      },
      UserRun::Options(options) => options.clone(),
    }
  }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum UserStep {
  /// Built-in steps such as `checkout`
  Builtin(String),
  Run { run: UserRun },
}

pub const CHECKOUT_STEP: &str = "checkout";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UserJob {
  pub machine: Option<UserMachine>,
  /// Relative to the runner's working directory
  pub working_directory: Option<String>,
  pub environment: Option<EnvironmentVariables>,
  #[serde(default)]
  pub steps: Vec<UserStep>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct UserWorkflowJobOptions {
  #[serde(default)]
  pub requires: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum UserWorkflowJob {
  Name(String),
  Options(OrderedMap<UserWorkflowJobOptions>),
}

impl UserWorkflowJob {
  fn resolve(&self, workflow: &str) -> Result<(String, Vec<String>)> {
    match self {
      UserWorkflowJob::Name(name) => Ok((name.clone(), vec![])),
      UserWorkflowJob::Options(options) if options.len() == 1 => {
        let (name, options) = options
          .iter()
          .next()
          .ok_or_else(|| Error::config_error("Empty job entry"))?;
        Ok((name.to_string(), options.requires.clone()))
      }
      UserWorkflowJob::Options(_) => Err(Error::config_error(format!(
        "Each job entry in workflow `{}` must name exactly one job",
        workflow
      ))),
    }
  }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UserWorkflow {
  #[serde(default)]
  pub jobs: Vec<UserWorkflowJob>,
}

/// The `workflows` section. A `version` key may sit next to the workflows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserWorkflows {
  pub version: Option<serde_yaml::Value>,
  pub workflows: OrderedMap<UserWorkflow>,
}

impl UserWorkflows {
  pub fn is_empty(&self) -> bool {
    self.workflows.is_empty()
  }

  pub fn get(&self, name: &str) -> Option<&UserWorkflow> {
    self.workflows.get(name)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.workflows.keys()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &UserWorkflow)> {
    self.workflows.iter()
  }
}

impl Serialize for UserWorkflows {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let len = self.workflows.len() + usize::from(self.version.is_some());
    let mut map = serializer.serialize_map(Some(len))?;
    if let Some(version) = &self.version {
      map.serialize_entry("version", version)?;
    }
    for (name, workflow) in self.workflows.iter() {
      map.serialize_entry(name, workflow)?;
    }
    map.end()
  }
}

struct UserWorkflowsVisitor;

impl<'de> Visitor<'de> for UserWorkflowsVisitor {
  type Value = UserWorkflows;

  fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    formatter.write_str("a mapping of workflows")
  }

  fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
    Ok(UserWorkflows::default())
  }

  fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
    Ok(UserWorkflows::default())
  }

  fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
    let mut workflows = UserWorkflows::default();

    while let Some(key) = access.next_key::<String>()? {
      if key == "version" {
        if workflows.version.is_some() {
          return Err(de::Error::custom("duplicate key `version`"));
        }
        workflows.version = Some(access.next_value()?);
        continue;
      }

      let workflow = access.next_value::<UserWorkflow>()?;
      if workflows.workflows.insert(key.clone(), workflow).is_err() {
        return Err(de::Error::custom(format!("duplicate key `{}`", key)));
      }
    }

    Ok(workflows)
  }
}

impl<'de> Deserialize<'de> for UserWorkflows {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
    deserializer.deserialize_any(UserWorkflowsVisitor)
  }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UserConfig {
  pub version: Option<serde_yaml::Value>,
  #[serde(default)]
  pub jobs: OrderedMap<UserJob>,
  pub workflows: Option<UserWorkflows>,
}

pub const DEFAULT_WORKFLOW: &str = "default";

pub(crate) fn parse_timeout(timeout: &str) -> Result<std::time::Duration> {
  humantime::parse_duration(timeout).map_err(|err| {
    log::error!("Invalid timeout format: {}", err);
    Error::config_error("Invalid timeout format. The format should like `60m` or `1h`.")
  })
}

impl UserConfig {
  fn validate(config: &UserConfig) -> Result<()> {
    if config.jobs.is_empty() {
      return Err(Error::config_error("Config must have at least one job"));
    }

    for (job_name, job) in config.jobs.iter() {
      if job.steps.is_empty() {
        return Err(Error::config_error(format!(
          "Job `{}` must have at least one step",
          job_name
        )));
      }

      for (idx, step) in job.steps.iter().enumerate() {
        match step {
          UserStep::Builtin(name) if name == CHECKOUT_STEP => {}
          UserStep::Builtin(name) => {
            return Err(Error::unsupported_feature(format!(
              "Step `{}` in job `{}` is not supported",
              name, job_name
            )));
          }
          UserStep::Run { run } => {
            let options = run.options();
            if options.command.trim().is_empty() {
              return Err(Error::config_error(format!(
                "Step {} of job `{}` has an empty command",
                idx, job_name
              )));
            }

            if let Some(timeout) = &options.timeout {
              parse_timeout(timeout)?;
            }
          }
        }
      }
    }

    if let Some(workflows) = &config.workflows {
      for name in workflows.keys() {
        config.workflow_jobs(Some(name))?;
      }
    }

    Ok(())
  }

  /// Jobs of a workflow in execution order. `None` picks the first declared
  /// workflow, or an implicit `default` workflow running every job.
  pub fn workflow_jobs(&self, workflow: Option<&str>) -> Result<(String, Vec<String>)> {
    let workflows = match &self.workflows {
      Some(workflows) if !workflows.is_empty() => workflows,
      _ => {
        return match workflow {
          Some(name) if name != DEFAULT_WORKFLOW => Err(Error::config_error(format!(
            "Workflow `{}` is not defined",
            name
          ))),
          _ => Ok((
            DEFAULT_WORKFLOW.to_string(),
            self.jobs.keys().map(|k| k.to_string()).collect(),
          )),
        };
      }
    };

    let (name, user_workflow) = match workflow {
      Some(name) => (
        name,
        workflows
          .get(name)
          .ok_or_else(|| Error::config_error(format!("Workflow `{}` is not defined", name)))?,
      ),
      None => workflows
        .iter()
        .next()
        .ok_or_else(|| Error::config_error("Config must have at least one workflow"))?,
    };

    if user_workflow.jobs.is_empty() {
      return Err(Error::config_error(format!(
        "Workflow `{}` must have at least one job",
        name
      )));
    }

    let mut jobs: Vec<String> = vec![];
    for entry in &user_workflow.jobs {
      let (job, requires) = entry.resolve(name)?;

      if !self.jobs.contains_key(&job) {
        return Err(Error::config_error(format!(
          "Workflow `{}` references job `{}`, but job `{}` is not defined",
          name, job, job
        )));
      }

      if jobs.contains(&job) {
        return Err(Error::config_error(format!(
          "Job `{}` is listed more than once in workflow `{}`",
          job, name
        )));
      }

      // Jobs run sequentially, so a requirement must already have run
      for required in &requires {
        if !jobs.contains(required) {
          return Err(Error::config_error(format!(
            "Job `{}` in workflow `{}` requires `{}`, which is not listed before it",
            job, name, required
          )));
        }
      }

      jobs.push(job);
    }

    Ok((name.to_string(), jobs))
  }

  pub fn to_yaml(&self) -> Result<String> {
    serde_yaml::to_string(self)
      .map_err(|e| Error::config_error(format!("Failed to serialize config: {}", e)))
  }
}

impl TryFrom<&str> for UserConfig {
  type Error = Error;

  fn try_from(value: &str) -> Result<Self> {
    let config = serde_yaml::from_str(value).map_err(|e| Error::config_error(e.to_string()))?;

    Self::validate(&config)?;

    Ok(config)
  }
}

impl TryFrom<String> for UserConfig {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> {
    Self::try_from(value.as_str())
  }
}
