use super::{Environment, PortMapping, StartupCommand, VolumeMount};
use crate::{EnvironmentVariable, OrderedMap};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOptions {
  #[serde(default = "default_context")]
  pub context: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dockerfile: Option<String>,
  #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
  pub args: OrderedMap<EnvironmentVariable>,
}

fn default_context() -> String {
  ".".to_string()
}

/// `build: .` or `build: { context, dockerfile, args }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildSource {
  Context(String),
  Options(BuildOptions),
}

impl BuildSource {
  pub fn context(&self) -> &str {
    match self {
      BuildSource::Context(context) => context,
      BuildSource::Options(options) => &options.context,
    }
  }

  pub fn dockerfile(&self) -> Option<&str> {
    match self {
      BuildSource::Context(_) => None,
      BuildSource::Options(options) => options.dockerfile.as_deref(),
    }
  }

  pub fn args(&self) -> Vec<(String, String)> {
    match self {
      BuildSource::Context(_) => vec![],
      BuildSource::Options(options) => options
        .args
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Service {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub build: Option<BuildSource>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub ports: Vec<PortMapping>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub volumes: Vec<VolumeMount>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub working_dir: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub container_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stdin_open: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tty: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub command: Option<StartupCommand>,
  #[serde(default, skip_serializing_if = "Environment::is_empty")]
  pub environment: Environment,
  /// Start-order-before only, dependencies are never awaited for readiness
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<String>,
  /// Keys the planner does not act on, kept for round-trips
  #[serde(flatten)]
  pub extra: serde_yaml::Mapping,
}

impl Service {
  /// Image the container runs: the declared image, or the tag of the local build.
  pub fn image_name(&self, service_name: &str, project: &str) -> String {
    self
      .image
      .clone()
      .unwrap_or_else(|| format!("{}_{}", project, service_name))
  }

  pub fn container_name(&self, service_name: &str, project: &str) -> String {
    self
      .container_name
      .clone()
      .unwrap_or_else(|| format!("{}_{}_1", project, service_name))
  }

  pub fn is_interactive(&self) -> bool {
    self.stdin_open.unwrap_or(false)
  }

  pub fn is_tty(&self) -> bool {
    self.tty.unwrap_or(false)
  }
}
