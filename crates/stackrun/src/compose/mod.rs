mod command;
mod environment;
mod plan;
mod port;
mod service;
mod volume;

pub use command::*;
pub use environment::*;
pub use plan::*;
pub use port::*;
pub use service::*;
pub use volume::*;

use crate::{Error, OrderedMap, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComposeFile {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<serde_yaml::Value>,
  #[serde(default)]
  pub services: OrderedMap<Service>,
  /// Top-level keys such as `volumes` or `networks`, kept for round-trips
  #[serde(flatten)]
  pub extra: serde_yaml::Mapping,
}

impl ComposeFile {
  pub fn validate(&self) -> Result<()> {
    if self.services.is_empty() {
      return Err(Error::config_error(
        "Compose file must define at least one service",
      ));
    }

    let mut container_names: HashMap<String, &str> = HashMap::new();
    let mut host_ports: HashMap<(Option<String>, u16, &str), &str> = HashMap::new();

    for (name, service) in self.services.iter() {
      if service.build.is_none() && service.image.is_none() {
        return Err(Error::config_error(format!(
          "Service `{}` must define either `build` or `image`",
          name
        )));
      }

      let mut seen = HashSet::new();
      for dependency in &service.depends_on {
        if dependency == name {
          return Err(Error::config_error(format!(
            "Service `{}` cannot depend on itself",
            name
          )));
        }

        if !self.services.contains_key(dependency) {
          return Err(Error::config_error(format!(
            "Service `{}` depends on service `{}`, but service `{}` is not defined",
            name, dependency, dependency
          )));
        }

        if !seen.insert(dependency) {
          return Err(Error::config_error(format!(
            "Service `{}` lists dependency `{}` more than once",
            name, dependency
          )));
        }
      }

      if let Some(key) = service.environment.duplicate_keys().first() {
        return Err(Error::config_error(format!(
          "Service `{}` defines environment variable `{}` more than once",
          name, key
        )));
      }

      if let Some(container_name) = &service.container_name {
        if let Some(other) = container_names.insert(container_name.clone(), name) {
          return Err(Error::config_error(format!(
            "Container name `{}` is used by both `{}` and `{}`",
            container_name, other, name
          )));
        }
      }

      for port in &service.ports {
        if let Some(host) = port.host {
          // No protocol publishes tcp
          let protocol = port.protocol.as_deref().unwrap_or("tcp");
          let key = (port.host_ip.clone(), host, protocol);
          if let Some(other) = host_ports.insert(key, name) {
            if other != name {
              return Err(Error::config_error(format!(
                "Host port {}/{} is published by both `{}` and `{}`",
                host, protocol, other, name
              )));
            }
          }
        }
      }
    }

    self.startup_order()?;

    Ok(())
  }

  pub fn service(&self, name: &str) -> Result<&Service> {
    self
      .services
      .get(name)
      .ok_or_else(|| Error::config_error(format!("No such service: `{}`", name)))
  }

  /// Services ordered so that each one comes after everything it depends on.
  /// Ties keep declaration order.
  pub fn startup_order(&self) -> Result<Vec<String>> {
    let mut ordered: Vec<String> = Vec::with_capacity(self.services.len());

    while ordered.len() < self.services.len() {
      let next = self.services.iter().find(|(name, service)| {
        !ordered.iter().any(|o| o.as_str() == *name)
          && service
            .depends_on
            .iter()
            .all(|dependency| {
              ordered.contains(dependency) || !self.services.contains_key(dependency)
            })
      });

      match next {
        Some((name, _)) => ordered.push(name.to_string()),
        None => {
          let remaining: Vec<&str> = self
            .services
            .keys()
            .filter(|name| !ordered.iter().any(|o| o.as_str() == *name))
            .collect();

          return Err(Error::config_error(format!(
            "Dependency cycle detected among services: {}",
            remaining.join(", ")
          )));
        }
      }
    }

    Ok(ordered)
  }

  /// `services` plus everything they transitively depend on, in startup order.
  /// An empty selection means every service.
  pub fn with_dependencies(&self, services: &[String]) -> Result<Vec<String>> {
    if services.is_empty() {
      return self.startup_order();
    }

    let mut selected: HashSet<String> = HashSet::new();
    let mut pending: Vec<String> = services.to_vec();

    while let Some(name) = pending.pop() {
      let service = self.service(&name)?;
      if selected.insert(name) {
        pending.extend(service.depends_on.iter().cloned());
      }
    }

    Ok(
      self
        .startup_order()?
        .into_iter()
        .filter(|name| selected.contains(name))
        .collect(),
    )
  }

  /// `(service, key)` pairs whose values are credentials written in plaintext.
  pub fn plaintext_secrets(&self) -> Vec<(String, String)> {
    self
      .services
      .iter()
      .flat_map(|(name, service)| {
        service
          .environment
          .plaintext_secrets()
          .into_iter()
          .map(move |key| (name.to_string(), key.to_string()))
      })
      .collect()
  }

  pub fn to_yaml(&self) -> Result<String> {
    serde_yaml::to_string(self)
      .map_err(|e| Error::config_error(format!("Failed to serialize compose file: {}", e)))
  }
}

impl TryFrom<&str> for ComposeFile {
  type Error = Error;

  fn try_from(value: &str) -> Result<Self> {
    let compose: ComposeFile = serde_yaml::from_str(value)
      .map_err(|e| Error::config_error(e.to_string()))?;

    compose.validate()?;

    Ok(compose)
  }
}

impl TryFrom<String> for ComposeFile {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> {
    Self::try_from(value.as_str())
  }
}
