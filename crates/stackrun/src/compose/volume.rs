use crate::Error;
use serde::{
  de::{self, Visitor},
  Deserialize, Deserializer, Serialize, Serializer,
};
use std::{fmt, path::Path, str::FromStr};

/// A volume entry: `[source:]target[:mode]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
  pub source: Option<String>,
  pub target: String,
  pub mode: Option<String>,
}

impl VolumeMount {
  /// Host paths start with `.`, `/` or `~`, anything else names a volume.
  pub fn is_bind_mount(&self) -> bool {
    self
      .source
      .as_ref()
      .map(|source| {
        source.starts_with('.') || source.starts_with('/') || source.starts_with('~')
      })
      .unwrap_or(false)
  }

  /// Renders the mount for the engine with host paths resolved against `directory`.
  pub fn resolve(&self, directory: &Path) -> String {
    let source = match &self.source {
      Some(source) if self.is_bind_mount() => Some(resolve_host_path(source, directory)),
      Some(source) => Some(source.clone()),
      None => None,
    };

    let mut rendered = match source {
      Some(source) => format!("{}:{}", source, self.target),
      None => self.target.clone(),
    };

    if let Some(mode) = &self.mode {
      rendered.push(':');
      rendered.push_str(mode);
    }

    rendered
  }
}

fn resolve_host_path(source: &str, directory: &Path) -> String {
  if let Some(rest) = source.strip_prefix('~') {
    if let Ok(home) = std::env::var("HOME") {
      return format!("{}{}", home, rest);
    }
    return source.to_string();
  }

  if source.starts_with('/') {
    return source.to_string();
  }

  let relative = source.strip_prefix("./").unwrap_or(source);
  let joined = if relative == "." {
    directory.to_path_buf()
  } else {
    directory.join(relative)
  };

  joined.to_string_lossy().to_string()
}

impl FromStr for VolumeMount {
  type Err = Error;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let parts: Vec<&str> = raw.split(':').collect();
    let (source, target, mode) = match parts[..] {
      [target] => (None, target, None),
      [source, target] => (Some(source), target, None),
      [source, target, mode] => (Some(source), target, Some(mode)),
      _ => return Err(Error::config_error(format!("Invalid volume `{}`", raw))),
    };

    if target.is_empty() || source.map(|s| s.is_empty()).unwrap_or(false) {
      return Err(Error::config_error(format!("Invalid volume `{}`", raw)));
    }

    Ok(VolumeMount {
      source: source.map(|s| s.to_string()),
      target: target.to_string(),
      mode: mode.map(|m| m.to_string()),
    })
  }
}

impl fmt::Display for VolumeMount {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(source) = &self.source {
      write!(f, "{}:", source)?;
    }
    write!(f, "{}", self.target)?;
    if let Some(mode) = &self.mode {
      write!(f, ":{}", mode)?;
    }
    Ok(())
  }
}

impl Serialize for VolumeMount {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_string())
  }
}

struct VolumeMountVisitor;

impl<'de> Visitor<'de> for VolumeMountVisitor {
  type Value = VolumeMount;

  fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    formatter.write_str("a volume such as \"./app:/app\"")
  }

  fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
    value.parse().map_err(de::Error::custom)
  }
}

impl<'de> Deserialize<'de> for VolumeMount {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_str(VolumeMountVisitor)
  }
}
