use serde::{
  de::{self, MapAccess, SeqAccess, Visitor},
  Deserialize, Deserializer, Serialize, Serializer,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentEntry {
  pub key: String,
  /// `None` passes the value through from the invoking environment
  pub value: Option<String>,
}

impl EnvironmentEntry {
  pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
    EnvironmentEntry {
      key: key.into(),
      value: Some(value.into()),
    }
  }
}

impl std::fmt::Display for EnvironmentEntry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.value {
      Some(value) => write!(f, "{}={}", self.key, value),
      None => write!(f, "{}", self.key),
    }
  }
}

impl From<&str> for EnvironmentEntry {
  fn from(raw: &str) -> Self {
    match raw.split_once('=') {
      Some((key, value)) => EnvironmentEntry::new(key, value),
      None => EnvironmentEntry {
        key: raw.to_string(),
        value: None,
      },
    }
  }
}

/// Service environment, kept in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Environment {
  entries: Vec<EnvironmentEntry>,
}

const SECRET_MARKERS: [&str; 5] = ["PASS", "SECRET", "TOKEN", "API_KEY", "PRIVATE_KEY"];

impl Environment {
  pub fn new(entries: Vec<EnvironmentEntry>) -> Self {
    Environment { entries }
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, EnvironmentEntry> {
    self.entries.iter()
  }

  pub fn keys(&self) -> Vec<&str> {
    self.entries.iter().map(|e| e.key.as_str()).collect()
  }

  /// Last declaration wins, as in the engine.
  pub fn get(&self, key: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .rev()
      .find(|e| e.key == key)
      .and_then(|e| e.value.as_deref())
  }

  pub fn duplicate_keys(&self) -> Vec<&str> {
    let mut duplicates = vec![];
    for (idx, entry) in self.entries.iter().enumerate() {
      let key = entry.key.as_str();
      if self.entries[..idx].iter().any(|e| e.key == key) && !duplicates.contains(&key) {
        duplicates.push(key);
      }
    }
    duplicates
  }

  /// Keys that look like credentials and carry a literal value.
  pub fn plaintext_secrets(&self) -> Vec<&str> {
    self
      .entries
      .iter()
      .filter(|e| e.value.as_ref().map(|v| !v.is_empty()).unwrap_or(false))
      .filter(|e| {
        let key = e.key.to_uppercase();
        SECRET_MARKERS.iter().any(|marker| key.contains(marker))
      })
      .map(|e| e.key.as_str())
      .collect()
  }
}

impl<'a> IntoIterator for &'a Environment {
  type Item = &'a EnvironmentEntry;
  type IntoIter = std::slice::Iter<'a, EnvironmentEntry>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.iter()
  }
}

struct EnvironmentVisitor;

impl<'de> Visitor<'de> for EnvironmentVisitor {
  type Value = Environment;

  fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    formatter.write_str("a list of `KEY=value` strings or a mapping")
  }

  fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
    Ok(Environment::default())
  }

  fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
    let mut entries = vec![];
    while let Some(raw) = access.next_element::<String>()? {
      entries.push(EnvironmentEntry::from(raw.as_str()));
    }

    Ok(Environment { entries })
  }

  // Values are read as their scalar text so numbers keep their exact spelling.
  // Repeated keys are kept and reported by validation.
  fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
    let mut entries = vec![];
    while let Some((key, value)) = access.next_entry::<String, Option<String>>()? {
      entries.push(EnvironmentEntry { key, value });
    }

    Ok(Environment { entries })
  }
}

impl<'de> Deserialize<'de> for Environment {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_any(EnvironmentVisitor)
  }
}

impl Serialize for Environment {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(self.entries.iter().map(|e| e.to_string()))
  }
}
