use serde::{
  de::{self, MapAccess, Visitor},
  ser::SerializeMap,
  Deserialize, Deserializer, Serialize, Serializer,
};
use std::{fmt, marker::PhantomData};

/// A YAML mapping that keeps declaration order and rejects duplicate keys.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
  entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
  pub fn new() -> Self {
    OrderedMap { entries: vec![] }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, key: &str) -> Option<&V> {
    self
      .entries
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, value)| value)
  }

  pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
    self
      .entries
      .iter_mut()
      .find(|(k, _)| k == key)
      .map(|(_, value)| value)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  pub fn position(&self, key: &str) -> Option<usize> {
    self.entries.iter().position(|(k, _)| k == key)
  }

  /// Appends an entry. Returns the value back when the key is already taken.
  pub fn insert(&mut self, key: impl Into<String>, value: V) -> Result<(), V> {
    let key = key.into();
    if self.contains_key(&key) {
      return Err(value);
    }

    self.entries.push((key, value));
    Ok(())
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn values(&self) -> impl Iterator<Item = &V> {
    self.entries.iter().map(|(_, v)| v)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }
}

impl<V> Default for OrderedMap<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V> IntoIterator for OrderedMap<V> {
  type Item = (String, V);
  type IntoIter = std::vec::IntoIter<(String, V)>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.into_iter()
  }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (key, value) in &self.entries {
      map.serialize_entry(key, value)?;
    }
    map.end()
  }
}

struct OrderedMapVisitor<V> {
  marker: PhantomData<V>,
}

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
  type Value = OrderedMap<V>;

  fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    formatter.write_str("a mapping with unique keys")
  }

  // `jobs:` with nothing under it
  fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
    Ok(OrderedMap::new())
  }

  fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
    Ok(OrderedMap::new())
  }

  fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
    let mut map = OrderedMap::new();

    while let Some((key, value)) = access.next_entry::<String, V>()? {
      if map.contains_key(&key) {
        return Err(de::Error::custom(format!("duplicate key `{}`", key)));
      }
      map.entries.push((key, value));
    }

    Ok(map)
  }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_any(OrderedMapVisitor {
      marker: PhantomData,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_keeps_declaration_order() {
    let map: OrderedMap<u32> = serde_yaml::from_str("zeta: 1\nalpha: 2\nmid: 3\n").unwrap();

    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    assert_eq!(map.get("alpha"), Some(&2));
    assert_eq!(map.position("mid"), Some(2));

    let yaml = serde_yaml::to_string(&map).unwrap();
    assert_eq!(yaml, "zeta: 1\nalpha: 2\nmid: 3\n");
  }

  #[test]
  fn test_rejects_duplicate_keys() {
    let err = serde_yaml::from_str::<OrderedMap<u32>>("db: 1\ndb: 2\n").unwrap_err();

    assert!(err.to_string().contains("duplicate key `db`"));
  }

  #[test]
  fn test_null_is_empty() {
    let map: OrderedMap<u32> = serde_yaml::from_str("~").unwrap();

    assert!(map.is_empty());
  }

  #[test]
  fn test_insert() {
    let mut map = OrderedMap::new();

    assert!(map.insert("app", 1).is_ok());
    assert_eq!(map.insert("app", 2), Err(2));
    assert_eq!(map.len(), 1);
  }
}
