use crate::Error;
use serde::{
  de::{self, Visitor},
  Deserialize, Deserializer, Serialize, Serializer,
};
use std::{fmt, str::FromStr};

/// A published port: `[ip:][host:]container[/protocol]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
  pub host_ip: Option<String>,
  pub host: Option<u16>,
  pub container: u16,
  pub protocol: Option<String>,
}

impl PortMapping {
  pub fn new(host: u16, container: u16) -> Self {
    PortMapping {
      host_ip: None,
      host: Some(host),
      container,
      protocol: None,
    }
  }
}

fn parse_port(value: &str, raw: &str) -> Result<u16, Error> {
  match value.parse::<u16>() {
    Ok(port) if port > 0 => Ok(port),
    _ => Err(Error::config_error(format!(
      "Invalid port `{}` in port mapping `{}`",
      value, raw
    ))),
  }
}

impl FromStr for PortMapping {
  type Err = Error;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let (mapping, protocol) = match raw.split_once('/') {
      Some((mapping, protocol)) => {
        if protocol != "tcp" && protocol != "udp" {
          return Err(Error::config_error(format!(
            "Unsupported protocol `{}` in port mapping `{}`",
            protocol, raw
          )));
        }
        (mapping, Some(protocol.to_string()))
      }
      None => (raw, None),
    };

    let parts: Vec<&str> = mapping.split(':').collect();
    let (host_ip, host, container) = match parts[..] {
      [container] => (None, None, container),
      [host, container] => (None, Some(host), container),
      [ip, host, container] => (Some(ip.to_string()), Some(host), container),
      _ => {
        return Err(Error::config_error(format!(
          "Invalid port mapping `{}`",
          raw
        )))
      }
    };

    let host = match host {
      Some(host) if !host.is_empty() => Some(parse_port(host, raw)?),
      _ => None,
    };

    Ok(PortMapping {
      host_ip,
      host,
      container: parse_port(container, raw)?,
      protocol,
    })
  }
}

impl fmt::Display for PortMapping {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(ip) = &self.host_ip {
      write!(f, "{}:", ip)?;
      if self.host.is_none() {
        write!(f, ":")?;
      }
    }
    if let Some(host) = self.host {
      write!(f, "{}:", host)?;
    }
    write!(f, "{}", self.container)?;
    if let Some(protocol) = &self.protocol {
      write!(f, "/{}", protocol)?;
    }
    Ok(())
  }
}

impl Serialize for PortMapping {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_string())
  }
}

struct PortMappingVisitor;

impl<'de> Visitor<'de> for PortMappingVisitor {
  type Value = PortMapping;

  fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    formatter.write_str("a port mapping such as \"8000:8000\" or a container port")
  }

  fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
    value.parse().map_err(de::Error::custom)
  }

  fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
    self.visit_str(&value.to_string())
  }

  fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
    self.visit_str(&value.to_string())
  }
}

impl<'de> Deserialize<'de> for PortMapping {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_any(PortMappingVisitor)
  }
}
