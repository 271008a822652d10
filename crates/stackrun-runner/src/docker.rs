use crate::command::Command;
use stackrun::{compose::ContainerSpec, Error, Result};
use std::borrow::Cow;

pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// `docker run` invocation for one container.
#[derive(Debug, Clone)]
pub struct Docker {
  pub binary: String,
  pub image: Option<String>,
  pub name: String,
  pub network: Option<String>,
  pub ports: Vec<String>,
  pub volumes: Vec<String>,
  pub environments: Vec<(String, Option<String>)>,
  pub working_dir: Option<String>,
  pub labels: Vec<(String, String)>,
  pub interactive: bool,
  pub tty: bool,
  pub detach: bool,
  pub auto_remove: bool,
  pub command: Vec<String>,
}

impl Docker {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      binary: DEFAULT_DOCKER_BINARY.to_string(),
      image: None,
      name: name.into(),
      network: None,
      ports: vec![],
      volumes: vec![],
      environments: vec![],
      working_dir: None,
      labels: vec![],
      interactive: false,
      tty: false,
      detach: false,
      auto_remove: false,
      command: vec![],
    }
  }

  pub fn binary(mut self, binary: impl Into<String>) -> Self {
    self.binary = binary.into();
    self
  }

  pub fn image(mut self, image: impl Into<String>) -> Self {
    self.image = Some(image.into());
    self
  }

  pub fn network(mut self, network: impl Into<String>) -> Self {
    self.network = Some(network.into());
    self
  }

  pub fn port(mut self, port: impl Into<String>) -> Self {
    self.ports.push(port.into());
    self
  }

  pub fn volume(mut self, volume: impl Into<String>) -> Self {
    self.volumes.push(volume.into());
    self
  }

  /// A `None` value passes the variable through from the invoking environment.
  pub fn environment(mut self, key: impl Into<String>, value: Option<String>) -> Self {
    self.environments.push((key.into(), value));
    self
  }

  pub fn working_dir(mut self, working_dir: impl Into<String>) -> Self {
    self.working_dir = Some(working_dir.into());
    self
  }

  pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.labels.push((key.into(), value.into()));
    self
  }

  pub fn interactive(mut self, interactive: bool) -> Self {
    self.interactive = interactive;
    self
  }

  pub fn tty(mut self, tty: bool) -> Self {
    self.tty = tty;
    self
  }

  pub fn detach(mut self, detach: bool) -> Self {
    self.detach = detach;
    self
  }

  pub fn auto_remove(mut self, auto_remove: bool) -> Self {
    self.auto_remove = auto_remove;
    self
  }

  pub fn command(mut self, command: Vec<String>) -> Self {
    self.command = command;
    self
  }

  /// Arguments following the docker binary.
  pub fn generate_args(&self) -> Result<Vec<String>> {
    let image = self
      .image
      .clone()
      .ok_or_else(|| Error::init_error("Docker image is required to run a docker container"))?;

    let mut args = vec!["run".to_string()];

    if self.auto_remove {
      args.push("--rm".to_string());
    }
    if self.detach {
      args.push("-d".to_string());
    }
    if self.interactive {
      args.push("-i".to_string());
    }
    if self.tty {
      args.push("-t".to_string());
    }

    args.push("--name".to_string());
    args.push(self.name.clone());

    if let Some(network) = &self.network {
      args.push("--network".to_string());
      args.push(network.clone());
    }

    for port in &self.ports {
      args.push("-p".to_string());
      args.push(port.clone());
    }

    for volume in &self.volumes {
      args.push("-v".to_string());
      args.push(volume.clone());
    }

    for (key, value) in &self.environments {
      args.push("-e".to_string());
      args.push(match value {
        Some(value) => format!("{}={}", key, value),
        None => key.clone(),
      });
    }

    if let Some(working_dir) = &self.working_dir {
      args.push("-w".to_string());
      args.push(working_dir.clone());
    }

    for (key, value) in &self.labels {
      args.push("--label".to_string());
      args.push(format!("{}={}", key, value));
    }

    args.push(image);
    args.extend(self.command.iter().cloned());

    Ok(args)
  }

  /// Shell-escaped rendering, used for logs only.
  pub fn generate_docker_command(&self) -> Result<String> {
    let args = self.generate_args()?;

    Ok(render(&self.binary, &args))
  }
}

pub(crate) fn render(binary: &str, args: &[String]) -> String {
  std::iter::once(binary)
    .chain(args.iter().map(|arg| arg.as_str()))
    .map(|arg| shell_escape::escape(Cow::Borrowed(arg)).to_string())
    .collect::<Vec<_>>()
    .join(" ")
}

impl From<&ContainerSpec> for Docker {
  fn from(spec: &ContainerSpec) -> Self {
    let mut docker = Docker::new(spec.name.clone())
      .image(spec.image.clone())
      .network(spec.network.clone())
      .interactive(spec.interactive)
      .tty(spec.tty)
      .detach(spec.detach)
      .auto_remove(spec.auto_remove)
      .command(spec.command.clone().unwrap_or_default());

    for port in &spec.ports {
      docker = docker.port(port.to_string());
    }
    for volume in &spec.volumes {
      docker = docker.volume(volume.clone());
    }
    for (key, value) in &spec.environment {
      docker = docker.environment(key.clone(), value.clone());
    }
    if let Some(working_dir) = &spec.working_dir {
      docker = docker.working_dir(working_dir.clone());
    }
    for (key, value) in &spec.labels {
      docker = docker.label(key.clone(), value.clone());
    }

    docker
  }
}

impl TryFrom<Docker> for Command {
  type Error = Error;

  fn try_from(docker: Docker) -> Result<Command> {
    let args = docker.generate_args()?;

    Ok(Command::program(docker.binary).args(args))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use stackrun::compose::{ComposeFile, Operation, ProjectOptions};

  #[test]
  fn test_generate_docker_command() {
    let command = Docker::new("test")
      .image("ubuntu")
      .auto_remove(true)
      .environment("key", Some("some value".to_string()))
      .environment("PASSTHROUGH", None)
      .working_dir("/home/runner/work")
      .volume("/app:/home/runner/work")
      .label("stackrun.project", "demo")
      .command(vec!["sh".to_string(), "-c".to_string(), "echo hi".to_string()])
      .generate_docker_command()
      .unwrap();

    assert_eq!(
      command,
      "docker run --rm --name test -v '/app:/home/runner/work' -e 'key=some value' -e PASSTHROUGH -w /home/runner/work --label stackrun.project=demo ubuntu sh -c 'echo hi'"
    );
  }

  #[test]
  fn test_image_required() {
    assert_eq!(
      Docker::new("test").generate_args().unwrap_err(),
      Error::init_error("Docker image is required to run a docker container")
    );
  }

  #[test]
  fn test_from_container_spec() {
    let compose =
      ComposeFile::try_from(include_str!("../../stackrun/tests/fixtures/docker-compose.yml"))
        .unwrap();
    let project = ProjectOptions::new("/srv/recipe-app");
    let operations = compose.plan_up(&project, &["db".to_string()]).unwrap();

    let spec = operations
      .iter()
      .find_map(|operation| match operation {
        Operation::StartContainer(spec) => Some(spec),
        _ => None,
      })
      .unwrap();

    let args = Docker::from(spec).generate_args().unwrap();

    assert_eq!(
      &args[..6],
      &["run", "-d", "--name", "recipe-app_db_1", "--network", "recipe-app_default"]
    );
    assert!(args.contains(&"POSTGRES_DB=app".to_string()));
    assert!(args.contains(&"stackrun.service=db".to_string()));
    assert_eq!(args.last().unwrap(), "postgres:10-alpine");
  }
}
