use crate::{
  command::Command,
  docker::{render, Docker, DEFAULT_DOCKER_BINARY},
};
use stackrun::{
  compose::{ContainerSpec, Operation, PROJECT_LABEL, SERVICE_LABEL},
  stream, Error, Log, Result, RunResult, StreamExt,
};
use std::{io::IsTerminal, sync::Arc};

/// Environment variable overriding the engine binary.
pub const DOCKER_BINARY_ENV: &str = "STACKRUN_DOCKER";

type OnLog = dyn Fn(Log) + Send + Sync;

/// Executes planned operations against the docker CLI.
#[derive(Clone)]
pub struct ComposeEngine {
  docker_binary: String,
  on_log: Arc<OnLog>,
}

impl ComposeEngine {
  pub fn new() -> Self {
    let docker_binary = std::env::var(DOCKER_BINARY_ENV)
      .ok()
      .filter(|binary| !binary.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_DOCKER_BINARY.to_string());

    ComposeEngine {
      docker_binary,
      on_log: Arc::new(|log: Log| {
        if log.is_error() {
          log::warn!("{}", log.message);
        } else {
          log::info!("{}", log.message);
        }
      }),
    }
  }

  pub fn docker_binary(mut self, docker_binary: impl Into<String>) -> Self {
    self.docker_binary = docker_binary.into();
    self
  }

  /// Receives the output of streamed engine commands.
  pub fn on_log<T>(mut self, on_log: T) -> Self
  where
    T: Fn(Log) + Send + Sync + 'static,
  {
    self.on_log = Arc::new(on_log);
    self
  }

  /// Runs `operations` in order and stops at the first failure.
  pub async fn execute(&self, operations: &[Operation]) -> Result<()> {
    for operation in operations {
      let started_at = std::time::Instant::now();
      log::info!("{}", operation);

      self.execute_operation(operation).await.map_err(|err| {
        log::error!("{} failed: {}", operation, err);
        err
      })?;

      log::trace!("{} done in {:?}", operation, started_at.elapsed());
    }

    Ok(())
  }

  pub async fn execute_operation(&self, operation: &Operation) -> Result<()> {
    match operation {
      Operation::BuildImage {
        context,
        dockerfile,
        args,
        tag,
        ..
      } => {
        let mut command = self.docker().arg("build").arg("-t").arg(tag);
        if let Some(dockerfile) = dockerfile {
          command = command.arg("-f").arg(context.join(dockerfile).to_string_lossy());
        }
        for (key, value) in args {
          command = command.arg("--build-arg").arg(format!("{}={}", key, value));
        }
        let command = command.arg(context.to_string_lossy());

        self.stream(command, None).await
      }
      Operation::PullImage { image, .. } => {
        self.stream(self.docker().arg("pull").arg(image), None).await
      }
      Operation::CreateNetwork { name } => {
        let project = name.strip_suffix("_default").unwrap_or(name);
        let command = self
          .docker()
          .args(["network", "create", "--label"])
          .arg(format!("{}={}", PROJECT_LABEL, project))
          .arg(name);

        self.tolerate(command, "already exists").await
      }
      Operation::StartContainer(spec) => self.start_container(spec).await,
      Operation::RemoveContainer { name, .. } => self.remove_container(name).await,
      Operation::RemoveOrphans { project, declared } => {
        let output = self
          .docker()
          .args(["ps", "-a", "--filter"])
          .arg(format!("label={}={}", PROJECT_LABEL, project))
          .arg("--format")
          .arg(format!("{{{{.Names}}}}\t{{{{.Label \"{}\"}}}}", SERVICE_LABEL))
          .exec()
          .await?;

        for name in parse_orphans(&output, declared) {
          log::info!("Removing orphan container {}", name);
          self.remove_container(&name).await?;
        }

        Ok(())
      }
      Operation::RemoveNetwork { name } => {
        let command = self.docker().args(["network", "rm"]).arg(name);

        self.tolerate(command, "not found").await
      }
    }
  }

  async fn start_container(&self, spec: &ContainerSpec) -> Result<()> {
    if spec.detach {
      // Recreate, a stale container would hold the name
      let existing = self
        .docker()
        .args(["ps", "-aq", "--filter"])
        .arg(format!("name=^{}$", spec.name))
        .exec()
        .await?;

      if !existing.is_empty() {
        log::info!("Recreating {}", spec.name);
        self.remove_container(&spec.name).await?;
      }
    }

    // `-t` needs a terminal on our side, e.g. not under CI
    let attached = !spec.detach;
    let tty = spec.tty && attached && std::io::stdin().is_terminal();
    let docker = Docker::from(spec)
      .binary(self.docker_binary.clone())
      .tty(tty)
      .interactive(spec.interactive && attached);

    log::trace!("{}", docker.generate_docker_command()?);
    let command = Command::try_from(docker)?;

    if spec.detach {
      return self.stream(command, None).await;
    }

    match command.status().await? {
      0 => Ok(()),
      exit_code => Err(Error::failed(exit_code)),
    }
  }

  async fn remove_container(&self, name: &str) -> Result<()> {
    let command = self.docker().args(["rm", "-f"]).arg(name);

    self.tolerate(command, "No such container").await
  }

  fn docker(&self) -> Command {
    Command::program(self.docker_binary.clone())
  }

  /// Succeeds when the command fails only because `message` already holds.
  async fn tolerate(&self, command: Command, message: &str) -> Result<()> {
    match command.exec().await {
      Ok(_) => Ok(()),
      Err(Error::InternalRuntimeError(stderr)) if stderr.contains(message) => {
        log::trace!("Ignoring: {}", stderr);
        Ok(())
      }
      Err(err) => Err(err),
    }
  }

  /// Follows the output of running containers until all of them exit.
  pub async fn follow_logs(&self, containers: &[String]) -> Result<()> {
    let mut handles = vec![];

    for name in containers {
      let engine = self.clone();
      let name = name.clone();
      let command = self.docker().args(["logs", "-f"]).arg(name.clone());

      handles.push(tokio::spawn(async move {
        engine.stream(command, Some(&name)).await
      }));
    }

    for handle in handles {
      handle
        .await
        .map_err(|err| Error::internal_runtime_error(format!("Log follower failed: {}", err)))??;
    }

    Ok(())
  }

  async fn stream(&self, command: Command, prefix: Option<&str>) -> Result<()> {
    log::trace!("{}", render(&command.program, &command.args));

    let (sender, mut receiver) = stream();
    let on_log = self.on_log.clone();

    let (_, result) = tokio::join!(
      async {
        while let Some(mut log) = receiver.next().await {
          if let Some(prefix) = prefix {
            log.message = format!("{} | {}", prefix, log.message);
          }
          on_log(log);
        }
      },
      async {
        let result = command.run(sender.clone(), None).await;
        if !sender.is_ended() {
          sender.failed(1);
        }
        result
      }
    );

    match result? {
      RunResult::Succeeded => Ok(()),
      RunResult::Failed { exit_code } => Err(Error::failed(exit_code)),
      RunResult::Cancelled => Err(Error::failed(1)),
    }
  }
}

impl Default for ComposeEngine {
  fn default() -> Self {
    Self::new()
  }
}

/// Containers from `docker ps` output (`name<TAB>service` per line) whose
/// service is not declared anymore.
pub fn parse_orphans(output: &str, declared: &[String]) -> Vec<String> {
  output
    .lines()
    .filter_map(|line| {
      let line = line.trim();
      if line.is_empty() {
        return None;
      }

      let (name, service) = line.split_once('\t').unwrap_or((line, ""));
      if declared.iter().any(|declared| declared == service.trim()) {
        None
      } else {
        Some(name.trim().to_string())
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_orphans() {
    let output = "recipe-app\tapp\nrecipeapp_db_1\tdb\nrecipeapp_worker_1\tworker\n\nstray\n";
    let declared = vec!["app".to_string(), "db".to_string()];

    assert_eq!(
      parse_orphans(output, &declared),
      vec!["recipeapp_worker_1".to_string(), "stray".to_string()]
    );
    assert!(parse_orphans("", &declared).is_empty());
  }

  #[tokio::test]
  async fn test_failed_operation_stops_plan() {
    // `false` exits 1 for every docker invocation
    let engine = ComposeEngine::new().docker_binary("false");
    let operations = vec![
      Operation::PullImage {
        service: "db".to_string(),
        image: "postgres:10-alpine".to_string(),
      },
      Operation::CreateNetwork {
        name: "demo_default".to_string(),
      },
    ];

    assert_eq!(engine.execute(&operations).await.unwrap_err(), Error::failed(1));
  }

  #[tokio::test]
  async fn test_streams_output() {
    let logs = Arc::new(parking_lot::Mutex::new(vec![]));
    let collected = logs.clone();
    let engine = ComposeEngine::new()
      .docker_binary("echo")
      .on_log(move |log| collected.lock().push(log.message));

    engine
      .execute(&[Operation::PullImage {
        service: "db".to_string(),
        image: "postgres:10-alpine".to_string(),
      }])
      .await
      .unwrap();

    assert_eq!(logs.lock().clone(), vec!["pull postgres:10-alpine".to_string()]);
  }
}
