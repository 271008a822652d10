use super::{ComposeFile, PortMapping, Service};
use crate::{Error, Result};
use std::{
  fmt,
  path::{Path, PathBuf},
};

pub const PROJECT_LABEL: &str = "stackrun.project";
pub const SERVICE_LABEL: &str = "stackrun.service";

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOptions {
  pub name: String,
  pub directory: PathBuf,
}

impl ProjectOptions {
  /// Project named after its directory, as the engine does by default.
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    let directory = directory.into();
    let name = directory
      .file_name()
      .map(|name| name.to_string_lossy().to_string())
      .unwrap_or_default();

    ProjectOptions {
      name: normalize_project_name(&name),
      directory,
    }
  }

  pub fn name(mut self, name: impl AsRef<str>) -> Self {
    self.name = normalize_project_name(name.as_ref());
    self
  }

  pub fn network_name(&self) -> String {
    format!("{}_default", self.name)
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }
}

pub fn normalize_project_name(name: &str) -> String {
  let normalized: String = name
    .to_lowercase()
    .chars()
    .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
    .collect();

  if normalized.is_empty() {
    "default".to_string()
  } else {
    normalized
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
  pub service: String,
  pub name: String,
  pub image: String,
  pub network: String,
  pub ports: Vec<PortMapping>,
  /// Mounts with host paths already resolved
  pub volumes: Vec<String>,
  /// `None` values pass through from the invoking environment
  pub environment: Vec<(String, Option<String>)>,
  pub working_dir: Option<String>,
  pub interactive: bool,
  pub tty: bool,
  pub command: Option<Vec<String>>,
  pub labels: Vec<(String, String)>,
  pub detach: bool,
  pub auto_remove: bool,
}

/// One engine action. Plans run strictly in order and stop at the first failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
  BuildImage {
    service: String,
    context: PathBuf,
    dockerfile: Option<String>,
    args: Vec<(String, String)>,
    tag: String,
  },
  PullImage {
    service: String,
    image: String,
  },
  CreateNetwork {
    name: String,
  },
  StartContainer(ContainerSpec),
  RemoveContainer {
    service: String,
    name: String,
  },
  RemoveOrphans {
    project: String,
    declared: Vec<String>,
  },
  RemoveNetwork {
    name: String,
  },
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operation::BuildImage { service, tag, .. } => write!(f, "Building {} ({})", service, tag),
      Operation::PullImage { service, image } => write!(f, "Pulling {} ({})", service, image),
      Operation::CreateNetwork { name } => write!(f, "Creating network {}", name),
      Operation::StartContainer(spec) if spec.detach => {
        write!(f, "Starting {} ({})", spec.service, spec.name)
      }
      Operation::StartContainer(spec) => write!(f, "Running {} ({})", spec.service, spec.name),
      Operation::RemoveContainer { name, .. } => write!(f, "Removing {}", name),
      Operation::RemoveOrphans { project, .. } => {
        write!(f, "Removing orphan containers of {}", project)
      }
      Operation::RemoveNetwork { name } => write!(f, "Removing network {}", name),
    }
  }
}

impl ComposeFile {
  fn image_operation(&self, name: &str, service: &Service, project: &ProjectOptions) -> Operation {
    match &service.build {
      Some(build) => {
        let context = Path::new(build.context());
        let context = if context.is_absolute() {
          context.to_path_buf()
        } else {
          project.directory.join(context)
        };

        Operation::BuildImage {
          service: name.to_string(),
          context,
          dockerfile: build.dockerfile().map(|d| d.to_string()),
          args: build.args(),
          tag: service.image_name(name, &project.name),
        }
      }
      None => Operation::PullImage {
        service: name.to_string(),
        image: service.image_name(name, &project.name),
      },
    }
  }

  fn container_spec(
    &self,
    name: &str,
    service: &Service,
    project: &ProjectOptions,
  ) -> Result<ContainerSpec> {
    for key in service.extra.keys() {
      if let Some(key) = key.as_str() {
        log::warn!(
          "Service `{}`: `{}` is not supported and will be ignored",
          name,
          key
        );
      }
    }

    let command = match &service.command {
      Some(command) => Some(command.argv()?),
      None => None,
    };

    Ok(ContainerSpec {
      service: name.to_string(),
      name: service.container_name(name, &project.name),
      image: service.image_name(name, &project.name),
      network: project.network_name(),
      ports: service.ports.clone(),
      volumes: service
        .volumes
        .iter()
        .map(|volume| volume.resolve(&project.directory))
        .collect(),
      environment: service
        .environment
        .iter()
        .map(|entry| (entry.key.clone(), entry.value.clone()))
        .collect(),
      working_dir: service.working_dir.clone(),
      interactive: service.is_interactive(),
      tty: service.is_tty(),
      command,
      labels: vec![
        (PROJECT_LABEL.to_string(), project.name.clone()),
        (SERVICE_LABEL.to_string(), name.to_string()),
      ],
      detach: true,
      auto_remove: false,
    })
  }

  /// Builds every selected service that has a `build` section.
  pub fn plan_build(
    &self,
    project: &ProjectOptions,
    services: &[String],
  ) -> Result<Vec<Operation>> {
    let selected = if services.is_empty() {
      self.startup_order()?
    } else {
      services.to_vec()
    };

    let mut operations = vec![];
    for name in selected {
      let service = self.service(&name)?;
      if service.build.is_some() {
        operations.push(self.image_operation(&name, service, project));
      }
    }

    Ok(operations)
  }

  /// Images first, then the network, then detached containers in startup order.
  /// Dependencies are started, never awaited.
  pub fn plan_up(&self, project: &ProjectOptions, services: &[String]) -> Result<Vec<Operation>> {
    let selected = self.with_dependencies(services)?;
    let mut operations = vec![];

    for name in &selected {
      operations.push(self.image_operation(name, self.service(name)?, project));
    }

    operations.push(Operation::CreateNetwork {
      name: project.network_name(),
    });

    for name in &selected {
      let spec = self.container_spec(name, self.service(name)?, project)?;
      operations.push(Operation::StartContainer(spec));
    }

    log::trace!("Planned {} operations for `up`", operations.len());

    Ok(operations)
  }

  /// Starts the dependencies of `service` detached, then runs a fresh,
  /// attached, auto-removed container of it with `command` in place of its own.
  pub fn plan_run(
    &self,
    project: &ProjectOptions,
    service: &str,
    command: Option<Vec<String>>,
  ) -> Result<Vec<Operation>> {
    let target = self.service(service)?;
    let dependencies: Vec<String> = self
      .with_dependencies(&[service.to_string()])?
      .into_iter()
      .filter(|name| name != service)
      .collect();

    let mut operations = if dependencies.is_empty() {
      vec![Operation::CreateNetwork {
        name: project.network_name(),
      }]
    } else {
      self.plan_up(project, &dependencies)?
    };

    let position = operations
      .iter()
      .position(|op| matches!(op, Operation::CreateNetwork { .. }))
      .ok_or_else(|| Error::internal_runtime_error("Missing network in run plan"))?;
    operations.insert(position, self.image_operation(service, target, project));

    let mut spec = self.container_spec(service, target, project)?;
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    spec.name = format!("{}_{}_run_{}", project.name, service, &suffix[..12]);
    // One-off containers do not publish the service's ports
    spec.ports = vec![];
    spec.detach = false;
    spec.auto_remove = true;
    if let Some(command) = command {
      if !command.is_empty() {
        spec.command = Some(command);
      }
    }

    operations.push(Operation::StartContainer(spec));

    Ok(operations)
  }

  /// Removes declared containers in reverse startup order, then orphans, then the network.
  pub fn plan_down(
    &self,
    project: &ProjectOptions,
    remove_orphans: bool,
  ) -> Result<Vec<Operation>> {
    let mut order = self.startup_order()?;
    order.reverse();

    let mut operations = vec![];
    for name in &order {
      let service = self.service(name)?;
      operations.push(Operation::RemoveContainer {
        service: name.clone(),
        name: service.container_name(name, &project.name),
      });
    }

    if remove_orphans {
      operations.push(Operation::RemoveOrphans {
        project: project.name.clone(),
        declared: self.services.keys().map(|k| k.to_string()).collect(),
      });
    }

    operations.push(Operation::RemoveNetwork {
      name: project.network_name(),
    });

    Ok(operations)
  }
}
