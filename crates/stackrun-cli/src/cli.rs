use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};
use stackrun::{
  compose::{ComposeFile, ProjectOptions},
  Log, PluginBuilder, StackRun, StepId, Workflow, WorkflowState, WorkflowStateEvent,
};
use stackrun_runner::{ComposeEngine, StackRunner};
use std::{
  collections::HashMap,
  ffi::OsString,
  path::{Path, PathBuf},
};

#[derive(Debug, Parser)]
#[command(name = "stackrun", version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
  /// Compose file
  #[arg(short, long, global = true, default_value = "docker-compose.yml")]
  pub file: PathBuf,

  /// Project name, defaults to the project directory's name
  #[arg(short = 'p', long, global = true, env = "STACKRUN_PROJECT_NAME")]
  pub project_name: Option<String>,

  /// Defaults to the directory of the compose file
  #[arg(long, global = true)]
  pub project_directory: Option<PathBuf>,

  /// More output, repeat for trace logs
  #[arg(short, long, global = true, action = ArgAction::Count)]
  pub verbose: u8,

  #[command(subcommand)]
  pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  #[command(about = "Validate the compose file and print it normalized")]
  Config,
  #[command(about = "Build service images")]
  Build {
    services: Vec<String>,
  },
  #[command(about = "Create and start containers")]
  Up {
    /// Start in the background
    #[arg(short, long)]
    detach: bool,
    services: Vec<String>,
  },
  #[command(about = "Run a one-off command in a new container of a service")]
  Run {
    service: String,
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
  },
  #[command(about = "Stop and remove containers and the network")]
  Down {
    /// Also remove containers of services no longer declared
    #[arg(long)]
    remove_orphans: bool,
  },
  #[command(about = "Run a CI pipeline locally")]
  Ci {
    /// Pipeline descriptor, relative to the project directory
    #[arg(long, default_value = ".circleci/config.yml")]
    config: PathBuf,
    /// Workflow to run, defaults to the first one
    #[arg(long)]
    workflow: Option<String>,
    /// Repository for `checkout` steps in an empty directory
    #[arg(long, env = "STACKRUN_REPOSITORY")]
    repository: Option<String>,
  },
}

impl Cli {
  /// Parses `args`, loads `.env` from the project directory, then parses again
  /// so the project's `.env` can supply `STACKRUN_*` flags too.
  pub fn parse_with_project_env<I, T>(args: I) -> Cli
  where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
  {
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let cli = Cli::parse_from(args.clone());

    if cli.load_project_env() {
      Cli::parse_from(args)
    } else {
      cli
    }
  }

  /// Variables already set in the process are kept.
  pub fn load_project_env(&self) -> bool {
    let path = self.project_directory().join(".env");

    match dotenv::from_path(&path) {
      Ok(()) => true,
      Err(err) => {
        log::trace!("No project .env at {}: {}", path.display(), err);
        false
      }
    }
  }

  pub fn log_level(&self) -> log::Level {
    match self.verbose {
      0 => log::Level::Info,
      1 => log::Level::Debug,
      _ => log::Level::Trace,
    }
  }

  fn project_directory(&self) -> PathBuf {
    let directory = match &self.project_directory {
      Some(directory) => directory.clone(),
      None => self
        .file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")),
    };

    std::fs::canonicalize(&directory).unwrap_or(directory)
  }

  fn project(&self) -> ProjectOptions {
    let project = ProjectOptions::new(self.project_directory());

    match &self.project_name {
      Some(name) => project.name(name),
      None => project,
    }
  }

  async fn compose_file(&self) -> anyhow::Result<ComposeFile> {
    let content = tokio::fs::read_to_string(&self.file)
      .await
      .with_context(|| format!("Failed to read compose file {}", self.file.display()))?;

    Ok(ComposeFile::try_from(content)?)
  }
}

/// Exit code for a failed invocation. Failing steps and operations keep theirs.
pub fn exit_code(err: &anyhow::Error) -> i32 {
  err
    .downcast_ref::<stackrun::Error>()
    .map(stackrun::Error::exit_code)
    .unwrap_or(1)
}

fn engine() -> ComposeEngine {
  ComposeEngine::new().on_log(print_log)
}

fn print_log(log: Log) {
  if log.is_error() {
    eprintln!("{}", log.message);
  } else {
    println!("{}", log.message);
  }
}

pub async fn run(cli: Cli) -> anyhow::Result<i32> {
  match &cli.cmd {
    Command::Config => {
      let compose = cli.compose_file().await?;

      for (service, key) in compose.plaintext_secrets() {
        log::warn!(
          "Service `{}` sets `{}` in plain text, consider passing it from the environment",
          service,
          key
        );
      }

      print!("{}", compose.to_yaml()?);
    }
    Command::Build { services } => {
      let compose = cli.compose_file().await?;
      let operations = compose.plan_build(&cli.project(), services)?;

      engine().execute(&operations).await?;
    }
    Command::Up { detach, services } => {
      let compose = cli.compose_file().await?;
      let project = cli.project();
      let operations = compose.plan_up(&project, services)?;
      let engine = engine();

      engine.execute(&operations).await?;

      if !detach {
        let containers: Vec<String> = compose
          .with_dependencies(services)?
          .iter()
          .map(|name| {
            compose
              .service(name)
              .map(|service| service.container_name(name, &project.name))
          })
          .collect::<stackrun::Result<_>>()?;

        tokio::select! {
          res = engine.follow_logs(&containers) => res?,
          _ = tokio::signal::ctrl_c() => log::info!("Stopping {}", project.name),
        }

        engine.execute(&compose.plan_down(&project, false)?).await?;
      }
    }
    Command::Run { service, command } => {
      let compose = cli.compose_file().await?;
      let command = (!command.is_empty()).then(|| command.clone());
      let operations = compose.plan_run(&cli.project(), service, command)?;

      engine().execute(&operations).await?;
    }
    Command::Down { remove_orphans } => {
      let compose = cli.compose_file().await?;
      let operations = compose.plan_down(&cli.project(), *remove_orphans)?;

      engine().execute(&operations).await?;
    }
    Command::Ci {
      config,
      workflow,
      repository,
    } => {
      let directory = cli.project_directory();
      return run_pipeline(
        &directory,
        &directory.join(config),
        workflow.clone(),
        repository.clone(),
      )
      .await;
    }
  }

  Ok(0)
}

async fn run_pipeline(
  directory: &Path,
  config: &Path,
  workflow: Option<String>,
  repository: Option<String>,
) -> anyhow::Result<i32> {
  let content = tokio::fs::read_to_string(config)
    .await
    .with_context(|| format!("Failed to read pipeline {}", config.display()))?;

  let mut builder = Workflow::builder().config(content);
  if let Some(workflow) = workflow {
    builder = builder.workflow(workflow);
  }
  let workflow = builder.build()?;

  let step_names: HashMap<StepId, String> = workflow
    .jobs
    .iter()
    .flat_map(|job| job.steps.iter())
    .map(|step| (step.id.clone(), step.name.clone()))
    .collect();

  let mut runner = StackRunner::builder().working_directory(directory);
  if let Some(repository) = repository {
    runner = runner.repository(repository);
  }

  let stackrun = StackRun::builder()
    .runner(runner.build()?)
    .plugin(
      PluginBuilder::new("console")
        .on_state_change(move |event| {
          if let WorkflowStateEvent::StepStateUpdated { id, state } = event {
            let name = step_names.get(&id).map(String::as_str).unwrap_or_default();
            match state {
              WorkflowState::InProgress => println!("==> {}", name),
              WorkflowState::Skipped => println!("==> {} (skipped)", name),
              _ => {}
            }
          }
        })
        .on_log(|log| {
          if log.is_error() {
            eprintln!("{}", log.message);
          } else {
            println!("{}", log.message);
          }
        })
        .on_step_completed(|result| {
          if result.state.is_halting() {
            log::error!(
              "Step {} failed with exit code {}",
              result.id,
              result.exit_code.unwrap_or(1)
            );
          }
        })
        .build(),
    )
    .build()?;

  let result = workflow.run(stackrun.execution_context()?).await;
  log::info!("Workflow {} {:?}", workflow.name, result.state);

  Ok(result.exit_code())
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn test_cli_definition() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_parse_run() {
    let cli = Cli::try_parse_from([
      "stackrun",
      "-f",
      "app/docker-compose.yml",
      "run",
      "app",
      "sh",
      "-c",
      "python manage.py test && flake8",
    ])
    .unwrap();

    assert_eq!(cli.file, PathBuf::from("app/docker-compose.yml"));
    match cli.cmd {
      Command::Run { service, command } => {
        assert_eq!(service, "app");
        assert_eq!(command, vec!["sh", "-c", "python manage.py test && flake8"]);
      }
      other => panic!("Unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parse_ci() {
    let cli = Cli::try_parse_from(["stackrun", "-vv", "ci", "--workflow", "main"]).unwrap();

    assert_eq!(cli.log_level(), log::Level::Trace);
    match cli.cmd {
      Command::Ci {
        config, workflow, ..
      } => {
        assert_eq!(config, PathBuf::from(".circleci/config.yml"));
        assert_eq!(workflow.as_deref(), Some("main"));
      }
      other => panic!("Unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_project_name_override() {
    let cli = Cli::try_parse_from([
      "stackrun",
      "--project-directory",
      "/srv/Recipe App",
      "-p",
      "Recipe_API",
      "down",
    ])
    .unwrap();

    assert_eq!(cli.project().name, "recipe_api");
  }

  #[test]
  fn test_exit_code() {
    assert_eq!(exit_code(&stackrun::Error::failed(3).into()), 3);
    assert_eq!(exit_code(&stackrun::Error::config_error("bad").into()), 1);
    assert_eq!(exit_code(&anyhow::anyhow!("io")), 1);
  }

  #[test]
  fn test_project_env() {
    let project = tempfile::tempdir().unwrap();
    std::fs::write(
      project.path().join(".env"),
      "STACKRUN_REPOSITORY=https://example.com/recipe-app.git\nSTACKRUN_CLI_PROJECT_ENV=loaded\n",
    )
    .unwrap();

    let cli = Cli::parse_with_project_env([
      OsString::from("stackrun"),
      OsString::from("--project-directory"),
      project.path().as_os_str().to_os_string(),
      OsString::from("ci"),
    ]);

    assert_eq!(std::env::var("STACKRUN_CLI_PROJECT_ENV").unwrap(), "loaded");
    match cli.cmd {
      Command::Ci { repository, .. } => {
        assert_eq!(
          repository.as_deref(),
          Some("https://example.com/recipe-app.git")
        );
      }
      other => panic!("Unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_missing_project_env() {
    let project = tempfile::tempdir().unwrap();
    let cli = Cli::try_parse_from([
      OsString::from("stackrun"),
      OsString::from("--project-directory"),
      project.path().as_os_str().to_os_string(),
      OsString::from("config"),
    ])
    .unwrap();

    assert!(!cli.load_project_env());
  }

  #[stackrun_test::test]
  async fn test_run_pipeline() {
    let project = tempfile::tempdir().unwrap();
    let directory = project.path();
    std::fs::write(directory.join("manage.py"), "").unwrap();

    let config = directory.join("ci.yml");
    std::fs::write(
      &config,
      "jobs:\n  build:\n    steps:\n      - checkout\n      - run: touch .env\n      - run: test -f .env && exit 4\n",
    )
    .unwrap();

    let exit_code = run_pipeline(directory, &config, None, None).await.unwrap();

    assert_eq!(exit_code, 4);
  }
}
