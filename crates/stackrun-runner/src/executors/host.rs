use crate::{command::Command, executors::Executor};
use stackrun::{Context, Result, StreamSender};
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct HostExecutor {
  pub working_directory: PathBuf,
  pub repository: Option<String>,
}

#[async_trait::async_trait]
impl Executor for HostExecutor {
  async fn execute(&self, ctx: Context, sender: StreamSender) -> Result<()> {
    let directory = match &ctx.command.working_directory {
      Some(dir) => self.working_directory.join(dir),
      None => self.working_directory.clone(),
    };

    fs::create_dir_all(&directory).await?;

    if ctx.command.is_checkout() {
      return self.checkout(&directory, sender).await;
    }

    let mut command = Command::new(ctx.command.run.clone())
      .dir(&directory)
      .env("CI", "true");

    for (key, env) in &ctx.command.environments {
      command = command.env(key.clone(), env.to_string());
    }

    command.run(sender, Some(ctx.command.timeout)).await?;

    log::trace!("Step {} finished", ctx.id);

    Ok(())
  }
}

impl HostExecutor {
  async fn checkout(&self, directory: &Path, sender: StreamSender) -> Result<()> {
    if !is_empty_dir(directory).await? {
      sender.log(format!("Using source tree at {}", directory.display()));
      sender.succeeded();

      return Ok(());
    }

    let Some(repository) = &self.repository else {
      sender.error("No repository configured to check out");
      sender.failed(1);

      return Ok(());
    };

    sender.log(format!("Cloning {}", repository));

    Command::program("git")
      .args(["clone", "--depth", "1"])
      .arg(repository.clone())
      .arg(".")
      .dir(directory)
      .run(sender, None)
      .await?;

    Ok(())
  }
}

async fn is_empty_dir(directory: &Path) -> Result<bool> {
  let mut entries = fs::read_dir(directory).await?;

  Ok(entries.next_entry().await?.is_none())
}
