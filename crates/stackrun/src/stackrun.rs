use crate::{Error, ExecutionContext, Plugin, PluginManager, Result, Runner, UserConfig};
use std::sync::Arc;

pub struct StackRun {
  runner: Arc<Box<dyn Runner>>,
  plugin_manager: PluginManager,
}

impl StackRun {
  pub fn builder() -> StackRunBuilder {
    StackRunBuilder::new()
  }

  pub fn register_plugin<P: Plugin + 'static>(&self, plugin: P) {
    self.plugin_manager.register(plugin);
  }

  pub fn unregister_plugin(&self, plugin_name: &'static str) {
    self.plugin_manager.unregister(plugin_name);
  }

  pub fn parse_config(&self, config: &str) -> Result<UserConfig> {
    UserConfig::try_from(config)
  }

  pub fn execution_context(&self) -> Result<ExecutionContext> {
    ExecutionContext::builder()
      .runner(self.runner.clone())
      .plugin_manager(self.plugin_manager.clone())
      .build()
  }
}

#[derive(Default)]
pub struct StackRunBuilder {
  runner: Option<Box<dyn Runner>>,
  plugin_manager: PluginManager,
}

impl StackRunBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn runner<T>(mut self, runner: T) -> Self
  where
    T: Runner + 'static,
  {
    self.runner = Some(Box::new(runner));
    self
  }

  pub fn plugin<P: Plugin + 'static>(self, plugin: P) -> Self {
    self.plugin_manager.register(plugin);
    self
  }

  pub fn build(self) -> Result<StackRun> {
    let runner = self
      .runner
      .ok_or_else(|| Error::init_error("Runner is required"))?;

    Ok(StackRun {
      runner: Arc::new(runner),
      plugin_manager: self.plugin_manager,
    })
  }
}
