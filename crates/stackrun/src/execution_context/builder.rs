use crate::{Error, ExecutionContext, PluginManager, Result, Runner};
use std::sync::Arc;

pub struct ExecutionContextBuilder {
  runner: Option<Arc<Box<dyn Runner>>>,
  plugin_manager: Option<PluginManager>,
}

impl ExecutionContextBuilder {
  pub fn new() -> Self {
    ExecutionContextBuilder {
      runner: None,
      plugin_manager: None,
    }
  }

  pub fn runner(mut self, runner: Arc<Box<dyn Runner>>) -> Self {
    self.runner = Some(runner);
    self
  }

  pub fn plugin_manager(mut self, plugin_manager: PluginManager) -> Self {
    self.plugin_manager = Some(plugin_manager);
    self
  }

  pub fn build(self) -> Result<ExecutionContext> {
    let runner = self.runner.ok_or_else(|| {
      Error::init_error("Runner is not set in execution context builder")
    })?;

    Ok(ExecutionContext {
      runner,
      plugin_manager: self.plugin_manager.unwrap_or_default(),
    })
  }
}

impl Default for ExecutionContextBuilder {
  fn default() -> Self {
    Self::new()
  }
}
