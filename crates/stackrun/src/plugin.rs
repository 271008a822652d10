use crate::{JobRunResult, StepRunResult, WorkflowLog, WorkflowRunResult, WorkflowStateEvent};
use parking_lot::Mutex;
use std::sync::Arc;

type OnStateChange = dyn Fn(WorkflowStateEvent) + Send + Sync;
type OnLog = dyn Fn(WorkflowLog) + Send + Sync;
type OnWorkflowComplete = dyn Fn(WorkflowRunResult) + Send + Sync;
type OnJobComplete = dyn Fn(JobRunResult) + Send + Sync;
type OnStepComplete = dyn Fn(StepRunResult) + Send + Sync;

pub trait Plugin: Send {
  fn name(&self) -> &'static str;
  fn on_state_change(&self, _event: WorkflowStateEvent) {}
  fn on_log(&self, _log: WorkflowLog) {}
  fn on_workflow_completed(&self, _result: WorkflowRunResult) {}
  fn on_job_completed(&self, _result: JobRunResult) {}
  fn on_step_completed(&self, _result: StepRunResult) {}
}

pub struct PluginBuilder {
  name: &'static str,
  on_state_change: Option<Box<OnStateChange>>,
  on_log: Option<Box<OnLog>>,
  on_workflow_completed: Option<Box<OnWorkflowComplete>>,
  on_job_completed: Option<Box<OnJobComplete>>,
  on_step_completed: Option<Box<OnStepComplete>>,
}

impl PluginBuilder {
  pub fn new(name: &'static str) -> Self {
    PluginBuilder {
      name,
      on_state_change: None,
      on_log: None,
      on_workflow_completed: None,
      on_job_completed: None,
      on_step_completed: None,
    }
  }

  pub fn on_state_change<T>(mut self, on_state_change: T) -> Self
  where
    T: Fn(WorkflowStateEvent) + 'static + Send + Sync,
  {
    self.on_state_change = Some(Box::new(on_state_change));
    self
  }

  pub fn on_log<T>(mut self, on_log: T) -> Self
  where
    T: Fn(WorkflowLog) + 'static + Send + Sync,
  {
    self.on_log = Some(Box::new(on_log));
    self
  }

  pub fn on_workflow_completed<T>(mut self, on_workflow_completed: T) -> Self
  where
    T: Fn(WorkflowRunResult) + 'static + Send + Sync,
  {
    self.on_workflow_completed = Some(Box::new(on_workflow_completed));
    self
  }

  pub fn on_job_completed<T>(mut self, on_job_completed: T) -> Self
  where
    T: Fn(JobRunResult) + 'static + Send + Sync,
  {
    self.on_job_completed = Some(Box::new(on_job_completed));
    self
  }

  pub fn on_step_completed<T>(mut self, on_step_completed: T) -> Self
  where
    T: Fn(StepRunResult) + 'static + Send + Sync,
  {
    self.on_step_completed = Some(Box::new(on_step_completed));
    self
  }

  pub fn build(self) -> StackRunPlugin {
    StackRunPlugin {
      name: self.name,
      on_state_change: self.on_state_change,
      on_log: self.on_log,
      on_workflow_completed: self.on_workflow_completed,
      on_job_completed: self.on_job_completed,
      on_step_completed: self.on_step_completed,
    }
  }
}

/// Closure-backed plugin, see [`StackRunPlugin::builder`].
pub struct StackRunPlugin {
  name: &'static str,
  on_state_change: Option<Box<OnStateChange>>,
  on_log: Option<Box<OnLog>>,
  on_workflow_completed: Option<Box<OnWorkflowComplete>>,
  on_job_completed: Option<Box<OnJobComplete>>,
  on_step_completed: Option<Box<OnStepComplete>>,
}

impl StackRunPlugin {
  pub fn builder(name: &'static str) -> PluginBuilder {
    PluginBuilder::new(name)
  }
}

impl Plugin for StackRunPlugin {
  fn name(&self) -> &'static str {
    self.name
  }

  fn on_state_change(&self, event: WorkflowStateEvent) {
    if let Some(on_state_change) = &self.on_state_change {
      on_state_change(event);
    }
  }

  fn on_log(&self, log: WorkflowLog) {
    if let Some(on_log) = &self.on_log {
      on_log(log);
    }
  }

  fn on_workflow_completed(&self, result: WorkflowRunResult) {
    if let Some(on_workflow_completed) = &self.on_workflow_completed {
      on_workflow_completed(result);
    }
  }

  fn on_job_completed(&self, result: JobRunResult) {
    if let Some(on_job_completed) = &self.on_job_completed {
      on_job_completed(result);
    }
  }

  fn on_step_completed(&self, result: StepRunResult) {
    if let Some(on_step_completed) = &self.on_step_completed {
      on_step_completed(result);
    }
  }
}

#[derive(Clone, Default)]
pub struct PluginManager {
  plugins: Arc<Mutex<Vec<Box<dyn Plugin>>>>,
}

impl PluginManager {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn size(&self) -> usize {
    self.plugins.lock().len()
  }

  /// Registering a plugin twice under the same name replaces the first one.
  pub fn register<P: Plugin + 'static>(&self, plugin: P) {
    let mut plugins = self.plugins.lock();

    plugins.retain(|p| p.name() != plugin.name());

    plugins.push(Box::new(plugin));
  }

  pub fn unregister(&self, name: &'static str) {
    self.plugins.lock().retain(|plugin| plugin.name() != name);
  }

  pub fn on_state_change(&self, event: WorkflowStateEvent) {
    for plugin in self.plugins.lock().iter() {
      plugin.on_state_change(event.clone());
    }
  }

  pub fn on_log(&self, log: WorkflowLog) {
    for plugin in self.plugins.lock().iter() {
      plugin.on_log(log.clone());
    }
  }

  pub fn on_workflow_completed(&self, result: WorkflowRunResult) {
    for plugin in self.plugins.lock().iter() {
      plugin.on_workflow_completed(result.clone());
    }
  }

  pub fn on_job_completed(&self, result: JobRunResult) {
    for plugin in self.plugins.lock().iter() {
      plugin.on_job_completed(result.clone());
    }
  }

  pub fn on_step_completed(&self, result: StepRunResult) {
    for plugin in self.plugins.lock().iter() {
      plugin.on_step_completed(result.clone());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{StepId, WorkflowId, WorkflowState};

  #[test]
  fn plugin_manager_register() {
    let plugin_manager = PluginManager::new();

    plugin_manager.register(PluginBuilder::new("test").build());
    plugin_manager.register(PluginBuilder::new("test").build());
    plugin_manager.register(StackRunPlugin::builder("other").build());

    assert_eq!(plugin_manager.size(), 2);
  }

  #[test]
  fn plugin_manager_unregister() {
    let plugin_manager = PluginManager::new();

    plugin_manager.register(PluginBuilder::new("test").build());
    plugin_manager.unregister("test");

    assert_eq!(plugin_manager.size(), 0);
  }

  #[test]
  fn plugin_manager_on_state_change() {
    let events = Arc::new(Mutex::new(vec![]));
    let plugin_manager = PluginManager::new();

    let collected = events.clone();
    plugin_manager.register(
      PluginBuilder::new("test")
        .on_state_change(move |event| collected.lock().push(event))
        .build(),
    );

    plugin_manager.on_state_change(WorkflowStateEvent::WorkflowStateUpdated {
      id: WorkflowId::new("test"),
      state: WorkflowState::Cancelled,
    });

    assert_eq!(
      events.lock().clone(),
      vec![WorkflowStateEvent::WorkflowStateUpdated {
        id: WorkflowId::new("test"),
        state: WorkflowState::Cancelled,
      }]
    );
  }

  #[test]
  fn plugin_manager_on_log() {
    let messages = Arc::new(Mutex::new(vec![]));
    let plugin_manager = PluginManager::new();

    let collected = messages.clone();
    plugin_manager.register(
      PluginBuilder::new("test")
        .on_log(move |log| collected.lock().push(log.message))
        .build(),
    );

    plugin_manager.on_log(WorkflowLog {
      step_id: StepId::new("wf", "build", 0),
      message: "test".to_string(),
      ..Default::default()
    });

    assert_eq!(messages.lock().clone(), vec!["test".to_string()]);
  }

  #[test]
  fn test_plugin_trait() {
    struct TestPlugin;

    impl Plugin for TestPlugin {
      fn name(&self) -> &'static str {
        "test"
      }
    }

    let plugin_manager = PluginManager::new();

    plugin_manager.register(TestPlugin);
    plugin_manager.on_log(WorkflowLog::default());

    assert_eq!(plugin_manager.size(), 1);
  }
}
