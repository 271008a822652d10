mod command;
mod compose_engine;
mod docker;
mod executors;
mod stack_runner;

pub use crate::stack_runner::{StackRunner, StackRunnerBuilder};
pub use command::Command;
pub use compose_engine::{parse_orphans, ComposeEngine, DOCKER_BINARY_ENV};
pub use docker::Docker;
pub use executors::{Executor, HostExecutor};
