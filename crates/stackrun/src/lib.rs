pub mod compose;
mod execution_context;
mod plugin;
mod runner;
mod stackrun;
mod stream;
mod types;
mod user_config;
mod workflow;

pub use crate::stackrun::*;
pub use async_trait::async_trait;
pub use execution_context::*;
pub use plugin::*;
pub use runner::*;
pub use stream::*;
pub use types::*;
pub use user_config::*;
pub use workflow::*;

pub type Result<T> = std::result::Result<T, Error>;
