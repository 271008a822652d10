mod host;

pub use host::HostExecutor;
use stackrun::{Context, Result, StreamSender};

#[async_trait::async_trait]
pub trait Executor: Send + Sync {
  async fn execute(&self, ctx: Context, sender: StreamSender) -> Result<()>;
}
