use async_trait::async_trait;
use eyre::Result;

pub mod apply;
pub mod preferences;
pub mod replay;
pub mod restore;
pub mod scan;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
