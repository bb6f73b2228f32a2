use crate::args::InitArgs;
use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory and an initial `config.json` for the organization in `args`.
///
/// # Errors
/// - Returns an error if the directory is already initialized or any file operation fails.
pub async fn init(bommel_home: &Path, args: InitArgs) -> Result<Out<()>> {
    let config = Config::create(
        bommel_home,
        args.organization_id(),
        args.organization_name(),
        args.currency(),
    )
    .await
    .context("Unable to create the data directory and config")?;
    Ok(format!(
        "Successfully created the bommel directory for '{}' at {}",
        config.organization_name(),
        config.root().display()
    )
    .into())
}
