use crate::api;
use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{Context, Result};
use url::Url;

/// Handle the server action
///
/// # Errors
/// Returns an error for an unusable DSN or any server startup failure.
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            worker_id,
            datacenter_id,
        } => {
            // Fail on malformed DSNs here, before the pool retries against
            // something that never was a URL.
            let dsn = Url::parse(&dsn).context("Invalid database DSN")?;

            api::new(port, dsn.to_string(), worker_id, datacenter_id, globals).await?;
        }
    }

    Ok(())
}
