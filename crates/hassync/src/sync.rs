//! End-to-end export and rename flows.
//!
//! Each flow opens its own session; the snapshot file is the only thing the
//! two share, so they can run in separate invocations.

use tracing::info;
use tracing::warn;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::ha::Session;
use crate::ha::Transport;
use crate::registry;
use crate::registry::ActionableRecord;
use crate::rename;
use crate::rename::RenameReport;
use crate::snapshot;
use crate::snapshot::Parsed;
use crate::snapshot::RenameMapping;

/// Fetch the registries and write them to the snapshot file.
pub async fn export(config: &Config) -> Result<Vec<ActionableRecord>> {
    let mut session = Session::open(&config.connection).await?;
    let records = export_with(&mut session, config).await;
    close(session).await;
    records
}

pub async fn export_with<T: Transport>(
    session: &mut Session<T>,
    config: &Config,
) -> Result<Vec<ActionableRecord>> {
    let records = registry::fetch(session, &config.export.domains).await?;
    snapshot::write_file(&config.snapshot.path, &records).await?;
    Ok(records)
}

/// Read the rename mapping from the snapshot file
pub async fn load_mapping(config: &Config) -> Result<Parsed> {
    snapshot::read_file(&config.snapshot.path).await
}

/// Push `mapping` to the remote.
///
/// Nothing is sent unless `confirmed` is true; asking the user is up to the
/// caller. An empty mapping does not open a connection.
pub async fn rename(
    config: &Config,
    mapping: &RenameMapping,
    confirmed: bool,
) -> Result<RenameReport> {
    if !confirmed {
        return Err(Error::NotConfirmed);
    }
    if mapping.is_empty() {
        info!("No devices to rename");
        return Ok(RenameReport::default());
    }

    let mut session = Session::open(&config.connection).await?;
    info!("Connected, renaming {} devices", mapping.len());
    let report = rename::dispatch(&mut session, mapping, config.rename.id_base).await;
    close(session).await;
    report
}

async fn close<T: Transport>(session: Session<T>) {
    if let Err(e) = session.close().await {
        warn!("Failed to close session cleanly: {}", e);
    }
}
