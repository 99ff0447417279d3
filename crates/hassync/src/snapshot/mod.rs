//! Snapshot file format.
//!
//! A snapshot is a human-editable text file with one block per entity:
//!
//! ```text
//! ### NAME: Bedroom Lamp | LOCATION: Bedroom
//! type: turn_off
//! device_id: dev123
//! entity_id: light.bedroom_lamp
//! domain: light
//!
//! ```
//!
//! Exporting writes it; renaming reads it back as a device id to name
//! mapping. The file is the only state shared between the two.

mod codec;
pub mod lexer;
mod mapping;

use std::path::Path;

use tracing::info;
use tracing::warn;

pub use codec::Action;
pub use codec::Block;
pub use codec::Field;
pub use codec::NO_DEVICE_ID;
pub use codec::Parsed;
pub use codec::SnapshotWarning;
pub use codec::parse;
pub use codec::parse_with_warnings;
pub use codec::render_warnings;
pub use codec::serialize;
pub use mapping::RenameMapping;

use crate::error::Error;
use crate::error::Result;
use crate::registry::ActionableRecord;

/// Write `records` to `path`, creating parent directories as needed
pub async fn write_file(path: &Path, records: &[ActionableRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Snapshot(parent.to_path_buf(), e))?;
    }
    tokio::fs::write(path, serialize(records))
        .await
        .map_err(|e| Error::Snapshot(path.to_path_buf(), e))?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read and parse the snapshot at `path`.
///
/// A missing file is not an error and parses as empty. Skipped blocks are
/// rendered into the log and returned in [`Parsed::warnings`].
pub async fn read_file(path: &Path) -> Result<Parsed> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No snapshot at {}, nothing to rename", path.display());
            return Ok(Parsed::default());
        }
        Err(e) => return Err(Error::Snapshot(path.to_path_buf(), e)),
    };

    let parsed = parse_with_warnings(&text);
    if !parsed.warnings.is_empty() {
        let filename = path.display().to_string();
        warn!(
            "{} blocks in {} were skipped or replaced\n{}",
            parsed.warnings.len(),
            filename,
            render_warnings(&parsed.warnings, &text, &filename)
        );
    }
    info!(
        "Read {} device names from {}",
        parsed.mapping.len(),
        path.display()
    );
    Ok(parsed)
}
