//! Batched device renames.

use tracing::info;
use tracing::warn;

use crate::error::Result;
use crate::ha::Command;
use crate::ha::ResultEnvelope;
use crate::ha::Session;
use crate::ha::Transport;
use crate::snapshot::RenameMapping;

/// Reported when a rename fails without an error message from the remote
const NO_ERROR_DETAIL: &str = "rename rejected without error detail";

/// Result of one rename request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub device_id: String,
    pub requested_name: String,
    pub succeeded: bool,
    pub error_message: Option<String>,
}

impl RenameOutcome {
    fn from_envelope(device_id: &str, name: &str, envelope: &ResultEnvelope) -> Self {
        Self {
            device_id: device_id.to_string(),
            requested_name: name.to_string(),
            succeeded: envelope.success,
            error_message: if envelope.success {
                None
            } else {
                Some(
                    envelope
                        .error_message()
                        .unwrap_or(NO_ERROR_DETAIL)
                        .to_string(),
                )
            },
        }
    }
}

/// Outcomes of a whole batch, in the order they were attempted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    pub outcomes: Vec<RenameOutcome>,
}

impl RenameReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RenameOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }

    /// True when every attempted rename succeeded (including none at all)
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }
}

impl std::fmt::Display for RenameReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let failed = self.outcomes.len() - self.succeeded();
        write!(f, "{} renamed, {} failed", self.succeeded(), failed)?;
        for outcome in self.failures() {
            write!(
                f,
                "\n  {} -> '{}': {}",
                outcome.device_id,
                outcome.requested_name,
                outcome.error_message.as_deref().unwrap_or(NO_ERROR_DETAIL)
            )?;
        }
        Ok(())
    }
}

/// Rename every device in `mapping`, in mapping order.
///
/// Request ids start at `id_base` (or the session's next id, if that is
/// higher). A rejected rename is recorded and the batch carries on; only a
/// transport failure stops it.
pub async fn dispatch<T: Transport>(
    session: &mut Session<T>,
    mapping: &RenameMapping,
    id_base: u64,
) -> Result<RenameReport> {
    session.advance_ids_to(id_base);
    let mut outcomes = Vec::with_capacity(mapping.len());

    for (device_id, name) in mapping.iter() {
        let command = Command::DeviceRegistryUpdate {
            device_id: device_id.to_string(),
            name_by_user: name.to_string(),
        };
        let envelope = session.request(&command).await?;
        let outcome = RenameOutcome::from_envelope(device_id, name, &envelope);

        if outcome.succeeded {
            info!("Renamed device {} to '{}'", device_id, name);
        } else {
            warn!(
                "Could not rename {}: {}",
                device_id,
                outcome.error_message.as_deref().unwrap_or(NO_ERROR_DETAIL)
            );
        }
        outcomes.push(outcome);
    }

    Ok(RenameReport { outcomes })
}
