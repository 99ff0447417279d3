//! Handoff to an external filter tool.
//!
//! hassync does not search snapshots itself. When `[filter] command` is set,
//! the command is run with the search term appended as its last argument
//! once the snapshot has been written.

use std::process::ExitStatus;

use tokio::process::Command;
use tracing::info;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;

/// Run the configured filter tool with `term`.
pub async fn run(config: &Config, term: &str) -> Result<ExitStatus> {
    let Some((program, args)) = config.filter.command.split_first() else {
        return Err(Error::Filter("no [filter] command configured".to_string()));
    };

    let snapshot = &config.snapshot.path;
    if !tokio::fs::try_exists(snapshot).await.unwrap_or(false) {
        return Err(Error::Filter(format!(
            "snapshot {} does not exist, run export first",
            snapshot.display()
        )));
    }

    info!("Running filter {} for '{}'", program, term);
    Command::new(program)
        .args(args)
        .arg(term)
        .status()
        .await
        .map_err(|e| Error::Filter(format!("failed to run {}: {}", program, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(command: &[&str], snapshot: &std::path::Path) -> Config {
        let mut config: Config = toml::from_str(
            r#"
            [connection]
            url = "http://homeassistant.local:8123"
            token = "secret"
            "#,
        )
        .unwrap();
        config.filter.command = command.iter().map(|s| s.to_string()).collect();
        config.snapshot.path = snapshot.to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_no_command_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&[], &dir.path().join("out.yaml"));
        assert!(matches!(run(&config, "Bedroom").await, Err(Error::Filter(_))));
    }

    #[tokio::test]
    async fn test_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&["true"], &dir.path().join("out.yaml"));
        assert!(matches!(run(&config, "Bedroom").await, Err(Error::Filter(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_passes_term_as_last_argument() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("out.yaml");
        std::fs::write(&snapshot, "").unwrap();

        let config = config(&["sh", "-c", "test \"$0\" = Bedroom"], &snapshot);
        let status = run(&config, "Bedroom").await.unwrap();
        assert!(status.success());

        let status = run(&config, "Kitchen").await.unwrap();
        assert!(!status.success());
    }
}
