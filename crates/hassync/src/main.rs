//! hassync command line.
//!
//! Usage:
//!   hassync export [--filter TERM]   write the registry snapshot
//!   hassync preview                  show the renames the snapshot implies
//!   hassync rename [--yes]           push snapshot names to the registry

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use hassync::Config;
use hassync::RenameMapping;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "hassync")]
#[command(about = "Export the Home Assistant device registry and rename devices from the export")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "hassync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Fetch devices, entities and areas and write the snapshot file
    Export {
        /// Hand the snapshot to the configured filter tool with this term
        #[arg(long)]
        filter: Option<String>,
    },

    /// Show the renames the snapshot file would apply
    Preview,

    /// Rename devices to the names in the snapshot file
    Rename {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.logging.targets())
        .init();

    match args.command {
        Cmd::Export { filter } => {
            let records = hassync::sync::export(&config).await?;
            println!(
                "Exported {} entities to {}",
                records.len(),
                config.snapshot.path.display()
            );
            if let Some(term) = filter {
                let status = hassync::filter::run(&config, &term).await?;
                if !status.success() {
                    anyhow::bail!("filter exited with {}", status);
                }
            }
        }
        Cmd::Preview => {
            let parsed = hassync::sync::load_mapping(&config).await?;
            print_preview(&parsed.mapping, usize::MAX);
        }
        Cmd::Rename { yes } => {
            let parsed = hassync::sync::load_mapping(&config).await?;
            if parsed.mapping.is_empty() {
                println!("No valid device data found in {}", config.snapshot.path.display());
                return Ok(());
            }

            print_preview(&parsed.mapping, config.rename.preview_limit);
            let confirmed = yes
                || confirm(&format!(
                    "Push these {} name changes to the device registry? (y/n): ",
                    parsed.mapping.len()
                ))
                .await?;
            if !confirmed {
                println!("Cancelled.");
                return Ok(());
            }

            let report = hassync::sync::rename(&config, &parsed.mapping, confirmed).await?;
            println!("{}", report);
            if !report.is_success() {
                anyhow::bail!("{} renames failed", report.failures().count());
            }
        }
    }

    Ok(())
}

fn print_preview(mapping: &RenameMapping, limit: usize) {
    for (device_id, name) in mapping.iter().take(limit) {
        println!("{} --> {}", device_id, name);
    }
    if mapping.len() > limit {
        println!("... and {} more", mapping.len() - limit);
    }
}

async fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("reading confirmation")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
