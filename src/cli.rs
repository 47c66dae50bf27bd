use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::load_config::load_config;
use crate::mirror::{self, MirrorConfig, MirrorError};
use crate::store::GirderStore;
use crate::validate::validate_dataset;

/// CLI for bids-mirror: validate and upload BIDS datasets.
#[derive(Parser)]
#[clap(
    name = "bids-mirror",
    version,
    about = "Validate BIDS datasets and mirror them into a Girder folder hierarchy"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the dataset, then mirror it into the destination folder
    Import {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Skip the bids-validator pre-check
        #[clap(long)]
        ignore_validation: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import {
            config,
            ignore_validation,
        } => {
            let config = load_config(config)?;
            config.trace_loaded();

            if ignore_validation {
                tracing::warn!("skipping dataset validation on request");
            } else {
                println!("Validating dataset...");
                if !validate_dataset(&config.source.root) {
                    eprintln!("[ERROR] Dataset validation failed. Aborting import.");
                    return Err(MirrorError::ValidationFailed {
                        root: config.source.root,
                    }
                    .into());
                }
                println!("Dataset is valid.");
            }

            let store = GirderStore::connect(&config.destination.api_url, &config.destination.api_key)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to girder: {e}"))?;

            let mirror_config = MirrorConfig {
                source_root: config.source.root,
                destination_id: config.destination.folder_id,
                policy: config.policy,
            };

            println!("Import starting...");
            match mirror::mirror(&mirror_config, &store).await {
                Ok(report) => {
                    println!("Import complete.\nReport:");
                    println!("{:#?}", report);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] Import failed: {}", e);
                    Err(e.into())
                }
            }
        }
    }
}
