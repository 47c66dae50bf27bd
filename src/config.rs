use std::path::PathBuf;

use tracing::info;

use crate::conflict::ImportPolicy;

/// Fully merged run configuration: static file plus env-supplied secrets.
#[derive(Debug)]
pub struct ImportConfig {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    pub policy: ImportPolicy,
}

/// Where the dataset lives locally.
#[derive(Debug)]
pub struct SourceConfig {
    pub root: PathBuf,
}

/// Where the dataset goes remotely. The API key is opaque to the engine;
/// only the store client consumes it.
#[derive(Debug)]
pub struct DestinationConfig {
    pub api_url: String,
    pub folder_id: String,
    pub api_key: String,
}

impl ImportConfig {
    pub fn trace_loaded(&self) {
        info!(
            source_root = %self.source.root.display(),
            api_url = %self.destination.api_url,
            folder_id = %self.destination.folder_id,
            policy = ?self.policy,
            "Loaded ImportConfig"
        );
    }
}
