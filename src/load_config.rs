use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::{DestinationConfig, ImportConfig, SourceConfig};
use crate::conflict::ImportPolicy;

#[derive(Deserialize)]
struct StaticConfig {
    source: SourceSection,
    destination: DestinationSection,
    import_policy: String,
}

#[derive(Deserialize)]
struct SourceSection {
    root: std::path::PathBuf,
}

#[derive(Deserialize)]
struct DestinationSection {
    api_url: String,
    folder_id: String,
}

/// Loads the static YAML config file (no secrets) and merges the API key
/// from the environment. Returns a fully merged ImportConfig or an error.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ImportConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let policy = match static_conf.import_policy.as_str() {
        "RESET_DATABASE" => ImportPolicy::ResetDatabase,
        "ERROR_ON_SAME_NAME" => ImportPolicy::ErrorOnSameName,
        "SKIP_ON_SAME_NAME" => ImportPolicy::SkipOnSameName,
        "OVERWRITE_ON_SAME_NAME" => ImportPolicy::OverwriteOnSameName,
        other => {
            error!(import_policy = %other, "Unsupported import_policy in config");
            anyhow::bail!("Unsupported import_policy: {}", other);
        }
    };

    let api_key = match std::env::var("GIRDER_API_KEY") {
        Ok(key) => {
            info!("GIRDER_API_KEY found in env");
            key
        }
        Err(e) => {
            error!(error = ?e, "GIRDER_API_KEY environment variable not set");
            return Err(anyhow::anyhow!(
                "GIRDER_API_KEY environment variable not set: {e}"
            ));
        }
    };

    info!(
        source_root = %static_conf.source.root.display(),
        folder_id = %static_conf.destination.folder_id,
        ?policy,
        "Config loaded and merged successfully"
    );

    Ok(ImportConfig {
        source: SourceConfig {
            root: static_conf.source.root,
        },
        destination: DestinationConfig {
            api_url: static_conf.destination.api_url,
            folder_id: static_conf.destination.folder_id,
            api_key,
        },
        policy,
    })
}
