//! Structural validation gate: shells out to the external `bids-validator`
//! CLI. The engine only consumes the boolean verdict; the validator's
//! schema knowledge stays outside this crate.

use std::path::Path;
use std::process::Command;

use tracing::{debug, error, info};

/// Runs `bids-validator --json` on the dataset root. Returns false when the
/// validator reports errors or cannot be launched at all.
pub fn validate_dataset(root: &Path) -> bool {
    let output = match Command::new("bids-validator").arg("--json").arg(root).output() {
        Ok(output) => output,
        Err(e) => {
            error!(
                error = ?e,
                "failed to launch bids-validator; make sure bids-validator is installed"
            );
            return false;
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        error!(stderr = %stderr, "bids-validator reported errors");
        return false;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let valid = stdout.contains("\"errors\": []") || !stdout.contains("\"severity\": \"error\"");
    if valid {
        info!(root = %root.display(), "dataset passed structural validation");
    } else {
        debug!(report = %stdout, "validator report");
    }
    valid
}
