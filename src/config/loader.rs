//! Reads and validates the mappings file.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::model::ConfigModel;
use super::schema::ConfigDocument;
use crate::error::{BridgeError, Result};
use crate::logging::category;

/// Load, decode and validate the config at `path`.
pub fn load_config(path: &Path) -> Result<ConfigModel> {
    let bytes = read_config(path)?;
    let model = parse_config(&bytes)?;
    info!(
        category = category::RELOAD,
        path = %path.display(),
        profiles = model.profiles.len(),
        dry_run = model.safety.dry_run,
        "Loaded config"
    );
    Ok(model)
}

/// Read the raw config bytes, mapping a missing file to its own error.
pub fn read_config(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BridgeError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            BridgeError::ConfigRead {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        }
    })
}

/// Decode and validate config bytes.
///
/// The returned model carries the SHA-256 of `bytes`, which reloads use to
/// skip rewrites that did not change the content.
pub fn parse_config(bytes: &[u8]) -> Result<ConfigModel> {
    let doc: ConfigDocument =
        serde_json::from_slice(bytes).map_err(|e| BridgeError::ConfigParse(e.to_string()))?;
    let model = ConfigModel::from_document(doc)?;
    let digest = content_digest(bytes);
    debug!(digest = %digest, "Config parsed");
    Ok(model.with_digest(digest))
}

/// Hex SHA-256 of config content.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
