//! Xray config document storage.
//!
//! One JSON document at a fixed path. Reads return the stored bytes
//! verbatim; writes are validated (content type, top-level object with
//! `inbounds` and `outbounds`) and then committed atomically via a temporary
//! sibling file and a rename, so readers observe either the old or the new
//! document in full.
//!
//! Concurrent writers are not serialized: the last rename wins.

use crate::Error;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Media type required on writes. Compared exactly.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Top-level keys a document must carry, checked in this order.
pub const REQUIRED_KEYS: [&str; 2] = ["inbounds", "outbounds"];

/// File-backed store for the config document.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full current document.
    pub async fn get(&self) -> Result<Vec<u8>, Error> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::NotReadable(format!("{}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), bytes = data.len(), "Config read");
        Ok(data)
    }

    /// Validate `document` and replace the stored one with its raw bytes.
    pub async fn put(&self, document: &[u8], content_type: Option<&str>) -> Result<(), Error> {
        match content_type {
            Some(JSON_CONTENT_TYPE) => {}
            other => {
                return Err(Error::UnsupportedMediaType(
                    other.unwrap_or_default().to_string(),
                ))
            }
        }

        validate_document(document)?;
        self.write_atomic(document).await?;

        info!(path = %self.path.display(), bytes = document.len(), "Config written");
        Ok(())
    }

    /// Write to a uniquely named temp file next to the target, fsync, rename.
    async fn write_atomic(&self, data: &[u8]) -> Result<(), Error> {
        let tmp = self.temp_path();
        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(e) = result {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(Error::NotWritable(format!("{}: {e}", self.path.display())));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        use rand::Rng;
        let suffix: u64 = rand::thread_rng().gen();
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config".into());
        self.path.with_file_name(format!(".{name}.{suffix:016x}.tmp"))
    }
}

/// Shallow structural check: a JSON object with every key in [`REQUIRED_KEYS`].
/// Values are opaque; the authoritative schema belongs to Xray.
pub fn validate_document(document: &[u8]) -> Result<(), Error> {
    let value: Value =
        serde_json::from_slice(document).map_err(|e| Error::MalformedDocument(e.to_string()))?;

    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(Error::MalformedDocument(format!(
                "top level is {}, expected an object",
                json_kind(&other)
            )))
        }
    };

    for key in REQUIRED_KEYS {
        if !map.contains_key(key) {
            return Err(Error::IncompleteDocument(key));
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
