//! History store - persist tracked series to .westgard-history.json
//!
//! Besides the series, the file records a SHA-256 digest of every sheet
//! export already ingested so the same run is never appended twice.

use crate::SeriesEntry;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

const HISTORY_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFile {
    pub version: u32,
    /// RFC 3339 time of the last write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default)]
    pub series: Vec<SeriesEntry>,
    #[serde(default)]
    pub ingested: Vec<IngestedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestedFile {
    pub digest: String,
    pub name: String,
    pub ingested_at: String,
}

impl Default for HistoryFile {
    fn default() -> Self {
        Self {
            version: HISTORY_VERSION,
            updated: None,
            series: Vec::new(),
            ingested: Vec::new(),
        }
    }
}

impl HistoryFile {
    /// Fresh history holding the given baselines
    pub fn with_series(series: Vec<SeriesEntry>) -> Self {
        Self {
            series,
            ..Self::default()
        }
    }

    pub fn is_ingested(&self, digest: &str) -> bool {
        self.ingested.iter().any(|f| f.digest == digest)
    }

    /// Remember an ingested export by content digest
    pub fn record_ingested(&mut self, digest: String, name: &Path) {
        if self.is_ingested(&digest) {
            return;
        }
        self.ingested.push(IngestedFile {
            digest,
            name: name.to_string_lossy().to_string(),
            ingested_at: chrono::Utc::now().to_rfc3339(),
        });
    }
}

/// Load history (missing file gives an empty history)
pub fn load_history(path: &Path) -> Result<HistoryFile> {
    if !path.exists() {
        log::debug!("no history at {}", path.display());
        return Ok(HistoryFile::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read history: {}", path.display()))?;
    let history: HistoryFile = serde_json::from_str(&content)
        .with_context(|| format!("Invalid history file: {}", path.display()))?;
    if history.version != HISTORY_VERSION {
        bail!(
            "Unsupported history version {} in {} (expected {})",
            history.version,
            path.display(),
            HISTORY_VERSION
        );
    }
    Ok(history)
}

/// Save history, creating parent directories as needed
pub fn save_history(path: &Path, history: &mut HistoryFile) -> Result<()> {
    history.updated = Some(chrono::Utc::now().to_rfc3339());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(history).context("Failed to serialize history")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write history to {}", path.display()))?;
    Ok(())
}

/// SHA-256 of a file's content, hex encoded
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
