//! Checkpoint files for resuming interrupted searches.
//!
//! A checkpoint stores the search parameters and the final counters of a
//! run, including the watermark. Results themselves are not persisted.

use domain_prospect_lib::{ProspectConfig, ProspectError, SearchSnapshot, SearchSummary};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CHECKPOINT_VERSION: u32 = 1;

/// Parameters that define the candidate space. A checkpoint only applies
/// to a search over the same space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub max_length: usize,
    pub alphabet: String,
    pub tld: String,
}

impl SearchParams {
    pub fn from_config(config: &ProspectConfig) -> Self {
        Self {
            max_length: config.max_length,
            alphabet: config.alphabet_string(),
            tld: config.tld.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub params: SearchParams,
    pub start_index: u64,
    pub end_index: u64,
    pub complete: bool,
    pub counts: SearchSnapshot,
}

impl Checkpoint {
    pub fn from_summary(config: &ProspectConfig, summary: &SearchSummary) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            params: SearchParams::from_config(config),
            start_index: summary.start_index,
            end_index: summary.end_index,
            complete: summary.is_complete(),
            counts: summary.counts,
        }
    }

    /// Read a checkpoint; a missing file is `Ok(None)`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>, ProspectError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ProspectError::file_error(path.to_string_lossy(), format!("Failed to read checkpoint: {}", e))
        })?;
        let checkpoint: Checkpoint = serde_json::from_str(&content).map_err(|e| {
            ProspectError::file_error(path.to_string_lossy(), format!("Invalid checkpoint: {}", e))
        })?;

        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(ProspectError::file_error(
                path.to_string_lossy(),
                format!("Unsupported checkpoint version {}", checkpoint.version),
            ));
        }

        Ok(Some(checkpoint))
    }

    /// Write the checkpoint atomically (temp file, then rename).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ProspectError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, path))
            .map_err(|e| {
                ProspectError::file_error(
                    path.to_string_lossy(),
                    format!("Failed to write checkpoint: {}", e),
                )
            })
    }

    /// The index to resume `config` from.
    ///
    /// Fails when the checkpoint was written for a different candidate space.
    pub fn resume_index(&self, config: &ProspectConfig) -> Result<u64, ProspectError> {
        let current = SearchParams::from_config(config);
        if self.params != current {
            return Err(ProspectError::config(format!(
                "Checkpoint is for length {} over '{}' in .{}, but this search is length {} over '{}' in .{}",
                self.params.max_length,
                self.params.alphabet,
                self.params.tld,
                current.max_length,
                current.alphabet,
                current.tld,
            )));
        }
        Ok(self.counts.watermark)
    }
}
