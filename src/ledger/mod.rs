//! Batch ledger: the durable tender-ID set shared between stages
//!
//! A leader run records the universe of tender ids it discovered; follower
//! runs reprocess exactly that universe without touching the search index.
//! The ledger is a typed, versioned TOML record written atomically
//! (temp-file + rename) so a follower can never observe a half-written set.

use crate::extract::TenderSummary;
use crate::LedgerError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// Ledger schema version this build reads and writes
pub const SCHEMA_VERSION: u32 = 1;

/// One batch member
///
/// Identity is the `app_id` alone; the access key is carried so follower
/// stages can address detail tabs without re-querying the search index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchEntry {
    /// The tender's application id
    pub app_id: String,

    /// Access key for the tender's detail tabs (empty if none was issued)
    #[serde(default)]
    pub key: String,
}

impl From<&TenderSummary> for BatchEntry {
    fn from(summary: &TenderSummary) -> Self {
        Self {
            app_id: summary.app_id.clone(),
            key: summary.key.clone(),
        }
    }
}

/// The persisted batch record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Schema version of this record
    #[serde(rename = "schema-version")]
    pub schema_version: u32,

    /// CPV code the leader run searched for
    #[serde(rename = "cpv-code")]
    pub cpv_code: String,

    /// RFC 3339 timestamp of the leader run that wrote this record
    #[serde(rename = "written-at")]
    pub written_at: String,

    /// SHA-256 over the sorted app_id set, hex-encoded
    pub checksum: String,

    /// Batch members, sorted by app_id
    #[serde(default)]
    pub entries: Vec<BatchEntry>,
}

impl BatchRecord {
    /// Builds a record for the given entries, stamping version, time and
    /// checksum. Entries are deduplicated by app_id and stored sorted.
    pub fn new(cpv_code: &str, entries: impl IntoIterator<Item = BatchEntry>) -> Self {
        let mut seen = BTreeSet::new();
        let mut sorted: Vec<BatchEntry> = entries
            .into_iter()
            .filter(|e| seen.insert(e.app_id.clone()))
            .collect();
        sorted.sort();

        let checksum = compute_checksum(&sorted);

        Self {
            schema_version: SCHEMA_VERSION,
            cpv_code: cpv_code.to_string(),
            written_at: chrono::Utc::now().to_rfc3339(),
            checksum,
            entries: sorted,
        }
    }

    /// The batch's identity set
    pub fn app_ids(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.app_id.as_str()).collect()
    }
}

/// Checksum over the sorted app_id set; key changes do not affect identity
fn compute_checksum(entries: &[BatchEntry]) -> String {
    let mut ids: Vec<&str> = entries.iter().map(|e| e.app_id.as_str()).collect();
    ids.sort_unstable();

    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Writes a batch record durably and atomically
///
/// The record is serialized to a `.tmp` sibling, synced, then renamed into
/// place. A crash mid-write leaves at most a stale temp file, never a
/// half-written ledger.
pub fn write(path: &Path, record: &BatchRecord) -> Result<(), LedgerError> {
    let content = toml::to_string_pretty(record).map_err(|e| LedgerError::Malformed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let tmp_path = path.with_extension("toml.tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;

    tracing::info!(
        "Wrote batch ledger with {} entries to {}",
        record.entries.len(),
        path.display()
    );
    Ok(())
}

/// Reads and verifies a batch record
///
/// # Errors
///
/// * `NotFound` - no ledger exists at the path; follower stages abort on this
/// * `Malformed` - the file is not a valid record
/// * `SchemaVersion` - the record was written by an incompatible build
/// * `ChecksumMismatch` - the stored ID set does not match its checksum
pub fn read(path: &Path) -> Result<BatchRecord, LedgerError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LedgerError::NotFound {
                path: path.display().to_string(),
            })
        }
        Err(e) => return Err(LedgerError::Write(e)),
    };

    let record: BatchRecord = toml::from_str(&content).map_err(|e| LedgerError::Malformed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    if record.schema_version != SCHEMA_VERSION {
        return Err(LedgerError::SchemaVersion {
            found: record.schema_version,
            supported: SCHEMA_VERSION,
        });
    }

    if compute_checksum(&record.entries) != record.checksum {
        return Err(LedgerError::ChecksumMismatch {
            path: path.display().to_string(),
        });
    }

    Ok(record)
}
