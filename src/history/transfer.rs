//! Whole-store export and merge-import
//!
//! Export wraps the full collection in a versioned snapshot document.
//! Import validates the document shape up front, then processes records
//! one by one: each valid record is re-created with a fresh identifier
//! (imported ids are never trusted, to avoid collisions with existing
//! records) while malformed records are reported and skipped.

use crate::error::{CarelogError, Result};
use crate::history::repository::ConversationRepository;
use crate::history::types::{Conversation, Message};
use crate::store::BlobStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Advisory format-version tag written into snapshots
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Versioned, self-contained export of the full conversation collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    /// When the snapshot was produced
    pub exported_at: DateTime<Utc>,
    /// Format-version tag; an advisory compatibility marker, not a
    /// strict schema gate
    pub version: String,
    /// The exported conversation records
    pub conversations: Vec<Conversation>,
}

/// Outcome of a merge-import
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Number of records successfully re-created
    pub imported: usize,
    /// One entry per record that failed validation or creation
    pub errors: Vec<String>,
}

/// Export the full repository contents as a snapshot document
pub fn export_all<S: BlobStore>(repository: &ConversationRepository<S>) -> SnapshotDocument {
    SnapshotDocument {
        exported_at: Utc::now(),
        version: SNAPSHOT_VERSION.to_string(),
        conversations: repository.list(),
    }
}

/// Merge a snapshot into the repository
///
/// Fails fast with [`CarelogError::MalformedSnapshot`] when the input is
/// not a recognizable document. Individual malformed records are
/// recorded in the report and processing continues; records imported
/// before a later failure stay. Each imported record receives a new id
/// and an `updated_at` of import time via the repository's `create`.
pub fn import_all<S: BlobStore>(
    repository: &mut ConversationRepository<S>,
    raw: &str,
) -> Result<ImportReport> {
    let document: Value = serde_json::from_str(raw)
        .map_err(|e| CarelogError::MalformedSnapshot(format!("not valid JSON: {}", e)))?;

    let records = document
        .get("conversations")
        .ok_or_else(|| {
            CarelogError::MalformedSnapshot("missing 'conversations' field".to_string())
        })?
        .as_array()
        .ok_or_else(|| {
            CarelogError::MalformedSnapshot("'conversations' is not an array".to_string())
        })?;

    if let Some(version) = document.get("version").and_then(Value::as_str) {
        if version != SNAPSHOT_VERSION {
            tracing::debug!(
                "Importing snapshot with version {} (current {})",
                version,
                SNAPSHOT_VERSION
            );
        }
    }

    let mut report = ImportReport::default();

    for (index, record) in records.iter().enumerate() {
        match import_record(repository, record) {
            Ok(()) => report.imported += 1,
            Err(err) => {
                tracing::warn!("Skipping snapshot record {}: {}", index, err);
                report.errors.push(format!("record {}: {}", index, err));
            }
        }
    }

    tracing::info!(
        "Imported {} conversation(s), {} error(s)",
        report.imported,
        report.errors.len()
    );
    Ok(report)
}

/// Validate one snapshot record and re-create it with a fresh identity
fn import_record<S: BlobStore>(
    repository: &mut ConversationRepository<S>,
    record: &Value,
) -> Result<()> {
    let id = record
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if id.is_empty() {
        return Err(CarelogError::MalformedRecord("missing or empty id".to_string()).into());
    }

    let title = record
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if title.is_empty() {
        return Err(CarelogError::MalformedRecord(format!("id {}: empty title", id)).into());
    }

    let messages_value = record.get("messages").ok_or_else(|| {
        CarelogError::MalformedRecord(format!("id {}: missing message list", id))
    })?;
    let messages: Vec<Message> = serde_json::from_value(messages_value.clone())
        .map_err(|e| CarelogError::MalformedRecord(format!("id {}: bad messages: {}", id, e)))?;

    let character_description = record
        .get("characterDescription")
        .and_then(Value::as_str);

    repository.create(&messages, character_description)?;
    Ok(())
}
