//! Backup and recovery orchestration
//!
//! A backup snapshots the enabled collections into one JSON payload, encodes
//! it (base64: reversible obfuscation, not confidentiality), and stores it
//! through the failover adapter so both backends hold a copy. Metadata is
//! persisted in state `creating` before any collection is read: a crash
//! mid-backup leaves a visible failed entry, never silent loss.
//!
//! Restore is checksum-gated. A digest mismatch aborts before any live
//! collection is touched. Past that gate, each data type restores
//! independently; per-type errors are recorded and the rest continue.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::BackupConfig;
use crate::error::PortalError;
use crate::notification::{Notification, NotificationLevel, Notifier};
use crate::storage::PersistenceAdapter;
use crate::types::{
    BackupMetadata, BackupStatus, DataType, RecoveryReport, RecoveryStatus, RestoreFailure,
    RestoreOptions, VerifyOutcome,
};
use crate::util;

const HISTORY_COLLECTION: &str = "backup_history";
const COMPONENT: &str = "backup";

const PAYLOAD_VERSION: u32 = 1;

fn payload_collection(backup_id: &str) -> String {
    format!("backup_payload_{}", util::sanitize_id(backup_id))
}

/// SHA-256 hex digest.
fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupPayload {
    version: u32,
    created_at: DateTime<Utc>,
    /// Section label → raw collection value. `Null` means the section was
    /// empty at backup time; an absent key means it was never captured.
    data: HashMap<String, Value>,
}

pub struct BackupService {
    adapter: Arc<PersistenceAdapter>,
    notifier: Arc<dyn Notifier>,
    config: BackupConfig,
}

impl BackupService {
    pub fn new(
        adapter: Arc<PersistenceAdapter>,
        notifier: Arc<dyn Notifier>,
        config: BackupConfig,
    ) -> Self {
        Self {
            adapter,
            notifier,
            config,
        }
    }

    // -------------------------------------------------------------------
    // Backup
    // -------------------------------------------------------------------

    pub async fn create_backup(
        &self,
        owner: &str,
        description: Option<String>,
    ) -> Result<BackupMetadata, PortalError> {
        let data_types = if self.config.data_types.is_empty() {
            DataType::ALL.to_vec()
        } else {
            self.config.data_types.clone()
        };

        let mut metadata = BackupMetadata {
            id: util::new_id(),
            timestamp: util::now(),
            size_bytes: 0,
            checksum: String::new(),
            data_types,
            status: BackupStatus::Creating,
            created_by: owner.to_string(),
            description,
            encoded: self.config.encode_payloads,
        };

        // Persist the creating entry up front so an interrupted backup is
        // queryable rather than silently absent.
        let mut history = self.history_list(owner).await;
        history.insert(0, metadata.clone());
        if !self.adapter.save(HISTORY_COLLECTION, &history, owner).await {
            self.notify_failure(&metadata.id, "could not persist backup metadata")
                .await;
            return Err(PortalError::Backend(
                "could not persist backup metadata".to_string(),
            ));
        }

        match self.write_payload(owner, &metadata).await {
            Ok((size_bytes, checksum)) => {
                metadata.size_bytes = size_bytes;
                metadata.checksum = checksum.clone();
                metadata.status = BackupStatus::Completed;
                self.update_entry(owner, &metadata.id, |entry| {
                    entry.size_bytes = size_bytes;
                    entry.checksum = checksum.clone();
                    entry.status = BackupStatus::Completed;
                })
                .await;
                log::info!(
                    "Backup {} completed ({} bytes, {} sections)",
                    metadata.id,
                    metadata.size_bytes,
                    metadata.data_types.len()
                );
                Ok(metadata)
            }
            Err(e) => {
                self.update_entry(owner, &metadata.id, |entry| {
                    entry.status = BackupStatus::Failed;
                })
                .await;
                self.notify_failure(&metadata.id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn write_payload(
        &self,
        owner: &str,
        metadata: &BackupMetadata,
    ) -> Result<(u64, String), PortalError> {
        let mut data = HashMap::new();
        for data_type in &metadata.data_types {
            let value: Option<Value> = self.adapter.get(data_type.collection(), owner).await;
            data.insert(data_type.label().to_string(), value.unwrap_or(Value::Null));
        }

        let payload = BackupPayload {
            version: PAYLOAD_VERSION,
            created_at: metadata.timestamp,
            data,
        };
        let serialized = serde_json::to_string(&payload)?;

        let stored = if metadata.encoded {
            BASE64.encode(serialized.as_bytes())
        } else {
            serialized
        };

        let checksum = sha256_hex(stored.as_bytes());
        let size_bytes = stored.len() as u64;

        if !self
            .adapter
            .save(&payload_collection(&metadata.id), &stored, owner)
            .await
        {
            return Err(PortalError::Backend(
                "could not store backup payload".to_string(),
            ));
        }

        Ok((size_bytes, checksum))
    }

    // -------------------------------------------------------------------
    // Verify
    // -------------------------------------------------------------------

    /// Valid iff a fresh digest of the stored payload equals the recorded
    /// checksum. A mismatch also flips the metadata to `corrupted`.
    pub async fn verify(&self, owner: &str, backup_id: &str) -> VerifyOutcome {
        let mut errors = Vec::new();

        let Some(metadata) = self.get_metadata(owner, backup_id).await else {
            return VerifyOutcome {
                backup_id: backup_id.to_string(),
                valid: false,
                errors: vec![format!("backup {} not found", backup_id)],
            };
        };

        if metadata.status != BackupStatus::Completed {
            errors.push(format!("backup status is {:?}", metadata.status));
        }

        let stored: Option<String> = self
            .adapter
            .get(&payload_collection(backup_id), owner)
            .await;
        let Some(stored) = stored else {
            errors.push("stored payload is missing".to_string());
            return VerifyOutcome {
                backup_id: backup_id.to_string(),
                valid: false,
                errors,
            };
        };

        if sha256_hex(stored.as_bytes()) != metadata.checksum {
            errors.push("checksum mismatch".to_string());
            self.update_entry(owner, backup_id, |entry| {
                entry.status = BackupStatus::Corrupted;
            })
            .await;
        }

        VerifyOutcome {
            backup_id: backup_id.to_string(),
            valid: errors.is_empty(),
            errors,
        }
    }

    // -------------------------------------------------------------------
    // Restore
    // -------------------------------------------------------------------

    pub async fn restore(
        &self,
        owner: &str,
        options: RestoreOptions,
    ) -> Result<RecoveryReport, PortalError> {
        let metadata = self
            .get_metadata(owner, &options.backup_id)
            .await
            .ok_or_else(|| PortalError::NotFound(format!("backup {}", options.backup_id)))?;

        if metadata.status != BackupStatus::Completed {
            return Err(PortalError::invalid(
                "backupId",
                format!("backup is {:?}, not completed", metadata.status),
            ));
        }

        let mut warnings = Vec::new();
        let mut safety_backup_id = None;

        // Best-effort: a safety-backup failure is a warning, not an abort.
        if options.create_safety_backup_first && !options.dry_run {
            match self
                .create_backup(owner, Some("Safety backup before restore".to_string()))
                .await
            {
                Ok(safety) => safety_backup_id = Some(safety.id),
                Err(e) => warnings.push(format!("Safety backup failed: {}", e)),
            }
        }

        let stored: Option<String> = self
            .adapter
            .get(&payload_collection(&metadata.id), owner)
            .await;
        let Some(stored) = stored else {
            warnings.push("stored payload is missing".to_string());
            return Ok(self
                .abort_corrupted(owner, &metadata, warnings, safety_backup_id, options.dry_run)
                .await);
        };

        // Checksum gate: nothing live is touched past a
        // mismatch.
        if sha256_hex(stored.as_bytes()) != metadata.checksum {
            warnings.push("checksum mismatch, restore aborted".to_string());
            return Ok(self
                .abort_corrupted(owner, &metadata, warnings, safety_backup_id, options.dry_run)
                .await);
        }

        let serialized = if metadata.encoded {
            match BASE64
                .decode(stored.as_bytes())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
            {
                Some(s) => s,
                None => {
                    warnings.push("payload could not be decoded".to_string());
                    return Ok(self
                        .abort_corrupted(
                            owner,
                            &metadata,
                            warnings,
                            safety_backup_id,
                            options.dry_run,
                        )
                        .await);
                }
            }
        } else {
            stored
        };

        let payload: BackupPayload = match serde_json::from_str(&serialized) {
            Ok(p) => p,
            Err(e) => {
                warnings.push(format!("payload is unreadable: {}", e));
                return Ok(self
                    .abort_corrupted(owner, &metadata, warnings, safety_backup_id, options.dry_run)
                    .await);
            }
        };

        let targets: Vec<DataType> = metadata
            .data_types
            .iter()
            .copied()
            .filter(|dt| {
                options.selective_data_types.is_empty()
                    || options.selective_data_types.contains(dt)
            })
            .collect();

        let mut restored = Vec::new();
        let mut failures = Vec::new();

        for data_type in targets {
            match payload.data.get(data_type.label()) {
                None => {
                    // Declared but never captured. Recorded, not fatal.
                    failures.push(RestoreFailure {
                        data_type,
                        error: "declared data type missing from payload".to_string(),
                    });
                }
                Some(Value::Null) => {
                    // Section was empty at backup time; nothing to write.
                    restored.push(data_type);
                }
                Some(value) => {
                    let value = apply_date_range(data_type, value.clone(), &options);
                    if options.dry_run {
                        restored.push(data_type);
                    } else if self
                        .adapter
                        .save(data_type.collection(), &value, owner)
                        .await
                    {
                        restored.push(data_type);
                    } else {
                        failures.push(RestoreFailure {
                            data_type,
                            error: "could not write collection".to_string(),
                        });
                    }
                }
            }
        }

        let status = if failures.is_empty() {
            RecoveryStatus::Success
        } else if restored.is_empty() {
            RecoveryStatus::Failed
        } else {
            RecoveryStatus::Partial
        };

        if status != RecoveryStatus::Success {
            let level = if status == RecoveryStatus::Failed {
                NotificationLevel::Critical
            } else {
                NotificationLevel::Warning
            };
            self.notifier
                .notify(
                    Notification::new(
                        level,
                        "Restore incomplete",
                        COMPONENT,
                        format!(
                            "Restore of backup {} finished with {} failed section(s)",
                            metadata.id,
                            failures.len()
                        ),
                    )
                    .with_action("Review the recovery report"),
                )
                .await;
        }

        Ok(RecoveryReport {
            backup_id: metadata.id,
            status,
            successful_items: restored.len(),
            failed_items: failures.len(),
            restored,
            failures,
            dry_run: options.dry_run,
            safety_backup_id,
            warnings,
        })
    }

    /// Common fatal-abort path: mark the backup corrupted, notify, report
    /// zero restored items.
    async fn abort_corrupted(
        &self,
        owner: &str,
        metadata: &BackupMetadata,
        warnings: Vec<String>,
        safety_backup_id: Option<String>,
        dry_run: bool,
    ) -> RecoveryReport {
        self.update_entry(owner, &metadata.id, |entry| {
            entry.status = BackupStatus::Corrupted;
        })
        .await;

        self.notifier
            .notify(
                Notification::new(
                    NotificationLevel::Critical,
                    "Backup corrupted",
                    COMPONENT,
                    format!("Backup {} failed integrity checks during restore", metadata.id),
                )
                .with_action("Delete the backup and restore from an earlier one"),
            )
            .await;

        RecoveryReport {
            backup_id: metadata.id.clone(),
            status: RecoveryStatus::Failed,
            restored: Vec::new(),
            failures: Vec::new(),
            successful_items: 0,
            failed_items: 0,
            dry_run,
            safety_backup_id,
            warnings,
        }
    }

    // -------------------------------------------------------------------
    // History & retention
    // -------------------------------------------------------------------

    /// Backup history, newest first.
    pub async fn list_history(&self, owner: &str) -> Vec<BackupMetadata> {
        let mut history = self.history_list(owner).await;
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history
    }

    pub async fn delete_backup(&self, owner: &str, backup_id: &str) -> Result<(), PortalError> {
        let mut history = self.history_list(owner).await;
        let before = history.len();
        history.retain(|entry| entry.id != backup_id);
        if history.len() == before {
            return Err(PortalError::NotFound(format!("backup {}", backup_id)));
        }

        if !self.adapter.save(HISTORY_COLLECTION, &history, owner).await {
            return Err(PortalError::Backend(
                "could not persist backup history".to_string(),
            ));
        }
        self.adapter
            .delete(&payload_collection(backup_id), owner)
            .await;
        Ok(())
    }

    /// Delete completed backups older than the retention window. Returns the
    /// number pruned. Failed/corrupted entries are kept for investigation.
    pub async fn prune_expired(&self, owner: &str) -> usize {
        let cutoff = util::now() - Duration::days(self.config.retention_days as i64);

        let history = self.history_list(owner).await;
        let (expired, kept): (Vec<BackupMetadata>, Vec<BackupMetadata>) = history
            .into_iter()
            .partition(|entry| {
                entry.status == BackupStatus::Completed && entry.timestamp < cutoff
            });

        if expired.is_empty() {
            return 0;
        }

        if !self.adapter.save(HISTORY_COLLECTION, &kept, owner).await {
            log::warn!("Backup retention: could not persist pruned history");
            return 0;
        }
        for entry in &expired {
            self.adapter
                .delete(&payload_collection(&entry.id), owner)
                .await;
        }

        log::info!("Backup retention: pruned {} expired backup(s)", expired.len());
        expired.len()
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    async fn history_list(&self, owner: &str) -> Vec<BackupMetadata> {
        self.adapter.get_list(HISTORY_COLLECTION, owner).await
    }

    async fn get_metadata(&self, owner: &str, backup_id: &str) -> Option<BackupMetadata> {
        self.history_list(owner)
            .await
            .into_iter()
            .find(|entry| entry.id == backup_id)
    }

    async fn update_entry(
        &self,
        owner: &str,
        backup_id: &str,
        mutate: impl FnOnce(&mut BackupMetadata),
    ) {
        let mut history = self.history_list(owner).await;
        if let Some(entry) = history.iter_mut().find(|entry| entry.id == backup_id) {
            mutate(entry);
            let _ = self.adapter.save(HISTORY_COLLECTION, &history, owner).await;
        }
    }

    async fn notify_failure(&self, backup_id: &str, reason: &str) {
        self.notifier
            .notify(
                Notification::new(
                    NotificationLevel::Critical,
                    "Backup failed",
                    COMPONENT,
                    format!("Backup {} failed: {}", backup_id, reason),
                )
                .with_action("Check storage connectivity and re-run the backup"),
            )
            .await;
    }
}

/// Drop dated items outside the requested range. Sections without a date
/// notion (metrics, saved searches) pass through untouched, as do items
/// whose date cannot be read.
fn apply_date_range(data_type: DataType, value: Value, options: &RestoreOptions) -> Value {
    if options.date_from.is_none() && options.date_to.is_none() {
        return value;
    }
    let Value::Array(items) = value else {
        return value;
    };

    let filtered: Vec<Value> = items
        .into_iter()
        .filter(|item| {
            let Some(date) = item_date(data_type, item) else {
                return true;
            };
            if let Some(from) = options.date_from {
                if date < from {
                    return false;
                }
            }
            if let Some(to) = options.date_to {
                if date > to {
                    return false;
                }
            }
            true
        })
        .collect();

    Value::Array(filtered)
}

fn item_date(data_type: DataType, item: &Value) -> Option<DateTime<Utc>> {
    let raw = match data_type {
        DataType::Activities => item.get("timestamp")?.as_str()?,
        DataType::Stories | DataType::Media => item.get("metadata")?.get("date")?.as_str()?,
        DataType::BrandTests => item.get("createdAt")?.as_str()?,
        DataType::Metrics | DataType::SavedSearches => return None,
    };
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
