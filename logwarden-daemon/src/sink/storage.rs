//! JSON Lines event store.
//!
//! Logs go to `logs.jsonl` and alerts to `alerts.jsonl` under the storage
//! directory, one object per line, each stamped with `stored_at`. Retention
//! rewrites a file without the records older than its cutoff.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use logwarden_core::error::{LogwardenError, StorageError};
use logwarden_core::pipeline::EventStore;
use logwarden_core::types::{Alert, Event};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const LOGS_FILE: &str = "logs.jsonl";
const ALERTS_FILE: &str = "alerts.jsonl";

#[derive(Serialize)]
struct StoredLog<'a> {
    stored_at: DateTime<Utc>,
    collector: &'a str,
    #[serde(flatten)]
    event: &'a Event,
}

#[derive(Serialize)]
struct StoredAlert<'a> {
    stored_at: DateTime<Utc>,
    #[serde(flatten)]
    alert: &'a Alert,
}

/// Append-only JSON Lines store.
pub struct JsonlStore {
    dir: PathBuf,
    file_lock: Mutex<()>,
}

impl JsonlStore {
    /// Create the storage directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, LogwardenError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::Write(format!("cannot create {}: {}", dir.display(), e))
        })?;
        tracing::info!(dir = %dir.display(), "event store ready");
        Ok(Self {
            dir,
            file_lock: Mutex::new(()),
        })
    }

    /// Path of the log file.
    pub fn logs_path(&self) -> PathBuf {
        self.dir.join(LOGS_FILE)
    }

    /// Path of the alert file.
    pub fn alerts_path(&self) -> PathBuf {
        self.dir.join(ALERTS_FILE)
    }

    async fn append(&self, path: &Path, lines: Vec<u8>) -> Result<(), LogwardenError> {
        if lines.is_empty() {
            return Ok(());
        }
        let _guard = self.file_lock.lock().await;
        let write = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(&lines).await?;
            file.flush().await
        };
        write
            .await
            .map_err(|e| StorageError::Write(format!("{}: {}", path.display(), e)).into())
    }

    /// Rewrite `path` keeping only records stamped at or after `cutoff`.
    async fn purge_file(&self, path: &Path, cutoff: DateTime<Utc>) -> Result<usize, LogwardenError> {
        let purge_err = |e: std::io::Error| -> LogwardenError {
            StorageError::Purge(format!("{}: {}", path.display(), e)).into()
        };

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(purge_err(e)),
        };

        let mut kept = String::with_capacity(content.len());
        let mut removed = 0;
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match stored_at(line) {
                Some(at) if at < cutoff => removed += 1,
                Some(_) => {
                    kept.push_str(line);
                    kept.push('\n');
                }
                None => {
                    tracing::warn!(path = %path.display(), "record without stored_at kept during purge");
                    kept.push_str(line);
                    kept.push('\n');
                }
            }
        }

        if removed > 0 {
            let tmp = path.with_extension("jsonl.tmp");
            tokio::fs::write(&tmp, kept).await.map_err(purge_err)?;
            tokio::fs::rename(&tmp, path).await.map_err(purge_err)?;
        }
        Ok(removed)
    }
}

fn stored_at(line: &str) -> Option<DateTime<Utc>> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value
        .get("stored_at")?
        .as_str()?
        .parse::<DateTime<Utc>>()
        .ok()
}

fn encode_lines<T: Serialize>(records: impl Iterator<Item = T>) -> Result<Vec<u8>, LogwardenError> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, &record)
            .map_err(|e| StorageError::Write(format!("serialization failed: {}", e)))?;
        out.push(b'\n');
    }
    Ok(out)
}

impl EventStore for JsonlStore {
    async fn store_logs(&self, events: &[Event], source: &str) -> Result<(), LogwardenError> {
        let stored_at = Utc::now();
        let lines = encode_lines(events.iter().map(|event| StoredLog {
            stored_at,
            collector: source,
            event,
        }))?;
        self.append(&self.logs_path(), lines).await?;
        tracing::debug!(count = events.len(), collector = source, "logs stored");
        Ok(())
    }

    async fn store_alerts(&self, alerts: &[Alert]) -> Result<(), LogwardenError> {
        let stored_at = Utc::now();
        let lines = encode_lines(alerts.iter().map(|alert| StoredAlert { stored_at, alert }))?;
        self.append(&self.alerts_path(), lines).await?;
        tracing::debug!(count = alerts.len(), "alerts stored");
        Ok(())
    }

    async fn purge_older_than(
        &self,
        log_cutoff: DateTime<Utc>,
        alert_cutoff: DateTime<Utc>,
    ) -> Result<usize, LogwardenError> {
        let _guard = self.file_lock.lock().await;
        let logs = self.purge_file(&self.logs_path(), log_cutoff).await?;
        let alerts = self.purge_file(&self.alerts_path(), alert_cutoff).await?;
        tracing::info!(logs_deleted = logs, alerts_deleted = alerts, "retention purge completed");
        Ok(logs + alerts)
    }
}
