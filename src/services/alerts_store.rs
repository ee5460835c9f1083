//! Persistent storage for alerts.
//!
//! Records are kept as raw JSON objects so rewriting the file never drops
//! fields the current schema does not know about.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::services::alert_rules::id_string;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("alerts file write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("alerts could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// All records in storage order. Never fails: missing or unreadable
    /// storage reads as empty.
    async fn list(&self) -> Vec<Value>;

    /// Appends a record, filling in `id` and `created_at` when absent.
    async fn add(&self, candidate: Map<String, Value>) -> Result<Map<String, Value>, StoreError>;

    /// Removes records with the given id. Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// Short random id, 10 hex chars.
pub fn new_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(10);
    id
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn stamp(mut candidate: Map<String, Value>) -> Map<String, Value> {
    if is_blank(candidate.get("id")) {
        candidate.insert("id".to_string(), Value::String(new_id()));
    }
    if is_blank(candidate.get("created_at")) {
        candidate.insert("created_at".to_string(), Value::String(Utc::now().to_rfc3339()));
    }
    candidate
}

fn has_id(record: &Value, id: &str) -> bool {
    record.get("id").and_then(id_string).as_deref() == Some(id)
}

async fn write_then_rename(tmp: &Path, dest: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(tmp, dest).await
}

/// Alerts stored as a JSON array in a single file.
///
/// Writes go to `<path>.tmp` and are renamed into place. Mutations within
/// this process are serialized; separate processes sharing the file are not.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    async fn read_records(&self) -> Vec<Value> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "alerts file unreadable, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "alerts file is not a JSON array, treating as empty");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "alerts file is corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    async fn write_records(&self, records: &[Value]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let content = serde_json::to_vec_pretty(records)?;
        let tmp = self.tmp_path();

        if let Err(e) = write_then_rename(&tmp, &self.path, &content).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(path = %self.path.display(), count = records.len(), "alerts saved");
        Ok(())
    }
}

#[async_trait]
impl AlertStore for JsonFileStore {
    async fn list(&self) -> Vec<Value> {
        self.read_records().await
    }

    async fn add(&self, candidate: Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
        let _guard = self.write_lock.lock().await;

        let record = stamp(candidate);
        let mut records = self.read_records().await;
        records.push(Value::Object(record.clone()));
        self.write_records(&records).await?;

        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_records().await;
        let before = records.len();
        records.retain(|r| !has_id(r, id));

        if records.len() == before {
            return Ok(false);
        }

        self.write_records(&records).await?;
        Ok(true)
    }
}

/// In-memory store, for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn list(&self) -> Vec<Value> {
        self.records.lock().await.clone()
    }

    async fn add(&self, candidate: Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
        let record = stamp(candidate);
        self.records.lock().await.push(Value::Object(record.clone()));
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| !has_id(r, id));
        Ok(records.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn candidate(symbol: &str) -> Map<String, Value> {
        let v = json!({ "symbol": symbol, "type": "price", "op": ">", "value": 100.0 });
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn missing_file_lists_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("alerts.json"));
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_lists_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.list().await.is_empty());

        std::fs::write(&path, r#"{"symbol":"BTC"}"#).unwrap();
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn add_then_list_then_delete() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("alerts.json"));

        let stored = store.add(candidate("BTC")).await.unwrap();
        let id = stored["id"].as_str().unwrap().to_string();
        assert_eq!(id.len(), 10);
        assert!(stored["created_at"].as_str().is_some());

        let records = store.list().await;
        assert_eq!(records, vec![Value::Object(stored.clone())]);

        assert!(store.delete(&id).await.unwrap());
        assert!(store.list().await.is_empty());
        assert!(!dir.path().join("alerts.json.tmp").exists());
    }

    #[tokio::test]
    async fn delete_unknown_id_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        let legacy = r#"[{"symbol":"BTC","type":"price_above","value":"100"}]"#;
        std::fs::write(&path, legacy).unwrap();

        let store = JsonFileStore::new(&path);
        assert!(!store.delete("nope").await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), legacy);
    }

    #[tokio::test]
    async fn rewrite_preserves_legacy_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        std::fs::write(
            &path,
            r#"[{"id":"old","symbol":"eth","type":"pct24_below","value":"-5","note":"keep"}]"#,
        )
        .unwrap();

        let store = JsonFileStore::new(&path);
        store.add(candidate("BTC")).await.unwrap();

        let records = store.list().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "pct24_below");
        assert_eq!(records[0]["note"], "keep");
        assert_eq!(records[1]["symbol"], "BTC");
    }

    #[tokio::test]
    async fn given_id_and_timestamp_are_kept() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("alerts.json"));

        let mut c = candidate("SOL");
        c.insert("id".into(), json!("fixed"));
        c.insert("created_at".into(), json!("2024-01-01T00:00:00+00:00"));

        let stored = store.add(c).await.unwrap();
        assert_eq!(stored["id"], "fixed");
        assert_eq!(stored["created_at"], "2024-01-01T00:00:00+00:00");
        assert!(store.delete("fixed").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_adds_in_process_are_not_lost() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(JsonFileStore::new(dir.path().join("alerts.json")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.add(candidate(&format!("C{i}"))).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.list().await.len(), 8);
    }

    #[tokio::test]
    async fn numeric_ids_can_be_deleted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        std::fs::write(
            &path,
            r#"[{"id":5,"symbol":"BTC","type":"price","op":">","value":1},{"id":"6","symbol":"ETH","type":"price","op":">","value":1}]"#,
        )
        .unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.delete("5").await.unwrap());

        let records = store.list().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], "6");

        let mem = MemoryStore::with_records(vec![json!({ "id": 7, "symbol": "SOL" })]);
        assert!(mem.delete("7").await.unwrap());
        assert!(mem.list().await.is_empty());
    }

    #[tokio::test]
    async fn failed_write_removes_tmp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        // a non-empty directory in place of the file makes the rename fail
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let store = JsonFileStore::new(&path);
        let err = store.add(candidate("BTC")).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(!dir.path().join("alerts.json.tmp").exists());
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let stored = store.add(candidate("ADA")).await.unwrap();
        let id = stored["id"].as_str().unwrap().to_string();

        assert_eq!(store.list().await.len(), 1);
        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
    }
}
