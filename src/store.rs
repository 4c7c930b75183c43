use std::path::PathBuf;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::models::Record;

pub const STORAGE_KEY: &str = "frequencia_records";

pub trait Backend {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    async fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    async fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Stores each key as `<dir>/<key>.json`.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Backend for FileBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, value).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The record collection, kept as one JSON array under [`STORAGE_KEY`].
///
/// Every mutation rewrites the whole array. Read-modify-write sequences hold
/// `write_lock` so concurrent appends cannot drop each other's records.
pub struct Store<B> {
    backend: B,
    write_lock: Mutex<()>,
}

impl<B: Backend> Store<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// All stored records. Missing, unreadable or corrupted data yields an
    /// empty collection.
    pub async fn get_all(&self) -> Vec<Record> {
        match self.load().await {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Treating stored records as empty: {e}");
                Vec::new()
            }
        }
    }

    pub async fn append(&self, record: Record) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        log::debug!("Appending record {} for {}", record.id, record.student_name);
        records.push(record);
        self.persist(&records).await
    }

    pub async fn append_all(&self, batch: Vec<Record>) -> Result<usize, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let added = batch.len();
        records.extend(batch);
        self.persist(&records).await?;
        Ok(added)
    }

    pub async fn replace_all(&self, records: &[Record]) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.persist(records).await
    }

    /// Returns whether a record with that id existed.
    pub async fn delete_by_id(&self, id: Uuid) -> Result<bool, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        let removed = records.len() != before;
        if removed {
            log::debug!("Deleting record {id}");
            self.persist(&records).await?;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        log::debug!("Clearing all records");
        self.backend.remove(STORAGE_KEY).await
    }

    async fn load(&self) -> Result<Vec<Record>, PersistenceError> {
        let Some(payload) = self.backend.read(STORAGE_KEY).await? else {
            return Ok(Vec::new());
        };
        if payload.trim().is_empty() || payload.trim() == "null" {
            return Ok(Vec::new());
        }
        serde_json::from_str(&payload).map_err(|source| PersistenceError::Corrupted {
            key: STORAGE_KEY.to_string(),
            source,
        })
    }

    async fn persist(&self, records: &[Record]) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string(records).map_err(PersistenceError::Encode)?;
        self.backend.write(STORAGE_KEY, &payload).await
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryBackend {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl Backend for MemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_input;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(name: &str, month: u32) -> Record {
        Record::create(sample_input(name, month, 2024, 18, 20))
    }

    #[tokio::test]
    async fn empty_store_reads_as_empty() {
        let store = Store::new(MemoryBackend::default());
        assert!(store.get_all().await.is_empty());
    }

    #[tokio::test]
    async fn append_then_delete_restores_prior_state() {
        let store = Store::new(MemoryBackend::default());
        store.append(record("Ana", 1)).await.unwrap();
        store.append(record("Bia", 2)).await.unwrap();
        let before = store.get_all().await;

        let extra = record("Caio", 3);
        let id = extra.id;
        store.append(extra).await.unwrap();
        assert_eq!(store.get_all().await.len(), 3);

        assert!(store.delete_by_id(id).await.unwrap());
        assert_eq!(store.get_all().await, before);
        assert!(!store.delete_by_id(id).await.unwrap());
    }

    #[tokio::test]
    async fn clear_and_replace_rewrite_everything() {
        let store = Store::new(MemoryBackend::default());
        store.append(record("Ana", 1)).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.get_all().await.is_empty());

        let batch = vec![record("Bia", 2), record("Caio", 3)];
        store.replace_all(&batch).await.unwrap();
        assert_eq!(store.get_all().await, batch);
    }

    #[tokio::test]
    async fn corrupted_payload_reads_empty_but_blocks_writes() {
        let backend = MemoryBackend::default();
        backend.write(STORAGE_KEY, "{not json").await.unwrap();
        let store = Store::new(backend);

        assert!(store.get_all().await.is_empty());
        let err = store.append(record("Ana", 1)).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupted { .. }));
        assert_eq!(
            store.backend.read(STORAGE_KEY).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    // Yields between reading and returning so concurrent appends interleave.
    #[derive(Default)]
    struct YieldingBackend(MemoryBackend);

    impl Backend for YieldingBackend {
        async fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            let value = self.0.read(key).await;
            tokio::task::yield_now().await;
            value
        }

        async fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
            self.0.write(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
            self.0.remove(key).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_all_kept() {
        let store = Arc::new(Store::new(YieldingBackend::default()));

        let mut handles = Vec::new();
        for month in 0..50u32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.append(record("Ana", month % 12 + 1)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get_all().await.len(), 50);
    }

    #[tokio::test]
    async fn file_backend_persists_across_instances() {
        let dir = tempdir().unwrap();
        let first = Store::new(FileBackend::new(dir.path()));
        first.append(record("Ana", 4)).await.unwrap();
        assert!(dir.path().join("frequencia_records.json").exists());

        let second = Store::new(FileBackend::new(dir.path()));
        let records = second.get_all().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].student_name, "Ana");

        second.clear().await.unwrap();
        assert!(second.get_all().await.is_empty());
        // Clearing twice is not an error.
        second.clear().await.unwrap();
    }

    #[tokio::test]
    async fn missing_optional_fields_default_to_empty() {
        let backend = MemoryBackend::default();
        let payload = r#"[{"id":"01890a5d-ac96-774b-bcce-b302099a8057","studentName":"Ana",
            "month":3,"year":2024,"daysAttended":18,"totalDays":20,"frequency":90,
            "createdAt":"2024-03-01T12:00:00Z"}]"#;
        backend.write(STORAGE_KEY, payload).await.unwrap();
        let store = Store::new(backend);
        let records = store.get_all().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].inep_code, "");
        assert_eq!(records[0].reason, "");
    }
}
