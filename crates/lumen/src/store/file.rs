use super::{record_key, PlayRecord, ProgressStore};
use crate::error::LumenResult;
use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};
use tokio::sync::Mutex;

/// Keeps every record in a single JSON object keyed by `source+id`.
pub struct FileProgressStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileProgressStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> LumenResult<BTreeMap<String, PlayRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(data) if data.is_empty() => Ok(BTreeMap::new()),
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, records: &BTreeMap<String, PlayRecord>) -> LumenResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec_pretty(records)?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(tmp_path, &self.path).await?;
        Ok(())
    }
}

impl ProgressStore for FileProgressStore {
    async fn get(&self, source: &str, id: &str) -> LumenResult<Option<PlayRecord>> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        Ok(records.remove(&record_key(source, id)))
    }

    async fn save(&self, source: &str, id: &str, record: PlayRecord) -> LumenResult<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.insert(record_key(source, id), record);
        self.store(&records).await?;
        log::debug!("Saved play record {source}+{id} to {}", self.path.display());
        Ok(())
    }

    async fn records(&self) -> LumenResult<Vec<(String, PlayRecord)>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(play_time: u64) -> PlayRecord {
        PlayRecord {
            title: "Title".to_string(),
            cover: "https://img/cover.jpg".to_string(),
            episode_index: 3,
            total_episodes: 12,
            play_time,
            total_time: 1440,
            source_name: "Source".to_string(),
            year: "2024".to_string(),
            intro_end_millis: Some(85_000),
            outro_start_offset_millis: None,
        }
    }

    #[tokio::test]
    async fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.json");

        let store = FileProgressStore::new(path.clone());
        assert_eq!(store.get("src", "42").await.unwrap(), None);
        store.save("src", "42", record(100)).await.unwrap();

        let reopened = FileProgressStore::new(path.clone());
        assert_eq!(reopened.get("src", "42").await.unwrap(), Some(record(100)));
        assert_eq!(reopened.records().await.unwrap().len(), 1);

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["src+42"]["index"], 3);
        assert_eq!(json["src+42"]["introEndTime"], 85_000);
        assert!(json["src+42"].get("outroStartTime").is_none());
    }

    #[tokio::test]
    async fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = FileProgressStore::new(path);
        assert!(store.get("src", "1").await.is_err());
    }
}
