use super::{record_key, PlayRecord, ProgressStore};
use crate::error::LumenResult;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

#[derive(Clone, Default)]
pub struct MemoryProgressStore {
    records: Arc<Mutex<BTreeMap<String, PlayRecord>>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgressStore {
    async fn get(&self, source: &str, id: &str) -> LumenResult<Option<PlayRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.get(&record_key(source, id)).cloned())
    }

    async fn save(&self, source: &str, id: &str, record: PlayRecord) -> LumenResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record_key(source, id), record);
        Ok(())
    }

    async fn records(&self) -> LumenResult<Vec<(String, PlayRecord)>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(play_time: u64) -> PlayRecord {
        PlayRecord {
            title: "Title".to_string(),
            cover: String::new(),
            episode_index: 1,
            total_episodes: 12,
            play_time,
            total_time: 1440,
            source_name: "Source".to_string(),
            year: "2024".to_string(),
            intro_end_millis: None,
            outro_start_offset_millis: Some(90_000),
        }
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryProgressStore::new();
        assert_eq!(store.get("src", "1").await.unwrap(), None);

        store.save("src", "1", record(10)).await.unwrap();
        store.save("src", "1", record(20)).await.unwrap();
        store.save("other", "1", record(30)).await.unwrap();

        assert_eq!(store.get("src", "1").await.unwrap(), Some(record(20)));
        let keys: Vec<_> = store
            .records()
            .await
            .unwrap()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, ["other+1", "src+1"]);
    }
}
