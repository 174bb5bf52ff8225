pub mod file;
pub mod memory;

use std::{future::Future, path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::LumenResult;

/// Progress of one title from one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub title: String,
    pub cover: String,
    /// 1-based episode number
    #[serde(rename = "index")]
    pub episode_index: u32,
    pub total_episodes: u32,
    /// Seconds
    pub play_time: u64,
    /// Seconds, 0 when unknown
    pub total_time: u64,
    pub source_name: String,
    pub year: String,
    #[serde(
        rename = "introEndTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub intro_end_millis: Option<u64>,
    /// Distance from the end of the media where the outro starts.
    #[serde(
        rename = "outroStartTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub outro_start_offset_millis: Option<u64>,
}

pub(crate) fn record_key(source: &str, id: &str) -> String {
    format!("{source}+{id}")
}

/// Durable storage for [`PlayRecord`]s, keyed by source and title id.
pub trait ProgressStore: Send + Sync + 'static {
    fn get(
        &self,
        source: &str,
        id: &str,
    ) -> impl Future<Output = LumenResult<Option<PlayRecord>>> + Send;

    /// Create or overwrite the record of a title.
    fn save(
        &self,
        source: &str,
        id: &str,
        record: PlayRecord,
    ) -> impl Future<Output = LumenResult<()>> + Send;

    /// All stored records with their `source+id` keys, sorted by key.
    fn records(&self) -> impl Future<Output = LumenResult<Vec<(String, PlayRecord)>>> + Send;
}

impl<S> ProgressStore for Arc<S>
where
    S: ProgressStore,
{
    fn get(
        &self,
        source: &str,
        id: &str,
    ) -> impl Future<Output = LumenResult<Option<PlayRecord>>> + Send {
        self.as_ref().get(source, id)
    }

    fn save(
        &self,
        source: &str,
        id: &str,
        record: PlayRecord,
    ) -> impl Future<Output = LumenResult<()>> + Send {
        self.as_ref().save(source, id, record)
    }

    fn records(&self) -> impl Future<Output = LumenResult<Vec<(String, PlayRecord)>>> + Send {
        self.as_ref().records()
    }
}

pub enum LumenStore {
    Memory(memory::MemoryProgressStore),
    File(file::FileProgressStore),
}

impl LumenStore {
    pub fn memory() -> Self {
        Self::Memory(memory::MemoryProgressStore::new())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(file::FileProgressStore::new(path.into()))
    }
}

impl ProgressStore for LumenStore {
    async fn get(&self, source: &str, id: &str) -> LumenResult<Option<PlayRecord>> {
        match self {
            LumenStore::Memory(store) => store.get(source, id).await,
            LumenStore::File(store) => store.get(source, id).await,
        }
    }

    async fn save(&self, source: &str, id: &str, record: PlayRecord) -> LumenResult<()> {
        match self {
            LumenStore::Memory(store) => store.save(source, id, record).await,
            LumenStore::File(store) => store.save(source, id, record).await,
        }
    }

    async fn records(&self) -> LumenResult<Vec<(String, PlayRecord)>> {
        match self {
            LumenStore::Memory(store) => store.records().await,
            LumenStore::File(store) => store.records().await,
        }
    }
}
