use std::future::Future;

use lumen_m3u::PlaylistEntry;

use crate::error::{LumenError, LumenResult};

/// A title resolved from one source, with the urls of its episodes in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleDetail {
    pub id: String,
    pub source: String,
    pub source_name: String,
    pub title: String,
    pub poster: Option<String>,
    pub year: Option<String>,
    pub episodes: Vec<String>,
}

impl TitleDetail {
    /// A title is identified by its id within a source. Requests without an
    /// id fall back to the display title.
    fn is_same_title(&self, title: &str, source: &str, id: &str) -> bool {
        if self.source != source {
            return false;
        }
        if id.is_empty() {
            self.title == title
        } else {
            self.id == id
        }
    }

    pub(crate) fn is_resolved_for(&self, title: &str, source: &str, id: &str) -> bool {
        !self.episodes.is_empty() && self.is_same_title(title, source, id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub url: String,
    pub title: String,
}

impl Episode {
    pub(crate) fn list(urls: &[String]) -> Vec<Self> {
        urls.iter()
            .enumerate()
            .map(|(index, url)| Self {
                url: url.clone(),
                title: format!("Episode {}", index + 1),
            })
            .collect()
    }
}

/// Looks up the episodes of a title. Implementations usually hit the network.
pub trait TitleResolver: Send + Sync {
    fn resolve(
        &self,
        title: &str,
        source: &str,
        id: &str,
    ) -> impl Future<Output = LumenResult<TitleDetail>> + Send;
}

/// Resolves live channels from an ingested playlist. Every channel is a
/// title with a single episode: its stream.
pub struct PlaylistResolver {
    source_name: String,
    entries: Vec<PlaylistEntry>,
}

impl PlaylistResolver {
    pub fn new(source_name: impl Into<String>, entries: Vec<PlaylistEntry>) -> Self {
        Self {
            source_name: source_name.into(),
            entries,
        }
    }

    fn find(&self, title: &str, id: &str) -> Option<&PlaylistEntry> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .or_else(|| self.entries.iter().find(|entry| entry.name == title))
    }
}

impl TitleResolver for PlaylistResolver {
    async fn resolve(&self, title: &str, source: &str, id: &str) -> LumenResult<TitleDetail> {
        let entry = self
            .find(title, id)
            .ok_or_else(|| LumenError::ResolveFailure(format!("no channel named {title}")))?;

        Ok(TitleDetail {
            id: entry.id.clone(),
            source: source.to_string(),
            source_name: self.source_name.clone(),
            title: entry.name.clone(),
            poster: (!entry.logo.is_empty()).then(|| entry.logo.clone()),
            year: None,
            episodes: vec![entry.url.clone()],
        })
    }
}
