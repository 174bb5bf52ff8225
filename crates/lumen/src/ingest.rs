use std::time::Duration;

use bytes::Bytes;
use lumen_m3u::{parse, PlaylistEntry, Recipe};
use reqwest::{header::USER_AGENT, Client, IntoUrl};
use serde::Deserialize;

use crate::error::{LumenError, LumenResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub user_agent: Option<String>,
    /// `password|salt_hex|iv_hex|iterations`. When set, the playlist body is
    /// treated as cipher text.
    pub decrypt_recipe: Option<String>,
}

/// Fetches channel playlists and turns them into [`PlaylistEntry`] lists.
#[derive(Clone)]
pub struct PlaylistIngestor {
    client: Client,
}

impl PlaylistIngestor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> LumenResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client))
    }

    /// Fetch, decrypt if needed and parse a playlist.
    ///
    /// Never fails: a broken playlist is logged and yields no channels.
    pub async fn ingest(&self, url: impl IntoUrl, options: &IngestOptions) -> Vec<PlaylistEntry> {
        match self.try_ingest(url, options).await {
            Ok(entries) => entries,
            Err(e) => {
                log::info!("Error fetching or parsing playlist: {e}");
                Vec::new()
            }
        }
    }

    pub async fn try_ingest(
        &self,
        url: impl IntoUrl,
        options: &IngestOptions,
    ) -> LumenResult<Vec<PlaylistEntry>> {
        let recipe = options
            .decrypt_recipe
            .as_deref()
            .map(str::parse::<Recipe>)
            .transpose()?;

        let body = self.fetch(url, options.user_agent.as_deref()).await?;

        let entries = tokio::task::spawn_blocking(move || -> LumenResult<_> {
            let text = match recipe {
                Some(recipe) => recipe.decrypt(&body)?,
                None => String::from_utf8_lossy(&body).into_owned(),
            };
            Ok(parse(&text))
        })
        .await??;

        log::debug!("Parsed {} channels from playlist.", entries.len());
        Ok(entries)
    }

    async fn fetch(&self, url: impl IntoUrl, user_agent: Option<&str>) -> LumenResult<Bytes> {
        let mut request = self.client.get(url);
        if let Some(user_agent) = user_agent {
            request = request.header(USER_AGENT, user_agent);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            if let Ok(body) = response.text().await {
                log::warn!("Error body: {body}");
            }
            return Err(LumenError::HttpError(status));
        }

        Ok(response.bytes().await?)
    }
}

impl Default for PlaylistIngestor {
    fn default() -> Self {
        Self::new(
            Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        )
    }
}
