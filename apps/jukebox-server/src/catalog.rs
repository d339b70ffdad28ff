//! YAML track catalog and the resolver that answers queries from it.
//!
//! A query that is a known track or playlist URL resolves to that entry.
//! Any other link fails to load; plain text searches titles and authors.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use jukebox_core::node::{ResolveError, ResolveResult};
use jukebox_core::{MetadataResolver, QueueItem, Resolution};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogTrack {
    pub url: String,
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub duration_secs: u64,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl CatalogTrack {
    fn to_item(&self, requester: &str) -> QueueItem {
        let item = QueueItem::new(
            &self.url,
            requester,
            &self.identifier,
            &self.title,
            &self.author,
            Duration::from_secs(self.duration_secs),
            &self.identifier,
        );
        match &self.thumbnail {
            Some(url) => item.with_thumbnail(url),
            None => item,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPlaylist {
    pub url: String,
    pub name: String,
    /// URLs of catalog tracks, in play order.
    pub tracks: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub tracks: Vec<CatalogTrack>,
    pub playlists: Vec<CatalogPlaylist>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        let catalog: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;
        log::info!(
            "[Catalog] Loaded {} track(s) and {} playlist(s) from {}",
            catalog.tracks.len(),
            catalog.playlists.len(),
            path.display()
        );
        Ok(catalog)
    }

    fn track(&self, url: &str) -> Option<&CatalogTrack> {
        self.tracks.iter().find(|track| track.url == url)
    }
}

fn is_link(query: &str) -> bool {
    query.starts_with("http://") || query.starts_with("https://")
}

/// [`MetadataResolver`] backed by a [`Catalog`].
pub struct CatalogResolver {
    catalog: Catalog,
}

impl CatalogResolver {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    fn playlist(&self, playlist: &CatalogPlaylist, requester: &str) -> Resolution {
        let items = playlist
            .tracks
            .iter()
            .filter_map(|url| match self.catalog.track(url) {
                Some(track) => Some(track.to_item(requester)),
                None => {
                    log::warn!("[Catalog] Playlist {} lists unknown track {}", playlist.name, url);
                    None
                }
            })
            .collect();
        Resolution::Playlist {
            name: playlist.name.clone(),
            items,
        }
    }

    fn search(&self, query: &str, requester: &str) -> Resolution {
        let needle = query.to_lowercase();
        let items: Vec<QueueItem> = self
            .catalog
            .tracks
            .iter()
            .filter(|track| {
                track.title.to_lowercase().contains(&needle)
                    || track.author.to_lowercase().contains(&needle)
            })
            .map(|track| track.to_item(requester))
            .collect();
        if items.is_empty() {
            Resolution::NoMatches
        } else {
            Resolution::Search(items)
        }
    }
}

#[async_trait]
impl MetadataResolver for CatalogResolver {
    async fn resolve(&self, query: &str, requester: &str) -> ResolveResult<Resolution> {
        if !is_link(query) {
            return Ok(self.search(query, requester));
        }
        if let Some(track) = self.catalog.track(query) {
            return Ok(Resolution::Track(track.to_item(requester)));
        }
        if let Some(playlist) = self.catalog.playlists.iter().find(|p| p.url == query) {
            return Ok(self.playlist(playlist, requester));
        }
        Err(ResolveError::LoadFailed {
            query: query.to_string(),
            message: "link is not in the catalog".into(),
        })
    }
}
