//! Library source backed by a directory of JSON snapshots.
//!
//! Layout:
//! - `<member_id>.json`: array of tracks held by the member
//! - `enrichment.json` (optional): object mapping ISRC to enrichment record

use super::LibrarySource;
use crate::library::{identity, EnrichmentBatch, Member, Track};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENRICHMENT_FILE_NAME: &str = "enrichment.json";

pub struct FileLibrarySource {
    dir: PathBuf,
}

impl FileLibrarySource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn library_path(&self, member: &Member) -> Result<PathBuf> {
        let id = member.id.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            bail!("Invalid member id for file source: {:?}", id);
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    async fn load_enrichment(&self) -> Result<EnrichmentBatch> {
        let path = self.dir.join(ENRICHMENT_FILE_NAME);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("No enrichment file at {:?}", path);
            return Ok(EnrichmentBatch::new());
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read enrichment file {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse enrichment file {:?}", path))
    }
}

#[async_trait]
impl LibrarySource for FileLibrarySource {
    async fn fetch_all_tracks(&self, member: &Member) -> Result<Vec<Track>> {
        let path = self.library_path(member)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read library of {} at {:?}", member.id, path))?;
        let tracks: Vec<Track> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse library of {} at {:?}", member.id, path))?;
        debug!("Loaded {} tracks for member {}", tracks.len(), member.id);
        Ok(tracks)
    }

    async fn fetch_enrichment(&self, tracks: &[Track]) -> Result<EnrichmentBatch> {
        let mut all = self.load_enrichment().await?;
        let batch: EnrichmentBatch = tracks
            .iter()
            .filter_map(identity::resolve)
            .filter_map(|isrc| all.remove_entry(isrc))
            .collect();
        debug!(
            "Enrichment found for {} of {} tracks",
            batch.len(),
            tracks.len()
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::TrackEnrichment;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn track(isrc: &str) -> Track {
        Track {
            id: format!("id-{}", isrc),
            name: format!("Track {}", isrc),
            artists: vec![],
            album: None,
            external_ids: HashMap::from([("isrc".to_string(), isrc.to_string())]),
            popularity: 0,
            danceability: None,
        }
    }

    fn write_json<T: serde::Serialize>(dir: &Path, name: &str, value: &T) {
        std::fs::write(dir.join(name), serde_json::to_string(value).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_fetch_all_tracks() {
        let dir = TempDir::new().unwrap();
        write_json(dir.path(), "alice.json", &vec![track("A"), track("B")]);

        let source = FileLibrarySource::new(dir.path());
        let tracks = source
            .fetch_all_tracks(&Member::new("alice", "Alice"))
            .await
            .unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].name, "Track A");
    }

    #[tokio::test]
    async fn test_missing_library_is_an_error() {
        let dir = TempDir::new().unwrap();
        let source = FileLibrarySource::new(dir.path());

        let err = source
            .fetch_all_tracks(&Member::new("bob", "Bob"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read library of bob"));
    }

    #[tokio::test]
    async fn test_rejects_path_like_member_ids() {
        let dir = TempDir::new().unwrap();
        let source = FileLibrarySource::new(dir.path());

        for id in ["../etc", "a/b", ".hidden", ""] {
            let result = source.fetch_all_tracks(&Member::new(id, "x")).await;
            assert!(result.is_err(), "id {:?} should be rejected", id);
        }
    }

    #[tokio::test]
    async fn test_enrichment_only_for_requested_tracks() {
        let dir = TempDir::new().unwrap();
        let enrichment: EnrichmentBatch = HashMap::from([
            (
                "A".to_string(),
                TrackEnrichment {
                    popularity: Some(70),
                    ..Default::default()
                },
            ),
            (
                "Z".to_string(),
                TrackEnrichment {
                    popularity: Some(10),
                    ..Default::default()
                },
            ),
        ]);
        write_json(dir.path(), ENRICHMENT_FILE_NAME, &enrichment);

        let source = FileLibrarySource::new(dir.path());
        let batch = source
            .fetch_enrichment(&[track("A"), track("B")])
            .await
            .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch["A"].popularity, Some(70));
    }

    #[tokio::test]
    async fn test_enrichment_without_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let source = FileLibrarySource::new(dir.path());
        let batch = source.fetch_enrichment(&[track("A")]).await.unwrap();
        assert!(batch.is_empty());
    }
}
