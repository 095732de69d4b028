//! Library source driven by a per-member script.

use anyhow::{bail, Result};
use async_trait::async_trait;
use shared_playlists::library::{identity, EnrichmentBatch, Member, MemberId, Track, TrackEnrichment};
use shared_playlists::LibrarySource;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
enum Script {
    Tracks(Vec<Track>),
    Fail(String),
    Panic,
    Slow(Duration, Vec<Track>),
}

/// Members without a script get an empty library.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: HashMap<MemberId, Script>,
    enrichment: EnrichmentBatch,
    enrichment_fails: bool,
    enrichment_panics: bool,
    enrichment_requests: Mutex<Vec<Vec<String>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracks(mut self, member_id: &str, tracks: Vec<Track>) -> Self {
        self.scripts
            .insert(MemberId::new(member_id), Script::Tracks(tracks));
        self
    }

    pub fn with_failure(mut self, member_id: &str, message: &str) -> Self {
        self.scripts
            .insert(MemberId::new(member_id), Script::Fail(message.to_string()));
        self
    }

    pub fn with_panic(mut self, member_id: &str) -> Self {
        self.scripts.insert(MemberId::new(member_id), Script::Panic);
        self
    }

    pub fn with_slow_tracks(mut self, member_id: &str, delay: Duration, tracks: Vec<Track>) -> Self {
        self.scripts
            .insert(MemberId::new(member_id), Script::Slow(delay, tracks));
        self
    }

    pub fn with_enrichment(mut self, isrc: String, enrichment: TrackEnrichment) -> Self {
        self.enrichment.insert(isrc, enrichment);
        self
    }

    pub fn with_failing_enrichment(mut self) -> Self {
        self.enrichment_fails = true;
        self
    }

    pub fn with_panicking_enrichment(mut self) -> Self {
        self.enrichment_panics = true;
        self
    }

    /// ISRCs requested by each enrichment call, in call order.
    pub fn enrichment_requests(&self) -> Vec<Vec<String>> {
        self.enrichment_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LibrarySource for ScriptedSource {
    async fn fetch_all_tracks(&self, member: &Member) -> Result<Vec<Track>> {
        match self.scripts.get(&member.id).cloned() {
            None => Ok(vec![]),
            Some(Script::Tracks(tracks)) => Ok(tracks),
            Some(Script::Fail(message)) => bail!("{}", message),
            Some(Script::Panic) => panic!("library of {} is corrupt", member.id),
            Some(Script::Slow(delay, tracks)) => {
                tokio::time::sleep(delay).await;
                Ok(tracks)
            }
        }
    }

    async fn fetch_enrichment(&self, tracks: &[Track]) -> Result<EnrichmentBatch> {
        let mut requested: Vec<String> = tracks
            .iter()
            .filter_map(identity::resolve)
            .map(str::to_string)
            .collect();
        requested.sort();
        self.enrichment_requests.lock().unwrap().push(requested);

        if self.enrichment_panics {
            panic!("metadata response could not be decoded");
        }
        if self.enrichment_fails {
            bail!("metadata service unavailable");
        }
        Ok(tracks
            .iter()
            .filter_map(identity::resolve)
            .filter_map(|isrc| {
                self.enrichment
                    .get(isrc)
                    .map(|enrichment| (isrc.to_string(), enrichment.clone()))
            })
            .collect())
    }
}
