use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub libraries_dir: Option<String>,
    pub room_id: Option<String>,

    // Feature configs
    pub aggregation: Option<AggregationConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AggregationConfig {
    pub min_shared_count: Option<usize>,
    pub popular_threshold: Option<u8>,
    pub unpopular_threshold: Option<u8>,
    pub genre_min_tracks: Option<usize>,
    pub period_min_tracks: Option<usize>,
    pub recent_period_min_tracks: Option<usize>,
    pub dance_playlist_enabled: Option<bool>,
    pub danceability_threshold: Option<f32>,
    pub stale_after_secs: Option<u64>,
    pub processing_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
