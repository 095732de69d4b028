mod file_config;

pub use file_config::{AggregationConfig, FileConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub libraries_dir: Option<PathBuf>,
    pub room_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub libraries_dir: PathBuf,
    pub room_id: String,

    pub aggregation: AggregationSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        // Library snapshots live next to the database unless told otherwise
        let libraries_dir = file
            .libraries_dir
            .map(PathBuf::from)
            .or_else(|| cli.libraries_dir.clone())
            .unwrap_or_else(|| db_dir.clone());

        if !libraries_dir.is_dir() {
            bail!("Libraries directory does not exist: {:?}", libraries_dir);
        }

        let room_id = file
            .room_id
            .or_else(|| cli.room_id.clone())
            .unwrap_or_else(|| "1".to_string());

        let defaults = AggregationSettings::default();
        let agg_file = file.aggregation.unwrap_or_default();
        let aggregation = AggregationSettings {
            min_shared_count: agg_file
                .min_shared_count
                .unwrap_or(defaults.min_shared_count),
            popular_threshold: agg_file
                .popular_threshold
                .unwrap_or(defaults.popular_threshold),
            unpopular_threshold: agg_file
                .unpopular_threshold
                .unwrap_or(defaults.unpopular_threshold),
            genre_min_tracks: agg_file
                .genre_min_tracks
                .unwrap_or(defaults.genre_min_tracks),
            period_min_tracks: agg_file
                .period_min_tracks
                .unwrap_or(defaults.period_min_tracks),
            recent_period_min_tracks: agg_file
                .recent_period_min_tracks
                .unwrap_or(defaults.recent_period_min_tracks),
            dance_playlist_enabled: agg_file
                .dance_playlist_enabled
                .unwrap_or(defaults.dance_playlist_enabled),
            danceability_threshold: agg_file
                .danceability_threshold
                .unwrap_or(defaults.danceability_threshold),
            stale_after_secs: agg_file
                .stale_after_secs
                .unwrap_or(defaults.stale_after_secs),
            processing_timeout_secs: agg_file
                .processing_timeout_secs
                .unwrap_or(defaults.processing_timeout_secs),
        };
        aggregation.validate()?;

        Ok(Self {
            db_dir,
            libraries_dir,
            room_id,
            aggregation,
        })
    }

    pub fn runs_db_path(&self) -> PathBuf {
        self.db_dir.join("runs.db")
    }
}

/// Thresholds and time windows of an aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSettings {
    /// Minimum number of members that must hold a track for it to be shared.
    pub min_shared_count: usize,
    pub popular_threshold: u8,
    /// Upper bound (inclusive) of the unpopular range; popularity 0 is never unpopular.
    pub unpopular_threshold: u8,
    pub genre_min_tracks: usize,
    /// Minimum track count of a release-era playlist.
    pub period_min_tracks: usize,
    /// Same, for the "Recent release" playlist.
    pub recent_period_min_tracks: usize,
    pub dance_playlist_enabled: bool,
    pub danceability_threshold: f32,
    /// A run whose last checkpoint is older than this may be expired.
    pub stale_after_secs: u64,
    pub processing_timeout_secs: u64,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            min_shared_count: 2,
            popular_threshold: 60,
            unpopular_threshold: 25,
            genre_min_tracks: 5,
            period_min_tracks: 5,
            recent_period_min_tracks: 2,
            dance_playlist_enabled: false,
            danceability_threshold: 0.7,
            stale_after_secs: 20 * 60,
            processing_timeout_secs: 18 * 60,
        }
    }
}

impl AggregationSettings {
    pub fn validate(&self) -> Result<()> {
        if self.min_shared_count < 1 {
            bail!("min_shared_count must be at least 1");
        }
        if self.popular_threshold > 100 || self.unpopular_threshold > 100 {
            bail!("Popularity thresholds must be within 0..=100");
        }
        if self.unpopular_threshold >= self.popular_threshold {
            bail!(
                "unpopular_threshold ({}) must be lower than popular_threshold ({})",
                self.unpopular_threshold,
                self.popular_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.danceability_threshold) {
            bail!("danceability_threshold must be within 0.0..=1.0");
        }
        if self.period_min_tracks < 1 || self.recent_period_min_tracks < 1 {
            bail!("Period playlist thresholds must be at least 1");
        }
        Ok(())
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }
}
