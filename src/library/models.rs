use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Members
// =============================================================================

/// Opaque identity of a room member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A participant whose library contributes to an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub display_name: String,
}

impl Member {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(id),
            display_name: display_name.into(),
        }
    }
}

// =============================================================================
// Tracks
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    /// "YYYY", "YYYY-MM" or "YYYY-MM-DD", depending on the provider's precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

impl Album {
    pub fn release_year(&self) -> Option<i32> {
        let date = self.release_date.as_deref()?.trim();
        let year = date.split('-').next()?;
        if year.len() != 4 {
            return None;
        }
        year.parse().ok()
    }
}

/// A track as returned by the external library source.
///
/// Tracks are immutable values. Enrichment fields (`popularity`,
/// `danceability`, artist genres) may be empty when the track comes straight
/// from a member library; [`Track::enriched`] produces a new value with the
/// metadata gathered for the shared set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Provider-specific track id.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<Album>,
    /// External identifiers keyed by scheme (e.g. "isrc").
    #[serde(default)]
    pub external_ids: HashMap<String, String>,
    /// Popularity score 0-100, 0 meaning unknown.
    #[serde(default)]
    pub popularity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub danceability: Option<f32>,
}

impl Track {
    /// Returns a copy of this track with the given enrichment applied.
    pub fn enriched(&self, enrichment: &TrackEnrichment) -> Track {
        let mut track = self.clone();
        if let Some(popularity) = enrichment.popularity {
            track.popularity = popularity.min(100);
        }
        if !enrichment.artists.is_empty() {
            track.artists = enrichment.artists.clone();
        }
        if enrichment.album.is_some() {
            track.album = enrichment.album.clone();
        }
        if enrichment.danceability.is_some() {
            track.danceability = enrichment.danceability;
        }
        track
    }

    pub fn release_year(&self) -> Option<i32> {
        self.album.as_ref().and_then(Album::release_year)
    }

    /// Whether any of the track's artists carries the given genre tag.
    pub fn has_genre(&self, genre: &str) -> bool {
        self.artists
            .iter()
            .any(|artist| artist.genres.iter().any(|g| g == genre))
    }
}

// =============================================================================
// Enrichment
// =============================================================================

/// Metadata fetched for a single shared track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackEnrichment {
    #[serde(default)]
    pub popularity: Option<u8>,
    /// Full artist records, carrying genre tags.
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default)]
    pub danceability: Option<f32>,
}

/// Enrichment results keyed by content identifier.
pub type EnrichmentBatch = HashMap<String, TrackEnrichment>;
