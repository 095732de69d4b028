//! Track, enrichment and on-disk library fixtures.

use anyhow::Result;
use shared_playlists::library::{
    identity::ISRC_KEY, Album, Artist, Member, Track, TrackEnrichment,
};
use std::collections::HashMap;
use std::path::Path;

pub fn member(id: &str) -> Member {
    Member::new(id, id.to_uppercase())
}

/// ISRC of the n-th fixture track.
pub fn isrc(n: usize) -> String {
    format!("TEST{:08}", n)
}

/// Track identified by ISRC `n`, with a member-specific provider id.
pub fn track_for(n: usize, provider_id: &str) -> Track {
    Track {
        id: provider_id.to_string(),
        name: format!("Track {}", n),
        artists: vec![Artist {
            id: format!("artist-{}", n),
            name: format!("Artist {}", n),
            genres: vec![],
        }],
        album: None,
        external_ids: HashMap::from([(ISRC_KEY.to_string(), isrc(n))]),
        popularity: 0,
        danceability: None,
    }
}

pub fn shared_track(n: usize) -> Track {
    track_for(n, &format!("sp-{}", n))
}

/// Track without any external identifier.
pub fn unidentified_track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        name: id.to_string(),
        artists: vec![],
        album: None,
        external_ids: HashMap::new(),
        popularity: 0,
        danceability: None,
    }
}

pub fn tracks(range: std::ops::RangeInclusive<usize>) -> Vec<Track> {
    range.map(shared_track).collect()
}

pub fn popularity(popularity: u8) -> TrackEnrichment {
    TrackEnrichment {
        popularity: Some(popularity),
        ..Default::default()
    }
}

pub fn genre(n: usize, genre: &str) -> TrackEnrichment {
    TrackEnrichment {
        artists: vec![Artist {
            id: format!("artist-{}", n),
            name: format!("Artist {}", n),
            genres: vec![genre.to_string()],
        }],
        ..Default::default()
    }
}

pub fn danceability(danceability: f32) -> TrackEnrichment {
    TrackEnrichment {
        danceability: Some(danceability),
        ..Default::default()
    }
}

pub fn released(n: usize, release_date: &str) -> TrackEnrichment {
    TrackEnrichment {
        album: Some(Album {
            id: format!("album-{}", n),
            name: format!("Album {}", n),
            release_date: Some(release_date.to_string()),
        }),
        ..Default::default()
    }
}

/// Write `<member>.json` into `dir`.
pub fn write_library(dir: &Path, member_id: &str, tracks: &[Track]) -> Result<()> {
    std::fs::write(
        dir.join(format!("{}.json", member_id)),
        serde_json::to_string_pretty(tracks)?,
    )?;
    Ok(())
}

/// Write the enrichment file into `dir`.
pub fn write_enrichment(dir: &Path, enrichment: &HashMap<String, TrackEnrichment>) -> Result<()> {
    std::fs::write(
        dir.join(shared_playlists::sources::ENRICHMENT_FILE_NAME),
        serde_json::to_string_pretty(enrichment)?,
    )?;
    Ok(())
}
