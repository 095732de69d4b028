//! Derivation of the shared playlist family from a completed rank table.
//!
//! Enrichment metadata is requested only for the shared set, never for the
//! full member libraries.

use super::error::EnrichmentError;
use super::playlists::{
    genre_playlist_name, MusicPeriod, PlaylistSet, PlaylistType, SharedBuckets, SharedPlaylist,
    PLAYLIST_NAME_DANCE, PLAYLIST_NAME_POPULAR, PLAYLIST_NAME_SHARED, PLAYLIST_NAME_UNPOPULAR,
};
use super::rank_table::RankTable;
use crate::config::AggregationSettings;
use crate::library::{identity, EnrichmentBatch, Member, MemberId, Track};
use crate::sources::LibrarySource;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

type Attribution = BTreeMap<String, Vec<MemberId>>;

/// Base shared set: buckets keyed by exact member count, plus who shared what.
///
/// A bucket exists for every count from the threshold up to the number of
/// members, even when no track landed in it.
pub fn build_shared_buckets(
    rank_table: &RankTable,
    min_shared_count: usize,
) -> (SharedBuckets, Attribution) {
    let mut buckets: SharedBuckets = (min_shared_count..=rank_table.members().len())
        .map(|count| (count, Vec::new()))
        .collect();
    let mut attribution = Attribution::new();

    for (isrc, entry) in rank_table.entries() {
        let count = entry.member_count();
        if count < min_shared_count {
            continue;
        }
        debug!("Track {} ({}) shared by {} members", entry.track.name, isrc, count);
        buckets.entry(count).or_default().push(entry.track.clone());
        attribution.insert(isrc.to_string(), entry.members.clone());
    }

    (buckets, attribution)
}

/// Builds every shared playlist out of the enriched base buckets.
struct PlaylistDeriver<'a> {
    buckets: SharedBuckets,
    attribution: Attribution,
    members: Vec<Member>,
    settings: &'a AggregationSettings,
}

impl<'a> PlaylistDeriver<'a> {
    /// Playlist holding the tracks of each bucket accepted by `keep`.
    /// The bucket structure of the base set is preserved.
    fn subset(
        &self,
        playlist_type: PlaylistType,
        name: String,
        keep: impl Fn(&Track) -> bool,
    ) -> SharedPlaylist {
        let buckets: SharedBuckets = self
            .buckets
            .iter()
            .map(|(count, tracks)| {
                let kept = tracks.iter().filter(|&track| keep(track)).cloned().collect();
                (*count, kept)
            })
            .collect();

        let attribution: Attribution = buckets
            .values()
            .flatten()
            .filter_map(identity::resolve)
            .filter_map(|isrc| {
                self.attribution
                    .get(isrc)
                    .map(|members| (isrc.to_string(), members.clone()))
            })
            .collect();

        SharedPlaylist::new(playlist_type, name, buckets, attribution, self.members.clone())
    }

    fn shared(&self) -> SharedPlaylist {
        self.subset(PlaylistType::Shared, PLAYLIST_NAME_SHARED.to_string(), |_| true)
    }

    fn popular(&self) -> SharedPlaylist {
        let threshold = self.settings.popular_threshold;
        self.subset(
            PlaylistType::Popular,
            PLAYLIST_NAME_POPULAR.to_string(),
            |track| {
                let popular = track.popularity != 0 && track.popularity >= threshold;
                if popular {
                    debug!("Popular track {} ({})", track.name, track.popularity);
                }
                popular
            },
        )
    }

    fn unpopular(&self) -> SharedPlaylist {
        let threshold = self.settings.unpopular_threshold;
        self.subset(
            PlaylistType::Unpopular,
            PLAYLIST_NAME_UNPOPULAR.to_string(),
            |track| {
                let unpopular = track.popularity != 0 && track.popularity <= threshold;
                if unpopular {
                    debug!("Unpopular track {} ({})", track.name, track.popularity);
                }
                unpopular
            },
        )
    }

    fn dance(&self) -> SharedPlaylist {
        let threshold = self.settings.danceability_threshold;
        self.subset(PlaylistType::Dance, PLAYLIST_NAME_DANCE.to_string(), |track| {
            track.danceability.is_some_and(|d| d >= threshold)
        })
        .with_rank_for_type(2)
    }

    /// One playlist per release era holding enough tracks. Tracks without a
    /// known release year belong to no era.
    fn period_playlists(&self) -> Vec<SharedPlaylist> {
        MusicPeriod::ALL
            .into_iter()
            .filter_map(|period| {
                let min_tracks = match period {
                    MusicPeriod::Recent => self.settings.recent_period_min_tracks,
                    _ => self.settings.period_min_tracks,
                };
                let playlist = self
                    .subset(
                        PlaylistType::Period,
                        period.playlist_name().to_string(),
                        |track| track.release_year().map(MusicPeriod::from_year) == Some(period),
                    )
                    .with_rank_for_type(period.rank_for_type());
                if playlist.shared_track_count >= min_tracks {
                    debug!(
                        "Period {} kept with {} tracks",
                        playlist.name, playlist.shared_track_count
                    );
                    Some(playlist)
                } else {
                    debug!(
                        "Period {} discarded with {} tracks",
                        playlist.name, playlist.shared_track_count
                    );
                    None
                }
            })
            .collect()
    }

    /// Every genre tag carried by an artist of a shared track.
    fn genres(&self) -> BTreeSet<String> {
        self.buckets
            .values()
            .flatten()
            .flat_map(|track| track.artists.iter())
            .flat_map(|artist| artist.genres.iter().cloned())
            .collect()
    }

    /// One playlist per genre with at least `genre_min_tracks` tracks, the
    /// largest genres first.
    fn genre_playlists(&self) -> Vec<SharedPlaylist> {
        let mut kept: Vec<SharedPlaylist> = self
            .genres()
            .into_iter()
            .filter_map(|genre| {
                let playlist = self
                    .subset(PlaylistType::Genre, genre_playlist_name(&genre), |track| {
                        track.has_genre(&genre)
                    })
                    .with_genre(genre.as_str());
                if playlist.shared_track_count >= self.settings.genre_min_tracks {
                    debug!(
                        "Genre {} kept with {} tracks",
                        genre, playlist.shared_track_count
                    );
                    Some(playlist)
                } else {
                    debug!(
                        "Genre {} discarded with {} tracks",
                        genre, playlist.shared_track_count
                    );
                    None
                }
            })
            .collect();

        kept.sort_by(|a, b| {
            b.shared_track_count
                .cmp(&a.shared_track_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        kept.into_iter()
            .zip(1..)
            .map(|(playlist, rank_for_type)| playlist.with_rank_for_type(rank_for_type))
            .collect()
    }
}

/// Apply enrichment to every bucketed track. Tracks without a matching
/// record keep their own metadata.
fn enrich_buckets(buckets: SharedBuckets, batch: &EnrichmentBatch) -> SharedBuckets {
    buckets
        .into_iter()
        .map(|(count, tracks)| {
            let tracks = tracks
                .into_iter()
                .map(|track| {
                    match identity::resolve(&track).and_then(|isrc| batch.get(isrc)) {
                        Some(enrichment) => track.enriched(enrichment),
                        None => track,
                    }
                })
                .collect();
            (count, tracks)
        })
        .collect()
}

/// Derive the shared, popular, unpopular, optional dance, release era and
/// genre playlists.
///
/// Consumes the rank table. An enrichment failure aborts derivation entirely:
/// no partial playlist set is ever returned.
pub async fn derive_playlists(
    rank_table: RankTable,
    source: &dyn LibrarySource,
    settings: &AggregationSettings,
    run_id: &str,
) -> Result<PlaylistSet, EnrichmentError> {
    let (buckets, attribution) = build_shared_buckets(&rank_table, settings.min_shared_count);
    let members = rank_table.members().to_vec();
    info!(
        "[{}] {} distinct tracks across {} members",
        run_id,
        rank_table.len(),
        members.len()
    );
    drop(rank_table);

    for (count, tracks) in &buckets {
        info!(
            "[{}] {} tracks shared by {} members",
            run_id,
            tracks.len(),
            count
        );
    }

    let shared_tracks: Vec<Track> = buckets.values().flatten().cloned().collect();
    let batch = if shared_tracks.is_empty() {
        debug!("[{}] Nothing shared, skipping enrichment", run_id);
        EnrichmentBatch::new()
    } else {
        info!(
            "[{}] Fetching enrichment for {} shared tracks",
            run_id,
            shared_tracks.len()
        );
        source
            .fetch_enrichment(&shared_tracks)
            .await
            .map_err(|e| EnrichmentError(format!("{:#}", e)))?
    };

    let deriver = PlaylistDeriver {
        buckets: enrich_buckets(buckets, &batch),
        attribution,
        members,
        settings,
    };

    let mut playlists = vec![deriver.shared(), deriver.popular(), deriver.unpopular()];
    if settings.dance_playlist_enabled {
        playlists.push(deriver.dance());
    }
    playlists.extend(deriver.period_playlists());
    playlists.extend(deriver.genre_playlists());

    for playlist in &playlists {
        info!(
            "[{}] Playlist \"{}\" with {} tracks",
            run_id, playlist.name, playlist.shared_track_count
        );
    }

    Ok(playlists.into_iter().collect())
}
