//! Shared playlists produced by an aggregation run.

use crate::library::{identity, Member, MemberId, Track};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const PLAYLIST_NAME_SHARED: &str = "All songs in common";
pub const PLAYLIST_NAME_POPULAR: &str = "Popular songs";
pub const PLAYLIST_NAME_UNPOPULAR: &str = "Uncommon songs";
pub const PLAYLIST_NAME_DANCE: &str = "Dance songs";

/// Tracks keyed by the number of members sharing them.
pub type SharedBuckets = BTreeMap<usize, Vec<Track>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistType {
    Shared,
    Popular,
    Unpopular,
    Dance,
    Period,
    Genre,
}

impl PlaylistType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistType::Shared => "shared",
            PlaylistType::Popular => "popular",
            PlaylistType::Unpopular => "unpopular",
            PlaylistType::Dance => "dance",
            PlaylistType::Period => "period",
            PlaylistType::Genre => "genre",
        }
    }

    /// Fixed display rank used to order playlists.
    pub fn rank(&self) -> u32 {
        match self {
            PlaylistType::Shared => 1,
            PlaylistType::Popular => 2,
            PlaylistType::Unpopular | PlaylistType::Dance => 3,
            PlaylistType::Period => 4,
            PlaylistType::Genre => 5,
        }
    }
}

/// "<Genre> songs", with the genre title-cased.
pub fn genre_playlist_name(genre: &str) -> String {
    format!("{} songs", title_case(genre))
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = !(c.is_alphanumeric() || c == '\'');
    }
    out
}

/// Release era of a track, by the release year of its album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicPeriod {
    Seventies,
    Eighties,
    Nineties,
    TwoThousands,
    TwentyTens,
    Recent,
}

impl MusicPeriod {
    pub const ALL: [MusicPeriod; 6] = [
        MusicPeriod::Recent,
        MusicPeriod::TwentyTens,
        MusicPeriod::TwoThousands,
        MusicPeriod::Nineties,
        MusicPeriod::Eighties,
        MusicPeriod::Seventies,
    ];

    pub fn from_year(year: i32) -> Self {
        match year {
            i32::MIN..=1979 => MusicPeriod::Seventies,
            1980..=1989 => MusicPeriod::Eighties,
            1990..=1999 => MusicPeriod::Nineties,
            2000..=2009 => MusicPeriod::TwoThousands,
            2010..=2019 => MusicPeriod::TwentyTens,
            _ => MusicPeriod::Recent,
        }
    }

    pub fn playlist_name(&self) -> &'static str {
        match self {
            MusicPeriod::Seventies => "1970s and before",
            MusicPeriod::Eighties => "1980s",
            MusicPeriod::Nineties => "1990s",
            MusicPeriod::TwoThousands => "2000s",
            MusicPeriod::TwentyTens => "2010s",
            MusicPeriod::Recent => "Recent release",
        }
    }

    /// Order among period playlists, most recent first.
    pub fn rank_for_type(&self) -> u32 {
        match self {
            MusicPeriod::Recent => 1,
            MusicPeriod::TwentyTens => 2,
            MusicPeriod::TwoThousands => 3,
            MusicPeriod::Nineties => 4,
            MusicPeriod::Eighties => 5,
            MusicPeriod::Seventies => 6,
        }
    }
}

fn first_rank_for_type() -> u32 {
    1
}

/// Listing metadata of a shared playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub playlist_type: PlaylistType,
    pub rank: u32,
    /// Order among playlists sharing the same rank.
    pub rank_for_type: u32,
    pub shared_track_count: usize,
}

/// A named, ranked set of tracks bucketed by sharing count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedPlaylist {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub playlist_type: PlaylistType,
    pub rank: u32,
    #[serde(default = "first_rank_for_type")]
    pub rank_for_type: u32,
    pub shared_track_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub tracks_per_shared_count: SharedBuckets,
    /// Members sharing each identifier above the threshold.
    pub member_ids_per_track: BTreeMap<String, Vec<MemberId>>,
    pub members: Vec<Member>,
}

impl SharedPlaylist {
    pub fn new(
        playlist_type: PlaylistType,
        name: impl Into<String>,
        tracks_per_shared_count: SharedBuckets,
        member_ids_per_track: BTreeMap<String, Vec<MemberId>>,
        members: Vec<Member>,
    ) -> Self {
        let shared_track_count = tracks_per_shared_count.values().map(Vec::len).sum();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.into(),
            playlist_type,
            rank: playlist_type.rank(),
            rank_for_type: first_rank_for_type(),
            shared_track_count,
            genre: None,
            tracks_per_shared_count,
            member_ids_per_track,
            members,
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_rank_for_type(mut self, rank_for_type: u32) -> Self {
        self.rank_for_type = rank_for_type;
        self
    }

    pub fn summary(&self) -> PlaylistSummary {
        PlaylistSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            playlist_type: self.playlist_type,
            rank: self.rank,
            rank_for_type: self.rank_for_type,
            shared_track_count: self.shared_track_count,
        }
    }

    /// All tracks across buckets, highest sharing count first.
    pub fn all_tracks(&self) -> Vec<&Track> {
        self.tracks_per_shared_count
            .values()
            .rev()
            .flatten()
            .collect()
    }

    /// Tracks shared by at least `min_shared_count` members.
    pub fn tracks_with_min_shared_count(&self, min_shared_count: usize) -> Vec<&Track> {
        self.tracks_per_shared_count
            .range(min_shared_count..)
            .rev()
            .flat_map(|(_, tracks)| tracks)
            .collect()
    }

    /// Members that share the given track.
    pub fn members_sharing(&self, track: &Track) -> &[MemberId] {
        identity::resolve(track)
            .and_then(|isrc| self.member_ids_per_track.get(isrc))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Name used when exporting the playlist to a member's account.
    pub fn export_name(&self, room_id: &str) -> String {
        format!("Room #{} - {}", room_id, self.name)
    }
}

/// All playlists of a successful run, keyed by playlist id.
#[derive(Debug, Clone, Default)]
pub struct PlaylistSet {
    playlists: HashMap<String, SharedPlaylist>,
}

impl PlaylistSet {
    pub fn insert(&mut self, playlist: SharedPlaylist) {
        self.playlists.insert(playlist.id.clone(), playlist);
    }

    pub fn get(&self, id: &str) -> Option<&SharedPlaylist> {
        self.playlists.get(id)
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    /// Playlists ordered by rank, rank within the type, then name.
    pub fn sorted(&self) -> Vec<&SharedPlaylist> {
        let mut playlists: Vec<&SharedPlaylist> = self.playlists.values().collect();
        playlists.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then_with(|| a.rank_for_type.cmp(&b.rank_for_type))
                .then_with(|| a.name.cmp(&b.name))
        });
        playlists
    }

    pub fn summaries(&self) -> Vec<PlaylistSummary> {
        self.sorted()
            .into_iter()
            .map(SharedPlaylist::summary)
            .collect()
    }

    pub fn find_by_type(&self, playlist_type: PlaylistType) -> Vec<&SharedPlaylist> {
        self.sorted()
            .into_iter()
            .filter(|p| p.playlist_type == playlist_type)
            .collect()
    }
}

impl FromIterator<SharedPlaylist> for PlaylistSet {
    fn from_iter<I: IntoIterator<Item = SharedPlaylist>>(iter: I) -> Self {
        let mut set = PlaylistSet::default();
        for playlist in iter {
            set.insert(playlist);
        }
        set
    }
}
