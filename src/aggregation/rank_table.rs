use crate::library::{identity, Member, MemberId, Track};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// A content identifier together with the members holding it.
#[derive(Debug, Clone)]
pub struct RankEntry {
    /// First track seen for this identifier.
    pub track: Track,
    /// Distinct members holding the identifier, in arrival order.
    pub members: Vec<MemberId>,
}

impl RankEntry {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Counters returned when merging one member's library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub distinct: usize,
    pub duplicates: usize,
    pub unresolved: usize,
}

/// Mapping from content identifier to the set of members holding it.
///
/// Owned by the run coordinator while results arrive and dropped once the
/// shared playlists are derived.
#[derive(Debug, Default)]
pub struct RankTable {
    entries: BTreeMap<String, RankEntry>,
    members: Vec<Member>,
}

impl RankTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a member's resolved tracks. A member is counted at most once per
    /// identifier, however many copies of the track their library contains.
    pub fn add_member_tracks(&mut self, member: &Member, tracks: &[Track]) -> MergeStats {
        if !self.members.iter().any(|m| m.id == member.id) {
            self.members.push(member.clone());
        }

        let mut stats = MergeStats::default();
        let mut seen: HashSet<&str> = HashSet::with_capacity(tracks.len());

        for track in tracks {
            let Some(isrc) = identity::resolve(track) else {
                debug!(
                    "Track {} of member {} has no ISRC, skipping",
                    track.id, member.id
                );
                stats.unresolved += 1;
                continue;
            };

            if !seen.insert(isrc) {
                stats.duplicates += 1;
                continue;
            }

            let entry = self
                .entries
                .entry(isrc.to_string())
                .or_insert_with(|| RankEntry {
                    track: track.clone(),
                    members: Vec::new(),
                });

            if entry.members.contains(&member.id) {
                warn!(
                    "Member {} already counted for {}, ignoring repeated merge",
                    member.id, isrc
                );
                stats.duplicates += 1;
                continue;
            }

            entry.members.push(member.id.clone());
            if entry.members.len() > 1 {
                debug!(
                    "Track {} ({}) now shared by {} members",
                    track.name,
                    isrc,
                    entry.members.len()
                );
            }
            stats.distinct += 1;
        }

        stats
    }

    pub fn member_count(&self, isrc: &str) -> usize {
        self.entries.get(isrc).map_or(0, RankEntry::member_count)
    }

    pub fn get(&self, isrc: &str) -> Option<&RankEntry> {
        self.entries.get(isrc)
    }

    /// Entries ordered by content identifier.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &RankEntry)> {
        self.entries.iter().map(|(isrc, entry)| (isrc.as_str(), entry))
    }

    /// Members whose libraries were merged.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
