//! Track identity resolution.
//!
//! Maps provider-specific tracks to a canonical content identifier (ISRC) so
//! the same recording can be matched across member libraries.

use super::models::Track;

/// External id scheme used as the content identifier.
pub const ISRC_KEY: &str = "isrc";

/// Resolve the content identifier of a track.
///
/// Returns `None` when the track carries no (or an empty) ISRC. Callers skip
/// such tracks; an unresolvable track never fails a run.
pub fn resolve(track: &Track) -> Option<&str> {
    track
        .external_ids
        .get(ISRC_KEY)
        .map(|isrc| isrc.trim())
        .filter(|isrc| !isrc.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn track_with_ids(ids: &[(&str, &str)]) -> Track {
        Track {
            id: "t".to_string(),
            name: "t".to_string(),
            artists: vec![],
            album: None,
            external_ids: ids
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            popularity: 0,
            danceability: None,
        }
    }

    #[test]
    fn test_resolve_isrc() {
        let track = track_with_ids(&[("isrc", "GBUM71029604"), ("upc", "123")]);
        assert_eq!(resolve(&track), Some("GBUM71029604"));
    }

    #[test]
    fn test_resolve_missing_isrc() {
        let track = track_with_ids(&[("upc", "123")]);
        assert_eq!(resolve(&track), None);
    }

    #[test]
    fn test_resolve_blank_isrc() {
        let track = track_with_ids(&[("isrc", "  ")]);
        assert_eq!(resolve(&track), None);
    }
}
