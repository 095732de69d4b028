//! Shared constants for end-to-end tests

// ============================================================================
// Members
// ============================================================================

pub const MEMBER_X: &str = "member-x";
pub const MEMBER_Y: &str = "member-y";
pub const MEMBER_Z: &str = "member-z";

// ============================================================================
// Catalog
// ============================================================================

pub const ROOM_ID: &str = "42";

pub const GENRE_ROCK: &str = "rock";
pub const GENRE_JAZZ: &str = "jazz";
