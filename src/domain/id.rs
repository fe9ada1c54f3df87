use std::{fmt::Display, str::FromStr};

use super::ValidationError;

/// Sequential track id.
///
/// Ids start at 1 and are never reused, 0 never names a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

impl TrackId {
    pub const RESERVED: TrackId = TrackId(0);

    pub fn is_reserved(&self) -> bool {
        *self == Self::RESERVED
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// value as stored in sqlite
    pub fn to_sql(&self) -> Result<i64, ValidationError> {
        i64::try_from(self.0).map_err(|_| ValidationError::InvalidTrackId(self.0.to_string()))
    }
}

impl Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a plain number or a uint literal (`u7`).
///
/// Only ASCII digits are accepted after the optional `u`, no sign.
pub fn parse_uint_literal(s: &str) -> Option<u64> {
    let s = s.trim();
    let digits = s.strip_prefix('u').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl FromStr for TrackId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_uint_literal(s)
            .map(TrackId)
            .ok_or_else(|| ValidationError::InvalidTrackId(s.to_string()))
    }
}
