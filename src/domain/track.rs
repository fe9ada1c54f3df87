use std::{fmt::Display, str::FromStr};

use super::{ValidationError, id::TrackId, principal::Principal};

/// Represent a registered audio track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub owner: Principal,
    pub license: LicenseTerms,
}

/// License terms, `price` is in the smallest currency unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseTerms {
    pub license_type: String,
    pub price: u64,
}

impl LicenseTerms {
    pub fn new(license_type: impl Into<String>, price: u64) -> Self {
        Self {
            license_type: license_type.into(),
            price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Register,
    Transfer,
    UpdateLicense,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Register => "register",
            EventKind::Transfer => "transfer",
            EventKind::UpdateLicense => "update-license",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" => Ok(EventKind::Register),
            "transfer" => Ok(EventKind::Transfer),
            "update-license" => Ok(EventKind::UpdateLicense),
            other => Err(anyhow::anyhow!("unknown event kind '{other}'")),
        }
    }
}

/// One applied mutation of a track, as kept in the event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    pub seq: u64,
    pub track_id: TrackId,
    pub kind: EventKind,
    pub sender: Principal,
    pub detail: String,
    /// seconds since unix epoch
    pub recorded_at: i64,
}

/// price as stored in sqlite
pub fn price_to_sql(price: u64) -> Result<i64, ValidationError> {
    i64::try_from(price).map_err(|_| ValidationError::PriceOutOfRange(price))
}
