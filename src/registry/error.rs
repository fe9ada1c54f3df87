use thiserror::Error;

use crate::domain::{ValidationError, id::TrackId, principal::Principal};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("track {0} not found")]
    NotFound(TrackId),

    #[error("{sender} is not the owner of track {track}")]
    NotAuthorized { track: TrackId, sender: Principal },

    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub const ERR_NOT_AUTHORIZED: u32 = 100;
pub const ERR_NOT_FOUND: u32 = 101;
pub const ERR_INVALID_INPUT: u32 = 102;

impl RegistryError {
    /// Error code reported to callers of the contract surface.
    ///
    /// Storage failures have no code, they are not part of the contract.
    pub fn code(&self) -> Option<u32> {
        match self {
            RegistryError::NotAuthorized { .. } => Some(ERR_NOT_AUTHORIZED),
            RegistryError::NotFound(_) => Some(ERR_NOT_FOUND),
            RegistryError::InvalidInput(_) => Some(ERR_INVALID_INPUT),
            RegistryError::Database(_) | RegistryError::Internal(_) => None,
        }
    }
}
