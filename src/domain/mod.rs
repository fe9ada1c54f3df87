use thiserror::Error;

pub mod id;
pub mod principal;
pub mod text;
pub mod track;

/// Rejected input, reported before anything touches the registry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is {len} bytes long, at most {max} allowed")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} must be ASCII text")]
    NonAscii { field: &'static str },

    #[error("{field} must not contain control characters")]
    ControlCharacter { field: &'static str },

    #[error("invalid principal '{0}'")]
    InvalidPrincipal(String),

    #[error("invalid track id '{0}'")]
    InvalidTrackId(String),

    #[error("price {0} is out of range")]
    PriceOutOfRange(u64),
}
