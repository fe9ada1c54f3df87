use thiserror::Error;

use crate::domain::{
    id::{TrackId, parse_uint_literal},
    principal::Principal,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function} expects {expected} arguments, got {got}")]
    Arity {
        function: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{function}: bad argument #{position}: {reason}")]
    BadArgument {
        function: &'static str,
        position: usize,
        reason: String,
    },
}

/// A typed call of one of the contract's public functions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    RegisterTrack {
        title: String,
        artist: String,
        license_type: String,
        price: u64,
    },
    TransferTrack {
        id: TrackId,
        new_owner: Principal,
    },
    UpdateLicense {
        id: TrackId,
        license_type: String,
        price: u64,
    },
    GetTrackInfo {
        id: TrackId,
    },
}

pub const REGISTER_TRACK: &str = "register-track";
pub const TRANSFER_TRACK: &str = "transfer-track";
pub const UPDATE_LICENSE: &str = "update-license";
pub const GET_TRACK_INFO: &str = "get-track-info";

impl ContractCall {
    /// Builds a call from a function name and its positional arguments.
    ///
    /// uints may be written as `u1000` or `1000`, text may be quoted,
    /// principals may carry the leading `'`.
    pub fn parse(function: &str, args: &[String]) -> Result<Self, CallError> {
        match function {
            REGISTER_TRACK => {
                let args = Args::new(REGISTER_TRACK, args, 4)?;
                Ok(ContractCall::RegisterTrack {
                    title: args.text(0)?,
                    artist: args.text(1)?,
                    license_type: args.text(2)?,
                    price: args.uint(3)?,
                })
            }
            TRANSFER_TRACK => {
                let args = Args::new(TRANSFER_TRACK, args, 2)?;
                Ok(ContractCall::TransferTrack {
                    id: args.track_id(0)?,
                    new_owner: args.principal(1)?,
                })
            }
            UPDATE_LICENSE => {
                let args = Args::new(UPDATE_LICENSE, args, 3)?;
                Ok(ContractCall::UpdateLicense {
                    id: args.track_id(0)?,
                    license_type: args.text(1)?,
                    price: args.uint(2)?,
                })
            }
            GET_TRACK_INFO => {
                let args = Args::new(GET_TRACK_INFO, args, 1)?;
                Ok(ContractCall::GetTrackInfo {
                    id: args.track_id(0)?,
                })
            }
            other => Err(CallError::UnknownFunction(other.to_string())),
        }
    }

    pub fn function_name(&self) -> &'static str {
        match self {
            ContractCall::RegisterTrack { .. } => REGISTER_TRACK,
            ContractCall::TransferTrack { .. } => TRANSFER_TRACK,
            ContractCall::UpdateLicense { .. } => UPDATE_LICENSE,
            ContractCall::GetTrackInfo { .. } => GET_TRACK_INFO,
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, ContractCall::GetTrackInfo { .. })
    }
}

/// Positional arguments of a single call, arity already checked
struct Args<'a> {
    function: &'static str,
    values: &'a [String],
}

impl<'a> Args<'a> {
    fn new(function: &'static str, values: &'a [String], expected: usize) -> Result<Self, CallError> {
        if values.len() != expected {
            return Err(CallError::Arity {
                function,
                expected,
                got: values.len(),
            });
        }
        Ok(Self { function, values })
    }

    fn bad(&self, position: usize, reason: impl ToString) -> CallError {
        CallError::BadArgument {
            function: self.function,
            position: position + 1,
            reason: reason.to_string(),
        }
    }

    /// Unquoted text is taken verbatim, quoted text has `\"` and `\\` unescaped
    fn text(&self, i: usize) -> Result<String, CallError> {
        let raw = self.values[i].as_str();
        let Some(quoted) = raw
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
        else {
            return Ok(raw.to_string());
        };

        let mut text = String::with_capacity(quoted.len());
        let mut chars = quoted.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped @ ('"' | '\\')) => text.push(escaped),
                    Some(other) => return Err(self.bad(i, format!("unknown escape '\\{other}'"))),
                    None => return Err(self.bad(i, "dangling '\\' at end of text")),
                },
                '"' => return Err(self.bad(i, "unescaped '\"' inside text")),
                c => text.push(c),
            }
        }
        Ok(text)
    }

    fn uint(&self, i: usize) -> Result<u64, CallError> {
        let raw = self.values[i].trim();
        parse_uint_literal(raw).ok_or_else(|| self.bad(i, format!("'{raw}' is not a uint")))
    }

    fn track_id(&self, i: usize) -> Result<TrackId, CallError> {
        self.values[i].parse().map_err(|e| self.bad(i, e))
    }

    fn principal(&self, i: usize) -> Result<Principal, CallError> {
        self.values[i].parse().map_err(|e| self.bad(i, e))
    }
}
