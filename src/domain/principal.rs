use std::{fmt::Display, str::FromStr};

use super::ValidationError;

/// Account identifier of a sender or a track owner.
///
/// Both standard addresses and contract principals (`ADDRESS.contract-name`) are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    pub const MAX_LEN: usize = 128;

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_');

        if value.is_empty() || value.len() > Self::MAX_LEN || !value.chars().all(valid_char) {
            return Err(ValidationError::InvalidPrincipal(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts principal literals with a leading quote (`'ST1...`)
impl FromStr for Principal {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::new(s.strip_prefix('\'').unwrap_or(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_standard_and_contract_principals() {
        assert!(Principal::new("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM").is_ok());
        assert!(Principal::new("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM.sonic_chain").is_ok());
    }

    #[test]
    fn strips_literal_quote() {
        let p: Principal = "'ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG".parse().unwrap();
        assert_eq!(p.as_str(), "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG");
    }

    #[test]
    fn rejects_bad_principals() {
        assert!(Principal::new("").is_err());
        assert!(Principal::new("has space").is_err());
        assert!(Principal::new("ünicode").is_err());
        assert!(Principal::new("a".repeat(Principal::MAX_LEN + 1)).is_err());
    }
}
