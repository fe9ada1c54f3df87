use super::ValidationError;

/// Checks that a text field is non-empty printable ASCII of at most `max` bytes
pub fn validate_ascii(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if !value.is_ascii() {
        return Err(ValidationError::NonAscii { field });
    }
    if value.bytes().any(|b| b.is_ascii_control()) {
        return Err(ValidationError::ControlCharacter { field });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}
