//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a session name contains visible characters and no control characters.
///
/// # Examples
///
/// ```ignore
/// validate_session_name("Friday Deepstack") // Ok
/// validate_session_name("   ")              // Err - blank
/// validate_session_name("Main\nEvent")      // Err - control character
/// ```
pub fn validate_session_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("session_name_blank");
        err.message = Some("Session name must not be blank".into());
        return Err(err);
    }

    if name.chars().any(char::is_control) {
        let mut err = ValidationError::new("session_name_format");
        err.message = Some("Session name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_name_valid() {
        assert!(validate_session_name("Friday Deepstack").is_ok());
        assert!(validate_session_name("€50 Turbo #3").is_ok());
    }

    #[test]
    fn test_validate_session_name_blank() {
        assert!(validate_session_name("").is_err());
        assert!(validate_session_name("   ").is_err());
    }

    #[test]
    fn test_validate_session_name_control_characters() {
        assert!(validate_session_name("Main\nEvent").is_err());
        assert!(validate_session_name("Main\tEvent").is_err());
    }
}
