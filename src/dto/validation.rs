//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a credential is non-blank and usable as a `Cookie` header value.
///
/// A credential the HTTP client cannot send would make every remote call fail,
/// and remote calls are retried without limit.
///
/// # Examples
///
/// ```ignore
/// validate_credential("session=abc; uid=7") // Ok
/// validate_credential("   ")                // Err - blank
/// validate_credential("session=abc\r\n")    // Err - control characters
/// ```
pub fn validate_credential(credential: &str) -> Result<(), ValidationError> {
    if credential.trim().is_empty() {
        let mut err = ValidationError::new("credential_blank");
        err.message = Some("Credential must not be empty".into());
        return Err(err);
    }

    if !credential
        .chars()
        .all(|c| c == '\t' || (' '..='~').contains(&c))
    {
        let mut err = ValidationError::new("credential_format");
        err.message = Some("Credential must contain only visible ASCII characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_credential_valid() {
        assert!(validate_credential("session=abc").is_ok());
        assert!(validate_credential("a=1; b=2").is_ok());
    }

    #[test]
    fn test_validate_credential_blank() {
        assert!(validate_credential("").is_err());
        assert!(validate_credential(" \t ").is_err());
    }

    #[test]
    fn test_validate_credential_invalid_format() {
        assert!(validate_credential("session=abc\r\nX-Evil: 1").is_err());
        assert!(validate_credential("сессия=1").is_err());
    }
}
