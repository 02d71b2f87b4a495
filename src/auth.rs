use std::fmt;

use anyhow::{anyhow, Result};
use reqwest::header::HeaderValue;

/// Login credentials for the banking API.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Builds credentials from optional flag/env values, failing with a hint
    /// about which variable is missing.
    pub fn from_parts(email: Option<String>, password: Option<String>) -> Result<Self> {
        let email = email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| anyhow!("Missing user: pass --user or set KONTIST_USER"))?;
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| anyhow!("Missing password: pass --password or set KONTIST_PASSWORD"))?;
        Ok(Self { email, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// `Authorization` value for a bearer token, flagged sensitive so it never
/// shows up in reqwest's debug output.
pub fn bearer_header(token: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).ok()?;
    value.set_sensitive(true);
    Some(value)
}

/// Shortens a token for log output. Counts characters, not bytes.
pub fn mask_token(token: &str) -> String {
    let len = token.chars().count();
    if len > 20 {
        let head: String = token.chars().take(10).collect();
        let tail: String = token.chars().skip(len - 5).collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_from_parts() {
        let creds =
            Credentials::from_parts(Some("alice@example.com".into()), Some("secret".into()))
                .unwrap();
        assert_eq!(creds.email, "alice@example.com");
        assert_eq!(creds.password, "secret");
    }

    #[test]
    fn credentials_missing_parts() {
        let err = Credentials::from_parts(None, Some("secret".into())).unwrap_err();
        assert!(err.to_string().contains("KONTIST_USER"));

        let err = Credentials::from_parts(Some("alice".into()), None).unwrap_err();
        assert!(err.to_string().contains("KONTIST_PASSWORD"));

        assert!(Credentials::from_parts(Some("  ".into()), Some("x".into())).is_err());
        assert!(Credentials::from_parts(Some("alice".into()), Some("".into())).is_err());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::from_parts(Some("bob".into()), Some("hunter2".into())).unwrap();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("bob"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn bearer_header_value() {
        let value = bearer_header("abc.def.ghi").unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer abc.def.ghi");
        assert!(value.is_sensitive());
    }

    #[test]
    fn bearer_header_rejects_control_chars() {
        assert!(bearer_header("bad\ntoken").is_none());
    }

    #[test]
    fn mask_long_and_short_tokens() {
        assert_eq!(
            mask_token("eyJhbGciOiJIUzI1NiJ9.payload.sig"),
            "eyJhbGciOi...d.sig"
        );
        assert_eq!(mask_token("short"), "***");
    }

    #[test]
    fn mask_non_ascii_token() {
        let token = format!("a{}", "ä".repeat(25));
        assert_eq!(mask_token(&token), format!("a{}...{}", "ä".repeat(9), "ä".repeat(5)));
        // 11 chars but 21 bytes
        assert_eq!(mask_token(&format!("a{}", "ä".repeat(10))), "***");
    }
}
