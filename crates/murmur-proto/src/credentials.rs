//! Session credential pair.

use std::fmt;

/// Access token plus anti-forgery token.
///
/// Both travel in every outbound frame. The pair is immutable; rotation means
/// replacing the whole value at the source, which is why callers fetch a fresh
/// pair right before each action instead of caching one.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
    anti_forgery_token: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(access_token: impl Into<String>, anti_forgery_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), anti_forgery_token: anti_forgery_token.into() }
    }

    /// Access (bearer) token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Anti-forgery (CSRF) token.
    pub fn anti_forgery_token(&self) -> &str {
        &self.anti_forgery_token
    }

    /// Name of the first empty token, if any.
    pub fn missing_token(&self) -> Option<&'static str> {
        if self.access_token.is_empty() {
            Some("access_token")
        } else if self.anti_forgery_token.is_empty() {
            Some("csrf_token")
        } else {
            None
        }
    }

    /// True when both tokens are non-empty.
    pub fn is_complete(&self) -> bool {
        self.missing_token().is_none()
    }
}

// Tokens never appear in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("anti_forgery_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tokens_are_reported() {
        assert_eq!(Credentials::new("", "x").missing_token(), Some("access_token"));
        assert_eq!(Credentials::new("x", "").missing_token(), Some("csrf_token"));
        assert!(Credentials::new("a", "c").is_complete());
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let creds = Credentials::new("secret-access", "secret-csrf");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("secret"));
    }
}
