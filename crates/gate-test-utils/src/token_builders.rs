//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating unsigned compact test tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::json;

/// Builder for creating unsigned three-segment test tokens.
///
/// The signature segment is a fixed placeholder; the gate never inspects it.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .with_email("alice@example.com")
///     .with_jti("tok-01")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: Option<String>,
    email: Option<String>,
    jti: Option<String>,
    exp: Option<i64>,
}

impl TestTokenBuilder {
    /// Create a builder with a subject, email, jti, and one-hour expiry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sub: Some("test-subject".to_string()),
            email: Some("test@example.com".to_string()),
            jti: Some("test-jti".to_string()),
            exp: Some((Utc::now() + Duration::seconds(3600)).timestamp()),
        }
    }

    /// Set the subject claim.
    #[must_use]
    pub fn with_sub(mut self, sub: &str) -> Self {
        self.sub = Some(sub.to_string());
        self
    }

    /// Set the email claim.
    #[must_use]
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Set the token identifier claim.
    #[must_use]
    pub fn with_jti(mut self, jti: &str) -> Self {
        self.jti = Some(jti.to_string());
        self
    }

    /// Set expiry as seconds from now (negative for an already-expired token).
    #[must_use]
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Set an absolute expiry timestamp (Unix epoch seconds).
    #[must_use]
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = Some(timestamp);
        self
    }

    /// Remove the expiry claim entirely (never expires).
    #[must_use]
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Build the compact token string.
    #[must_use]
    pub fn build(self) -> String {
        let header = json!({"alg": "none", "typ": "JWT"});

        let mut claims = serde_json::Map::new();
        if let Some(sub) = self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        if let Some(email) = self.email {
            claims.insert("email".to_string(), json!(email));
        }
        if let Some(jti) = self.jti {
            claims.insert("jti".to_string(), json!(jti));
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }

        format!(
            "{}.{}.unsigned",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(serde_json::Value::Object(claims).to_string())
        )
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
