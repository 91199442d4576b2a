//! Compact-token claims decoding and expiry validation.
//!
//! Tokens are compact three-segment strings (`header.payload.signature`).
//! The first two segments are base64url-encoded JSON; the third segment is
//! required for segment-count purposes only and is never inspected. No
//! signature verification happens here: claims are client-supplied facts
//! that the authorization directory is consulted about afterwards.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE any decoding (resource exhaustion guard)
//! - Error messages are intentionally generic; detail is logged at debug level
//! - The `sub` and `email` fields are redacted in Debug output

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// Typical compact tokens are 200-500 bytes. Anything larger is rejected
/// before base64 decoding allocates a buffer for it.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Base64url engine that accepts both padded and unpadded segments.
///
/// Token producers commonly strip the `=` padding; some do not. Decoding is
/// indifferent to padding so both forms round-trip.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding a compact token.
///
/// Messages are intentionally generic to prevent information leakage;
/// the distinguishing detail is logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Token size exceeds [`MAX_TOKEN_SIZE_BYTES`].
    #[error("The access token is invalid")]
    TokenTooLarge,

    /// Wrong segment count, undecodable base64, or invalid JSON.
    #[error("The access token is invalid")]
    MalformedToken,
}

// =============================================================================
// Claims Types
// =============================================================================

/// Decoded token header.
///
/// Only carried for completeness; admission never branches on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared algorithm. Unverified.
    #[serde(default)]
    pub alg: Option<String>,

    /// Declared token type.
    #[serde(default)]
    pub typ: Option<String>,
}

/// Decoded claims payload.
///
/// Every field is optional; an absent `exp` means the claims never expire.
/// Unrecognized fields are ignored.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ClaimsSet {
    /// Subject identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Holder email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Unique-ish token identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Expiry timestamp (Unix epoch seconds). Absent means never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl fmt::Debug for ClaimsSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsSet")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("jti", &self.jti)
            .field("exp", &self.exp)
            .finish()
    }
}

/// A fully decoded compact token: header plus claims.
///
/// The signature segment is deliberately not represented; its presence is
/// enforced by the segment count and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    /// Decoded header segment.
    pub header: TokenHeader,

    /// Decoded claims segment.
    pub claims: ClaimsSet,
}

// =============================================================================
// Functions
// =============================================================================

/// Decode a compact three-segment token into header and claims.
///
/// The third (signature) segment must be present but is never validated.
///
/// # Errors
///
/// - [`DecodeError::TokenTooLarge`] - token exceeds [`MAX_TOKEN_SIZE_BYTES`]
/// - [`DecodeError::MalformedToken`] - segment count is not exactly 3, or a
///   non-signature segment is not valid base64url-encoded JSON
pub fn decode(token: &str) -> Result<DecodedToken, DecodeError> {
    // Size check before any decoding work.
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "gate.claims",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(DecodeError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header_part), Some(payload_part), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "gate.claims", "Token rejected: segment count is not 3");
        return Err(DecodeError::MalformedToken);
    };

    let header = decode_segment(header_part, "header")?;
    let claims = decode_segment(payload_part, "payload")?;

    Ok(DecodedToken { header, claims })
}

/// Decode one base64url JSON segment into a deserializable value.
fn decode_segment<T>(segment: &str, which: &'static str) -> Result<T, DecodeError>
where
    T: serde::de::DeserializeOwned,
{
    let bytes = URL_SAFE_LENIENT.decode(segment).map_err(|e| {
        tracing::debug!(target: "gate.claims", segment = which, error = %e, "Failed to decode token segment base64");
        DecodeError::MalformedToken
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "gate.claims", segment = which, error = %e, "Failed to parse token segment JSON");
        DecodeError::MalformedToken
    })
}

/// Check whether an expiry timestamp has elapsed.
///
/// Returns true iff an expiry is present and strictly before `now`; an
/// expiry equal to `now` is not yet expired, and an absent expiry never
/// expires. This is the single validator used for claims expiry, session
/// expiry, and directory-entry expiry.
#[must_use]
pub fn is_expired(exp: Option<i64>, now: i64) -> bool {
    exp.map_or(false, |e| e < now)
}

// =============================================================================
// Tests
// =============================================================================
