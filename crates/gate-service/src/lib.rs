//! Admission Gate Service Library
//!
//! Gates access to a page by inspecting a bearer token, checking it against
//! a remotely fetched authorization directory, and caching the decision in
//! a local session slot for subsequent visits.
//!
//! Claims are decoded, not verified: the token's signature segment is never
//! validated against a key, and the directory consultation is the only
//! authorization check. The directory fetch is fail-closed — an outage
//! denies everyone rather than granting anyone.
//!
//! # Modules
//!
//! - `claims` - Compact-token decoding and expiry validation
//! - `config` - Gate configuration
//! - `controller` - Admission state machine and its ports
//! - `directory` - Authorization directory client and matcher
//! - `session` - Persisted session cache and storage capability

pub mod claims;
pub mod config;
pub mod controller;
pub mod directory;
pub mod session;
