//! # Gate Test Utilities
//!
//! Shared test utilities for the admission gate.
//!
//! This crate provides:
//! - Test token builder producing unsigned three-segment compact tokens
//! - In-memory session store (`MemoryStore`) with raw-record access
//! - Recording port implementations (`StubNavigator`, `RecordingNotifier`)
//! - Gate harness (`TestGate`) wiring a controller against a wiremock
//!   directory server
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gate_test_utils::*;
//!
//! let token = TestTokenBuilder::new()
//!     .with_email("alice@example.com")
//!     .with_jti("tok-01")
//!     .expires_in(3600)
//!     .build();
//!
//! let navigator = StubNavigator::with_token(&token);
//! let notifier = RecordingNotifier::new();
//! ```

pub mod harness;
pub mod ports;
pub mod stores;
pub mod token_builders;

// Re-export commonly used items
pub use harness::*;
pub use ports::*;
pub use stores::*;
pub use token_builders::*;
