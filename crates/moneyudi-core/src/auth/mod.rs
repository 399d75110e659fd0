//! Authentication state for the backend.
//!
//! This module provides:
//! - `Session`: the signed-in user's tokens, persisted as `session.json`
//! - `CredentialStore`: refresh-token storage in the OS keychain
//!
//! Access tokens are short lived; the refresh token is exchanged for a new
//! pair shortly before expiry.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
