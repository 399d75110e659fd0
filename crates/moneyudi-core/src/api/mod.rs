//! Backend client module.
//!
//! `ApiClient` talks to the hosted backend: the PostgREST-style table API
//! under `/rest/v1` for ledger rows, and the GoTrue-style auth API under
//! `/auth/v1` for email sign-in and token refresh.
//!
//! Every request carries the project's anon key in the `apikey` header and
//! a bearer token (the user's access token once signed in).

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
