//! Core library for MoneYudi.
//!
//! Everything that is not terminal rendering lives here:
//!
//! - `models`: transactions, categories, budgets, settings, vocabulary cards
//! - `period`: billing-period and report-range calculations
//! - `reports`: totals, category breakdowns and budget progress
//! - `ledger`: in-memory state and input validation
//! - `api`: backend table and auth client
//! - `auth`: session persistence and keychain storage
//! - `cache`: JSON file cache with freshness tracking
//! - `vocab`: the vocabulary flashcard service
//! - `offline`: the offline asset cache policy
//! - `notify`: toast notification bus

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod offline;
pub mod period;
pub mod reports;
pub mod utils;
pub mod vocab;
