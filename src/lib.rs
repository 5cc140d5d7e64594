//! keygate - HWID-bound license key server
//!
//! Issues opaque license keys, binds each key to the first device that
//! validates it, and answers accept/reject for later validations and
//! HWID-only auto-logins. The lifecycle rules live in [`engine`]; [`db`]
//! is the SQLite-backed store and [`handlers`] the HTTP surface.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod util;
