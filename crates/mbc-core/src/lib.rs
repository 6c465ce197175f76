//! Core library for the Mountain Backpackers Club member client.
//!
//! - `auth`: the session store holding the member's bearer token
//! - `cache`: expiring key-value cache with lazy eviction
//! - `storage`: the storage backends both of them persist through
//! - `api`: client for the club's content and identity backend
//! - `app`: `Portal`, the application context tying them together

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod storage;
pub mod utils;

pub use app::{Portal, PortalError, RegistrationOutcome};
pub use config::Config;
