//! REST API client for the club's content and identity backend.
//!
//! This module provides the `ApiClient` for signing members in, registering
//! new members, reading and updating profiles, and fetching public pages
//! and navigation.
//!
//! Member calls carry the session's JWT as a bearer token; public content
//! calls carry the site API key instead.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthResponse, RegisterResponse};
pub use error::ApiError;
