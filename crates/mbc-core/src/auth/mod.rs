//! Member authentication state.
//!
//! This module provides:
//! - `SessionStore`: the current bearer token, mirrored to the `mbc-state`
//!   storage slot on every change
//! - `SessionState`: the persisted shape of that slot
//!
//! A missing token means the member is signed out.

pub mod session;

pub use session::{SessionState, SessionStore, SESSION_KEY};
