//! Utility functions for turning backend content into terminal text.

pub mod format;

pub use format::{format_optional, html_to_text, truncate_string, yes_no};
