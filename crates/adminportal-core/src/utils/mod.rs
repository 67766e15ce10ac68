//! Utility functions for string formatting.

pub mod format;

pub use format::{format_countdown, format_ticket_date, truncate_string};
