//! Utility functions for string formatting and table cell parsing.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    format_percentage, format_timestamp, generate_id, generate_unique_id, normalize_key, parse_flag,
    parse_timestamp, truncate_string,
};
