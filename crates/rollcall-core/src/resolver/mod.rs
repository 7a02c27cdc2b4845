//! Resolution of submissions into cadets and attendance codes.
//!
//! - `code`: Pure state machine from (current code, stimulus) to next code
//! - `names`: Free-text cadet tokens to directory entries

pub mod code;
pub mod names;

pub use code::{resolve, Stimulus};
pub use names::{parse_name, split_tokens, NameIndex, TokenMatch, TokenResolution};
