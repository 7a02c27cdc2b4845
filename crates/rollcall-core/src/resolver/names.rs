//! Free-text cadet token resolution.
//!
//! Form cells name cadets as emails, `"Last, First"`, or `"First Last"`. The
//! index is built once per batch; a name key shared by two cadets is ambiguous
//! and never resolves.

use std::collections::HashMap;

use tracing::debug;

use crate::directory::Directory;
use crate::utils::normalize_key;

/// Normalized `(last, first)` name key
type NameKey = (String, String);

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameSlot {
    Unique(String),
    Ambiguous,
}

/// Outcome for a single token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenMatch {
    /// Directory email of the matched cadet
    Cadet(String),
    Ambiguous,
    Missing,
}

/// Outcome for a batch of tokens. Never an error: unresolved tokens are
/// reported so the matched subset can still be recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenResolution {
    /// Directory emails, first-seen order, no duplicates
    pub matched: Vec<String>,
    /// Tokens that did not resolve, including ambiguous ones
    pub missing: Vec<String>,
    /// Subset of `missing` that matched several cadets
    pub ambiguous: Vec<String>,
}

impl TokenResolution {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct NameIndex<'a> {
    directory: &'a Directory,
    by_name: HashMap<NameKey, NameSlot>,
}

impl<'a> NameIndex<'a> {
    pub fn build(directory: &'a Directory) -> Self {
        let mut by_name: HashMap<NameKey, NameSlot> = HashMap::with_capacity(directory.len());
        for cadet in directory.cadets() {
            let Some(key) = name_key(&cadet.last_name, &cadet.first_name) else {
                continue;
            };
            by_name
                .entry(key)
                .and_modify(|slot| {
                    if *slot != NameSlot::Unique(cadet.email.clone()) {
                        *slot = NameSlot::Ambiguous;
                    }
                })
                .or_insert_with(|| NameSlot::Unique(cadet.email.clone()));
        }
        Self { directory, by_name }
    }

    pub fn resolve_token(&self, token: &str) -> TokenMatch {
        let token = token.trim();
        if token.contains('@') {
            return match self.directory.get(token) {
                Some(cadet) => TokenMatch::Cadet(cadet.email.clone()),
                None => TokenMatch::Missing,
            };
        }

        let Some(key) = parse_name(token) else {
            return TokenMatch::Missing;
        };
        match self.by_name.get(&key) {
            Some(NameSlot::Unique(email)) => TokenMatch::Cadet(email.clone()),
            Some(NameSlot::Ambiguous) => TokenMatch::Ambiguous,
            None => TokenMatch::Missing,
        }
    }

    pub fn resolve_all<'t>(&self, tokens: impl IntoIterator<Item = &'t str>) -> TokenResolution {
        let mut resolution = TokenResolution::default();
        for token in tokens {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match self.resolve_token(token) {
                TokenMatch::Cadet(email) => {
                    if !resolution.matched.contains(&email) {
                        resolution.matched.push(email);
                    }
                }
                TokenMatch::Ambiguous => {
                    debug!(token = %token, "Ambiguous cadet name");
                    resolution.missing.push(token.to_string());
                    resolution.ambiguous.push(token.to_string());
                }
                TokenMatch::Missing => {
                    debug!(token = %token, "Unresolved cadet token");
                    resolution.missing.push(token.to_string());
                }
            }
        }
        resolution
    }
}

/// Split a raw form cell into cadet tokens on newlines and `;`.
pub fn split_tokens(raw: &str) -> Vec<&str> {
    raw.split(['\n', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse `"Last, First"` or `"First Last"` into a normalized key.
pub fn parse_name(token: &str) -> Option<NameKey> {
    if let Some((last, first)) = token.split_once(',') {
        return name_key(last, first);
    }
    let words: Vec<&str> = token.split_whitespace().collect();
    match words.as_slice() {
        [first, .., last] => name_key(last, first),
        _ => None,
    }
}

/// Key on the full last name and the first word of the first name.
fn name_key(last: &str, first: &str) -> Option<NameKey> {
    let last = normalize_key(last);
    let first = normalize_key(first)
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();
    if last.is_empty() || first.is_empty() {
        None
    } else {
        Some((last, first))
    }
}
