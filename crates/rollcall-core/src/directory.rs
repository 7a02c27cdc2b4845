//! Read-only cadet directory index.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::Cadet;
use crate::store::{TableId, TableStore};

#[derive(Debug, Clone, Default)]
pub struct Directory {
    cadets: Vec<Cadet>,
    by_email: HashMap<String, usize>,
}

impl Directory {
    /// Build the index. A repeated email keeps its first row.
    pub fn new(cadets: Vec<Cadet>) -> Self {
        let mut kept = Vec::with_capacity(cadets.len());
        let mut by_email = HashMap::with_capacity(cadets.len());
        for cadet in cadets {
            let key = cadet.email_key();
            if by_email.contains_key(&key) {
                warn!(email = %cadet.email, "Duplicate directory email, keeping first entry");
                continue;
            }
            by_email.insert(key, kept.len());
            kept.push(cadet);
        }
        Self {
            cadets: kept,
            by_email,
        }
    }

    pub fn load<S: TableStore + ?Sized>(store: &S) -> Result<Self> {
        let cadets = store.read_table(TableId::Directory)?.decode_lenient::<Cadet>();
        if cadets.is_empty() {
            debug!("Directory is empty");
        }
        Ok(Self::new(cadets))
    }

    /// Case-insensitive email lookup
    pub fn get(&self, email: &str) -> Option<&Cadet> {
        self.by_email
            .get(&email.trim().to_lowercase())
            .map(|&i| &self.cadets[i])
    }

    pub fn contains(&self, email: &str) -> bool {
        self.get(email).is_some()
    }

    pub fn cadets(&self) -> &[Cadet] {
        &self.cadets
    }

    pub fn len(&self) -> usize {
        self.cadets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cadets.is_empty()
    }

    /// Cadets ordered by (last, first), case-insensitive
    pub fn sorted(&self) -> Vec<&Cadet> {
        let mut sorted: Vec<&Cadet> = self.cadets.iter().collect();
        sorted.sort_by_cached_key(|c| {
            (
                c.last_name.to_lowercase(),
                c.first_name.to_lowercase(),
                c.email_key(),
            )
        });
        sorted
    }
}
