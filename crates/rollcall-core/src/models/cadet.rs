use serde::{Deserialize, Serialize};

use crate::error::{AttendanceError, Result};
use crate::store::{Record, TableId, TableRecord};

/// A cadet as listed in the squadron directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadet {
    pub last_name: String,
    pub first_name: String,
    /// Unique key
    pub email: String,
    pub as_year: String,
    pub flight: String,
    pub squadron: String,
    pub university: String,
}

impl Cadet {
    pub fn new(last_name: &str, first_name: &str, email: &str) -> Self {
        Self {
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            email: email.to_string(),
            as_year: String::new(),
            flight: String::new(),
            squadron: String::new(),
            university: String::new(),
        }
    }

    pub fn with_flight(mut self, flight: &str) -> Self {
        self.flight = flight.to_string();
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }

    /// Lowercased email used for lookups
    pub fn email_key(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

impl TableRecord for Cadet {
    const TABLE: TableId = TableId::Directory;
    const SCHEMA: &'static [&'static str] = &[
        "last_name",
        "first_name",
        "email",
        "as_year",
        "flight",
        "squadron",
        "university",
    ];

    fn from_record(record: &Record<'_>) -> Result<Self> {
        let email = record.get("email");
        if email.is_empty() {
            return Err(AttendanceError::invalid_record(
                Self::TABLE,
                record.index(),
                "missing email",
            ));
        }
        Ok(Self {
            last_name: record.get("last_name").to_string(),
            first_name: record.get("first_name").to_string(),
            email: email.to_string(),
            as_year: record.get("as_year").to_string(),
            flight: record.get("flight").to_string(),
            squadron: record.get("squadron").to_string(),
            university: record.get("university").to_string(),
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.last_name.clone(),
            self.first_name.clone(),
            self.email.clone(),
            self.as_year.clone(),
            self.flight.clone(),
            self.squadron.clone(),
            self.university.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Table;

    #[test]
    fn test_display_names() {
        let cadet = Cadet::new("Doe", "Jane", "Jane.Doe@Example.edu");
        assert_eq!(cadet.display_name(), "Doe, Jane");
        assert_eq!(cadet.full_name(), "Jane Doe");
        assert_eq!(cadet.email_key(), "jane.doe@example.edu");
    }

    #[test]
    fn test_decode_requires_email() {
        let mut table = Table::new(Cadet::SCHEMA);
        table.rows.push(vec!["Doe".into(), "Jane".into(), "".into()]);
        let err = table.decode::<Cadet>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid directory row 0: missing email");
    }

    #[test]
    fn test_decode_tolerates_missing_optional_columns() {
        let mut table = Table::new(&["email", "last_name", "first_name"]);
        table.rows.push(vec!["a@example.edu".into(), "Doe".into(), "Jane".into()]);
        let cadets = table.decode::<Cadet>().unwrap();
        assert_eq!(cadets[0].display_name(), "Doe, Jane");
        assert_eq!(cadets[0].flight, "");
    }
}
