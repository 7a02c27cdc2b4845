use serde::{Deserialize, Serialize};

use crate::error::{AttendanceError, Result};
use crate::store::{Record, TableId, TableRecord};
use crate::utils::parse_flag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Mando,
    Llab,
    Secondary,
    Poc,
    Other,
}

impl EventType {
    /// Recognize a type from free text ("Mando PT", "LLAB", "poc lab").
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("llab") {
            EventType::Llab
        } else if lower.contains("mando") {
            EventType::Mando
        } else if lower.contains("secondary") {
            EventType::Secondary
        } else if lower.contains("poc") {
            EventType::Poc
        } else {
            EventType::Other
        }
    }

    /// Lowercase keyword used for event resolution
    pub fn keyword(&self) -> &'static str {
        match self {
            EventType::Mando => "mando",
            EventType::Llab => "llab",
            EventType::Secondary => "secondary",
            EventType::Poc => "poc",
            EventType::Other => "other",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Mando => write!(f, "Mando"),
            EventType::Llab => write!(f, "LLAB"),
            EventType::Secondary => write!(f, "Secondary"),
            EventType::Poc => write!(f, "POC"),
            EventType::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Published,
    Cancelled,
    Archived,
    Draft,
}

impl EventStatus {
    /// Unrecognized or blank statuses are treated as drafts.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "published" | "active" => EventStatus::Published,
            "cancelled" | "canceled" => EventStatus::Cancelled,
            "archived" => EventStatus::Archived,
            _ => EventStatus::Draft,
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Published => write!(f, "Published"),
            EventStatus::Cancelled => write!(f, "Cancelled"),
            EventStatus::Archived => write!(f, "Archived"),
            EventStatus::Draft => write!(f, "Draft"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    /// Normalized to `TW-NN` when the catalog value carries a week number
    pub training_week: String,
    pub event_type: EventType,
    pub display_name: String,
    pub attendance_column_label: String,
    pub flight_scope: String,
    pub status: EventStatus,
    pub start_datetime: Option<String>,
    pub end_datetime: Option<String>,
    pub affects_attendance: bool,
}

impl Event {
    pub fn new(event_id: &str, training_week: &str, event_type: EventType, display_name: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            training_week: normalize_training_week(training_week)
                .unwrap_or_else(|| training_week.trim().to_string()),
            event_type,
            display_name: display_name.to_string(),
            attendance_column_label: display_name.to_string(),
            flight_scope: String::new(),
            status: EventStatus::Published,
            start_datetime: None,
            end_datetime: None,
            affects_attendance: true,
        }
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_affects_attendance(mut self, affects: bool) -> Self {
        self.affects_attendance = affects;
        self
    }

    /// Published and attendance-affecting: counts toward percentages
    pub fn is_in_scope(&self) -> bool {
        self.status == EventStatus::Published && self.affects_attendance
    }

    /// Whether the event gets a matrix column (cancelled columns render N/A)
    pub fn has_column(&self) -> bool {
        self.affects_attendance
            && matches!(self.status, EventStatus::Published | EventStatus::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Matrix column header
    pub fn column_label(&self) -> &str {
        if self.attendance_column_label.trim().is_empty() {
            &self.display_name
        } else {
            &self.attendance_column_label
        }
    }
}

/// Normalize a training week to `TW-NN`.
///
/// Accepts `TW-3`, `tw03`, `TW 03`, `Week 3` and bare `3`. Returns `None` when
/// the text carries no week number.
pub fn normalize_training_week(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let week: u32 = digits.parse().ok()?;
    Some(format!("TW-{:02}", week))
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl TableRecord for Event {
    const TABLE: TableId = TableId::Events;
    const SCHEMA: &'static [&'static str] = &[
        "event_id",
        "training_week",
        "event_type",
        "display_name",
        "attendance_column_label",
        "flight_scope",
        "status",
        "start_datetime",
        "end_datetime",
        "affects_attendance",
    ];

    fn from_record(record: &Record<'_>) -> Result<Self> {
        let event_id = record.get("event_id");
        if event_id.is_empty() {
            return Err(AttendanceError::invalid_record(
                Self::TABLE,
                record.index(),
                "missing event_id",
            ));
        }
        let raw_week = record.get("training_week");
        let label = record.get("attendance_column_label");

        // Older catalogs have no flag column: a column label marks attendance events
        let affects_attendance = if record.has("affects_attendance") {
            parse_flag(record.get("affects_attendance"))
        } else {
            !label.is_empty()
        };

        Ok(Self {
            event_id: event_id.to_string(),
            training_week: normalize_training_week(raw_week).unwrap_or_else(|| raw_week.to_string()),
            event_type: EventType::parse(record.get("event_type")),
            display_name: record.get("display_name").to_string(),
            attendance_column_label: label.to_string(),
            flight_scope: record.get("flight_scope").to_string(),
            status: EventStatus::parse(record.get("status")),
            start_datetime: optional(record.get("start_datetime")),
            end_datetime: optional(record.get("end_datetime")),
            affects_attendance,
        })
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.event_id.clone(),
            self.training_week.clone(),
            self.event_type.to_string(),
            self.display_name.clone(),
            self.attendance_column_label.clone(),
            self.flight_scope.clone(),
            self.status.to_string(),
            self.start_datetime.clone().unwrap_or_default(),
            self.end_datetime.clone().unwrap_or_default(),
            self.affects_attendance.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Table;

    #[test]
    fn test_normalize_training_week() {
        assert_eq!(normalize_training_week("TW-3").as_deref(), Some("TW-03"));
        assert_eq!(normalize_training_week("tw03").as_deref(), Some("TW-03"));
        assert_eq!(normalize_training_week("TW 03").as_deref(), Some("TW-03"));
        assert_eq!(normalize_training_week("Week 12").as_deref(), Some("TW-12"));
        assert_eq!(normalize_training_week("7").as_deref(), Some("TW-07"));
        assert_eq!(normalize_training_week("Finals"), None);
    }

    #[test]
    fn test_event_type_parse() {
        assert_eq!(EventType::parse("Mando PT"), EventType::Mando);
        assert_eq!(EventType::parse("LLAB"), EventType::Llab);
        assert_eq!(EventType::parse("Secondary PT"), EventType::Secondary);
        assert_eq!(EventType::parse("POC Lab"), EventType::Poc);
        assert_eq!(EventType::parse("Dining In"), EventType::Other);
    }

    #[test]
    fn test_status_parse_defaults_to_draft() {
        assert_eq!(EventStatus::parse("Canceled"), EventStatus::Cancelled);
        assert_eq!(EventStatus::parse("published"), EventStatus::Published);
        assert_eq!(EventStatus::parse(""), EventStatus::Draft);
    }

    #[test]
    fn test_scope_and_columns() {
        let published = Event::new("EV-1", "TW-01", EventType::Llab, "TW-01 LLAB");
        assert!(published.is_in_scope());
        assert!(published.has_column());

        let cancelled = published.clone().with_status(EventStatus::Cancelled);
        assert!(!cancelled.is_in_scope());
        assert!(cancelled.has_column());

        let draft = published.clone().with_status(EventStatus::Draft);
        assert!(!draft.has_column());

        let social = published.with_affects_attendance(false);
        assert!(!social.is_in_scope());
        assert!(!social.has_column());
    }

    #[test]
    fn test_affects_attendance_derived_from_label() {
        let mut table = Table::new(&[
            "event_id",
            "training_week",
            "event_type",
            "display_name",
            "attendance_column_label",
            "status",
        ]);
        table.rows.push(vec![
            "EV-1".into(),
            "tw 2".into(),
            "LLAB".into(),
            "Week 2 LLAB".into(),
            "TW-02 LLAB".into(),
            "Published".into(),
        ]);
        table.rows.push(vec![
            "EV-2".into(),
            "TW-02".into(),
            "Other".into(),
            "Squadron Social".into(),
            "".into(),
            "Published".into(),
        ]);
        let events = table.decode::<Event>().unwrap();
        assert_eq!(events[0].training_week, "TW-02");
        assert!(events[0].affects_attendance);
        assert_eq!(events[0].column_label(), "TW-02 LLAB");
        assert!(!events[1].affects_attendance);
        assert_eq!(events[1].column_label(), "Squadron Social");
    }
}
