//! Read-only event catalog and event resolution for form submissions.

use tracing::{debug, warn};

use crate::error::{AttendanceError, Result};
use crate::models::{normalize_training_week, Event, EventType};
use crate::store::{TableId, TableStore};
use crate::utils::normalize_key;

#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<Event>,
}

impl EventCatalog {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn load<S: TableStore + ?Sized>(store: &S) -> Result<Self> {
        let events = store.read_table(TableId::Events)?.decode_lenient::<Event>();
        debug!(count = events.len(), "Loaded event catalog");
        Ok(Self::new(events))
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn get(&self, event_id: &str) -> Option<&Event> {
        self.events
            .iter()
            .find(|e| e.event_id.eq_ignore_ascii_case(event_id.trim()))
    }

    /// Events with a matrix column, in catalog order
    pub fn columns(&self) -> Vec<&Event> {
        self.events.iter().filter(|e| e.has_column()).collect()
    }

    /// Published, attendance-affecting events
    pub fn in_scope(&self) -> Vec<&Event> {
        self.events.iter().filter(|e| e.is_in_scope()).collect()
    }

    /// Resolve a free-text event reference.
    ///
    /// Tries the event id, then the attendance column label, then the display
    /// name, all case-insensitive. A label or name shared by several events is
    /// ambiguous.
    pub fn lookup(&self, reference: &str) -> Result<&Event> {
        if let Some(event) = self.get(reference) {
            return Ok(event);
        }

        let key = normalize_key(reference);
        let by_label: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| normalize_key(e.column_label()) == key)
            .collect();
        let matches = if by_label.is_empty() {
            self.events
                .iter()
                .filter(|e| normalize_key(&e.display_name) == key)
                .collect()
        } else {
            by_label
        };

        match matches.as_slice() {
            [] => Err(AttendanceError::UnknownEvent(reference.to_string())),
            [event] => Ok(*event),
            several => Err(AttendanceError::AmbiguousEvent {
                reference: reference.to_string(),
                candidates: several.iter().map(|e| e.event_id.clone()).collect(),
            }),
        }
    }

    /// Resolve an attendance form's training week and event type to one
    /// in-scope event.
    ///
    /// Candidates share the normalized training week and either carry the
    /// requested type or mention its keyword in their name. When several
    /// match, the first whose type matches exactly wins, else the first
    /// candidate in catalog order.
    pub fn resolve_submission(&self, raw_week: &str, raw_type: &str) -> Result<&Event> {
        let not_found = || AttendanceError::EventNotFound {
            training_week: raw_week.to_string(),
            event_type: raw_type.to_string(),
        };

        let week = normalize_training_week(raw_week).ok_or_else(not_found)?;
        let keyword = type_keyword(raw_type);
        if keyword.is_empty() {
            return Err(not_found());
        }

        let candidates: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| e.is_in_scope() && e.training_week == week)
            .filter(|e| {
                e.event_type.keyword() == keyword
                    || normalize_key(&e.display_name).contains(&keyword)
                    || normalize_key(e.column_label()).contains(&keyword)
            })
            .collect();

        match candidates.as_slice() {
            [] => Err(not_found()),
            [event] => Ok(*event),
            several => {
                let chosen = several
                    .iter()
                    .find(|e| e.event_type.keyword() == keyword)
                    .unwrap_or(&several[0]);
                warn!(
                    training_week = %week,
                    event_type = %keyword,
                    candidates = several.len(),
                    chosen = %chosen.event_id,
                    "Several events match submission, using tie-break"
                );
                Ok(*chosen)
            }
        }
    }
}

/// Lowercase keyword for a raw event type: a known type's keyword, else the
/// normalized text itself.
fn type_keyword(raw_type: &str) -> String {
    let parsed = EventType::parse(raw_type);
    if parsed == EventType::Other {
        normalize_key(raw_type)
    } else {
        parsed.keyword().to_string()
    }
}
