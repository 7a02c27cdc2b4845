use std::sync::Arc;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use proptest::test_runner::Config;

use rollcall_core::{
    AttendanceCode, AttendanceLedger, AttendanceLogEntry, AttendanceMatrix, Event, EventCatalog,
    EventStatus, EventType, MemoryStore,
};

const CADETS: [&str; 4] = [
    "a.able@example.edu",
    "b.baker@example.edu",
    "c.charlie@example.edu",
    "d.delta@example.edu",
];

const MARKS: [&str; 10] = ["P", "ER", "E", "ED", "U", "UR", "T", "ES", "MU", "N/A"];

fn catalog() -> EventCatalog {
    EventCatalog::new(vec![
        Event::new("EV-1", "TW-01", EventType::Mando, "TW-01 Mando"),
        Event::new("EV-2", "TW-02", EventType::Llab, "TW-02 LLAB"),
        Event::new("EV-3", "TW-03", EventType::Llab, "TW-03 LLAB").with_status(EventStatus::Cancelled),
        Event::new("EV-4", "TW-04", EventType::Secondary, "TW-04 Social")
            .with_affects_attendance(false),
    ])
}

fn entry_strategy() -> impl Strategy<Value = (usize, usize, Vec<usize>)> {
    (
        0..MARKS.len(),
        0..5usize,
        prop::collection::vec(0..CADETS.len(), 1..4),
    )
}

fn build_entries(raw: Vec<(usize, usize, Vec<usize>)>) -> Vec<AttendanceLogEntry> {
    raw.into_iter()
        .enumerate()
        .map(|(i, (mark, event, cadets))| AttendanceLogEntry {
            submission_id: format!("SUB-{i:04}"),
            submitted_at: Utc.with_ymd_and_hms(2024, 9, 1, 18, 0, 0).unwrap()
                + chrono::Duration::minutes(i as i64),
            // index 4 names an event missing from the catalog
            event: format!("EV-{}", event + 1),
            attendance_type: AttendanceCode::parse(MARKS[mark]),
            email: "submitter@example.edu".to_string(),
            name: "Submitter".to_string(),
            flight: "Alpha".to_string(),
            cadets: cadets.into_iter().map(|c| CADETS[c].to_string()).collect(),
        })
        .collect()
}

proptest! {
    #![proptest_config(Config::with_cases(128))]

    #[test]
    fn incremental_apply_matches_full_replay(raw in prop::collection::vec(entry_strategy(), 0..40)) {
        let catalog = catalog();
        let entries = build_entries(raw);

        let mut incremental = AttendanceMatrix::new();
        for entry in &entries {
            incremental.apply(entry, &catalog);
        }
        let replayed = AttendanceMatrix::rebuild(&entries, &catalog);

        prop_assert!(incremental.drift(&replayed).is_empty());
        prop_assert_eq!(incremental, replayed);
    }

    #[test]
    fn ledger_round_trip_preserves_projection(raw in prop::collection::vec(entry_strategy(), 1..20)) {
        let catalog = catalog();
        let entries = build_entries(raw);

        let ledger = AttendanceLedger::new(Arc::new(MemoryStore::new()));
        for chunk in entries.chunks(3) {
            ledger.append(chunk).unwrap();
        }
        let stored = ledger.replay_all().unwrap();

        prop_assert_eq!(&stored, &entries);
        prop_assert_eq!(
            AttendanceMatrix::rebuild(&stored, &catalog),
            AttendanceMatrix::rebuild(&entries, &catalog)
        );
    }

    #[test]
    fn rebuild_only_touches_named_cells(raw in prop::collection::vec(entry_strategy(), 1..20)) {
        let catalog = catalog();
        let entries = build_entries(raw);
        let matrix = AttendanceMatrix::rebuild(&entries, &catalog);

        for cadet in CADETS {
            for event in ["EV-1", "EV-2", "EV-3", "EV-4", "EV-5"] {
                let named = entries
                    .iter()
                    .any(|e| e.event == event && e.cadets.iter().any(|c| c == cadet));
                if !named {
                    prop_assert_eq!(matrix.raw_code(cadet, event), AttendanceCode::Unset);
                }
            }
        }
    }
}
