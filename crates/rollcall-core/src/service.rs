//! Lock-guarded entry point for every attendance mutation.
//!
//! Each submission, rebuild and verification holds the backing store's write
//! lock for its whole read-append-apply-write sequence, with a bounded wait.
//! The lock belongs to the store, not the service, so every service (and every
//! process, for file stores) over the same data is serialized. The guard is
//! released on every exit path when it drops.
//!
//! The service caches the projection between operations. Another writer may
//! have appended to the ledger since, so every locked operation first compares
//! the projection's applied count with the ledger and replays when they differ.
//! The ledger append then comes first: nothing is applied if it fails. Once it
//! succeeds the projection follows the ledger, and the matrix artifact is
//! rewritten as a whole table.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::catalog::EventCatalog;
use crate::config::{Config, DEFAULT_LOCK_TIMEOUT_SECS};
use crate::directory::Directory;
use crate::error::{AttendanceError, Result};
use crate::excusals::ExcusalRegister;
use crate::ledger::AttendanceLedger;
use crate::matrix::{AttendanceMatrix, AttendanceSummary, CellChange, CellDrift};
use crate::models::{AttendanceLogEntry, ExcusalRequest, ExcusalStatus};
use crate::notify::Notifier;
use crate::resolver::{split_tokens, NameIndex, Stimulus};
use crate::store::{StoreGuard, StoreLock, Table, TableId, TableStore};
use crate::submission::{AttendanceForm, DecisionEdit, ExcusalForm, Submission, SubmissionOutcome};
use crate::utils::generate_unique_id;

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub lock_timeout: Duration,
    /// Reviewer notified of new excusal requests
    pub notify_email: Option<String>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS),
            notify_email: None,
        }
    }
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            lock_timeout: config.lock_timeout(),
            notify_email: config.notify_email.clone(),
        }
    }
}

/// Result of a full rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    pub entries: usize,
    pub cadets: usize,
    pub columns: usize,
}

/// The projection, reachable only while the store lock is held.
struct Locked {
    matrix: OwnedMutexGuard<AttendanceMatrix>,
    _store: StoreGuard,
}

/// Tables read at the start of a locked operation.
struct Snapshot {
    directory: Directory,
    catalog: EventCatalog,
    entries: Vec<AttendanceLogEntry>,
}

impl Snapshot {
    fn id_taken(&self, id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.submission_id.eq_ignore_ascii_case(id))
    }
}

pub struct AttendanceService {
    store: Arc<dyn TableStore>,
    store_lock: StoreLock,
    ledger: AttendanceLedger,
    excusals: ExcusalRegister,
    notifier: Arc<dyn Notifier>,
    projection: Arc<Mutex<AttendanceMatrix>>,
    options: ServiceOptions,
}

impl AttendanceService {
    /// Open the service over a store, replaying the ledger into a fresh
    /// projection.
    pub async fn open(
        store: Arc<dyn TableStore>,
        notifier: Arc<dyn Notifier>,
        options: ServiceOptions,
    ) -> Result<Self> {
        let service = Self {
            ledger: AttendanceLedger::new(store.clone()),
            excusals: ExcusalRegister::new(store.clone()),
            store_lock: store.lock(),
            store,
            notifier,
            projection: Arc::new(Mutex::new(AttendanceMatrix::new())),
            options,
        };
        service.rebuild().await?;
        Ok(service)
    }

    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    pub fn excusals(&self) -> &ExcusalRegister {
        &self.excusals
    }

    async fn lock(&self) -> Result<Locked> {
        let store = self.store_lock.acquire(self.options.lock_timeout).await?;
        // Only ever taken under the store lock, so never contended
        let matrix = self.projection.clone().lock_owned().await;
        Ok(Locked {
            matrix,
            _store: store,
        })
    }

    /// Load the directory, catalog and ledger, and bring the projection up to
    /// date with appends made through other handles.
    fn snapshot(&self, matrix: &mut AttendanceMatrix) -> Result<Snapshot> {
        let directory = Directory::load(&*self.store)?;
        let catalog = EventCatalog::load(&*self.store)?;
        let entries = self.ledger.replay_all()?;
        if matrix.applied() != entries.len() {
            debug!(applied = matrix.applied(), ledger = entries.len(), "Projection behind ledger, replaying");
            *matrix = AttendanceMatrix::rebuild(&entries, &catalog);
        }
        Ok(Snapshot {
            directory,
            catalog,
            entries,
        })
    }

    /// Single dispatch point for every submission kind.
    pub async fn submit(&self, submission: Submission) -> Result<SubmissionOutcome> {
        debug!(kind = submission.kind(), "Handling submission");
        match submission {
            Submission::Attendance(form) => self.record_attendance(form).await,
            Submission::ExcusalSubmit(form) => self.submit_excusal(form).await,
            Submission::ExcusalDecision(edit) => self.decide_excusal(edit).await,
        }
    }

    async fn record_attendance(&self, form: AttendanceForm) -> Result<SubmissionOutcome> {
        let mut locked = self.lock().await?;
        let snapshot = self.snapshot(&mut locked.matrix)?;

        let event = snapshot
            .catalog
            .resolve_submission(&form.training_week, &form.event_type)?;
        let tokens = split_tokens(&form.cadets);
        let resolution = NameIndex::build(&snapshot.directory).resolve_all(tokens.iter().copied());
        if resolution.matched.is_empty() {
            let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
            return Err(AttendanceError::no_cadets(&tokens));
        }

        let entry = AttendanceLogEntry {
            submission_id: generate_unique_id("SUB", form.submitted_at, |id| snapshot.id_taken(id)),
            submitted_at: form.submitted_at,
            event: event.event_id.clone(),
            attendance_type: Stimulus::Present.mark(),
            email: form.submitted_by_email,
            name: form.submitted_by_name,
            flight: form.flight,
            cadets: resolution.matched.clone(),
        };
        let changes = self.append_and_apply(&mut locked.matrix, &entry, &snapshot)?;

        if resolution.is_complete() {
            info!(event_id = %event.event_id, applied = resolution.matched.len(), "Recorded attendance");
        } else {
            warn!(
                event_id = %event.event_id,
                applied = resolution.matched.len(),
                missing = ?resolution.missing,
                ambiguous = ?resolution.ambiguous,
                "Recorded partial attendance"
            );
        }

        Ok(SubmissionOutcome {
            submission_id: Some(entry.submission_id),
            event_id: event.event_id.clone(),
            applied: resolution.matched,
            missing: resolution.missing,
            ambiguous: resolution.ambiguous,
            request_id: None,
            changes,
        })
    }

    async fn submit_excusal(&self, form: ExcusalForm) -> Result<SubmissionOutcome> {
        let mut locked = self.lock().await?;
        let snapshot = self.snapshot(&mut locked.matrix)?;

        let event = snapshot.catalog.lookup(&form.event)?;
        let cadet = snapshot
            .directory
            .get(&form.email)
            .ok_or_else(|| AttendanceError::CadetNotFound(form.email.clone()))?;

        // A cell that already earns credit has nothing to excuse, and a later
        // denial would otherwise turn attendance into ED.
        let current = locked.matrix.raw_code(&cadet.email, &event.event_id);
        if current.is_credit() {
            info!(
                event_id = %event.event_id,
                cadet = %cadet.email,
                current = %current,
                "Cell already earns credit, no excusal opened"
            );
            return Ok(SubmissionOutcome {
                event_id: event.event_id.clone(),
                ..Default::default()
            });
        }

        let requests = self.excusals.all()?;
        let request_id = generate_unique_id("EXC", form.submitted_at, |id| {
            snapshot.id_taken(id) || requests.iter().any(|r| r.request_id.eq_ignore_ascii_case(id))
        });
        let entry = AttendanceLogEntry {
            submission_id: request_id.clone(),
            submitted_at: form.submitted_at,
            event: event.event_id.clone(),
            attendance_type: Stimulus::ExcusalSubmitted.mark(),
            email: cadet.email.clone(),
            name: cadet.display_name(),
            flight: cadet.flight.clone(),
            cadets: vec![cadet.email.clone()],
        };
        let changes = self.append_and_apply(&mut locked.matrix, &entry, &snapshot)?;
        let effect = changes.first().map(|c| c.after.to_string()).unwrap_or_default();

        let request = ExcusalRequest {
            request_id: request_id.clone(),
            event: event.event_id.clone(),
            email: cadet.email.clone(),
            last_name: cadet.last_name.clone(),
            first_name: cadet.first_name.clone(),
            flight: cadet.flight.clone(),
            squadron: cadet.squadron.clone(),
            status: ExcusalStatus::Pending,
            decision: None,
            decided_by: String::new(),
            decided_at: None,
            attendance_effect: effect,
            submitted_at: form.submitted_at,
            last_updated_at: None,
            notes: form.notes,
        };
        self.excusals.create(&request)?;
        info!(request_id = %request_id, event_id = %event.event_id, cadet = %cadet.email, "Excusal submitted");

        if let Some(ref reviewer) = self.options.notify_email {
            self.notify(
                reviewer,
                &format!("Excusal request: {}", cadet.display_name()),
                &format!(
                    "{} requested an excusal for {}.\nRequest: {}\nNotes: {}",
                    cadet.full_name(),
                    event.column_label(),
                    request_id,
                    request.notes
                ),
            );
        }

        Ok(SubmissionOutcome {
            submission_id: Some(entry.submission_id),
            event_id: event.event_id.clone(),
            applied: entry.cadets,
            missing: Vec::new(),
            ambiguous: Vec::new(),
            request_id: Some(request_id),
            changes,
        })
    }

    async fn decide_excusal(&self, edit: DecisionEdit) -> Result<SubmissionOutcome> {
        let mut locked = self.lock().await?;
        let mut request = self.excusals.get(&edit.request_id)?;

        if request.decision == Some(edit.decision) {
            debug!(request_id = %request.request_id, decision = %edit.decision, "Decision unchanged");
            return Ok(SubmissionOutcome {
                event_id: request.event.clone(),
                request_id: Some(request.request_id),
                ..Default::default()
            });
        }
        let revised = request.status.is_terminal();

        let snapshot = self.snapshot(&mut locked.matrix)?;
        let entry = AttendanceLogEntry {
            submission_id: generate_unique_id("DEC", edit.decided_at, |id| snapshot.id_taken(id)),
            submitted_at: edit.decided_at,
            event: request.event.clone(),
            attendance_type: Stimulus::Decided(edit.decision).mark(),
            email: String::new(),
            name: edit.decided_by.clone(),
            flight: request.flight.clone(),
            cadets: vec![request.email.clone()],
        };
        let changes = self.append_and_apply(&mut locked.matrix, &entry, &snapshot)?;

        request.status = edit.decision.status();
        request.decision = Some(edit.decision);
        request.decided_by = edit.decided_by;
        request.decided_at = Some(edit.decided_at);
        request.attendance_effect = changes.first().map(|c| c.after.to_string()).unwrap_or_default();
        request.last_updated_at = Some(Utc::now());
        self.excusals.update(&request)?;

        info!(
            request_id = %request.request_id,
            decision = %edit.decision,
            revised,
            effect = %request.attendance_effect,
            "Excusal decided"
        );

        let event_label = snapshot
            .catalog
            .get(&request.event)
            .map(|e| e.column_label().to_string())
            .unwrap_or_else(|| request.event.clone());
        let subject = if revised {
            format!("Excusal decision changed: {}", event_label)
        } else {
            format!("Excusal {}: {}", edit.decision.to_string().to_lowercase(), event_label)
        };
        self.notify(
            &request.email,
            &subject,
            &format!(
                "Your excusal request {} for {} was {} by {}.",
                request.request_id,
                event_label,
                edit.decision.to_string().to_lowercase(),
                request.decided_by
            ),
        );

        Ok(SubmissionOutcome {
            submission_id: Some(entry.submission_id),
            event_id: request.event.clone(),
            applied: entry.cadets,
            missing: Vec::new(),
            ambiguous: Vec::new(),
            request_id: Some(request.request_id),
            changes,
        })
    }

    /// Append one entry, apply it to the locked projection, and republish the
    /// matrix artifact.
    fn append_and_apply(
        &self,
        matrix: &mut AttendanceMatrix,
        entry: &AttendanceLogEntry,
        snapshot: &Snapshot,
    ) -> Result<Vec<CellChange>> {
        self.ledger.append(std::slice::from_ref(entry))?;
        let changes = matrix.apply(entry, &snapshot.catalog);
        for change in &changes {
            debug!(
                cadet = %change.email,
                event_id = %change.event_id,
                before = %change.before,
                after = %change.after,
                "Cell updated"
            );
        }
        self.publish(matrix, snapshot)?;
        Ok(changes)
    }

    fn publish(&self, matrix: &AttendanceMatrix, snapshot: &Snapshot) -> Result<()> {
        self.store.write_table(
            TableId::AttendanceMatrix,
            &matrix.to_table(&snapshot.directory, &snapshot.catalog),
        )
    }

    fn notify(&self, recipient: &str, subject: &str, body: &str) {
        if let Err(e) = self.notifier.send(recipient, subject, body) {
            warn!(recipient = %recipient, subject = %subject, error = %e, "Notification failed");
        }
    }

    /// Replay the full ledger into a fresh projection and republish it.
    pub async fn rebuild(&self) -> Result<RebuildReport> {
        let mut locked = self.lock().await?;
        let directory = Directory::load(&*self.store)?;
        let catalog = EventCatalog::load(&*self.store)?;
        let entries = self.ledger.replay_all()?;

        let snapshot = Snapshot {
            directory,
            catalog,
            entries,
        };
        let rebuilt = AttendanceMatrix::rebuild(&snapshot.entries, &snapshot.catalog);
        self.publish(&rebuilt, &snapshot)?;
        *locked.matrix = rebuilt;

        let report = RebuildReport {
            entries: snapshot.entries.len(),
            cadets: snapshot.directory.len(),
            columns: snapshot.catalog.columns().len(),
        };
        info!(entries = report.entries, cadets = report.cadets, columns = report.columns, "Rebuilt matrix");
        Ok(report)
    }

    /// Compare the live projection with a fresh replay of the ledger.
    pub async fn verify(&self) -> Result<Vec<CellDrift>> {
        let mut locked = self.lock().await?;
        let snapshot = self.snapshot(&mut locked.matrix)?;
        let replayed = AttendanceMatrix::rebuild(&snapshot.entries, &snapshot.catalog);
        let drift = locked.matrix.drift(&replayed);
        if !drift.is_empty() {
            warn!(cells = drift.len(), "Projection drifted from ledger");
        }
        Ok(drift)
    }

    /// Render the current matrix artifact.
    pub async fn matrix_table(&self) -> Result<Table> {
        let mut locked = self.lock().await?;
        let snapshot = self.snapshot(&mut locked.matrix)?;
        Ok(locked.matrix.to_table(&snapshot.directory, &snapshot.catalog))
    }

    pub async fn summary(&self, email: &str) -> Result<AttendanceSummary> {
        let mut locked = self.lock().await?;
        let snapshot = self.snapshot(&mut locked.matrix)?;
        Ok(locked.matrix.summary(email, &snapshot.catalog))
    }

    pub fn pending_excusals(&self) -> Result<Vec<ExcusalRequest>> {
        self.excusals.list_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceCode, Cadet, Decision, Event, EventStatus, EventType};
    use crate::notify::tests::RecordingNotifier;
    use crate::notify::NullNotifier;
    use crate::store::MemoryStore;

    const JANE: &str = "jane.doe@example.edu";
    const SAM: &str = "sam.lee@example.edu";

    fn seeded_store() -> Arc<MemoryStore> {
        let directory = Table::encode(&[
            Cadet::new("Doe", "Jane", JANE).with_flight("Alpha"),
            Cadet::new("Lee", "Sam", SAM).with_flight("Alpha"),
        ]);
        let events = Table::encode(&[
            Event::new("EV-1", "TW-01", EventType::Mando, "TW-01 Mando"),
            Event::new("EV-3", "TW-03", EventType::Llab, "TW-03 LLAB"),
            Event::new("EV-4", "TW-04", EventType::Llab, "TW-04 LLAB")
                .with_status(EventStatus::Cancelled),
        ]);
        Arc::new(
            MemoryStore::new()
                .with_table(TableId::Directory, directory)
                .with_table(TableId::Events, events),
        )
    }

    async fn service(store: Arc<MemoryStore>, notifier: Arc<dyn Notifier>) -> AttendanceService {
        let options = ServiceOptions {
            lock_timeout: Duration::from_millis(200),
            notify_email: Some("reviewer@example.edu".to_string()),
        };
        AttendanceService::open(store, notifier, options).await.unwrap()
    }

    fn attendance(week: &str, kind: &str, cadets: &str) -> Submission {
        Submission::Attendance(AttendanceForm {
            training_week: week.to_string(),
            event_type: kind.to_string(),
            cadets: cadets.to_string(),
            submitted_by_email: "flight.cc@example.edu".to_string(),
            submitted_by_name: "Cadre, Carl".to_string(),
            flight: "Alpha".to_string(),
            submitted_at: Utc::now(),
        })
    }

    fn excusal(event: &str, email: &str) -> Submission {
        Submission::ExcusalSubmit(ExcusalForm {
            event: event.to_string(),
            email: email.to_string(),
            notes: "Exam".to_string(),
            submitted_at: Utc::now(),
        })
    }

    fn decision(request_id: &str, decision: Decision) -> Submission {
        Submission::ExcusalDecision(DecisionEdit {
            request_id: request_id.to_string(),
            decision,
            decided_by: "Col. Hart".to_string(),
            decided_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_attendance_updates_matrix_and_artifact() {
        let store = seeded_store();
        let service = service(store.clone(), Arc::new(NullNotifier)).await;

        let outcome = service
            .submit(attendance("tw3", "LLAB", "Doe, Jane\nsam.lee@example.edu"))
            .await
            .unwrap();
        assert_eq!(outcome.event_id, "EV-3");
        assert_eq!(outcome.applied, vec![JANE, SAM]);
        assert!(!outcome.is_partial());

        let artifact = store.read_table(TableId::AttendanceMatrix).unwrap();
        let column = artifact.column("TW-03 LLAB").unwrap();
        assert_eq!(artifact.rows[0][column], "P");
        assert_eq!(artifact.rows[0][5], "100%");

        let summary = service.summary(JANE).await.unwrap();
        assert_eq!((summary.credited, summary.recorded), (1, 1));
    }

    #[tokio::test]
    async fn test_partial_attendance_records_matched_subset() {
        let store = seeded_store();
        let service = service(store, Arc::new(NullNotifier)).await;

        let outcome = service
            .submit(attendance("TW-01", "Mando", "Doe, Jane; Ghost, Casper"))
            .await
            .unwrap();
        assert!(outcome.is_partial());
        assert_eq!(outcome.applied, vec![JANE]);
        assert_eq!(outcome.missing, vec!["Ghost, Casper"]);
        assert_eq!(service.ledger().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_submissions_are_fatal() {
        let store = seeded_store();
        let service = service(store, Arc::new(NullNotifier)).await;

        let err = service
            .submit(attendance("TW-01", "Mando", "Ghost, Casper"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No cadets could be resolved from: Ghost, Casper");

        let err = service
            .submit(attendance("TW-09", "LLAB", "Doe, Jane"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'TW-09'"));
        assert!(!err.is_retryable());
        assert!(service.ledger().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_excusal_lifecycle_with_revision() {
        let store = seeded_store();
        let notifier = Arc::new(RecordingNotifier::default());
        let service = service(store, notifier.clone()).await;

        let submitted = service.submit(excusal("TW-03 LLAB", JANE)).await.unwrap();
        let request_id = submitted.request_id.clone().unwrap();
        assert_eq!(submitted.changes[0].after, AttendanceCode::Er);
        assert_eq!(service.pending_excusals().unwrap().len(), 1);

        let approved = service.submit(decision(&request_id, Decision::Approved)).await.unwrap();
        assert_eq!(approved.changes[0].after, AttendanceCode::E);

        // Repeating the same decision does nothing
        let repeat = service.submit(decision(&request_id, Decision::Approved)).await.unwrap();
        assert!(repeat.is_unchanged());

        let revised = service.submit(decision(&request_id, Decision::Denied)).await.unwrap();
        assert_eq!(revised.changes[0].before, AttendanceCode::E);
        assert_eq!(revised.changes[0].after, AttendanceCode::Ed);

        let stored = service.excusals().get(&request_id).unwrap();
        assert_eq!(stored.status, ExcusalStatus::Denied);
        assert_eq!(stored.attendance_effect, "ED");
        assert_eq!(stored.decided_by, "Col. Hart");
        assert!(stored.last_updated_at.is_some());
        assert!(service.pending_excusals().unwrap().is_empty());

        let subjects = notifier.subjects();
        assert_eq!(subjects.len(), 3);
        assert_eq!(subjects[0], "Excusal request: Doe, Jane");
        assert_eq!(subjects[1], "Excusal approved: TW-03 LLAB");
        assert_eq!(subjects[2], "Excusal decision changed: TW-03 LLAB");
        assert_eq!(service.ledger().len().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unexcused_round_trip_through_service() {
        let store = seeded_store();
        let service = service(store.clone(), Arc::new(NullNotifier)).await;

        // A commander records U directly in the ledger
        let ledger = AttendanceLedger::new(store.clone());
        ledger
            .append(&[AttendanceLogEntry {
                submission_id: "SUB-MANUAL".to_string(),
                submitted_at: Utc::now(),
                event: "EV-1".to_string(),
                attendance_type: AttendanceCode::U,
                email: String::new(),
                name: String::new(),
                flight: String::new(),
                cadets: vec![SAM.to_string()],
            }])
            .unwrap();
        service.rebuild().await.unwrap();

        let submitted = service.submit(excusal("EV-1", SAM)).await.unwrap();
        assert_eq!(submitted.changes[0].after, AttendanceCode::Ur);
        let request_id = submitted.request_id.unwrap();
        let denied = service.submit(decision(&request_id, Decision::Denied)).await.unwrap();
        assert_eq!(denied.changes[0].after, AttendanceCode::U);
        assert!(service.verify().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_excusal_for_unknown_cadet_is_fatal() {
        let store = seeded_store();
        let service = service(store, Arc::new(NullNotifier)).await;
        let err = service.submit(excusal("EV-1", "ghost@example.edu")).await.unwrap_err();
        assert_eq!(err.to_string(), "Cadet not found in directory: ghost@example.edu");
        assert!(service.excusals().all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_block() {
        let store = seeded_store();
        let service = service(store, Arc::new(RecordingNotifier::failing())).await;
        let outcome = service.submit(excusal("EV-3", JANE)).await.unwrap();
        assert!(outcome.request_id.is_some());
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let store = seeded_store();
        let service = service(store.clone(), Arc::new(NullNotifier)).await;
        service.submit(attendance("TW-03", "LLAB", "Doe, Jane")).await.unwrap();
        service.submit(excusal("EV-1", SAM)).await.unwrap();

        let first = service.rebuild().await.unwrap();
        let first_table = store.read_table(TableId::AttendanceMatrix).unwrap();
        let second = service.rebuild().await.unwrap();
        let second_table = store.read_table(TableId::AttendanceMatrix).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.entries, 2);
        assert_eq!(first_table, second_table);
    }

    #[tokio::test]
    async fn test_lock_timeout_is_retryable() {
        let store = seeded_store();
        let service = service(store, Arc::new(NullNotifier)).await;

        let held = service.lock().await.unwrap();
        let err = service.rebuild().await.unwrap_err();
        assert!(matches!(err, AttendanceError::LockTimeout { .. }));
        assert!(err.is_retryable());
        drop(held);

        service.rebuild().await.unwrap();
    }

    #[tokio::test]
    async fn test_excusal_against_credited_cell_opens_nothing() {
        let store = seeded_store();
        {
            let service = service(store.clone(), Arc::new(NullNotifier)).await;
            service.submit(attendance("TW-03", "LLAB", "Doe, Jane")).await.unwrap();
        }
        let reopened = service(store, Arc::new(NullNotifier)).await;
        let outcome = reopened.submit(excusal("EV-3", JANE)).await.unwrap();

        // Present is kept and no request exists that a denial could turn into ED
        assert!(outcome.is_unchanged());
        assert!(outcome.request_id.is_none());
        assert!(reopened.excusals().all().unwrap().is_empty());
        assert_eq!(reopened.ledger().len().unwrap(), 1);
        let summary = reopened.summary(JANE).await.unwrap();
        assert_eq!((summary.credited, summary.recorded), (1, 1));
    }

    #[tokio::test]
    async fn test_services_over_one_store_share_lock_and_ledger() {
        let store = seeded_store();
        let first = service(store.clone(), Arc::new(NullNotifier)).await;
        let second = service(store.clone(), Arc::new(NullNotifier)).await;

        first.submit(attendance("TW-03", "LLAB", "Doe, Jane")).await.unwrap();
        second.submit(attendance("TW-01", "Mando", "Lee, Sam")).await.unwrap();

        // The second writer caught up before publishing
        let artifact = store.read_table(TableId::AttendanceMatrix).unwrap();
        let llab = artifact.column("TW-03 LLAB").unwrap();
        let mando = artifact.column("TW-01 Mando").unwrap();
        assert_eq!(artifact.rows[0][llab], "P");
        assert_eq!(artifact.rows[1][mando], "P");
        assert!(second.verify().await.unwrap().is_empty());
        assert!(first.verify().await.unwrap().is_empty());
        assert_eq!(first.summary(SAM).await.unwrap().credited, 1);

        // One service holding the lock blocks the other
        let held = first.lock().await.unwrap();
        let err = second.rebuild().await.unwrap_err();
        assert!(matches!(err, AttendanceError::LockTimeout { .. }));
        drop(held);
        second.rebuild().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_rows_degrade_instead_of_failing() {
        let store = seeded_store();
        let mut directory = store.read_table(TableId::Directory).unwrap();
        directory.rows.push(
            ["Newcadet", "Pat", "", "", "", "", ""]
                .iter()
                .map(|v| v.to_string())
                .collect(),
        );
        store.write_table(TableId::Directory, &directory).unwrap();
        let mut events = store.read_table(TableId::Events).unwrap();
        let mut orphan = vec![String::new(); events.headers.len()];
        orphan[events.column("display_name").unwrap()] = "Mystery event".to_string();
        events.rows.push(orphan);
        store.write_table(TableId::Events, &events).unwrap();

        let service = service(store, Arc::new(NullNotifier)).await;
        let outcome = service
            .submit(attendance("TW-03", "LLAB", "Doe, Jane\nNewcadet, Pat"))
            .await
            .unwrap();
        assert_eq!(outcome.applied, vec![JANE]);
        assert_eq!(outcome.missing, vec!["Newcadet, Pat"]);
    }

    #[tokio::test]
    async fn test_hand_entered_bad_ledger_row_is_skipped() {
        let store = seeded_store();
        let mut bad = Table::new(&["submission_id", "submitted_at", "event", "attendance_type", "cadets"]);
        bad.rows.push(
            ["SUB-HAND", "last tuesday", "EV-1", "P", SAM]
                .iter()
                .map(|v| v.to_string())
                .collect(),
        );
        store.append_rows(TableId::AttendanceLog, &bad).unwrap();

        let service = service(store, Arc::new(NullNotifier)).await;
        service.submit(attendance("TW-03", "LLAB", "Doe, Jane")).await.unwrap();
        assert_eq!(service.ledger().len().unwrap(), 1);
        assert_eq!(service.summary(SAM).await.unwrap().recorded, 0);
        assert!(service.verify().await.unwrap().is_empty());
    }
}
