//! Rollcall - command-line front end for the cadet squadron attendance engine.
//!
//! Every command opens the JSON file store in the configured data directory,
//! replays the attendance ledger, and runs one operation under the store lock.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rollcall_core::utils::{format_percentage, truncate_string};
use rollcall_core::{
    AttendanceForm, AttendanceService, Config, Decision, DecisionEdit, ExcusalForm,
    JsonFileStore, ServiceOptions, Submission, SubmissionOutcome, TracingNotifier,
};

// ============================================================================
// Constants
// ============================================================================

/// Width of each column when printing the matrix
const MATRIX_CELL_WIDTH: usize = 14;

/// Submitter identity recorded on attendance forms
const SUBMITTER_EMAIL_ENV: &str = "ROLLCALL_SUBMITTER_EMAIL";
const SUBMITTER_NAME_ENV: &str = "ROLLCALL_SUBMITTER_NAME";
const SUBMITTER_FLIGHT_ENV: &str = "ROLLCALL_FLIGHT";

const USAGE: &str = "\
Usage: rollcall <command> [args]

Commands:
  rebuild                                   Replay the ledger into the matrix
  matrix                                    Print the attendance matrix
  attend <week> <type> <cadet>...           Record attendance for an event
  excuse <email> <event> [notes]            File an excusal request
  decide <request_id> <approved|denied> <decided_by>
                                            Decide an excusal request
  pending                                   List pending excusal requests
  summary <email>                           Show one cadet's attendance
  verify                                    Compare the matrix with the ledger
  status                                    Show stored table ages";

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "rollcall.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let result = run(command, &args[1..], &config).await;
    if let Err(ref e) = result {
        error!(command = %command, error = %e, "Command failed");
    }
    result
}

async fn run(command: &str, args: &[String], config: &Config) -> Result<()> {
    if command == "help" || command == "--help" || command == "-h" {
        println!("{}", USAGE);
        return Ok(());
    }

    let data_dir = config.data_dir()?;
    let store = Arc::new(JsonFileStore::new(&data_dir)?);
    if command == "status" {
        return print_status(&store);
    }

    info!(command = %command, data_dir = %data_dir.display(), "Rollcall starting");
    let service = AttendanceService::open(
        store,
        Arc::new(TracingNotifier),
        ServiceOptions::from(config),
    )
    .await
    .context("Failed to open attendance store")?;

    match command {
        "rebuild" => {
            let report = service.rebuild().await?;
            println!(
                "Rebuilt matrix from {} ledger entries ({} cadets, {} event columns)",
                report.entries, report.cadets, report.columns
            );
        }
        "matrix" => print_matrix(&service).await?,
        "attend" => {
            if args.len() < 3 {
                bail!("Usage: rollcall attend <week> <type> <cadet>...");
            }
            let form = AttendanceForm {
                training_week: args[0].clone(),
                event_type: args[1].clone(),
                cadets: args[2..].join("\n"),
                submitted_by_email: std::env::var(SUBMITTER_EMAIL_ENV).unwrap_or_default(),
                submitted_by_name: std::env::var(SUBMITTER_NAME_ENV).unwrap_or_default(),
                flight: std::env::var(SUBMITTER_FLIGHT_ENV).unwrap_or_default(),
                submitted_at: Utc::now(),
            };
            let outcome = service.submit(Submission::Attendance(form)).await?;
            print_outcome(&outcome);
        }
        "excuse" => {
            if args.len() < 2 {
                bail!("Usage: rollcall excuse <email> <event> [notes]");
            }
            let form = ExcusalForm {
                email: args[0].clone(),
                event: args[1].clone(),
                notes: args[2..].join(" "),
                submitted_at: Utc::now(),
            };
            let outcome = service.submit(Submission::ExcusalSubmit(form)).await?;
            if outcome.is_unchanged() {
                println!(
                    "{} already earns credit for {}; no excusal opened",
                    args[0], outcome.event_id
                );
            } else {
                print_outcome(&outcome);
            }
        }
        "decide" => {
            if args.len() < 3 {
                bail!("Usage: rollcall decide <request_id> <approved|denied> <decided_by>");
            }
            let decision = Decision::parse(&args[1])
                .with_context(|| format!("Unknown decision '{}'", args[1]))?;
            let edit = DecisionEdit {
                request_id: args[0].clone(),
                decision,
                decided_by: args[2..].join(" "),
                decided_at: Utc::now(),
            };
            let outcome = service.submit(Submission::ExcusalDecision(edit)).await?;
            if outcome.is_unchanged() {
                println!("Request {} already {}", args[0], decision.to_string().to_lowercase());
            } else {
                print_outcome(&outcome);
            }
        }
        "pending" => {
            let pending = service.pending_excusals()?;
            if pending.is_empty() {
                println!("No pending excusal requests");
            }
            for request in pending {
                println!(
                    "{}  {}  {}  {}  {}",
                    request.request_id,
                    request.event,
                    request.display_name(),
                    request.submitted_at.format("%Y-%m-%d %H:%M"),
                    truncate_string(&request.notes, 40)
                );
            }
        }
        "summary" => {
            let Some(email) = args.first() else {
                bail!("Usage: rollcall summary <email>");
            };
            let summary = service.summary(email).await?;
            println!(
                "{}: overall {} ({}/{}), LLAB {} ({}/{})",
                email,
                format_percentage(summary.overall_pct()),
                summary.credited,
                summary.recorded,
                format_percentage(summary.llab_pct()),
                summary.llab_credited,
                summary.llab_recorded
            );
        }
        "verify" => {
            let drift = service.verify().await?;
            if drift.is_empty() {
                println!("Matrix matches ledger replay");
            } else {
                for cell in &drift {
                    println!(
                        "{} {}: live '{}' replay '{}'",
                        cell.email, cell.event_id, cell.left, cell.right
                    );
                }
                bail!("{} cells drifted from the ledger", drift.len());
            }
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }

    Ok(())
}

fn print_outcome(outcome: &SubmissionOutcome) {
    if let Some(ref id) = outcome.submission_id {
        println!("Recorded {} for event {}", id, outcome.event_id);
    }
    if let Some(ref request_id) = outcome.request_id {
        println!("Excusal request: {}", request_id);
    }
    for change in &outcome.changes {
        println!("  {}: {} -> {}", change.email, change.before, change.after);
    }
    if !outcome.missing.is_empty() {
        println!("Not recorded (no unique directory match):");
        for token in &outcome.missing {
            let note = if outcome.ambiguous.contains(token) {
                " (ambiguous)"
            } else {
                ""
            };
            println!("  {}{}", token, note);
        }
    }
}

async fn print_matrix(service: &AttendanceService) -> Result<()> {
    let table = service.matrix_table().await?;
    let line = |cells: &[String]| {
        cells
            .iter()
            .map(|c| format!("{:<width$}", truncate_string(c, MATRIX_CELL_WIDTH), width = MATRIX_CELL_WIDTH))
            .collect::<Vec<_>>()
            .join(" ")
    };
    println!("{}", line(&table.headers));
    for row in &table.rows {
        println!("{}", line(row));
    }
    Ok(())
}

fn print_status(store: &JsonFileStore) -> Result<()> {
    println!("Data directory: {}", store.data_dir().display());
    for (table, age) in store.table_ages() {
        println!(
            "  {:<20} {}",
            table.name(),
            age.unwrap_or_else(|| "never written".to_string())
        );
    }
    Ok(())
}
