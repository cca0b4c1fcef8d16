//! Administrative entry point.
//!
//! # Responsibility
//! - Trigger the bulk assignment job against the configured database.
//! - Print mentor rosters, unassigned students and progress reports for
//!   quick inspection.

use clap::{Parser, Subcommand};
use log::error;
use mentorlink_core::db::open_db;
use mentorlink_core::{
    init_logging, init_stderr_logging, AssignmentService, CoreConfig, MeetingService,
    NotificationService, PersonListQuery, PersonRepository, SqliteMeetingRepository,
    SqliteNotificationRepository, SqlitePersonRepository,
};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "mentorlink", about = "MentorLink administration", version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that the core library links
    Ping,
    /// Print the core library version
    Version,
    /// Assign every unassigned student to a mentor
    BulkAssign,
    /// List students without a mentor
    Unassigned,
    /// List the students of one mentor
    Roster {
        /// Mentor ID
        mentor_id: Uuid,
    },
    /// Print the meeting progress report of one student
    Progress {
        /// Student ID
        student_id: Uuid,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Ping => {
            println!("mentorlink_core ping={}", mentorlink_core::ping());
            return Ok(());
        }
        Commands::Version => {
            println!("mentorlink_core version={}", mentorlink_core::core_version());
            return Ok(());
        }
        _ => {}
    }

    let config = match &cli.config {
        Some(path) => CoreConfig::from_file(path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    }
    .with_env_overrides();

    match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, dir),
        None => init_stderr_logging(&config.log_level),
    }
    .map_err(|err| err.to_string())?;

    let conn = open_db(&config.db_path).map_err(|err| {
        error!("event=cli_open module=cli status=error error={err}");
        err.to_string()
    })?;
    let people = SqlitePersonRepository::new(&conn);
    let inbox = NotificationService::new(SqliteNotificationRepository::new(&conn));
    let service = AssignmentService::new(people, &inbox)
        .with_notifications(config.notify_on_assignment);

    match cli.command {
        Commands::BulkAssign => {
            let report = service.run_bulk_assignment().map_err(|err| err.to_string())?;
            println!(
                "assigned={} lost_races={} skipped={} failed={}",
                report.assigned.len(),
                report.lost_races.len(),
                report.skipped_students(),
                report.failures.len()
            );
            for group in &report.skipped {
                println!(
                    "skipped branch={} category={} students={}",
                    group.branch,
                    group.category,
                    group.student_ids.len()
                );
            }
            for (student_id, err) in &report.failures {
                println!("failed student_id={student_id} error={err}");
            }
            if report.failures.is_empty() {
                Ok(())
            } else {
                Err(format!("{} assignments failed", report.failures.len()))
            }
        }
        Commands::Unassigned => {
            let students = people
                .list_persons(&PersonListQuery::unassigned_students())
                .map_err(|err| err.to_string())?;
            for student in students {
                println!("{}\t{}\t{}", student.id, student.branch, student.username);
            }
            Ok(())
        }
        Commands::Roster { mentor_id } => {
            let roster = service
                .mentor_roster(mentor_id)
                .map_err(|err| err.to_string())?;
            for student in roster {
                let category = mentorlink_core::category(&student)
                    .map(|category| category.as_str())
                    .unwrap_or("-");
                println!("{}\t{}\t{}", student.id, category, student.username);
            }
            Ok(())
        }
        Commands::Progress { student_id } => {
            let meetings =
                MeetingService::new(people, SqliteMeetingRepository::new(&conn), &inbox);
            let report = meetings
                .progress_report(student_id, None)
                .map_err(|err| err.to_string())?;
            println!(
                "completed={} time={}h{:02}m average={}m upcoming={} cancelled={}",
                report.total_completed,
                report.total_hours(),
                report.remaining_minutes(),
                report.average_duration_minutes(),
                report.upcoming_scheduled,
                report.cancelled
            );
            for (month, bucket) in &report.by_month {
                println!(
                    "{month}\tmeetings={}\tminutes={}",
                    bucket.meetings, bucket.duration_minutes
                );
            }
            Ok(())
        }
        Commands::Ping | Commands::Version => Ok(()),
    }
}
