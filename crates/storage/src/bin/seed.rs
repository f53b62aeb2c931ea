use std::fmt;

use chrono::{DateTime, Duration, Utc};
use study_core::model::{ReviewItem, ReviewItemId, StudyLogDraft, StudyLogId, Subject, UserId};
use study_core::scheduler::ReviewScheduler;
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: Option<UserId>,
    logs: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidLogs { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidLogs { raw } => write!(f, "invalid --logs value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("STUDY_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut user_id = std::env::var("STUDY_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut logs = 6_u32;
        let mut now = None;

        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--db" => db_url = require_value(&mut iter, "--db")?,
                "--user" => {
                    let raw = require_value(&mut iter, "--user")?;
                    user_id = Some(raw.parse().map_err(|_| ArgsError::InvalidUserId { raw })?);
                }
                "--logs" => {
                    let raw = require_value(&mut iter, "--logs")?;
                    logs = raw.parse().map_err(|_| ArgsError::InvalidLogs { raw })?;
                }
                "--now" => {
                    let raw = require_value(&mut iter, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&raw)
                        .map_err(|_| ArgsError::InvalidNow { raw })?;
                    now = Some(parsed.with_timezone(&Utc));
                }
                "-h" | "--help" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => return Err(ArgsError::UnknownArg(other.to_string())),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            logs,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --user <uuid>             Learner id to seed for (default: random)");
    eprintln!("  --logs <n>                Number of study logs to create (default: 6)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  STUDY_DB_URL, STUDY_USER_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().inspect_err(|e| {
        eprintln!("{e}");
        print_usage();
    })?;

    let now = args.now.unwrap_or_else(Utc::now);
    let user_id = args.user_id.unwrap_or_default();
    let storage = Storage::sqlite(&args.db_url).await?;

    let samples = [
        (Subject::Math, "Quadratic equations", "Completing the square"),
        (Subject::English, "Past perfect", "Irregular verb drills"),
        (Subject::Science, "Photosynthesis", "Light-dependent reactions"),
        (Subject::History, "Industrial revolution", "Causes and timeline"),
        (Subject::Language, "Kanji set 12", "Radicals and stroke order"),
        (Subject::Other, "Touch typing", "Home row accuracy"),
    ];

    let mut items_created = 0_u32;
    for i in 0..args.logs {
        let idx = (i as usize) % samples.len();
        let (subject, unit, content) = samples[idx];
        let days_ago = i64::from(i) + 1;

        let log = StudyLogDraft {
            user_id,
            subject,
            unit_label: unit.into(),
            content: content.into(),
            duration_minutes: 25 + (i % 4) * 10,
            understanding: 55 + ((i * 7) % 45) as u8,
            studied_at: now - Duration::days(days_ago),
        }
        .validate(now)?
        .assign_id(StudyLogId::new());
        storage.logs.append_log(&log).await?;

        let item = ReviewItem::new(
            ReviewItemId::new(),
            user_id,
            log.id(),
            log.subject(),
            log.unit_label(),
            log.content(),
            ReviewScheduler::initial_progress(log.studied_at()),
            now,
        )?;
        storage.items.insert_item(&item).await?;
        items_created += 1;
    }

    println!(
        "Seeded {} study logs and {} review items for user {} into {}",
        args.logs, items_created, user_id, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
