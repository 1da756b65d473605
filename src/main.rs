mod server;

use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};

use lessondesk::booking::memory::{
    InMemoryAvailabilityStore, InMemoryCommitmentLedger, InMemoryPackageStore,
    InMemoryTeacherDirectory, RecordingDispatcher,
};
use lessondesk::booking::{
    AvailabilitySlot, BookingConfig, BookingService, LessonRequest, LessonType, PackageId,
    StudentId, TeacherId,
};
use lessondesk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lessondesk",
    about = "Run the lesson booking admission service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk an end-to-end admission scenario against in-memory stores
    Demo,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo => run_demo(),
    }
}

fn run_demo() -> Result<(), AppError> {
    let ledger = Arc::new(InMemoryCommitmentLedger::default());
    let availability = Arc::new(InMemoryAvailabilityStore::default());
    let directory = Arc::new(InMemoryTeacherDirectory::default());
    let packages = Arc::new(InMemoryPackageStore::default());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = BookingService::new(
        ledger,
        availability.clone(),
        directory.clone(),
        packages.clone(),
        dispatcher.clone(),
        BookingConfig::default(),
    );

    let teacher = TeacherId("teacher-ada".to_string());
    let now = Utc::now();
    let tomorrow_ten = (now + Duration::days(1))
        .date_naive()
        .and_hms_opt(10, 0, 0)
        .expect("valid demo time")
        .and_utc();

    directory.set_auto_accept(teacher.clone(), true);
    availability.publish(AvailabilitySlot {
        teacher_id: teacher.clone(),
        date: tomorrow_ten.date_naive(),
        start_time: tomorrow_ten.time(),
        end_time: tomorrow_ten.time() + Duration::hours(1),
        lesson_type: LessonType::Group,
        max_capacity: 3,
    });
    packages.grant(PackageId("pkg-demo".to_string()), 5);

    let admitted = service.try_admit(
        LessonRequest {
            teacher_id: teacher.clone(),
            student_id: StudentId("student-grace".to_string()),
            subject: "Linear algebra".to_string(),
            start: tomorrow_ten,
            duration_minutes: 60,
            lesson_type: LessonType::Group,
            package_id: Some(PackageId("pkg-demo".to_string())),
        },
        now,
    )?;
    println!(
        "admitted: {}",
        serde_json::to_string_pretty(&admitted.status_view()).unwrap_or_default()
    );

    let rejected = service.try_admit(
        LessonRequest {
            teacher_id: teacher,
            student_id: StudentId("student-grace".to_string()),
            subject: "Calculus".to_string(),
            start: tomorrow_ten + Duration::minutes(30),
            duration_minutes: 60,
            lesson_type: LessonType::OneOnOne,
            package_id: None,
        },
        now,
    );
    match rejected {
        Ok(_) => println!("unexpectedly admitted the overlapping request"),
        Err(err) => println!("rejected as expected: {err} (reason {})", err.kind().code()),
    }

    service.flush_side_effects();
    println!("notifications dispatched: {}", dispatcher.notifications().len());
    Ok(())
}
