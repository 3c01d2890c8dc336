//! goaltrack CLI - manage study goals from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use goaltrack_core::{
    ActivityRecord, Calendar, Clock, ContentCompletion, FixedClock, Goal, GoalId, GoalStatus, MockExam, OwnerId,
    StudySession, SubjectScore, SystemClock, TenantId,
};
use goaltrack_engine::{
    Caller, CreateGoalRequest, EngineConfig, EngineContext, GoalService, Role, StaticAuthorizer, UpdateGoalRequest,
};
use goaltrack_storage::{JsonStorage, Storage};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goaltrack")]
#[command(about = "Study goal tracking for exam preparation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory
    #[arg(short, long, global = true, default_value = ".goaltrack")]
    data: PathBuf,

    /// Tenant (mentoring program) the data directory is scoped to
    #[arg(short, long, global = true)]
    tenant: Option<String>,

    /// Student whose goals are managed
    #[arg(short, long, global = true, default_value = "me")]
    owner: String,

    /// Act as this user; defaults to the owner
    #[arg(long = "as", global = true)]
    as_uid: Option<String>,

    /// Role of the acting user
    #[arg(long, global = true, default_value = "student", value_parser = parse_role)]
    role: Role,

    /// Pretend today is this day (YYYY-MM-DD)
    #[arg(long, global = true)]
    now: Option<String>,

    /// UTC offset of the platform timezone, in hours
    #[arg(long, global = true, allow_hyphen_values = true,
          default_value_t = goaltrack_core::time::DEFAULT_UTC_OFFSET_HOURS)]
    utc_offset: i32,
}

#[derive(Subcommand)]
enum Commands {
    /// List visible goals, newest first
    List,
    /// Show goal details
    Show {
        /// Goal ID
        id: String,
    },
    /// Create a goal
    Create {
        /// hours, questions, mock_exams, topics, streak or score_rate
        #[arg(long = "type")]
        goal_type: String,
        /// Goal name
        #[arg(long)]
        name: String,
        /// Value to reach
        #[arg(long)]
        target: f64,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Display unit; defaults from the type
        #[arg(long)]
        unit: Option<String>,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Only count this subject
        #[arg(long)]
        subject: Option<String>,
        /// Only count this content category
        #[arg(long)]
        category: Option<String>,
        /// Repeat daily
        #[arg(long)]
        recurring: bool,
    },
    /// Update a goal; an empty --subject/--category clears the filter
    Update {
        /// Goal ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// active or completed
        #[arg(long)]
        status: Option<String>,
        /// Turn daily recurrence on or off
        #[arg(long)]
        recurring: Option<bool>,
    },
    /// Delete a goal
    Delete {
        /// Goal ID
        id: String,
    },
    /// Expire goals whose window has closed
    Sweep,
    /// Spawn today's instances of recurring goals
    Spawn,
    /// Record a study session
    LogStudy {
        #[arg(long)]
        date: String,
        #[arg(long)]
        subject: String,
        #[arg(long, default_value_t = 0.0)]
        minutes: f64,
        #[arg(long, default_value_t = 0.0)]
        questions: f64,
        #[arg(long, default_value_t = 0.0)]
        correct: f64,
    },
    /// Record a mock exam
    LogExam {
        #[arg(long)]
        date: String,
        /// Correct answers overall
        #[arg(long)]
        total_correct: f64,
        /// Per-subject result as subject=correct, repeatable
        #[arg(long = "score", value_parser = parse_score)]
        scores: Vec<SubjectScore>,
    },
    /// Record a completed content item
    LogTopic {
        #[arg(long)]
        date: String,
        #[arg(long)]
        category: Option<String>,
    },
}

fn parse_role(s: &str) -> Result<Role, String> {
    match s {
        "student" => Ok(Role::Student),
        "mentor" => Ok(Role::Mentor),
        "manager" => Ok(Role::Manager),
        _ => Err(format!("unknown role '{}'", s)),
    }
}

fn parse_score(s: &str) -> Result<SubjectScore, String> {
    let (subject, correct) = s.split_once('=').ok_or_else(|| format!("expected subject=correct, got '{}'", s))?;
    let correct = correct.parse().map_err(|e| format!("invalid score '{}': {}", correct, e))?;
    Ok(SubjectScore { subject: subject.to_string(), correct })
}

fn parse_id(raw: &str) -> Result<GoalId> {
    raw.parse().map_err(|_| anyhow::anyhow!("Invalid goal ID '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let calendar = EngineConfig { utc_offset_hours: cli.utc_offset, ..Default::default() }
        .calendar()
        .context("invalid calendar settings")?;
    let clock: Arc<dyn Clock> = match &cli.now {
        Some(day) => Arc::new(FixedClock::new(calendar.parse_local_date(day)?)),
        None => Arc::new(SystemClock),
    };

    let tenant = cli.tenant.map(TenantId::new);
    let storage = JsonStorage::new(&cli.data, tenant.as_ref(), calendar)
        .await
        .with_context(|| format!("failed to open data directory {}", cli.data.display()))?;
    let auth_path = cli.data.join("auth.json");
    let authorizer = if auth_path.exists() {
        StaticAuthorizer::load(&auth_path).with_context(|| format!("failed to load {}", auth_path.display()))?
    } else {
        StaticAuthorizer::new()
    };

    let context = EngineContext::with_calendar(storage, clock, calendar);
    let service = GoalService::new(context, Arc::new(authorizer));
    let owner = OwnerId::new(cli.owner);
    let caller = Caller::new(cli.as_uid.unwrap_or_else(|| owner.as_str().to_string()), cli.role);

    match cli.command {
        Commands::List => {
            let goals = service.list_goals(&caller, &owner).await?;
            println!("Goals for {} ({})", owner, goals.len());
            for goal in goals {
                println!(
                    "  {} | {} | {:>6}/{:<6} {} | {}",
                    goal.id,
                    format_status(goal.status),
                    goal.current_value,
                    goal.target_value,
                    goal.unit.as_str(),
                    goal.name,
                );
            }
        }
        Commands::Show { id } => {
            let goal = service.get_goal(&caller, &owner, parse_id(&id)?).await?;
            print_goal(&goal, &calendar);
        }
        Commands::Create {
            goal_type,
            name,
            target,
            start,
            end,
            unit,
            description,
            subject,
            category,
            recurring,
        } => {
            let request = CreateGoalRequest {
                goal_type: Some(goal_type),
                name: Some(name),
                description,
                target_value: Some(target),
                unit,
                window_start: Some(start),
                window_end: Some(end),
                subject_filter: subject,
                category_filter: category,
                is_recurring: Some(recurring),
            };
            let id = service.create_goal(&caller, &owner, request).await?;
            println!("Created goal: {}", id);
        }
        Commands::Update { id, name, description, target, unit, start, end, subject, category, status, recurring } => {
            let request = UpdateGoalRequest {
                name,
                description,
                target_value: target,
                unit,
                window_start: start,
                window_end: end,
                subject_filter: subject,
                category_filter: category,
                status,
                is_recurring: recurring,
            };
            let id = service.update_goal(&caller, &owner, parse_id(&id)?, request).await?;
            println!("Updated goal: {}", id);
        }
        Commands::Delete { id } => {
            let id = parse_id(&id)?;
            service.delete_goal(&caller, &owner, id).await?;
            println!("Deleted goal: {}", id);
        }
        Commands::Sweep => {
            let count = service.sweep_expired(&caller, &owner).await?;
            println!("Expired {} goal(s)", count);
        }
        Commands::Spawn => {
            let count = service.spawn_daily_instances(&caller, &owner).await?;
            println!("Spawned {} instance(s)", count);
        }
        Commands::LogStudy { date, subject, minutes, questions, correct } => {
            let record = ActivityRecord::Study(StudySession {
                date: calendar.parse_local_date(&date)?,
                subject,
                minutes_spent: minutes,
                questions_attempted: questions,
                questions_correct: correct,
            });
            log_activity(&service, &caller, &owner, record).await?;
        }
        Commands::LogExam { date, total_correct, scores } => {
            let record = ActivityRecord::MockExam(MockExam {
                date: calendar.parse_local_date(&date)?,
                subject_breakdown: scores,
                total_correct,
            });
            log_activity(&service, &caller, &owner, record).await?;
        }
        Commands::LogTopic { date, category } => {
            let record = ActivityRecord::Content(ContentCompletion {
                completed_at: calendar.parse_local_date(&date)?,
                category_tag: category.filter(|c| !c.is_empty()),
                is_completed: true,
            });
            log_activity(&service, &caller, &owner, record).await?;
        }
    }

    Ok(())
}

/// Activity is owned by the platform; the CLI writes it directly so goals
/// have something to measure.
async fn log_activity<S: Storage + 'static>(
    service: &GoalService<S>,
    caller: &Caller,
    owner: &OwnerId,
    record: ActivityRecord,
) -> Result<()> {
    // Same gate as goal operations.
    service.list_goals(caller, owner).await?;
    let storage = service.manager().context().storage();
    storage.lock().await.save_activity(owner, &record).await?;
    info!("Recorded {:?} activity for {}", record.kind(), owner);
    println!("Recorded {:?} activity for {}", record.kind(), owner);
    Ok(())
}

fn print_goal(goal: &Goal, calendar: &Calendar) {
    println!("Goal: {}", goal.id);
    println!("  Name: {}", goal.name);
    if !goal.description.is_empty() {
        println!("  Description: {}", goal.description);
    }
    println!("  Type: {}", goal.goal_type);
    println!("  Progress: {}/{} {}", goal.current_value, goal.target_value, goal.unit.as_str());
    println!(
        "  Window: {} .. {}",
        calendar.render_local_date(goal.window_start),
        calendar.render_local_date(goal.window_end)
    );
    if let Some(subject) = &goal.subject_filter {
        println!("  Subject: {}", subject);
    }
    if let Some(category) = &goal.category_filter {
        println!("  Category: {}", category);
    }
    println!("  Status: {}", format_status(goal.status));
    if let Some(at) = goal.completed_at {
        println!("  Completed: {}", at);
    }
    if goal.is_recurring {
        println!("  Recurring: daily template");
    }
    if let Some(parent) = goal.parent_goal_id {
        println!("  Instance of: {}", parent);
    }
    if let Some(by) = &goal.created_by {
        println!("  Created by: {}", by);
    }
    println!("  Created: {}", goal.created_at);
}

fn format_status(status: GoalStatus) -> &'static str {
    match status {
        GoalStatus::Active => "ACTIVE",
        GoalStatus::Completed => "COMPLETED",
        GoalStatus::Expired => "EXPIRED",
    }
}
