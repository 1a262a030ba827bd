//! pesapp - command-line client for the PES school community backend.
//!
//! Reads announcements, events, financial reports and the user directory
//! through the cached repositories in `pesapp-core`.

mod format;

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pesapp_core::models::{
    Announcement, DashboardSection, Event, FinancialReport, FinancialSummary, ReportCategory, User,
    UserRole,
};
use pesapp_core::repository::or_empty;
use pesapp_core::{Backend, CacheManager, Config, Repositories, RepositoryError, SupabaseClient};

use format::{format_amount, format_date, format_phone, truncate_string};

const USAGE: &str = "\
Usage: pesapp <command>

Commands:
  announcements [ROLE]  List active announcements, optionally only those visible to ROLE
  events                List upcoming events
  reports [CATEGORY]    List financial reports with totals, optionally for one category
  users                 List the user directory
  profile <ID>          Show one user's profile
  dashboard <ROLE>      Show the home dashboard for ROLE
  config                Show configuration file location and cache TTLs

Roles: admin, teacher, parent, guest
Report categories: solicitations, projects_fund, expenses, general, infrastructure,
  events, maintenance, supplies, utilities, other
Set RUST_LOG (e.g. RUST_LOG=pesapp_core=debug) to see cache activity.";

/// Width of the title column in list output
const TITLE_WIDTH: usize = 40;

#[derive(Debug, PartialEq)]
enum Command {
    Announcements(Option<UserRole>),
    Events,
    Reports(Option<ReportCategory>),
    Users,
    Profile(String),
    Dashboard(UserRole),
    Config,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let role = |arg: &String| arg.parse::<UserRole>().map_err(anyhow::Error::msg);

        match args.first().map(String::as_str) {
            Some("announcements") => Ok(Command::Announcements(args.get(1).map(role).transpose()?)),
            Some("events") => Ok(Command::Events),
            Some("reports") => Ok(Command::Reports(
                args.get(1)
                    .map(|arg| arg.parse::<ReportCategory>().map_err(anyhow::Error::msg))
                    .transpose()?,
            )),
            Some("users") => Ok(Command::Users),
            Some("profile") => match args.get(1) {
                Some(id) => Ok(Command::Profile(id.clone())),
                None => bail!("profile needs a user id\n\n{}", USAGE),
            },
            Some("dashboard") => match args.get(1) {
                Some(arg) => Ok(Command::Dashboard(role(arg)?)),
                None => bail!("dashboard needs a role\n\n{}", USAGE),
            },
            Some("config") => Ok(Command::Config),
            Some(other) => bail!("Unknown command '{}'\n\n{}", other, USAGE),
            None => bail!("{}", USAGE),
        }
    }
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and, when `log_dir` is usable, to a daily rolling file.
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = log_dir.and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("pesapp")
            .filename_suffix("log")
            .build(dir)
            .ok()
    });
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
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
    let log_dir = config.cache_dir().ok().map(|dir| dir.join("logs"));
    let _log_guard = init_tracing(log_dir.as_deref());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    info!(?command, "pesapp starting");

    if command == Command::Config {
        return show_config(&config);
    }

    let settings = config.backend_settings()?;
    let client = SupabaseClient::new(&settings).context("Failed to create backend client")?;
    let repos = Repositories::new(client, CacheManager::new(config.cache_ttls()));

    let result = run(&repos, command).await;
    if let Err(ref e) = result {
        if e
            .downcast_ref::<RepositoryError>()
            .is_some_and(RepositoryError::is_transient)
        {
            eprintln!("The backend is temporarily unavailable. Try again in a moment.");
        }
    }

    info!(stats = ?repos.cache.stats(), "pesapp finished");
    result
}

async fn run<B: Backend>(repos: &Repositories<B>, command: Command) -> Result<()> {
    match command {
        Command::Announcements(role) => {
            let announcements = match role {
                Some(role) => repos.announcements.visible_to(role, false).await?,
                None => repos.announcements.list(false).await?,
            };
            print_announcements(&announcements);
        }
        Command::Events => {
            let events = repos.events.upcoming(Utc::now(), false).await?;
            print_events(&events);
        }
        Command::Reports(category) => {
            let reports = match category {
                Some(category) => repos.financial_reports.by_category(category, false).await?,
                None => repos.financial_reports.list(false).await?,
            };
            print_reports(&reports);
        }
        Command::Users => {
            let users = repos.users.list(false).await?;
            print_users(&users);
        }
        Command::Profile(id) => match repos.users.profile(&id, false).await? {
            Some(user) => print_profile(&user),
            None => bail!("No user with id {}", id),
        },
        Command::Dashboard(role) => show_dashboard(repos, role).await,
        Command::Config => {}
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    println!("Config file: {}", Config::config_path()?.display());
    println!("Cache dir:   {}", config.cache_dir()?.display());
    println!(
        "Backend:     {}",
        config.supabase_url.as_deref().unwrap_or("(not set)")
    );

    let ttls = config.cache_ttls();
    println!("\nCache TTLs (minutes):");
    for (name, ttl) in [
        ("users", ttls.users),
        ("announcements", ttls.announcements),
        ("financial reports", ttls.financial_reports),
        ("events", ttls.events),
        ("user profiles", ttls.user_profile),
        ("details", ttls.details),
    ] {
        println!("  {:<18} {}", name, ttl.as_secs() / 60);
    }
    Ok(())
}

/// Load every section of a role's dashboard concurrently. A failed section
/// shows as empty rather than failing the whole screen.
async fn show_dashboard<B: Backend>(repos: &Repositories<B>, role: UserRole) {
    let sections = role.dashboard_sections();
    let wants = |section: DashboardSection| sections.contains(&section);

    let announcements = async {
        if wants(DashboardSection::Announcements) {
            Some(or_empty(repos.announcements.visible_to(role, false).await, "announcements"))
        } else {
            None
        }
    };
    let events = async {
        if wants(DashboardSection::Events) {
            Some(or_empty(repos.events.upcoming(Utc::now(), false).await, "events"))
        } else {
            None
        }
    };
    let reports = async {
        if wants(DashboardSection::FinancialReports) {
            Some(or_empty(repos.financial_reports.list(false).await, "financial reports"))
        } else {
            None
        }
    };
    let users = async {
        if wants(DashboardSection::UserManagement) {
            Some(or_empty(repos.users.list(false).await, "users"))
        } else {
            None
        }
    };

    let (announcements, events, reports, users) =
        futures::join!(announcements, events, reports, users);

    println!("{} dashboard\n", role);
    if let Some(announcements) = announcements {
        println!("== Announcements ==");
        print_announcements(&announcements);
        println!();
    }
    if let Some(events) = events {
        println!("== Upcoming events ==");
        print_events(&events);
        println!();
    }
    if let Some(reports) = reports {
        println!("== Financial reports ==");
        print_reports(&reports);
        println!();
    }
    if let Some(users) = users {
        println!("== Users ==");
        print_users(&users);
    }
}

fn print_announcements(announcements: &[Announcement]) {
    if announcements.is_empty() {
        println!("No announcements.");
        return;
    }
    for a in announcements {
        println!(
            "{}  {:<width$}  {:?}/{:?}",
            format_date(&a.created_at),
            truncate_string(&a.title, TITLE_WIDTH),
            a.category,
            a.priority,
            width = TITLE_WIDTH
        );
    }
}

fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("No upcoming events.");
        return;
    }
    for e in events {
        let capacity = match e.max_attendees {
            Some(max) => format!("{}/{}", e.attendees.len(), max),
            None => e.attendees.len().to_string(),
        };
        println!(
            "{:<27}  {:<width$}  {}  ({} attending)",
            e.formatted_date(),
            truncate_string(&e.title, TITLE_WIDTH),
            e.location,
            capacity,
            width = TITLE_WIDTH
        );
    }
}

fn print_reports(reports: &[FinancialReport]) {
    if reports.is_empty() {
        println!("No financial reports.");
        return;
    }
    for r in reports {
        println!(
            "{}  {:<width$}  {:>16}",
            format_date(&r.report_date),
            truncate_string(&r.title, TITLE_WIDTH),
            format_amount(r.signed_amount()),
            width = TITLE_WIDTH
        );
    }

    let summary = FinancialSummary::from_reports(reports);
    println!(
        "\nIncome {}  Expenses {}  Balance {}  ({} reports)",
        format_amount(summary.income),
        format_amount(summary.expenses),
        format_amount(summary.balance),
        summary.count
    );
}

fn print_users(users: &[User]) {
    if users.is_empty() {
        println!("No users.");
        return;
    }
    for u in users {
        println!(
            "{:<30}  {:<8}  {}",
            truncate_string(u.name(), 30),
            u.role.to_string(),
            u.email
        );
    }
}

fn print_profile(user: &User) {
    println!("{}", user.name());
    println!("  Email:    {}", user.email);
    println!("  Role:     {}", user.role);
    if !user.contact_number.is_empty() {
        println!("  Contact:  {}", format_phone(&user.contact_number));
    }
    if !user.children.is_empty() {
        println!("  Children: {}", user.children.join(", "));
    }
    println!("  Joined:   {}", format_date(&user.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse(&args(&["announcements"])).unwrap(),
            Command::Announcements(None)
        );
        assert_eq!(
            Command::parse(&args(&["announcements", "Parent"])).unwrap(),
            Command::Announcements(Some(UserRole::Parent))
        );
        assert_eq!(
            Command::parse(&args(&["profile", "u1"])).unwrap(),
            Command::Profile("u1".to_string())
        );
        assert_eq!(
            Command::parse(&args(&["dashboard", "admin"])).unwrap(),
            Command::Dashboard(UserRole::Admin)
        );
        assert_eq!(Command::parse(&args(&["reports"])).unwrap(), Command::Reports(None));
        assert_eq!(
            Command::parse(&args(&["reports", "projects_fund"])).unwrap(),
            Command::Reports(Some(ReportCategory::ProjectsFund))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse(&[]).is_err());
        assert!(Command::parse(&args(&["profile"])).is_err());
        assert!(Command::parse(&args(&["dashboard", "principal"])).is_err());
        assert!(Command::parse(&args(&["launch"])).is_err());
        assert!(Command::parse(&args(&["reports", "lottery"])).is_err());
    }
}
