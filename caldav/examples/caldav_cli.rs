// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! CalDAV client validation tool.
//!
//! A standalone CLI for exercising the client against real CalDAV servers.
//! Connection settings come from the command line or from `CALDAV_URL`,
//! `CALDAV_USERNAME`, `CALDAV_PASSWORD` and `CALDAV_TOKEN`, which may be kept
//! in a `.env` file.

use std::error::Error;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use calbridge_caldav::{
    AuthMethod, CalDavClient, CalDavConfig, CalDavError, CalendarSummary, EventSummary, Href,
    SyncState,
};
use calbridge_ical::{DateTimeValue, EventDraft, EventPatch, RecurrenceRule, Status};
use clap::{Parser, Subcommand};
use colored::Colorize as _;
use jiff::ToSpan as _;
use jiff::civil::{Date, DateTime};
use tracing_subscriber::EnvFilter;

/// CalDAV client validation tool.
#[derive(Parser)]
#[command(name = "caldav_cli")]
#[command(about = "CalDAV client validation tool", long_about = None)]
#[command(version)]
struct Cli {
    /// CalDAV server URL
    #[arg(long, env = "CALDAV_URL")]
    server: String,
    /// Calendar home path, used when the server does not advertise one
    #[arg(long, env = "CALDAV_HOME", default_value = "")]
    home: String,
    /// Username for basic auth
    #[arg(long, env = "CALDAV_USERNAME")]
    username: Option<String>,
    /// Password for basic auth
    #[arg(long, env = "CALDAV_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Bearer token for OAuth
    #[arg(long, env = "CALDAV_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,
    /// Treat task lists as calendars
    #[arg(long)]
    include_tasks: bool,
    /// Print JSON instead of tables
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Test server discovery
    Discover,
    /// List all calendar collections
    ListCals,
    /// Create a calendar collection
    CreateCal {
        /// Display name
        name: String,
        /// Description
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a calendar collection
    DeleteCal {
        /// Calendar href
        calendar: String,
    },
    /// List event occurrences in a time range
    ListEvents {
        /// Calendar href
        calendar: String,
        /// Start date (e.g., "2025-01-01" or "today")
        #[arg(long, default_value = "today")]
        start: String,
        /// End date, a week after the start by default
        #[arg(long)]
        end: Option<String>,
    },
    /// Show an event by UID
    Get {
        /// Calendar href
        calendar: String,
        /// Event UID
        uid: String,
    },
    /// Create an event
    Create {
        /// Calendar href
        calendar: String,
        /// Summary
        summary: String,
        /// Start ("2025-01-10", "2025-01-10T09:00" or "2025-01-10T09:00:00Z")
        #[arg(long)]
        start: String,
        /// End, same formats as the start
        #[arg(long)]
        end: Option<String>,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Recurrence rule, e.g. "FREQ=WEEKLY;COUNT=4"
        #[arg(long)]
        rrule: Option<String>,
        /// Use this UID instead of a generated one
        #[arg(long)]
        uid: Option<String>,
    },
    /// Update an event by UID
    Update {
        /// Calendar href
        calendar: String,
        /// Event UID
        uid: String,
        /// New summary
        #[arg(long)]
        summary: Option<String>,
        /// New start
        #[arg(long)]
        start: Option<String>,
        /// New end
        #[arg(long)]
        end: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New status, e.g. "tentative" or "cancelled"
        #[arg(long)]
        status: Option<String>,
    },
    /// Delete an event by UID
    Delete {
        /// Calendar href
        calendar: String,
        /// Event UID
        uid: String,
    },
    /// Run a sync pass, keeping the state in a JSON file
    Sync {
        /// Calendar href
        calendar: String,
        /// State file, created when missing
        #[arg(long, default_value = "caldav-sync.json")]
        state: PathBuf,
    },
}

impl Cli {
    fn build_config(&self) -> CalDavConfig {
        let auth = if let Some(token) = self.token.clone() {
            AuthMethod::Bearer { token }
        } else if let (Some(username), Some(password)) =
            (self.username.clone(), self.password.clone())
        {
            AuthMethod::Basic { username, password }
        } else {
            AuthMethod::None
        };

        CalDavConfig {
            base_url: self.server.clone(),
            calendar_home: self.home.clone(),
            auth,
            timeout_secs: self.timeout,
            include_tasks: self.include_tasks,
            ..CalDavConfig::default()
        }
    }
}

fn cmd_discover(client: &CalDavClient) {
    let principal = client.principal();
    println!("{}", "✓ CalDAV server reachable".green());
    println!("Base URL: {}", principal.base_url);
    match &principal.principal {
        Some(href) => println!("Principal: {href}"),
        None => println!("Principal: {}", "not advertised".yellow()),
    }
    println!("Calendar home: {}", principal.calendar_home);
}

async fn cmd_list_cals(client: &CalDavClient, json: bool) -> Result<(), Box<dyn Error>> {
    let calendars = client.list_calendars().await?;

    if json {
        let summaries: Vec<CalendarSummary> = calendars
            .iter()
            .filter(|c| c.supported)
            .map(CalendarSummary::from)
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if calendars.is_empty() {
        println!("No calendars found");
        return Ok(());
    }

    println!("{:-<100}", "");
    println!("{:<50} {:<20} {:<20}", "Href", "Name", "Components");
    println!("{:-<100}", "");

    for cal in &calendars {
        let components = cal.supported_components.join(", ");
        let line = format!("{:<50} {:<20} {}", cal.href.as_str(), cal.name(), components);
        if cal.supported {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    Ok(())
}

async fn cmd_create_cal(
    client: &CalDavClient,
    name: &str,
    description: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let calendar = client.create_calendar(name, description).await?;
    println!("{}", "✓ Calendar created successfully".green());
    println!("Href: {}", calendar.href);
    Ok(())
}

async fn cmd_delete_cal(client: &CalDavClient, calendar: &str) -> Result<(), Box<dyn Error>> {
    client.delete_calendar(&Href::from(calendar)).await?;
    println!("{}", "✓ Calendar deleted successfully".green());
    Ok(())
}

async fn cmd_list_events(
    client: &CalDavClient,
    calendar: &str,
    start: &str,
    end: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let start = parse_range_bound(start)?;
    let end = match end {
        Some(end) => parse_range_bound(end)?,
        None => start.checked_add(7.days())?,
    };

    let events = client
        .list_events(&Href::from(calendar), start, end)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No events found");
        return Ok(());
    }

    println!("{:-<100}", "");
    println!("{:<28} {:<28} {:<40}", "Start", "End", "Summary");
    println!("{:-<100}", "");

    for event in &events {
        let end = event.end.as_deref().unwrap_or("");
        let summary = if event.recurrence_id.is_some() {
            format!("{} {}", event.summary, "↻".cyan())
        } else {
            event.summary.clone()
        };
        println!("{:<28} {:<28} {}", event.start, end, summary);
    }

    Ok(())
}

async fn cmd_get(
    client: &CalDavClient,
    calendar: &str,
    uid: &str,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let resource = client.get_event(&Href::from(calendar), uid).await?;

    if json {
        let summary = EventSummary::from_object(&resource.object);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("ETag: {}", resource.etag);
    println!("Href: {}", resource.href);
    println!();
    print!("{}", calbridge_ical::format(&resource.object));

    Ok(())
}

#[expect(clippy::too_many_arguments)]
async fn cmd_create(
    client: &CalDavClient,
    calendar: &str,
    summary: String,
    start: &str,
    end: Option<&str>,
    description: Option<String>,
    rrule: Option<&str>,
    uid: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let mut draft = EventDraft::new(summary, parse_event_time(start)?);
    if let Some(end) = end {
        draft = draft.end(parse_event_time(end)?);
    }
    if let Some(description) = description {
        draft = draft.description(description);
    }
    if let Some(rrule) = rrule {
        draft = draft.rrule(rrule.parse::<RecurrenceRule>()?);
    }
    if let Some(uid) = uid {
        draft = draft.uid(uid);
    }

    let resource = match client.create_event(&Href::from(calendar), draft).await {
        Ok(resource) => resource,
        Err(CalDavError::Conflict { href }) => {
            return Err(format!("an event already exists at {href}").into());
        }
        Err(err) => return Err(err.into()),
    };

    println!("{}", "✓ Event created successfully".green());
    println!("UID: {}", resource.object.uid().unwrap_or_default());
    println!("Href: {}", resource.href);
    println!("ETag: {}", resource.etag);

    Ok(())
}

#[expect(clippy::too_many_arguments)]
async fn cmd_update(
    client: &CalDavClient,
    calendar: &str,
    uid: &str,
    summary: Option<String>,
    start: Option<&str>,
    end: Option<&str>,
    description: Option<String>,
    status: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let patch = EventPatch {
        summary,
        description: description.map(Some),
        start: start.map(parse_event_time).transpose()?,
        end: end.map(parse_event_time).transpose()?.map(Some),
        status: status.map(str::parse::<Status>).transpose()?,
        ..EventPatch::default()
    };
    if patch.is_empty() {
        return Err("nothing to update".into());
    }

    let resource = client
        .update_event(&Href::from(calendar), uid, &patch)
        .await?;

    println!("{}", "✓ Event updated successfully".green());
    println!("Href: {}", resource.href);
    println!("New ETag: {}", resource.etag);

    Ok(())
}

async fn cmd_delete(client: &CalDavClient, calendar: &str, uid: &str) -> Result<(), Box<dyn Error>> {
    client.delete_event(&Href::from(calendar), uid).await?;
    println!("{}", "✓ Event deleted successfully".green());
    Ok(())
}

async fn cmd_sync(
    client: &CalDavClient,
    calendar: &str,
    state_path: &Path,
) -> Result<(), Box<dyn Error>> {
    let collection = client.get_calendar(&Href::from(calendar)).await?;
    let state = match std::fs::read_to_string(state_path) {
        Ok(content) => serde_json::from_str(&content)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            SyncState::new(collection.href.clone())
        }
        Err(err) => return Err(err.into()),
    };

    let result = client.sync(&collection, &state).await?;

    println!("Mode: {:?}", result.mode);
    for entry in &result.added {
        println!("{} {}", "+".green(), entry.href);
    }
    for entry in &result.changed {
        println!("{} {}", "~".yellow(), entry.href);
    }
    for href in &result.removed {
        println!("{} {}", "-".red(), href);
    }

    std::fs::write(state_path, serde_json::to_string_pretty(&result.new_state)?)?;
    println!(
        "State saved to {} ({} objects)",
        state_path.display(),
        result.new_state.etags.len()
    );

    Ok(())
}

/// Parses a range bound: "today", "2025-01-01" or "2025-01-01T12:00:00".
fn parse_range_bound(value: &str) -> Result<DateTime, String> {
    if value.eq_ignore_ascii_case("today") {
        return Ok(jiff::Zoned::now().date().to_datetime(jiff::civil::Time::midnight()));
    }
    if let Ok(date) = value.parse::<Date>() {
        return Ok(date.to_datetime(jiff::civil::Time::midnight()));
    }
    value.trim_end_matches('Z').parse::<DateTime>().map_err(|_| {
        format!("Invalid date format: '{value}'. Use YYYY-MM-DD, today, or full datetime")
    })
}

/// Parses an event time in ISO 8601 or iCalendar form.
///
/// A trailing `Z` gives a UTC time, a bare date an all-day value, anything
/// else a floating time.
fn parse_event_time(value: &str) -> Result<DateTimeValue, String> {
    if let Ok(date) = value.parse::<Date>() {
        return Ok(DateTimeValue::Date(date));
    }
    if let Some(utc) = value.strip_suffix('Z')
        && let Ok(dt) = utc.parse::<DateTime>()
    {
        return Ok(DateTimeValue::Utc(dt));
    }
    if let Ok(dt) = value.parse::<DateTime>() {
        return Ok(DateTimeValue::Floating(dt));
    }
    DateTimeValue::parse(value, None, false)
        .map_err(|reason| format!("Invalid time '{value}': {reason}"))
}

/// Format error for user-friendly display.
fn format_error(err: &(dyn Error + 'static)) -> String {
    let prefix = "Error:".red().bold();
    match err.downcast_ref::<CalDavError>() {
        Some(CalDavError::Authorization { .. }) => format!("{prefix} Authentication failed"),
        Some(CalDavError::NotFound { href }) => format!("{prefix} Not found: {href}"),
        Some(CalDavError::PreconditionFailed { .. }) => format!(
            "{prefix} ETag conflict - resource was modified by another client"
        ),
        Some(err) if err.is_retryable() => {
            format!("{prefix} {err} (temporary, try again)")
        }
        _ => format!("{prefix} {err}"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Priority: .env.local (highest) -> .env -> existing environment variables (lowest)
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.build_config();

    let result: Result<(), Box<dyn Error>> = async {
        let client = CalDavClient::connect(config).await?;
        match cli.command {
            Commands::Discover => {
                cmd_discover(&client);
                Ok(())
            }
            Commands::ListCals => cmd_list_cals(&client, cli.json).await,
            Commands::CreateCal { name, description } => {
                cmd_create_cal(&client, &name, description.as_deref()).await
            }
            Commands::DeleteCal { calendar } => cmd_delete_cal(&client, &calendar).await,
            Commands::ListEvents {
                calendar,
                start,
                end,
            } => cmd_list_events(&client, &calendar, &start, end.as_deref(), cli.json).await,
            Commands::Get { calendar, uid } => cmd_get(&client, &calendar, &uid, cli.json).await,
            Commands::Create {
                calendar,
                summary,
                start,
                end,
                description,
                rrule,
                uid,
            } => {
                cmd_create(
                    &client,
                    &calendar,
                    summary,
                    &start,
                    end.as_deref(),
                    description,
                    rrule.as_deref(),
                    uid,
                )
                .await
            }
            Commands::Update {
                calendar,
                uid,
                summary,
                start,
                end,
                description,
                status,
            } => {
                cmd_update(
                    &client,
                    &calendar,
                    &uid,
                    summary,
                    start.as_deref(),
                    end.as_deref(),
                    description,
                    status.as_deref(),
                )
                .await
            }
            Commands::Delete { calendar, uid } => cmd_delete(&client, &calendar, &uid).await,
            Commands::Sync { calendar, state } => cmd_sync(&client, &calendar, &state).await,
        }
    }
    .await;

    if let Err(e) = result {
        // Flush stdout before printing error
        std::io::stdout().flush().ok();
        eprintln!("{}", format_error(e.as_ref()));
        std::process::exit(1);
    }

    Ok(())
}
