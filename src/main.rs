//! CLI entry and dispatch.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};

use section_dashboard::config::{config_schema, load_config};
use section_dashboard::dashboard::{Dashboard, DashboardError};
use section_dashboard::models::peek_claims;
use section_dashboard::routes::{resolve, Guard, LoggingNavigator, Navigation, Route, SessionGuard};
use section_dashboard::startup::build_state;
use section_dashboard::state::AppState;
use section_dashboard::store::SessionStore;
use section_dashboard::utils::logger::init_logging;

const NOT_LOGGED_IN: &str = "Not logged in. Run `section-dashboard login` first.";

#[derive(Parser)]
#[command(name = "section-dashboard")]
#[command(version)]
#[command(about = "Browse sections and record student activity")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with an email or username and store the session
    Login {
        #[arg(short, long)]
        identifier: String,
        /// Read from stdin when omitted
        #[arg(short, long, env = "SECTION_DASHBOARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// End the session on the backend and locally
    Logout,
    /// Show who is logged in and where the session is kept
    Status,
    /// List sections, optionally filtered by section name
    Sections {
        #[arg(short, long, default_value = "")]
        filter: String,
    },
    /// Show a section's students and when each was clicked
    Students {
        section: String,
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Record a click on a student (only the first click is logged)
    Click { section: String, student: String },
    /// List the stored activity logs
    Logs,
    /// Resolve a view path the way the navigation shell would
    Open { path: String },
    /// Print the configuration JSON schema
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Schema = cli.command {
        println!("{}", config_schema()?);
        return Ok(());
    }

    let config = load_config(&cli.config).with_context(|| {
        format!(
            "Error loading configuration from '{}'",
            cli.config.display()
        )
    })?;
    init_logging(&config.logging)?;
    let state = build_state(Arc::new(config), Arc::new(LoggingNavigator)).await?;

    match cli.command {
        Commands::Login {
            identifier,
            password,
        } => login(&state, &identifier, password).await,
        Commands::Logout => {
            state.api.logout().await;
            println!("Logged out.");
            Ok(())
        }
        Commands::Status => status(&state).await,
        Commands::Sections { filter } => sections(&state, &filter).await,
        Commands::Students { section, search } => students(&state, &section, &search).await,
        Commands::Click { section, student } => click(&state, &section, &student).await,
        Commands::Logs => logs(&state).await,
        Commands::Open { path } => open(&state, &path).await,
        Commands::Schema => Ok(()),
    }
}

async fn login(state: &AppState, identifier: &str, password: Option<String>) -> Result<()> {
    if let Navigation::Redirect(Route::Dashboard) =
        resolve(Route::LOGIN_PATH, state.store.as_ref()).await
    {
        println!("Already logged in. Run `section-dashboard logout` to switch accounts.");
        return Ok(());
    }

    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };
    let identifier = identifier.trim();
    if identifier.is_empty() || password.is_empty() {
        bail!("Please fill all fields");
    }

    state.api.login(identifier, &password).await?;
    println!("Login successful");
    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn status(state: &AppState) -> Result<()> {
    match SessionGuard::check(state.store.as_ref()).await {
        Guard::Redirect(_) => println!("Not logged in."),
        Guard::Allow => {
            let token = state.store.access_token().await.unwrap_or_default();
            match peek_claims(&token) {
                Some(claims) => {
                    println!(
                        "Logged in as {}",
                        claims.subject().unwrap_or("an unnamed user")
                    );
                    if let Some(exp) = claims.expires_at() {
                        let verb = if claims.is_expired_at(Utc::now()) {
                            "expired"
                        } else {
                            "expires"
                        };
                        println!("Access token {} {}", verb, local_time(exp));
                    }
                }
                None => println!("Logged in."),
            }
        }
    }

    println!(
        "Session storage: {} ({})",
        state.store.get_name(),
        if state.store.is_persistent() {
            "persistent"
        } else {
            "memory only"
        }
    );
    Ok(())
}

async fn open_dashboard(state: &AppState) -> Result<Dashboard> {
    if let Navigation::Redirect(_) = resolve(Route::DASHBOARD_PATH, state.store.as_ref()).await {
        bail!(NOT_LOGGED_IN);
    }
    Dashboard::load(state.api.clone()).await.map_err(|e| match e {
        DashboardError::NotAuthenticated => anyhow!(NOT_LOGGED_IN),
        other => other.into(),
    })
}

async fn sections(state: &AppState, filter: &str) -> Result<()> {
    let dashboard = open_dashboard(state).await?;
    let sections = dashboard.filter_sections(filter);

    let mut table = table(&["ID", "Title", "Section Name", "Total Students"]);
    for section in &sections {
        table.add_row(vec![
            section.id.clone(),
            format!("{} ({})", section.title, section.section_name),
            section.section_name.clone(),
            section.total_students().to_string(),
        ]);
    }

    let title = if filter.trim().is_empty() {
        "ALL SECTIONS"
    } else {
        filter.trim()
    };
    println!("{}", title);
    println!("{table}");
    Ok(())
}

async fn students(state: &AppState, section_id: &str, search: &str) -> Result<()> {
    let dashboard = open_dashboard(state).await?;
    let roster = dashboard.students(section_id, search)?;
    let section_name = dashboard
        .section(section_id)
        .map(|s| s.section_name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("Section");

    println!("Students in {}", section_name);
    if roster.is_empty() {
        println!("No students found.");
        return Ok(());
    }

    let mut table = table(&["ID", "Name", "Clicked"]);
    for entry in roster {
        table.add_row(vec![
            entry.student.id.clone(),
            entry.student.name.clone(),
            entry.clicked_at.map(local_time).unwrap_or_default(),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn click(state: &AppState, section_id: &str, student_id: &str) -> Result<()> {
    let mut dashboard = open_dashboard(state).await?;
    let already_clicked = dashboard.clicked_at(student_id).is_some();
    let at = dashboard
        .click_student(section_id, student_id)
        .await
        .map_err(|e| match e {
            DashboardError::Api(_) => anyhow!("Error logging activity."),
            other => other.into(),
        })?;

    let name = dashboard
        .section(section_id)
        .and_then(|s| s.student(student_id))
        .map(|s| s.name.clone())
        .unwrap_or_default();
    if already_clicked {
        println!("{} was already clicked at {}.", name, local_time(at));
    } else {
        println!("{} clicked and logged.", name);
    }
    Ok(())
}

async fn logs(state: &AppState) -> Result<()> {
    let logs = state.api.list_activity_logs().await?;
    let mut table = table(&["Student ID", "Activity", "Timestamp"]);
    for log in logs {
        table.add_row(vec![
            log.username_id,
            log.activity,
            log.timestamp.map(local_time).unwrap_or_default(),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn open(state: &AppState, path: &str) -> Result<()> {
    match resolve(path, state.store.as_ref()).await {
        Navigation::Render(Route::NotFound(_)) => println!("404 Not Found"),
        Navigation::Render(route) => println!("Showing {}", route),
        Navigation::Redirect(route) => println!("Redirected to {}", route),
    }
    Ok(())
}

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.to_vec());
    table
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
