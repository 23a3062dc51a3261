//! Mission CLI - Admin session and settings management tools.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password from MISSION_ADMIN_PASSWORD or --password)
//! mission login -u admin
//!
//! # Read, write and reset a setting
//! mission settings get countdown_target
//! mission settings set hero_title '"Join the mission"'
//! mission settings reset hero_title
//!
//! # Follow a setting as other admins change it
//! mission settings watch countdown_target --interval-ms 5000
//!
//! # Configure the launch countdown
//! mission countdown set --at 2027-01-01T00:00:00Z --label "Launch"
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `whoami` - Admin session
//! - `settings` - Read, write, reset, list and watch settings
//! - `countdown` - Show or configure the launch countdown

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "mission")]
#[command(author, version, about = "Mission settings CLI tools")]
struct Cli {
    /// Backend base URL (overrides `MISSION_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in as an admin and persist the session
    Login {
        /// Admin username
        #[arg(short, long)]
        username: String,

        /// Admin password
        #[arg(short, long, env = "MISSION_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the admin session
    Logout,
    /// Show the authenticated admin
    Whoami,
    /// Manage settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show or configure the launch countdown
    Countdown {
        #[command(subcommand)]
        action: CountdownAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print a setting (null when not configured)
    Get {
        /// Setting key
        key: String,
    },
    /// Write a setting (admin only)
    Set {
        /// Setting key
        key: String,
        /// New value as JSON
        value: String,
    },
    /// Delete a setting (admin only)
    Reset {
        /// Setting key
        key: String,
    },
    /// Print every stored setting (admin only)
    List,
    /// Print a setting every time it changes, until Ctrl-C
    Watch {
        /// Setting key
        key: String,

        /// Poll interval in milliseconds (default: `MISSION_POLL_INTERVAL_MS`)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

#[derive(Subcommand)]
enum CountdownAction {
    /// Print the countdown target and time remaining
    Show,
    /// Set the countdown target (admin only)
    Set {
        /// Target instant (RFC 3339)
        #[arg(long, conflicts_with = "timestamp", required_unless_present = "timestamp")]
        at: Option<String>,

        /// Target as a Unix timestamp in seconds
        #[arg(long)]
        timestamp: Option<i64>,

        /// Caption shown above the timer
        #[arg(short, long, default_value = mission_core::values::DEFAULT_COUNTDOWN_LABEL)]
        label: String,
    },
    /// Revert the countdown to its default (admin only)
    Reset,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), commands::CommandError> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Text logs by default, JSON lines when `MISSION_LOG_JSON` is set.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mission_cli=info,mission_client=info".into());

    let json = std::env::var("MISSION_LOG_JSON").is_ok();
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let ctx = commands::Context::load(cli.api_url.as_deref())?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&ctx, &username, password).await?;
        }
        Commands::Logout => commands::auth::logout(&ctx).await,
        Commands::Whoami => commands::auth::whoami(&ctx).await?,
        Commands::Settings { action } => match action {
            SettingsAction::Get { key } => commands::settings::get(&ctx, &key).await?,
            SettingsAction::Set { key, value } => {
                commands::settings::set(&ctx, &key, &value).await?;
            }
            SettingsAction::Reset { key } => commands::settings::reset(&ctx, &key).await?,
            SettingsAction::List => commands::settings::list(&ctx).await?,
            SettingsAction::Watch { key, interval_ms } => {
                commands::settings::watch(&ctx, &key, interval_ms).await?;
            }
        },
        Commands::Countdown { action } => match action {
            CountdownAction::Show => commands::countdown::show(&ctx).await?,
            CountdownAction::Set {
                at,
                timestamp,
                label,
            } => {
                commands::countdown::set(&ctx, at.as_deref(), timestamp, label).await?;
            }
            CountdownAction::Reset => commands::countdown::reset(&ctx).await?,
        },
    }
    Ok(())
}
