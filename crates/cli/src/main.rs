mod config;
mod error;

use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use policy::{Combinator, Required, Requirement};
use runtime::{
    Access, AccessContext, History, Navigator, PermissionResolver, RedirectState, Session, Visit,
};
use storage::{AuditStore, Event, EventKind, UserId};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::{Config, Identity};
use error::{Error, Result};

const CONFIG_FILE: &str = "chantier.toml";

#[derive(Parser)]
#[command(name = "chantier")]
#[command(about = "Capability gates and route guards for the field-service app", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log resolution details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the capabilities granted to a user
    Caps {
        /// User ID (UUID)
        #[arg(short, long)]
        user: String,
    },
    /// Check a user against a requirement
    Check {
        /// User ID (UUID)
        #[arg(short, long)]
        user: String,
        /// Required capability tokens (comma separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        require: Vec<String>,
        /// Require every token instead of any one
        #[arg(long)]
        all: bool,
    },
    /// Visit a path and show what the guard and gate decide
    Visit {
        /// Path to visit, e.g. /settings/security
        path: String,
        /// Signed-in user ID; anonymous when omitted
        #[arg(short, long)]
        user: Option<String>,
        /// Pretend the auth provider has not answered yet
        #[arg(long, conflicts_with = "user")]
        loading: bool,
    },
    /// List the protected screens
    Routes,
    /// List audited sessions
    Sessions {
        /// Show only the last N sessions
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show audit events for a session
    Logs {
        /// Session ID (prefix match supported)
        #[arg(short, long)]
        session: String,
        /// Filter by event kind (access_denied, redirected, lookup_failed, ...)
        #[arg(short, long)]
        kind: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Caps { user } => cmd_caps(&config, &user).await,
        Commands::Check { user, require, all } => cmd_check(&config, &user, &require, all).await,
        Commands::Visit {
            path,
            user,
            loading,
        } => cmd_visit(&config, &path, user.as_deref(), loading).await,
        Commands::Routes => cmd_routes(&config),
        Commands::Sessions { limit } => cmd_sessions(limit),
        Commands::Logs { session, kind } => cmd_logs(&session, kind.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Ok(Config::load(path)?);
    }

    let default_path = PathBuf::from(CONFIG_FILE);
    if default_path.exists() {
        debug!(path = %default_path.display(), "loading config");
        Ok(Config::load(&default_path)?)
    } else {
        debug!("no {CONFIG_FILE}; using built-in routes with no roles");
        Ok(Config::default_config())
    }
}

fn parse_user(raw: &str) -> Result<UserId> {
    raw.parse()
        .map_err(|_| Error::InvalidUser(raw.to_string()))
}

fn resolver(config: &Config) -> Result<PermissionResolver<Identity>> {
    Ok(PermissionResolver::new(
        config.identity()?,
        config.policy.clone(),
    ))
}

async fn cmd_caps(config: &Config, user: &str) -> Result<()> {
    let user = parse_user(user)?;
    let caps = resolver(config)?
        .resolve(&Session::signed_in(user, None))
        .await;

    if caps.is_empty() {
        println!("No capabilities.");
        return Ok(());
    }
    for cap in &caps {
        println!("{cap}");
    }
    Ok(())
}

async fn cmd_check(config: &Config, user: &str, require: &[String], all: bool) -> Result<()> {
    let user = parse_user(user)?;
    let requirement = Requirement::new(Required::parse(require)?, Combinator::from_require_all(all));

    let resolver = resolver(config)?;
    let caps = resolver.resolve(&Session::signed_in(user, None)).await;

    match resolver.policy().check(&requirement, &caps) {
        policy::Decision::Allow => {
            println!("allow: {requirement}");
            Ok(())
        }
        policy::Decision::Deny { reason } => Err(Error::Denied(reason)),
    }
}

async fn cmd_visit(config: &Config, path: &str, user: Option<&str>, loading: bool) -> Result<()> {
    let user = user.map(parse_user).transpose()?;
    let routes = config.route_table()?;
    let guard = config.guard();

    let mut ctx = AccessContext::init(resolver(config)?).with_audit(create_store()?);
    if !loading {
        match user {
            Some(user) => {
                ctx.sign_in(user, None).await;
            }
            None => {
                ctx.settle_anonymous();
            }
        }
    }

    let mut history = History::default();
    history.navigate(path);

    let visit = ctx.visit(&routes, &guard, path, &mut history);
    match visit {
        Visit::Waiting => println!("waiting: session is still loading"),
        Visit::Redirected { to, from } => {
            let state = RedirectState { from };
            println!("redirect: {to} (from {})", state.from);
            println!("after login: {}", guard.return_path(Some(&state)));
        }
        Visit::Denied(denied) => println!("{denied}"),
        Visit::Allowed => println!("allowed: {path}"),
    }

    println!("Session ID: {}", ctx.snapshot().session.id);
    if user.is_some() {
        ctx.sign_out();
    }
    Ok(())
}

fn cmd_routes(config: &Config) -> Result<()> {
    let routes = config.route_table()?;

    println!("{:<24}  ACCESS", "PATH");
    println!("{}", "-".repeat(60));
    for route in routes.routes() {
        let access = match &route.access {
            Access::Public => "public".to_string(),
            Access::Authenticated => "signed in".to_string(),
            Access::Requires(req) => req.to_string(),
        };
        println!("{:<24}  {access}", route.path);
    }
    Ok(())
}

fn cmd_sessions(limit: usize) -> Result<()> {
    let store = open_store()?;
    let sessions = store.list_sessions()?;

    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<20}  {:<36}  {:<7}  STATUS",
        "SESSION ID", "STARTED", "USER", "DENIED"
    );
    println!("{}", "-".repeat(120));

    for summary in sessions.into_iter().take(limit) {
        let started = Local
            .from_utc_datetime(&summary.started_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        let user = summary
            .user_id
            .map(|u| u.to_string())
            .unwrap_or_else(|| "anonymous".to_string());
        let status = if summary.ended_at.is_some() {
            "ended"
        } else {
            "active"
        };
        println!(
            "{:<36}  {:<20}  {:<36}  {:<7}  {status}",
            summary.id, started, user, summary.denial_count
        );
    }

    Ok(())
}

fn cmd_logs(session_prefix: &str, kind_filter: Option<&str>) -> Result<()> {
    let store = open_store()?;

    // Find session by prefix
    let sessions = store.list_sessions()?;
    let matching: Vec<_> = sessions
        .iter()
        .filter(|s| s.id.to_string().starts_with(session_prefix))
        .collect();

    let session_id = match matching.len() {
        0 => {
            return Err(Error::SessionNotFound {
                prefix: session_prefix.to_string(),
            });
        }
        1 => matching[0].id,
        _ => {
            return Err(Error::AmbiguousSession {
                prefix: session_prefix.to_string(),
                matches: matching.iter().map(|s| s.id.to_string()).collect(),
            });
        }
    };

    let events = store.load_events(session_id, kind_filter)?;

    if events.is_empty() {
        println!("No events found for session {session_id}");
        return Ok(());
    }

    println!("Session: {session_id}\n");

    for event in events {
        print_event(&event);
    }

    Ok(())
}

fn print_event(event: &Event) {
    let time = Local
        .from_utc_datetime(&event.timestamp.naive_utc())
        .format("%H:%M:%S");

    match &event.kind {
        EventKind::SessionStart { user_id } => {
            println!("[{time}] === Signed in as {user_id} ===");
        }
        EventKind::SessionRefresh => {
            println!("[{time}] Token refreshed");
        }
        EventKind::SessionEnd => {
            println!("[{time}] === Signed out ===");
        }
        EventKind::AccessDenied { path, required } => {
            println!("[{time}] DENIED: {path} (requires {required})");
        }
        EventKind::Redirected { from, to } => {
            println!("[{time}] REDIRECT: {from} -> {to}");
        }
        EventKind::LookupFailed { error } => {
            println!("[{time}] LOOKUP FAILED: {error}");
        }
    }
}

fn audit_db_path() -> PathBuf {
    dirs_data_dir()
        .unwrap_or_else(|| ".chantier".into())
        .join("audit.db")
}

fn create_store() -> Result<AuditStore> {
    let db_path = audit_db_path();
    if let Some(dir) = db_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(AuditStore::open(&db_path)?)
}

fn open_store() -> Result<AuditStore> {
    let db_path = audit_db_path();

    if !db_path.exists() {
        return Err(Error::DatabaseNotFound { path: db_path });
    }

    Ok(AuditStore::open(&db_path)?)
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/chantier"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("chantier"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("chantier"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
