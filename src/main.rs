use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use matelog_session::config::{ConfigError, SessionConfig};
use matelog_session::navigation::RouteTracker;
use matelog_session::net::api::{ApiClientError, HttpApi};
use matelog_session::net::types::{Credentials, RegistrationData};
use matelog_session::state::session::{RestoreOutcome, SessionError, SessionManager};
use matelog_session::storage::{COOKIE_KEY, FileStorage, SessionStorage};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Client(#[from] ApiClientError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("invalid --field {0:?}; expected KEY=VALUE")]
    InvalidField(String),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "matelog", about = "Matelog session CLI")]
struct Cli {
    #[arg(long, env = "MATELOG_API_URL")]
    base_url: Option<String>,

    #[arg(long, env = "MATELOG_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Do not open or close study-tracking sessions.
    #[arg(long, default_value_t = false)]
    no_tracking: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current session.
    Status,
    Login(LoginArgs),
    Register(RegisterArgs),
    Logout,
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    username: String,

    #[arg(long, env = "MATELOG_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    username: String,

    #[arg(long, env = "MATELOG_PASSWORD", hide_env_values = true)]
    password: String,

    /// Extra registration field, repeatable (e.g. `--field email=a@b.com`).
    #[arg(long = "field", value_name = "KEY=VALUE")]
    fields: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = SessionConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.api_url = base_url;
    }
    if let Some(state_file) = cli.state_file {
        config.state_file = state_file;
    }
    if cli.no_tracking {
        config.tracking = false;
    }

    let storage = Arc::new(FileStorage::new(&config.state_file));
    let api = Arc::new(HttpApi::new(&config.api_url, config.timeouts)?);
    restore_cookies(&api, storage.as_ref());

    let navigator = Arc::new(RouteTracker::new());
    let mut manager = SessionManager::new(api.clone(), storage.clone(), navigator.clone(), config.routes.clone());
    if config.tracking {
        manager = manager.with_tracking(api.clone());
    }

    let restored = manager.check_auth().await;
    let result = execute(&manager, cli.command, &restored).await;
    if let (Ok(()), Some(route)) = (&result, navigator.current()) {
        println!("-> {route}");
    }

    save_cookies(&api, storage.as_ref(), manager.is_authenticated());
    result
}

async fn execute(manager: &SessionManager, command: Command, restored: &RestoreOutcome) -> Result<(), CliError> {
    match command {
        Command::Status => print_status(manager, restored)?,
        Command::Login(args) => {
            let credentials = Credentials { username: args.username, password: args.password };
            manager.login(&credentials).await?;
        }
        Command::Register(args) => {
            let extra = parse_fields(&args.fields)?;
            let data = RegistrationData { username: args.username, password: args.password, extra };
            manager.register(&data).await?;
        }
        Command::Logout => manager.logout().await,
    }
    Ok(())
}

fn print_status(manager: &SessionManager, restored: &RestoreOutcome) -> Result<(), CliError> {
    let state = manager.snapshot();
    match restored {
        RestoreOutcome::Authenticated(user) => {
            println!("{}", serde_json::to_string_pretty(&user.0)?);
            if let Some(id) = &state.tracking_session_id {
                println!("study session: {id}");
            }
        }
        RestoreOutcome::Anonymous => println!("not logged in"),
    }
    Ok(())
}

fn parse_fields(raw: &[String]) -> Result<Map<String, Value>, CliError> {
    let mut fields = Map::new();
    for item in raw {
        let Some((key, value)) = item.split_once('=').filter(|(k, _)| !k.trim().is_empty()) else {
            return Err(CliError::InvalidField(item.clone()));
        };
        // Numbers and booleans pass through typed; anything else is a string.
        let value = serde_json::from_str::<Value>(value)
            .ok()
            .filter(|v| v.is_number() || v.is_boolean())
            .unwrap_or_else(|| Value::String(value.to_owned()));
        fields.insert(key.trim().to_owned(), value);
    }
    Ok(fields)
}

fn restore_cookies(api: &HttpApi, storage: &dyn SessionStorage) {
    match storage.get(COOKIE_KEY) {
        Ok(Some(header)) => api.restore_cookies(&header),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "could not read stored session cookie"),
    }
}

fn save_cookies(api: &HttpApi, storage: &dyn SessionStorage, authenticated: bool) {
    let result = match api.cookie_header().filter(|_| authenticated) {
        Some(header) => storage.set(COOKIE_KEY, &header),
        None => storage.remove(COOKIE_KEY),
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "could not store session cookie");
    }
}
