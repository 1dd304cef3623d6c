use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use portal_client::auth::{self, LoginOutcome, LoginRequest, Registration};
use portal_client::{ApiClient, Body, ClientConfig, ClientError, ErrorCode, MultipartForm, RequestConfig};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("invalid form field '{0}' (expected key=value)")]
    InvalidField(String),
    #[error("login rejected: {0}")]
    Rejected(String),
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            Self::Client(e) => e.error_code(),
            Self::InvalidJson(_) => "E_INVALID_JSON",
            Self::ReadFile { .. } => "E_READ_FILE",
            Self::InvalidField(_) => "E_INVALID_FIELD",
            Self::Rejected(_) => "E_REJECTED",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Authenticated client for the agent portal API")]
struct Cli {
    #[arg(long, env = "PORTAL_BASE_URL", default_value = "http://127.0.0.1:8000")]
    base_url: String,

    #[arg(long, env = "PORTAL_COOKIE_FILE", default_value = ".portal-cookies.json")]
    cookie_file: PathBuf,

    #[arg(long, env = "PORTAL_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with email, password and role.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "User")]
        role: String,
    },
    /// Start a guest session.
    Guest,
    /// Create an account.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "User")]
        role: String,
    },
    /// Forget the local token and session cookies.
    Logout,
    /// Show the stored session.
    Whoami,
    Get {
        path: String,
    },
    Post(MutationArgs),
    Put(MutationArgs),
    Delete {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// Upload a file as multipart form data.
    Upload(UploadArgs),
}

#[derive(Args, Debug)]
struct MutationArgs {
    path: String,
    #[arg(long, default_value = "{}")]
    data: String,
}

#[derive(Args, Debug)]
struct UploadArgs {
    path: String,
    #[arg(long, default_value = "file")]
    field: String,
    #[arg(long)]
    file: PathBuf,
    #[arg(long = "text", value_name = "KEY=VALUE")]
    text: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error [{}]: {e}", e.code());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::new(&cli.base_url)?
        .with_env_overrides()
        .with_cookie_file(&cli.cookie_file);
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    let client = ApiClient::from_config(config)?;
    tracing::debug!(base_url = client.base_url(), "client ready");

    match cli.command {
        Command::Login { email, password, role } => {
            let outcome = auth::login(&client, &LoginRequest { email_id: email, password, role }).await?;
            report_login(&outcome)
        }
        Command::Guest => {
            let outcome = auth::login_guest(&client).await?;
            report_login(&outcome)
        }
        Command::Register { username, email, password, role } => {
            let registration = Registration { username, email_id: email, password, role };
            let outcome = auth::register(&client, &registration).await?;
            report_login(&outcome)
        }
        Command::Logout => {
            auth::logout(&client)?;
            println!("logged out");
            Ok(())
        }
        Command::Whoami => {
            match auth::current_session(&client) {
                Some(session) => print_json(&serde_json::to_value(session)?)?,
                None => println!("not logged in"),
            }
            Ok(())
        }
        Command::Get { path } => print_json(&client.get(&path, RequestConfig::new()).await?),
        Command::Post(args) => {
            let body = parse_body(&args.data)?;
            print_json(&client.post(&args.path, body, RequestConfig::new()).await?)
        }
        Command::Put(args) => {
            let body = parse_body(&args.data)?;
            print_json(&client.put(&args.path, body, RequestConfig::new()).await?)
        }
        Command::Delete { path, data } => {
            let body = match data {
                Some(raw) => parse_body(&raw)?,
                None => Body::Empty,
            };
            print_json(&client.delete(&path, body, RequestConfig::new()).await?)
        }
        Command::Upload(args) => {
            let form = build_form(&args)?;
            print_json(&client.post(&args.path, form, RequestConfig::new()).await?)
        }
    }
}

fn report_login(outcome: &LoginOutcome) -> Result<(), CliError> {
    if !outcome.approval {
        let message = outcome.message.clone().unwrap_or_else(|| "not approved".to_owned());
        return Err(CliError::Rejected(message));
    }
    match &outcome.credentials {
        Some(session) => println!("logged in as {} ({})", session.username, session.role),
        None => println!("logged in"),
    }
    Ok(())
}

fn parse_body(raw: &str) -> Result<Body, CliError> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(Body::Json(value))
}

fn build_form(args: &UploadArgs) -> Result<MultipartForm, CliError> {
    let bytes = std::fs::read(&args.file).map_err(|source| CliError::ReadFile { path: args.file.clone(), source })?;
    let filename = args
        .file
        .file_name()
        .map_or_else(|| "upload".to_owned(), |n| n.to_string_lossy().into_owned());

    let mut form = MultipartForm::new();
    for field in &args.text {
        let Some((key, value)) = field.split_once('=') else {
            return Err(CliError::InvalidField(field.clone()));
        };
        form = form.text(key, value);
    }
    Ok(form.file(args.field.clone(), filename, bytes, None))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
