use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gitlab_provider::config::ProviderConfig;
use gitlab_provider::server::Server;
use gitlab_provider::{Registry, VERSION};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Filter directive that overrides --log-level, e.g. `gitlab_provider=trace`
const LOG_ENV: &str = "GITLAB_PROVIDER_LOG";

/// GitLab provider plugin
#[derive(Parser, Debug)]
#[command(name = "gitlab-provider", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Log file (defaults to the config directory)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Serve requests on stdin/stdout (default)
    #[default]
    Serve,
    /// Print the provider schema as JSON
    Schema,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// stdout carries the protocol, so logs only ever go to a file
fn setup_logging(
    level: LogLevel,
    log_file: Option<PathBuf>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = std::env::var(LOG_ENV).ok().filter(|v| !v.is_empty());
    let filter = match (env_filter, level.to_tracing_level()) {
        (Some(directive), _) => EnvFilter::try_new(&directive)
            .with_context(|| format!("Invalid {} directive {:?}", LOG_ENV, directive))?,
        (None, Some(tracing_level)) => EnvFilter::new(tracing_level.as_str()),
        (None, None) => return Ok(None),
    };

    let log_path = log_file.unwrap_or_else(get_log_path);

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gitlab-provider {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gitlab-provider").join("gitlab-provider.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gitlab-provider").join("gitlab-provider.log");
    }
    PathBuf::from("gitlab-provider.log")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file)?;
    let registry = Registry::gitlab();

    match args.command.unwrap_or_default() {
        Command::Schema => {
            let schema = serde_json::to_string_pretty(&registry.schema())
                .context("Failed to encode schema")?;
            println!("{}", schema);
        }
        Command::Serve => {
            let config = ProviderConfig::load().with_env();
            let mut server = Server::new(registry, config);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            server.run(stdin, tokio::io::stdout()).await?;
        }
    }

    Ok(())
}
