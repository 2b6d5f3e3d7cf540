//! strokewarden - mouse and stylus gesture daemon
//!
//! Entry point for the daemon binary. Events are read as JSON lines from
//! stdin and replayed against the headless platform.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strokewarden::config::Config;
use strokewarden::daemon::Daemon;
use strokewarden::error::DaemonError;
use strokewarden::platform::{feed, HeadlessPlatform};

/// Command-line arguments for strokewarden
#[derive(Parser, Debug)]
#[command(name = "strokewarden")]
#[command(version, about = "Mouse and stylus gesture daemon", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "STROKEWARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Write logs to file (in addition to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Start with gestures disabled
    #[arg(long)]
    pub disabled: bool,

    /// Load and validate the configuration, print the bindings and exit
    #[arg(long)]
    pub check: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let path = args.config.clone().or_else(Config::default_path);
    let loaded = match &path {
        Some(path) => Config::load(path),
        None => Err(anyhow::anyhow!("No configuration directory")),
    };

    if args.check {
        return check(path.as_deref(), loaded);
    }

    // An explicitly named file must load; a missing default falls back
    let (config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) if args.config.is_some() => {
            let err = anyhow::Error::new(DaemonError::Config(format!("{:#}", e)));
            eprintln!("{}", strokewarden::utils::format_user_error(&err));
            return Err(err);
        }
        Err(e) => (Config::default_config(), Some(e)),
    };

    let _guard = init_logging(&args, &config)?;

    info!("════════════════════════════════════════════════════════");
    info!("  strokewarden v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {} {}", env!("BUILD_DATE"), env!("BUILD_TIME"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    if let Some(e) = load_error {
        warn!("Failed to load config: {:#}, using defaults", e);
    } else {
        info!("Configuration loaded successfully");
    }
    tracing::debug!("Config: {:?}", config);

    let platform = Rc::new(HeadlessPlatform::new());
    let mut daemon = match Daemon::new(&config, platform) {
        Ok(d) => d,
        Err(e) => {
            let err = anyhow::Error::new(e);
            eprintln!("{}", strokewarden::utils::format_user_error(&err));
            return Err(err);
        }
    };
    if args.disabled {
        daemon.dispatcher_mut().set_disabled(true)?;
    }

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let reader = tokio::spawn(feed::pump(BufReader::new(tokio::io::stdin()), tx));

    if let Err(e) = daemon.run(rx).await {
        let err = anyhow::Error::new(e);
        eprintln!("{}", strokewarden::utils::format_user_error(&err));
        return Err(err);
    }

    // stdin may still be open after Ctrl-C
    reader.abort();
    info!("strokewarden shut down");
    Ok(())
}

fn check(path: Option<&std::path::Path>, loaded: Result<Config>) -> Result<()> {
    let shown = path.map(|p| p.display().to_string()).unwrap_or_else(|| "<none>".into());
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", strokewarden::utils::format_user_error(&e));
            return Err(e);
        }
    };
    println!("Configuration {} is valid", shown);
    println!(
        "Gesture buttons: {:?}",
        config.gestures.buttons.iter().map(|b| b.button).collect::<Vec<_>>()
    );
    let db = config.action_db();
    println!("{} binding(s):", db.len());
    for binding in db.bindings() {
        println!(
            "  {:<24} {:<12} {:?}",
            binding.name,
            binding.app.as_deref().unwrap_or("*"),
            binding.action.kind
        );
    }
    Ok(())
}

fn init_logging(args: &Args, config: &Config) -> Result<Option<WorkerGuard>> {
    let log_level = match args.verbose {
        0 => config.logging.level.to_lowercase(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("strokewarden={},warn", log_level)));

    let log_file = args.log_file.clone().or_else(|| config.logging.file.clone());

    // If log file is specified, write to both stderr and file
    if let Some(log_file_path) = &log_file {
        let dir = log_file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = log_file_path
            .file_name()
            .context("Log file path has no file name")?;
        let (file, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                    .with(tracing_subscriber::fmt::layer().json().with_writer(file).with_ansi(false))
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                    .with(tracing_subscriber::fmt::layer().compact().with_writer(file).with_ansi(false))
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                    .with(tracing_subscriber::fmt::layer().with_writer(file).with_ansi(false))
                    .init();
            }
        }
        info!("Logging to file: {}", log_file_path.display());
        return Ok(Some(guard));
    }

    match args.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(None)
}
