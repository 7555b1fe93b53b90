use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use repcam::{AnnouncerKind, RepcamConfig, Session, StopReason};

#[derive(Parser, Debug)]
#[command(name = "repcam")]
#[command(about = "Counts squat repetitions from pose estimates and speaks form feedback")]
#[command(version)]
#[command(long_about = "Reads per-frame pose keypoints (MoveNet layout) as JSON lines, \
tracks knee and back angles to count squats, and announces each repetition along with \
descent and back-posture cues.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, help = "Path to TOML configuration file [default: repcam.toml]")]
    config: Option<String>,

    /// Pose input, overrides source.input
    #[arg(short, long, value_name = "PATH", help = "JSON-lines pose file, or - for stdin")]
    input: Option<String>,

    /// Replay rate, overrides source.fps
    #[arg(long, help = "Replay frames at this rate (0 = as fast as read)")]
    fps: Option<u32>,

    /// Announcer, overrides feedback.announcer
    #[arg(long, value_parser = ["log", "stdout", "command"], help = "Where spoken feedback goes")]
    announcer: Option<String>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting a session")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Write the session summary as JSON
    #[arg(long, value_name = "PATH", help = "Write the session summary to this JSON file")]
    summary: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let loaded = match &args.config {
        Some(path) => RepcamConfig::load_from_file(path),
        None => RepcamConfig::load(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    apply_overrides(&mut config, &args);

    let _log_guard = init_logging(&args, config.system.log_file.as_deref())?;

    info!("Starting repcam v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration file: {}",
        args.config.as_deref().unwrap_or("repcam.toml")
    );

    // Validate configuration if requested
    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let session = Session::from_config(config).await.map_err(|e| {
        error!("Failed to open session: {}", e);
        e
    })?;
    session.install_signal_handlers();

    let summary = session.run().await.map_err(|e| {
        error!("Session failed: {}", e);
        e
    })?;
    summary.log();

    if let Some(path) = &args.summary {
        summary.write_json(path)?;
    }

    if let StopReason::Signal(signal) = &summary.stop_reason {
        warn!("Stopped early by {}", signal);
    }

    Ok(())
}

fn apply_overrides(config: &mut RepcamConfig, args: &Args) {
    if let Some(input) = &args.input {
        config.source.input = input.clone();
    }
    if let Some(fps) = args.fps {
        config.source.fps = fps;
    }
    if let Some(announcer) = args.announcer.as_deref() {
        config.feedback.announcer = match announcer {
            "stdout" => AnnouncerKind::Stdout,
            "command" => AnnouncerKind::Command,
            _ => AnnouncerKind::Log,
        };
    }
}

fn init_logging(args: &Args, log_file: Option<&str>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{
        fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    };

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    // Create environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("repcam={}", log_level)));

    // Configure format based on options
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let mut layers = vec![fmt_layer];
    let mut guard = None;

    // Mirror output into a plain-text log file
    if let Some(log_file) = log_file {
        let path = Path::new(log_file);
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("Log file path has no file name: {}", log_file))?;
        let directory = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let (writer, worker_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
        layers.push(fmt::layer().with_ansi(false).with_writer(writer).boxed());
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Repcam Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Any value can also be set with REPCAM_<SECTION>__<KEY>, e.g.");
    println!("# REPCAM_ANALYZER__KNEE_UP_ANGLE=165");
    println!();
    println!("{}", RepcamConfig::default().to_toml()?);
    Ok(())
}
