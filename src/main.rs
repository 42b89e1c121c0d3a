use anyhow::Result;
use clap::Parser;
use firewatch::{FirewatchApp, FirewatchConfig, SourceSpec};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "firewatch")]
#[command(about = "Color-heuristic fire detection for video files and cameras")]
#[command(version)]
#[command(long_about = "Watches a video file, image directory, or camera for fire-colored \
regions, raises debounced alarms to the log and an optional JSON-lines alarm record, \
and saves annotated snapshots when an alarm is raised.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "firewatch.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Video file, still image, or directory of images to watch
    #[arg(short, long, value_name = "PATH", conflicts_with = "device")]
    file: Option<PathBuf>,

    /// Capture device index (e.g. 0 for /dev/video0)
    #[arg(long, value_name = "INDEX")]
    device: Option<u32>,

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
    #[arg(long, help = "Validate configuration file and exit without watching")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Terminal controls: 'm' raises a manual alarm, 'q' stops
    #[arg(long, help = "Enable keyboard controls ('m' manual alarm, 'q' quit)")]
    keyboard: bool,
}

impl Args {
    fn source_spec(&self) -> SourceSpec {
        match (&self.file, self.device) {
            (Some(path), _) => SourceSpec::FilePath(path.clone()),
            (None, Some(index)) => SourceSpec::DeviceIndex(index),
            (None, None) => SourceSpec::DeviceIndex(0),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting firewatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match FirewatchConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

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

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let source_spec = args.source_spec();
    info!("Watching {}", source_spec);

    let mut app = FirewatchApp::new(config, source_spec);
    app.set_keyboard_enabled(args.keyboard);

    let reason = app.run().await.map_err(|e| {
        error!("Fire watch session failed: {}", e);
        e
    })?;

    info!("firewatch finished: {:?}", reason);
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("firewatch={}", log_level)));

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

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# firewatch configuration file");
    println!("# Optional keys (off unless set): alarm.location, alarm.log_path, output.snapshot_dir");
    println!("# Environment overrides use FIREWATCH_<SECTION>__<KEY>");
    println!();
    println!("{}", toml::to_string_pretty(&FirewatchConfig::default())?);
    Ok(())
}
