use anyhow::Result;
use clap::Parser;
use statusboard::{
    AggregatorViewModel, DashboardSources, LifecycleController, LocalSettingsStore,
    MockStatusSource, Status, StatusboardConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "statusboard")]
#[command(about = "Live status dashboard for scenario server, runs and settings")]
#[command(version)]
#[command(long_about = "Polls the scenario server's health, run-status and validation-status \
endpoints, follows the dashboard settings, and prints the aggregated view every time \
a status changes.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "statusboard.toml", help = "Path to TOML configuration file")]
    config: String,

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
    #[arg(long, help = "Validate configuration file and exit without starting the dashboard")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Use built-in mock sources instead of the HTTP endpoints
    #[arg(long, help = "Run against mock sources instead of the scenario server")]
    demo: bool,

    /// Deactivate and exit after this many seconds
    #[arg(long, value_name = "SECONDS", help = "Stop after SECONDS instead of waiting for Ctrl+C")]
    duration_secs: Option<u64>,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting statusboard v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match StatusboardConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Err(e.into());
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let sources = build_sources(&args, &config).map_err(|e| {
        error!("Failed to create status sources: {}", e);
        e
    })?;
    let settings = Arc::new(LocalSettingsStore::from_config(&config.settings));
    let view_model = Arc::new(AggregatorViewModel::new());

    let controller = LifecycleController::new(
        Arc::clone(&view_model),
        sources,
        settings,
        config.polling.clone(),
    );

    controller.activate();
    render_until_shutdown(&view_model, args.duration_secs).await;
    controller.deactivate();

    println!("{}", view_model.view());
    info!("Statusboard stopped");
    Ok(())
}

fn build_sources(args: &Args, config: &StatusboardConfig) -> Result<DashboardSources> {
    if args.demo {
        info!("Using demo sources");
        return Ok(demo_sources());
    }
    http_sources(config)
}

#[cfg(feature = "http")]
fn http_sources(config: &StatusboardConfig) -> Result<DashboardSources> {
    info!("Polling {}", config.server.base_url);
    Ok(DashboardSources::http(&config.server)?)
}

#[cfg(not(feature = "http"))]
fn http_sources(_config: &StatusboardConfig) -> Result<DashboardSources> {
    anyhow::bail!("built without the `http` feature; run with --demo")
}

fn demo_sources() -> DashboardSources {
    let server = MockStatusSource::new("server", Status::up());
    server.enqueue_failure("demo: server still starting");
    server.set_latency(Duration::from_millis(150));

    let run_status = MockStatusSource::new(
        "run_status",
        Status::table(vec![
            vec!["base_case".to_string(), "complete".to_string()],
            vec!["high_load".to_string(), "running".to_string()],
        ]),
    );
    run_status.set_latency(Duration::from_millis(300));

    let validation_status = MockStatusSource::new(
        "validation_status",
        Status::table(vec![vec!["base_case".to_string(), "valid".to_string()]]),
    );

    DashboardSources {
        server: Arc::new(server),
        run_status: Arc::new(run_status),
        validation_status: Arc::new(validation_status),
    }
}

/// Print the dashboard on every change until Ctrl+C or the run duration ends
async fn render_until_shutdown(view_model: &AggregatorViewModel, duration_secs: Option<u64>) {
    let mut revisions = view_model.subscribe();

    let deadline = async {
        match duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Received SIGINT signal (Ctrl+C)");
                break;
            }
            _ = &mut deadline => {
                info!("Run duration elapsed");
                break;
            }
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", view_model.view());
            }
        }
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

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

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("statusboard={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
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
    println!("# Statusboard Configuration File");
    println!("# Environment overrides use STATUSBOARD_<SECTION>__<KEY>");
    println!();
    println!("{}", StatusboardConfig::default().to_toml()?);
    println!("# Optional initial values, under [settings]:");
    println!("# scenarios_directory = \"/path/to/scenarios\"");
    println!("# gridpath_database = \"/path/to/io.db\"");
    println!("# python_environment = \"/path/to/env\"");
    Ok(())
}
