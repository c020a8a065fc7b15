use anyhow::Result;
use clap::{Parser, Subcommand};
use paddycheck::camera::FacingMode;
use paddycheck::{
    source, AnalyzeOutcome, CaptureOutcome, CapturePrompt, DiagnosisClient, FrameCapturerBuilder,
    PaddyConfig, PaddyError, Report, Session,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

const EXIT_REPORTED_ERROR: i32 = 1;
const EXIT_FATAL: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "paddycheck")]
#[command(about = "Diagnose rice crop diseases and pests from a photo")]
#[command(version)]
#[command(long_about = "Sends a photo of a rice plant, read from a file or captured from a \
camera, to a multimodal inference service and prints a structured diagnosis with \
treatment recommendations.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "paddycheck.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, global = true, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, global = true, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, global = true, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, global = true, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Print the diagnosis as JSON instead of a text report
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Diagnose an image file
    Analyze {
        /// Image to diagnose
        file: PathBuf,
    },
    /// Capture a still from the camera and diagnose it
    Camera {
        /// Camera facing: environment (rear) or user (front)
        #[arg(long)]
        facing: Option<FacingMode>,

        /// Also write the captured still to this path
        #[arg(long, value_name = "PATH")]
        save: Option<PathBuf>,

        /// Capture only, skip the diagnosis
        #[arg(long)]
        no_analyze: bool,
    },
    /// Print default configuration in TOML format and exit
    PrintConfig,
    /// Validate configuration file and exit
    ValidateConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    info!("Starting paddycheck v{}", env!("CARGO_PKG_VERSION"));

    let exit_code = match args.command {
        Command::PrintConfig => {
            print_default_config()?;
            0
        }
        Command::ValidateConfig => {
            load_config(&args.config);
            info!("Configuration validation successful");
            println!("✓ Configuration is valid");
            0
        }
        Command::Analyze { file } => {
            let config = load_config(&args.config);
            let client = diagnosis_client(&config);
            let report = Report::new(config.report.clone());
            run_analyze(file, &client, &Session::new(), &report, args.json).await
        }
        Command::Camera {
            facing,
            save,
            no_analyze,
        } => {
            let config = load_config(&args.config);
            let client = if no_analyze {
                None
            } else {
                Some(diagnosis_client(&config))
            };
            let report = Report::new(config.report.clone());
            let facing = facing.unwrap_or(config.camera.facing);
            run_camera(
                &config,
                facing,
                save,
                client.as_ref(),
                &Session::new(),
                &report,
                args.json,
            )
            .await?
        }
    };

    info!("paddycheck exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

/// Load and validate configuration or exit; a bad configuration is fatal
fn load_config(path: &str) -> PaddyConfig {
    info!("Configuration file: {}", path);

    let config = match PaddyConfig::load_from_file(path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("✗ Failed to load configuration: {}", e);
            std::process::exit(EXIT_FATAL);
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(EXIT_FATAL);
    }

    config
}

/// Build the diagnosis client or exit; a missing credential is fatal
fn diagnosis_client(config: &PaddyConfig) -> DiagnosisClient {
    match DiagnosisClient::new(&config.inference, config.inference.resolve_credential()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create diagnosis client: {}", e);
            eprintln!("✗ {}", e.user_message());
            std::process::exit(EXIT_FATAL);
        }
    }
}

async fn run_analyze(
    file: PathBuf,
    client: &DiagnosisClient,
    session: &Session,
    report: &Report,
    json: bool,
) -> i32 {
    match source::from_file(&file).await {
        Ok(image) => session.set_image(image),
        Err(e) => {
            let e = PaddyError::from(e);
            error!("Failed to read image: {}", e);
            session.record_error(&e);
            eprintln!("{}", e.user_message());
            return EXIT_REPORTED_ERROR;
        }
    }

    diagnose(client, session, report, json).await
}

async fn run_camera(
    config: &PaddyConfig,
    facing: FacingMode,
    save: Option<PathBuf>,
    client: Option<&DiagnosisClient>,
    session: &Session,
    report: &Report,
    json: bool,
) -> Result<i32> {
    let capturer = match FrameCapturerBuilder::new()
        .config(config.camera.clone())
        .build()
    {
        Ok(capturer) => capturer,
        Err(e) => {
            error!("Failed to set up camera: {}", e);
            eprintln!("{}", e.user_message());
            return Ok(EXIT_REPORTED_ERROR);
        }
    };
    info!("Camera backend: {}", capturer.backend_name());

    let prompt = CapturePrompt::new(Arc::new(capturer));

    let token = prompt.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; closing camera");
            token.cancel();
        }
    });

    let still = match prompt.run(facing).await? {
        CaptureOutcome::Captured(still) => still,
        CaptureOutcome::Cancelled => {
            println!("Capture cancelled");
            return Ok(0);
        }
        CaptureOutcome::Unavailable(message) => {
            eprintln!("{}", message);
            return Ok(EXIT_REPORTED_ERROR);
        }
    };

    if let Some((width, height)) = still.dimensions() {
        info!("Captured {}x{} still ({} bytes)", width, height, still.len());
    }

    if let Some(path) = save {
        tokio::fs::write(&path, still.bytes()).await?;
        info!("Saved still to {}", path.display());
        println!("Saved capture to {}", path.display());
    }

    session.set_image(source::from_capture(still));

    match client {
        Some(client) => Ok(diagnose(client, session, report, json).await),
        None => Ok(0),
    }
}

async fn diagnose(client: &DiagnosisClient, session: &Session, report: &Report, json: bool) -> i32 {
    println!("Analyzing...");

    match session.analyze(client).await {
        AnalyzeOutcome::Completed(analysis) => {
            if json {
                match report.render_json(&analysis) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        error!("Failed to serialize analysis: {}", e);
                        return EXIT_REPORTED_ERROR;
                    }
                }
            } else {
                println!("{}", report.render(&analysis));
            }
            0
        }
        AnalyzeOutcome::Failed(e) => {
            eprintln!("{}", e.user_message());
            EXIT_REPORTED_ERROR
        }
        outcome => {
            warn!("Diagnosis did not complete: {:?}", outcome);
            if let Some(message) = session.snapshot().error {
                eprintln!("{}", message);
            }
            EXIT_REPORTED_ERROR
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
        .unwrap_or_else(|_| EnvFilter::new(format!("paddycheck={}", log_level)));

    // Logs go to stderr so stdout carries only the report
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
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
    println!("# paddycheck configuration file");
    println!("# Every option with its default value. The inference API key is read from");
    println!("# inference.api_key, or the API_KEY / GEMINI_API_KEY environment variables.");
    println!();
    print!("{}", PaddyConfig::default_toml()?);
    Ok(())
}
