//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - validates the profile table
//! - runs the server or one of the inspection commands

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, SampleArgs, ServeArgs};
use crate::domain::{profiles, validate_profiles};
use crate::error::AppError;

pub mod pipeline;

const DEFAULT_LOG_FILTER: &str = "labkib=info,tower_http=info";

/// Entry point for the `labkib` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; everything has a default or a flag.
    let _ = dotenvy::dotenv();
    init_tracing();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    validate_profiles().map_err(|e| AppError::new(3, format!("Invalid profile table: {e}")))?;

    match cli.command {
        Command::Serve(args) => handle_serve(args),
        Command::Profiles => handle_profiles(),
        Command::Sample(args) => handle_sample(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // Ignore the error if a subscriber is already installed.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn handle_serve(args: ServeArgs) -> Result<(), AppError> {
    let config = args.server_config();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::new(1, format!("Failed to start async runtime: {e}")))?;
    runtime.block_on(crate::server::serve(config))
}

fn handle_profiles() -> Result<(), AppError> {
    println!("{}", to_json(&profiles())?);
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let view = pipeline::setup(args.sub_kind, &mut rng)?;
    println!("{}", to_json(&view)?);
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::new(4, format!("Failed to encode JSON: {e}")))
}

/// Rewrite argv so `labkib` defaults to `labkib serve`.
///
/// Rules:
/// - `labkib`                          -> `labkib serve`
/// - `labkib --listen 0.0.0.0:80 ...`  -> `labkib serve --listen 0.0.0.0:80 ...`
/// - `labkib --help/--version/-h`      -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("serve".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "serve" | "profiles" | "sample");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "serve".to_string());
        return argv;
    }

    argv
}
