//! Command-line parsing for the lab simulation server.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the lab logic. Every `serve` option can also come from the
//! environment (or a `.env` file).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::domain::SubKind;
use crate::report::ReportConfig;
use crate::server::ServerConfig;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "labkib", version, about = "Server-backed cybernetics lab simulations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve(ServeArgs),
    /// Validate and print the lab profile table as JSON.
    Profiles,
    /// Print one freshly generated SETUP payload as JSON.
    Sample(SampleArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// Socket address to bind, e.g. 127.0.0.1:8000
    #[arg(long, env = "LABKIB_LISTEN", default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,

    /// Directory charts are written to and served from under /graphics.
    #[arg(long, env = "LABKIB_GRAPHICS_DIR", default_value = "static/graphics")]
    pub graphics_dir: PathBuf,

    /// Directory reports are written to and served from under /works.
    #[arg(long, env = "LABKIB_WORKS_DIR", default_value = "static/works")]
    pub works_dir: PathBuf,

    /// Seconds a request's artifacts are kept before being pruned (at least 1).
    #[arg(
        long,
        env = "LABKIB_ARTIFACT_TTL",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub artifact_ttl: u64,

    /// Route optimizer executable behind POST /komi/.
    #[arg(long, env = "LABKIB_BRIDGE_EXECUTABLE", default_value = "other/komi/komi")]
    pub bridge_executable: PathBuf,

    /// Extra arguments passed to the optimizer.
    #[arg(long = "bridge-arg", env = "LABKIB_BRIDGE_ARGS", value_delimiter = ' ')]
    pub bridge_args: Vec<String>,

    /// File the distance matrix is written to before each optimizer run.
    #[arg(long, env = "LABKIB_BRIDGE_INPUT", default_value = "other/komi/matrix_input.json")]
    pub bridge_input: PathBuf,

    /// Seconds before an optimizer run is killed.
    #[arg(long, env = "LABKIB_BRIDGE_TIMEOUT", default_value_t = 30)]
    pub bridge_timeout: u64,

    /// Report title page: parent organization (`вышестоящая`).
    #[arg(long, env = "LABKIB_REPORT_PARENT_ORGANIZATION")]
    pub report_parent_organization: Option<String>,

    /// Report title page: institution.
    #[arg(long, env = "LABKIB_REPORT_INSTITUTION")]
    pub report_institution: Option<String>,

    /// Report title page: institution abbreviation (`сокращенное`).
    #[arg(long, env = "LABKIB_REPORT_INSTITUTION_SHORT")]
    pub report_institution_short: Option<String>,

    /// Report title page: supervisor position.
    #[arg(long, env = "LABKIB_REPORT_SUPERVISOR_TITLE")]
    pub report_supervisor_title: Option<String>,

    /// Report title page: supervisor name.
    #[arg(long, env = "LABKIB_REPORT_SUPERVISOR")]
    pub report_supervisor: Option<String>,

    /// Report title page: student group.
    #[arg(long, env = "LABKIB_REPORT_GROUP")]
    pub report_group: Option<String>,

    /// Report title page: city.
    #[arg(long, env = "LABKIB_REPORT_CITY")]
    pub report_city: Option<String>,
}

impl ServeArgs {
    pub fn report_config(&self) -> ReportConfig {
        let defaults = ReportConfig::default();
        ReportConfig {
            parent_organization: self
                .report_parent_organization
                .clone()
                .unwrap_or(defaults.parent_organization),
            institution: self.report_institution.clone().unwrap_or(defaults.institution),
            institution_short: self
                .report_institution_short
                .clone()
                .unwrap_or(defaults.institution_short),
            supervisor_title: self.report_supervisor_title.clone().unwrap_or(defaults.supervisor_title),
            supervisor: self.report_supervisor.clone().unwrap_or(defaults.supervisor),
            group: self.report_group.clone().unwrap_or(defaults.group),
            city: self.report_city.clone().unwrap_or(defaults.city),
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            listen: self.listen,
            graphics_root: self.graphics_dir.clone(),
            works_root: self.works_dir.clone(),
            artifact_ttl: Duration::from_secs(self.artifact_ttl),
            report: self.report_config(),
            bridge_executable: self.bridge_executable.clone(),
            bridge_args: self.bridge_args.clone(),
            bridge_input: self.bridge_input.clone(),
            bridge_timeout: Duration::from_secs(self.bridge_timeout),
        }
    }
}

#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Lab variant to draw ground truth for.
    #[arg(value_enum)]
    pub sub_kind: SubKind,

    /// Seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,
}
