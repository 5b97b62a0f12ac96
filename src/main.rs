//! CLI entry point for the outcomes rollup tool.
//!
//! Provides subcommands for merging the institution and field-of-study
//! extracts, generating the dashboard's site data from the merged table, and
//! running both stages back to back.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use outcomes_rollup::analyzers::analyzer::generate_site_data;
use outcomes_rollup::analyzers::payload::PayloadPolicy;
use outcomes_rollup::config::{EarningsHorizon, Overrides, SiteConfig};
use outcomes_rollup::merge::merge_files;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "outcomes_rollup")]
#[command(about = "Builds dashboard site data from higher-education outcomes extracts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct MergeArgs {
    /// Institution-level CSV (optionally .gz)
    #[arg(long, default_value = "data/raw/cohorts_institutions.csv")]
    institutions: PathBuf,

    /// Field-of-study CSV (optionally .gz)
    #[arg(long, default_value = "data/raw/recent-cohorts-filed.csv")]
    fields_of_study: PathBuf,

    /// Where to write the merged table
    #[arg(long, default_value = "data/clean/clean_data.csv")]
    merged: PathBuf,
}

#[derive(Args)]
struct GenerateArgs {
    /// Where to write the site data JSON
    #[arg(short, long, default_value = "docs/data.json")]
    output: PathBuf,

    /// Process every major instead of the configured allow-list
    #[arg(long, default_value_t = false)]
    full: bool,

    /// Number of earnings histogram bins
    #[arg(long)]
    bins: Option<usize>,

    /// When a slice yields a payload
    #[arg(long, value_enum)]
    policy: Option<PayloadPolicy>,

    /// Horizon of the primary earnings column
    #[arg(long, value_enum)]
    earnings: Option<EarningsHorizon>,

    /// Optional JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl GenerateArgs {
    fn site_config(&self) -> Result<SiteConfig> {
        let overrides = Overrides {
            bins: self.bins,
            policy: self.policy,
            earnings: self.earnings,
            full: self.full,
        };
        SiteConfig::load(self.config.as_deref(), overrides)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Left-join institution columns onto field-of-study rows
    Merge(MergeArgs),
    /// Aggregate a merged table into site data JSON
    Generate {
        /// Merged table produced by `merge`
        #[arg(short, long, default_value = "data/clean/clean_data.csv")]
        input: PathBuf,

        #[command(flatten)]
        args: GenerateArgs,
    },
    /// Merge, then generate
    Run {
        #[command(flatten)]
        merge: MergeArgs,

        #[command(flatten)]
        generate: GenerateArgs,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/outcomes_rollup.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("outcomes_rollup.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Merge(args) => {
            let summary = merge_files(&args.institutions, &args.fields_of_study, &args.merged)?;
            info!(rows = summary.rows, unmatched = summary.unmatched, "Merge complete");
        }
        Commands::Generate { input, args } => {
            // Resolve config before touching any file.
            let config = args.site_config()?;
            let summary = generate_site_data(&input, &args.output, &config)?;
            info!(
                majors = summary.majors,
                output = %args.output.display(),
                "Generate complete"
            );
        }
        Commands::Run { merge, generate } => {
            let config = generate.site_config()?;
            let merged = merge_files(&merge.institutions, &merge.fields_of_study, &merge.merged)?;
            info!(rows = merged.rows, "Merge stage complete");

            let summary = generate_site_data(&merge.merged, &generate.output, &config)?;
            info!(
                majors = summary.majors,
                groups = summary.groups,
                output = %generate.output.display(),
                "Pipeline complete"
            );
        }
    }

    Ok(())
}
