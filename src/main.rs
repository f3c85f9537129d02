use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vblag::chart::ChartOutcome;
use vblag::config::load_config;
use vblag::fetch::candidate_urls;
use vblag::harness::run_harness;
use vblag::model::{LagSeries, RunReport};
use vblag::pipeline::{ExtractOptions, default_source, extract_lag_series, run_chart};
use vblag::store::PageCache;

#[derive(Parser, Debug)]
#[command(name = "vblag", about = "Visa bulletin cut-off lag tracker")]
struct Cli {
    #[arg(long, default_value = "IN")]
    country_category: String,

    #[arg(long, default_value_t = 2002, value_parser = clap::value_parser!(i32).range(1999..))]
    start_year: i32,

    /// Exclusive.
    #[arg(long, default_value_t = 2025)]
    end_year: i32,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch, extract and render the lag chart (default).
    Chart,
    /// Print the extracted series as JSON.
    Report,
    /// Run twice against the cache and check the results match.
    Harness,
    /// Check the config and print the candidate urls for the first month.
    Validate,
}

#[derive(serde::Serialize)]
struct ReportOutput<'a> {
    target: &'a str,
    series: &'a LagSeries,
    report: &'a RunReport,
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(cache_dir) = cli.cache_dir {
        config.fetch.cache_dir = cache_dir;
    }
    if let Some(out_dir) = cli.out_dir {
        config.chart.out_dir = out_dir;
    }

    let options = ExtractOptions {
        config,
        target: cli.country_category,
        start_year: cli.start_year,
        end_year: cli.end_year,
    };
    options.validate()?;

    match cli.command.unwrap_or(Commands::Chart) {
        Commands::Chart => {
            let mut source = default_source(&options.config)?;
            let run = run_chart(&mut source, &options)?;
            if let ChartOutcome::Written(path) = &run.outcome {
                println!("{}", path.display());
            }
        }
        Commands::Report => {
            let mut source = default_source(&options.config)?;
            let (series, report) = extract_lag_series(&mut source, &options)?;
            let output = ReportOutput {
                target: &options.target,
                series: &series,
                report: &report,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Harness => {
            let report = run_harness(|| default_source(&options.config), &options)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Validate => {
            let cache = PageCache::new(options.config.fetch.cache_dir.clone());
            let stats = cache.stats()?;
            info!(
                cache = %cache.dir().display(),
                pages = stats.pages,
                absent = stats.absent,
                bytes = stats.bytes,
                "config OK"
            );
            if let Some(month) = options.months().first() {
                for url in candidate_urls(&options.config.fetch, *month) {
                    println!("{url}");
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
