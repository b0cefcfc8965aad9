use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use socks_probe::proxy::{
    runner, top_successes, BatchRunner, ConfigLoader, Locale, ProbeConfig, ProxyChecker,
    ReportWriter, Summary,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Number of successful proxies shown after the summary
const PREVIEW_ROWS: usize = 5;

/// Check local SOCKS5 listeners and report their egress IP, location and latency
#[derive(Parser)]
#[command(name = "socks-probe", version)]
#[command(about = "Check local SOCKS5 listeners and report their egress IP, location and latency")]
struct Cli {
    /// Config file listing the local listeners
    #[arg(short, long, default_value = "output.yaml")]
    config: PathBuf,

    /// CSV report path
    #[arg(short, long, default_value = "proxy_results.csv")]
    output: PathBuf,

    /// Number of concurrent probes
    #[arg(short, long, default_value = "5")]
    threads: usize,

    /// Number of proxies to test, 0 for all
    #[arg(short, long, default_value = "0")]
    num: usize,

    /// Timeout per proxy in seconds
    #[arg(long, default_value = "8")]
    timeout: u64,

    /// Geolocation endpoint fetched through each proxy
    #[arg(long, default_value = "https://ipinfo.io/json")]
    lookup_url: String,

    /// Language of the status column
    #[arg(long, value_enum, default_value_t = Locale::En)]
    locale: Locale,

    /// Start the report with a UTF-8 byte order mark
    #[arg(long)]
    bom: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Log every probe outcome
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "socks_probe=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar(hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(progress)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    println!("Reading config: {:?}", cli.config);
    let descriptors = ConfigLoader::load(&cli.config)?;
    let selected = runner::select(&descriptors, cli.num).len();

    if descriptors.is_empty() {
        warn!("no proxies found in {:?}", cli.config);
    }
    println!("Found {} proxies, testing {}", descriptors.len(), selected);
    println!(
        "Checking with {} threads, timeout: {}s",
        cli.threads, cli.timeout
    );
    println!("Lookup URL: {}", cli.lookup_url);
    println!();

    let config = ProbeConfig::new()
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_lookup_url(cli.lookup_url);

    let progress = progress_bar(cli.no_progress)?;
    let batch = BatchRunner::new(ProxyChecker::with_config(config)).with_progress(progress.clone());
    let results = batch.run(&descriptors, cli.threads, cli.num).await?;
    progress.finish_and_clear();

    ReportWriter::new(cli.locale)
        .with_bom(cli.bom)
        .write(&results, &cli.output)?;

    print!("{}", Summary::from_results(&results).render(cli.locale));
    println!("\nResults saved to {:?}", cli.output);

    let mut preview = top_successes(&results, PREVIEW_ROWS).peekable();
    if preview.peek().is_some() {
        println!("\nWorking proxies:");
        for result in preview {
            if let Some(egress) = result.egress() {
                println!(
                    "  {} [{}] {} {} / {} / {} ({:.2}ms)",
                    result.descriptor.name,
                    result.descriptor.display_name,
                    egress.remote_ip,
                    egress.country,
                    egress.city,
                    egress.isp,
                    egress.latency_ms
                );
            }
        }
    }

    Ok(())
}
