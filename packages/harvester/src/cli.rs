//! Command-line interface for the harvester.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::client::CatalogClient;
use crate::config::{validate_page_size, SourceConfig, DEFAULT_PAGE_SIZE};
use crate::error::Result;
use crate::filter::translate;
use crate::record::Record;

/// CSW Harvester - Page through OGC catalogue services and fetch ISO metadata.
#[derive(Parser)]
#[command(name = "csw-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List record identifiers, one per line.
    Ids {
        /// Catalogue endpoint URL
        url: String,

        /// Records requested per page
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Maximum number of identifiers (0 = unbounded)
        #[arg(short, long, default_value_t = 0)]
        limit: usize,

        /// Filter specification, e.g. "PropertyIsEqualTo('dc:type', 'dataset')".
        /// Repeat to match any of several filters.
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Do not fetch the service capabilities first
        #[arg(long)]
        skip_caps: bool,
    },

    /// Fetch one full record and print it.
    Record {
        /// Catalogue endpoint URL
        url: String,

        /// Record identifier
        id: String,

        /// Do not fetch the service capabilities first
        #[arg(long)]
        skip_caps: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// Harvest a source described by a YAML configuration file.
    Harvest {
        /// Source configuration (url, page_size, limit, filters)
        config: PathBuf,

        /// Also fetch every listed record
        #[arg(long)]
        fetch: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ids {
            url,
            page_size,
            limit,
            filters,
            skip_caps,
        } => ids_command(&url, page_size, limit, &filters, skip_caps),
        Commands::Record {
            url,
            id,
            skip_caps,
            format,
        } => record_command(&url, &id, skip_caps, format),
        Commands::Harvest { config, fetch } => harvest_command(&config, fetch),
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Execute the ids command.
fn ids_command(
    url: &str,
    page_size: usize,
    limit: usize,
    filters: &[String],
    skip_caps: bool,
) -> Result<()> {
    // Reject bad arguments before touching the network
    validate_page_size(page_size)?;
    let filter = translate(filters)?;
    let client = CatalogClient::new(url, skip_caps)?;

    let mut count = 0usize;
    for id in client.get_ids(filter, page_size, limit)? {
        println!("{}", id?);
        count += 1;
    }
    eprintln!("{} {count} identifiers", style("Listed").green().bold());
    Ok(())
}

/// Execute the record command.
fn record_command(url: &str, id: &str, skip_caps: bool, format: OutputFormat) -> Result<()> {
    let client = CatalogClient::new(url, skip_caps)?;

    let pb = spinner("Fetching record...");
    let record = client.get_record(id);
    pb.finish_and_clear();

    print!("{}", render_record(&record?, format)?);
    Ok(())
}

fn render_record(record: &Record, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml_ng::to_string(record)?,
        OutputFormat::Json => serde_json::to_string_pretty(record)? + "\n",
    })
}

/// Execute the harvest command.
fn harvest_command(config_path: &Path, fetch: bool) -> Result<()> {
    let config = SourceConfig::load(config_path)?;

    println!(
        "{} {} (page size {}, limit {})",
        style("Harvesting").bold(),
        style(&config.url).cyan(),
        config.page_size,
        if config.limit == 0 {
            "none".to_string()
        } else {
            config.limit.to_string()
        }
    );

    let client = CatalogClient::from_config(&config)?;
    if let Some(caps) = client.capabilities() {
        println!(
            "  Service: {} {}{}",
            caps.service_type,
            caps.version,
            caps.title
                .as_deref()
                .map(|t| format!(" ({t})"))
                .unwrap_or_default()
        );
    }

    let mut listed = 0usize;
    let mut failed = 0usize;
    for id in client.get_ids_for(&config)? {
        let id = id?;
        listed += 1;
        if !fetch {
            println!("  {id}");
            continue;
        }
        // A bad record does not stop the harvest
        match client.get_record(&id) {
            Ok(record) => println!(
                "  {} {}",
                style(&id).cyan(),
                record.display_title().unwrap_or("(untitled)")
            ),
            Err(e) => {
                failed += 1;
                tracing::warn!(id = %id, error = %e, "Record fetch failed");
                println!("  {} {}: {e}", style(&id).cyan(), style("failed").red());
            }
        }
    }

    println!();
    println!("{} {listed} records", style("Listed:").green().bold());
    if fetch {
        println!(
            "{} {}",
            style("Fetched:").green().bold(),
            listed - failed
        );
        if failed > 0 {
            println!("{} {}", style("Failed:").yellow().bold(), failed);
        }
    }

    Ok(())
}
