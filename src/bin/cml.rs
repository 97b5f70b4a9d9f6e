//! CML2 emulator CLI binary.
//!
//! # Commands
//!
//! - `serv` - Store exchange endpoint and credentials
//! - `generate` - Generate random exchange documents
//! - `exchange` - Run an exchange against the stored endpoint

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cml::{
    CatalogGenerator, Config, DocumentKind, ExchangeError, ExchangeOrchestrator, ExchangeReport,
    VERSION,
};

#[derive(Parser)]
#[command(name = "cml")]
#[command(version = VERSION)]
#[command(about = "CommerceML2 exchange emulator", long_about = None)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store exchange endpoint and credentials
    Serv {
        /// Exchange URL
        #[arg(long)]
        url: Option<String>,

        /// Basic auth user
        #[arg(long)]
        user: Option<String>,

        /// Basic auth password
        #[arg(long)]
        pass: Option<String>,
    },

    /// Generate import.xml, offers.xml and rests.xml with random content
    Generate {
        /// Approximate number of leaf categories
        #[arg(long)]
        categories_count: Option<u32>,

        /// Depth of the category tree
        #[arg(long)]
        categories_level: Option<u32>,

        /// Number of products
        #[arg(long)]
        products_count: Option<u32>,

        /// Number of units of measure
        #[arg(long)]
        units_count: Option<u32>,
    },

    /// Upload documents to the exchange endpoint
    Exchange {
        /// Documents to exchange
        #[arg(short = 't', long = "type", value_enum, default_value = "full")]
        exchange_type: ExchangeType,

        /// Reuse previously staged documents
        #[arg(long)]
        nocopy: bool,

        /// Give up on an import after this many polls
        #[arg(long)]
        max_polls: Option<u32>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExchangeType {
    Full,
    Import,
    Offers,
    Rests,
}

impl ExchangeType {
    fn document(self) -> Option<DocumentKind> {
        match self {
            ExchangeType::Full => None,
            ExchangeType::Import => Some(DocumentKind::Import),
            ExchangeType::Offers => Some(DocumentKind::Offers),
            ExchangeType::Rests => Some(DocumentKind::Rests),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Serv { url, user, pass } => cmd_serv(&config_path, url, user, pass),

        Commands::Generate {
            categories_count,
            categories_level,
            products_count,
            units_count,
        } => {
            let mut config = load_config(&config_path)?;
            let generator = &mut config.generator;
            if let Some(v) = categories_count {
                generator.categories_count = v;
            }
            if let Some(v) = categories_level {
                generator.categories_level = v;
            }
            if let Some(v) = products_count {
                generator.products_count = v;
            }
            if let Some(v) = units_count {
                generator.units_count = v;
            }
            cmd_generate(&config)
        },

        Commands::Exchange {
            exchange_type,
            nocopy,
            max_polls,
            json,
        } => {
            let mut config = load_config(&config_path)?;
            config.exchange.no_copy |= nocopy;
            if max_polls.is_some() {
                config.exchange.max_polls = max_polls;
            }
            cmd_exchange(&config, exchange_type.document(), json)
        },
    }
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();
}

/// Stored config overlaid with environment overrides
fn load_config(path: &std::path::Path) -> anyhow::Result<Config> {
    let stored = Config::load_or_default(path)?;
    Ok(stored.merge(Config::from_env()))
}

fn cmd_serv(
    path: &std::path::Path,
    url: Option<String>,
    user: Option<String>,
    pass: Option<String>,
) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(path)?;
    if let Some(url) = url {
        config.endpoint.url = url;
    }
    if let Some(user) = user {
        config.endpoint.user = user;
    }
    if let Some(pass) = pass {
        config.endpoint.pass = pass;
    }

    config.save(path)?;
    tracing::debug!("Saved {}", path.display());
    println!("{}", config.endpoint.summary());
    Ok(())
}

fn cmd_generate(config: &Config) -> anyhow::Result<()> {
    let generator = CatalogGenerator::from_paths(config.generator.clone(), &config.paths)?;
    let summary = generator.generate(&mut rand::thread_rng(), &config.paths.templates_dir)?;

    println!("categories: {}", summary.categories);
    println!("products: {}", summary.products);
    println!("units: {}", summary.units);
    Ok(())
}

fn cmd_exchange(config: &Config, kind: Option<DocumentKind>, json: bool) -> anyhow::Result<()> {
    if config.endpoint.url.is_empty() {
        anyhow::bail!("No exchange URL configured, run `cml serv --url <URL>` first");
    }

    tracing::info!("Exchanging with {}", config.endpoint.summary());
    let mut orchestrator = ExchangeOrchestrator::from_config(config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        match kind {
            Some(kind) => orchestrator.run_single(kind).await,
            None => orchestrator.run_full().await,
        }
    });

    match result {
        Ok(report) => {
            print_report(&report, json)?;
            Ok(())
        },
        Err(err) => {
            if json {
                print_report(orchestrator.report(), true)?;
            }
            report_failure(&err);
            Err(err.into())
        },
    }
}

fn print_report(report: &ExchangeReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for doc in &report.documents {
        println!(
            "{:<7} {:<14} parts={:<5} polls={:<4} zip={}",
            doc.kind.as_str(),
            format!("{:?}", doc.state),
            doc.parts_sent,
            doc.polls,
            doc.zipped
        );
    }
    println!(
        "requests={} elapsed={:.1}s complete={}",
        report.requests, report.elapsed_secs, report.completed
    );
    Ok(())
}

fn report_failure(err: &ExchangeError) {
    eprintln!("Exchange failed: {err}");
    if let Some(log) = err.server_log() {
        for line in log {
            eprintln!("  {line}");
        }
    }
}
