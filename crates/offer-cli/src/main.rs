//! `offers` CLI: detect last-minute offer gaps, quote stays, and recheck
//! published offers from a JSON snapshot of the booking store.
//!
//! ## Usage
//!
//! ```sh
//! # Detect gaps for every vehicle (snapshot on stdin, JSON on stdout)
//! offers detect < snapshot.json
//!
//! # Quote a stay against the snapshot's seasons
//! offers price --pickup 2025-06-06 --dropoff 2025-06-09 -i snapshot.json
//!
//! # Recheck published offers and auto-cancel the unavailable ones
//! offers recheck -i snapshot.json --apply --today 2025-06-01
//!
//! # Engine settings from a file, overridden by flags
//! offers --config engine.json --two-day-rule price --pickup 2025-06-06 --dropoff 2025-06-07 -i snapshot.json
//! ```
//!
//! Logs go to stderr. `RUST_LOG` sets the filter (default `warn`) and
//! `LOG_FORMAT=json` switches to JSON lines.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use offer_engine::gaps::{annotate, DetectedGap, GapDetector};
use offer_engine::offer::{Offer, OfferBook};
use offer_engine::pricing::PriceCalculator;
use offer_engine::recheck::{check_offers, AvailabilityReport};
use offer_engine::{EngineConfig, IntegrityPolicy, Snapshot};
use serde::Serialize;
use std::io::{self, Read};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "offers",
    version,
    about = "Last-minute offer detection and seasonal price quotes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Skip inverted or overlapping bookings instead of failing
    #[arg(long, global = true)]
    lenient: bool,

    /// Bill two-day stays as three days
    #[arg(long, global = true)]
    two_day_rule: bool,

    /// Longest billable stay in days
    #[arg(long, global = true)]
    max_days: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect unbookable gaps between bookings and price them
    Detect {
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Leave out gaps that already have an offer (the summary still counts them)
        #[arg(long)]
        only_new: bool,
    },
    /// Quote a stay against the snapshot's seasons
    Price {
        /// First day of the stay (YYYY-MM-DD)
        #[arg(long)]
        pickup: NaiveDate,
        /// Last day of the stay (YYYY-MM-DD)
        #[arg(long)]
        dropoff: NaiveDate,
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Check published offers against current bookings and blocked periods
    Recheck {
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Auto-cancel unavailable offers and print the resulting offers
        #[arg(long)]
        apply: bool,
        /// With --apply, also expire published offers starting before this day
        #[arg(long, requires = "apply")]
        today: Option<NaiveDate>,
    },
}

#[derive(Serialize)]
struct DetectSummary {
    total: usize,
    new: usize,
    already_exists: usize,
    unpriced: usize,
}

#[derive(Serialize)]
struct DetectOutput {
    gaps: Vec<DetectedGap>,
    summary: DetectSummary,
}

#[derive(Serialize)]
struct RecheckOutput<'a> {
    #[serde(flatten)]
    report: AvailabilityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_cancelled: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expired: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offers: Option<Vec<&'a Offer>>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    debug!(?config, "engine configuration");

    match cli.command {
        Commands::Detect {
            input,
            output,
            only_new,
        } => {
            let snapshot = read_snapshot(input.as_deref())?;
            let calendar = snapshot.calendar();
            let gaps = GapDetector::new(&calendar)
                .with_integrity(config.integrity)
                .detect(&snapshot.bookings)
                .context("Failed to detect gaps")?;

            let mut calculator = PriceCalculator::new(&calendar, config.pricing);
            let mut detected = annotate(gaps, &snapshot.offers, &mut calculator);
            // The summary always covers every detected gap, listed or not.
            let already_exists = detected.iter().filter(|g| g.already_exists).count();
            let summary = DetectSummary {
                total: detected.len(),
                new: detected.len() - already_exists,
                already_exists,
                unpriced: detected.iter().filter(|g| g.real_price.is_none()).count(),
            };
            info!(gaps = summary.total, new = summary.new, "gap detection finished");
            if only_new {
                detected.retain(|g| !g.already_exists);
            }

            let out = DetectOutput {
                gaps: detected,
                summary,
            };
            write_json(output.as_deref(), &out)?;
        }
        Commands::Price {
            pickup,
            dropoff,
            input,
            output,
        } => {
            let snapshot = read_snapshot(input.as_deref())?;
            let calendar = snapshot.calendar();
            let quote = PriceCalculator::new(&calendar, config.pricing)
                .quote(pickup, dropoff)
                .with_context(|| format!("Failed to price stay {} to {}", pickup, dropoff))?;
            write_json(output.as_deref(), &quote)?;
        }
        Commands::Recheck {
            input,
            output,
            apply,
            today,
        } => {
            let snapshot = read_snapshot(input.as_deref())?;
            let report = check_offers(&snapshot.offers, &snapshot.bookings, &snapshot.blocked_periods);
            info!(
                total = report.summary.total,
                unavailable = report.summary.unavailable,
                "availability recheck finished"
            );

            if !apply {
                let out = RecheckOutput {
                    report,
                    auto_cancelled: None,
                    expired: None,
                    offers: None,
                };
                write_json(output.as_deref(), &out)?;
                return Ok(());
            }

            let mut book = OfferBook::from_offers(snapshot.offers).context("Failed to load offers")?;
            let auto_cancelled = book.apply_recheck(&report);
            let expired = today.map(|day| book.expire_before(day));
            let out = RecheckOutput {
                report,
                auto_cancelled: Some(auto_cancelled),
                expired,
                offers: Some(book.offers()),
            };
            write_json(output.as_deref(), &out)?;
        }
    }

    Ok(())
}

/// Merge the optional config file with command-line overrides.
fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            EngineConfig::from_json(&raw).with_context(|| format!("Invalid config file: {}", path))?
        }
        None => EngineConfig::default(),
    };

    if cli.lenient {
        config.integrity = IntegrityPolicy::Skip;
    }
    if cli.two_day_rule {
        config.pricing.bill_two_days_as_three = true;
    }
    if let Some(max) = cli.max_days {
        config.pricing.max_rental_days = max;
    }
    Ok(config)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    }
}

fn read_snapshot(path: Option<&str>) -> Result<Snapshot> {
    let raw = read_input(path)?;
    Snapshot::from_json(&raw).context("Failed to parse snapshot")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_json<T: Serialize>(path: Option<&str>, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    content.push('\n');
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
