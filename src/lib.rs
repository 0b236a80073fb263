//! Sunrise/Sunset
//!
//! Core library for recording one sunrise/sunset row per day from the
//! OpenWeatherMap One Call API into CSV, and for measuring how much of each
//! work shift falls in darkness from that CSV.
//!
//! The binary crate parses the command line and calls `run`.

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use std::io::Write;
use tracing::{error, info, warn};

pub mod config;
pub mod error;
pub mod lowlight;
pub mod onecall;
pub mod record;

pub use config::{Cli, Command, ErrorPolicy, FetchConfig, LowLightConfig};
pub use error::{FetchError, LowLightError};
pub use onecall::{OneCallClient, SunTimes};
pub use record::{DailyRecord, Zone, days, format_timestamp, parse_timestamp};

/// Outcome of a fetch run.
#[derive(Debug, Default, PartialEq)]
pub struct FetchSummary {
    /// Rows written to the output.
    pub written: usize,
    /// Days left out under [`ErrorPolicy::Skip`], with the reason.
    pub skipped: Vec<(NaiveDate, String)>,
}

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fetch(args) => {
            let cfg = args.into_config(Local::now().date_naive());
            let summary = run_fetch(&cfg)
                .await
                .with_context(|| format!("fetch into {} failed", cfg.output.display()))?;
            println!(
                "Wrote {} rows to {}",
                summary.written,
                cfg.output.display()
            );
            if !summary.skipped.is_empty() {
                for (date, reason) in &summary.skipped {
                    error!(%date, %reason, "day skipped");
                }
                return Err(anyhow!(
                    "{} of {} days could not be fetched. Please check the log above.",
                    summary.skipped.len(),
                    cfg.day_count()
                ));
            }
            Ok(())
        }
        Command::LowLight(args) => {
            let cfg = LowLightConfig::from(args);
            let totals = lowlight::run_low_light(&cfg.input, &cfg.output)
                .with_context(|| format!("low-light report from {} failed", cfg.input.display()))?;
            for t in totals {
                println!(
                    "Shift {}: {} shifts, {:.1} dark minutes on average",
                    t.shift.label(),
                    t.count,
                    t.mean_minutes()
                );
            }
            Ok(())
        }
    }
}

/// Fetch every day of `cfg`'s range into `cfg.output`.
///
/// The output is flushed before returning on every path, so rows written
/// before a failure stay on disk.
pub async fn run_fetch(cfg: &FetchConfig) -> Result<FetchSummary, FetchError> {
    let client = OneCallClient::new(cfg)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&cfg.output)
        .map_err(|source| FetchError::FileCreate {
            path: cfg.output.clone(),
            source,
        })?;

    info!(
        start = %cfg.start_date,
        end = %cfg.end_date,
        days = cfg.day_count(),
        path = %cfg.output.display(),
        "fetching sunrise/sunset"
    );
    let result = collect_into(&client, cfg, &mut wtr).await;
    let flushed = wtr.flush();
    let summary = result?;
    flushed?;

    info!(rows = summary.written, skipped = summary.skipped.len(), "fetch finished");
    Ok(summary)
}

/// The daily loop: one request and one row per day of `[start_date, end_date)`.
pub async fn collect_into<W: Write>(
    client: &OneCallClient,
    cfg: &FetchConfig,
    wtr: &mut csv::Writer<W>,
) -> Result<FetchSummary, FetchError> {
    let mut summary = FetchSummary::default();

    for date in days(cfg.start_date, cfg.end_date) {
        let record = match fetch_day(client, cfg, date).await {
            Ok(r) => r,
            Err(e) if cfg.on_error == ErrorPolicy::Skip && e.is_per_day() => {
                warn!(%date, error = %e, "skipping day");
                summary.skipped.push((date, e.to_string()));
                continue;
            }
            Err(e) => return Err(e),
        };
        wtr.write_record(record.to_row())?;
        summary.written += 1;
    }
    Ok(summary)
}

async fn fetch_day(
    client: &OneCallClient,
    cfg: &FetchConfig,
    date: NaiveDate,
) -> Result<DailyRecord, FetchError> {
    let times = client.sun_times(date).await?;
    DailyRecord::from_epochs(date, times.sunrise, times.sunset, cfg.zone)
}
