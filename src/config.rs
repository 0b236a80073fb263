//! Command-line surface and the run configurations built from it.

use chrono::{Duration, FixedOffset, Months, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::record::Zone;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_OUTPUT: &str = "sunrise_sunset.csv";
pub const DEFAULT_LOW_LIGHT_OUTPUT: &str = "low_light_hours.csv";

/// Record daily sunrise/sunset times and measure dark hours per work shift.
#[derive(Parser, Debug)]
#[command(name = "sunrise-sunset")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one sunrise/sunset row per day from OpenWeatherMap into CSV
    Fetch(FetchArgs),
    /// Compute darkness minutes per shift from a fetched CSV
    LowLight(LowLightArgs),
}

/// What to do when a single day's fetch fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ErrorPolicy {
    /// Stop the run at the first failing day
    #[default]
    Abort,
    /// Log the failure, leave the day out and keep going
    Skip,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: f64,

    /// OpenWeatherMap API key
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// First day to fetch (inclusive). Defaults to one year ago.
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Day to stop at (exclusive). Defaults to yesterday.
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Destination CSV file
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Units system passed to the API
    #[arg(long, default_value = "metric")]
    pub units: String,

    /// API base URL
    #[arg(long, env = "OPENWEATHER_BASE", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Render timestamps at this UTC offset (e.g. -05:00) instead of local time
    #[arg(long, value_parser = parse_utc_offset, allow_hyphen_values = true)]
    pub utc_offset: Option<FixedOffset>,

    /// Policy for a day whose fetch fails
    #[arg(long, value_enum, default_value_t = ErrorPolicy::Abort)]
    pub on_error: ErrorPolicy,

    /// Per-request timeout in seconds; no timeout when omitted
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct LowLightArgs {
    /// Sunrise/sunset CSV produced by `fetch`
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub input: PathBuf,

    /// Destination for the per-shift report
    #[arg(short, long, default_value = DEFAULT_LOW_LIGHT_OUTPUT)]
    pub output: PathBuf,
}

/// Everything the fetch loop needs; no hidden constants.
#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub api_key: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub output: PathBuf,
    pub units: String,
    pub base_url: String,
    pub zone: Zone,
    pub on_error: ErrorPolicy,
    pub timeout: Option<std::time::Duration>,
}

impl FetchConfig {
    /// Config for the given location and range with every other field at
    /// its default.
    pub fn new(
        latitude: f64,
        longitude: f64,
        api_key: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        FetchConfig {
            latitude,
            longitude,
            api_key: api_key.to_string(),
            start_date,
            end_date,
            output: PathBuf::from(DEFAULT_OUTPUT),
            units: "metric".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            zone: Zone::Local,
            on_error: ErrorPolicy::Abort,
            timeout: None,
        }
    }

    /// Number of days in `[start_date, end_date)`.
    pub fn day_count(&self) -> usize {
        (self.end_date - self.start_date).num_days().max(0) as usize
    }
}

#[derive(Clone, Debug)]
pub struct LowLightConfig {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl FetchArgs {
    /// Resolve defaults relative to `today`.
    pub fn into_config(self, today: NaiveDate) -> FetchConfig {
        let (default_start, default_end) = default_range(today);
        FetchConfig {
            latitude: self.latitude,
            longitude: self.longitude,
            api_key: self.api_key,
            start_date: self.start_date.unwrap_or(default_start),
            end_date: self.end_date.unwrap_or(default_end),
            output: self.output,
            units: self.units,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            zone: Zone::from_offset(self.utc_offset),
            on_error: self.on_error,
            timeout: self.timeout_secs.map(std::time::Duration::from_secs),
        }
    }
}

impl From<LowLightArgs> for LowLightConfig {
    fn from(args: LowLightArgs) -> Self {
        LowLightConfig {
            input: args.input,
            output: args.output,
        }
    }
}

/// One year before `today` through yesterday. Feb 29 maps to Feb 28.
pub fn default_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_months(Months::new(12))
        .unwrap_or(today - Duration::days(365));
    (start, today - Duration::days(1))
}

fn parse_utc_offset(s: &str) -> Result<FixedOffset, String> {
    s.parse::<FixedOffset>()
        .map_err(|e| format!("invalid UTC offset '{s}' (expected e.g. +05:30): {e}"))
}
