use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{
    api::open_meteo::Location,
    core::{analysis::AnalysisSettings, validity::Precedence},
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: price the readings, analyse them, save and print the report.
    #[clap(name = "analyse")]
    Analyse(Box<AnalyseArgs>),

    /// Inspect or wipe the account cache.
    #[clap(name = "cache")]
    Cache(CacheArgs),
}

#[derive(Parser)]
pub struct AnalyseArgs {
    /// Collected data document (JSON).
    #[clap(long = "input", env = "WATTWISE_INPUT")]
    pub input: PathBuf,

    /// Also write the analysis result to this file.
    #[clap(long = "output", env = "WATTWISE_OUTPUT")]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub storage: StorageArgs,

    /// Account number, defaults to the one in the input document.
    #[clap(long = "account", env = "WATTWISE_ACCOUNT")]
    pub account: Option<String>,

    #[clap(flatten)]
    pub analysis: AnalysisArgs,

    /// Rule for the overlapping agreements and rates.
    #[clap(
        long = "overlap-precedence",
        env = "WATTWISE_OVERLAP_PRECEDENCE",
        value_enum,
        default_value_t = Precedence::default()
    )]
    pub overlap_precedence: Precedence,

    /// Electricity region (grid supply point group).
    #[clap(long = "region", default_value = "C", env = "WATTWISE_REGION")]
    pub region: char,

    #[clap(flatten)]
    pub weather: WeatherArgs,
}

#[derive(Copy, Clone, Parser)]
pub struct AnalysisArgs {
    /// Days the readings span.
    #[clap(
        long = "period-days",
        default_value = "30",
        env = "WATTWISE_PERIOD_DAYS",
        value_parser = clap::value_parser!(u32).range(1..=365)
    )]
    pub period_days: u32,

    /// Minimal consumption spike deviation, percent.
    #[clap(
        long = "anomaly-threshold",
        default_value = "50",
        env = "WATTWISE_ANOMALY_THRESHOLD",
        value_parser = parse_percentage
    )]
    pub anomaly_threshold: f64,

    /// Current monthly direct debit in pounds.
    #[clap(long = "direct-debit", env = "WATTWISE_DIRECT_DEBIT")]
    pub direct_debit: Option<f64>,
}

impl AnalysisArgs {
    pub fn settings(&self) -> AnalysisSettings {
        AnalysisSettings::builder()
            .period_days(self.period_days)
            .anomaly_threshold(self.anomaly_threshold)
            .maybe_current_direct_debit(self.direct_debit)
            .build()
    }
}

#[derive(Copy, Clone, Parser)]
pub struct WeatherArgs {
    /// Do not fetch the weather.
    #[clap(long = "no-weather", env = "WATTWISE_NO_WEATHER")]
    pub no_weather: bool,

    #[clap(
        long = "latitude",
        default_value = "52.4862",
        env = "WATTWISE_LATITUDE",
        allow_negative_numbers = true
    )]
    pub latitude: f64,

    #[clap(
        long = "longitude",
        default_value = "-1.8904",
        env = "WATTWISE_LONGITUDE",
        allow_negative_numbers = true
    )]
    pub longitude: f64,
}

impl WeatherArgs {
    pub const fn location(&self) -> Option<Location> {
        if self.no_weather {
            None
        } else {
            Some(Location { latitude: self.latitude, longitude: self.longitude })
        }
    }
}

#[derive(Clone, Parser)]
pub struct StorageArgs {
    /// Directory for the cache and the saved analyses.
    #[clap(long = "storage-dir", default_value = "data", env = "WATTWISE_STORAGE_DIR")]
    pub dir: PathBuf,
}

impl StorageArgs {
    pub fn cache_dir(&self) -> PathBuf {
        self.dir.join("cache")
    }
}

#[derive(Parser)]
pub struct CacheArgs {
    #[clap(long = "account", env = "WATTWISE_ACCOUNT")]
    pub account: String,

    #[clap(flatten)]
    pub storage: StorageArgs,

    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Copy, Clone, Subcommand)]
pub enum CacheCommand {
    /// Count the cached entries.
    #[clap(name = "stats")]
    Stats,

    /// Remove all the cached entries.
    #[clap(name = "clear")]
    Clear,
}

fn parse_percentage(value: &str) -> Result<f64> {
    let percentage: f64 = value.parse()?;
    ensure!((0.0..=100.0).contains(&percentage), "`{percentage}` is not within 0 to 100");
    Ok(percentage)
}
