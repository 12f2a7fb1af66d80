//! Command line interface.

pub mod command;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::product::Product;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get one file per day
    Daily(DailyArgs),
    /// Get one biogeochemistry file per month
    Monthly(MonthlyArgs),
    /// List products, coverage and variables
    Products {},
}

#[derive(Args, Debug)]
pub struct DailyArgs {
    /// reanalysis, forecast-physics or forecast-biogeochem
    #[arg(short, long, default_value = "reanalysis")]
    pub product: Product,

    /// First day to download (YYYY-MM-DD)
    #[arg(short, long)]
    pub start: NaiveDate,

    /// Number of days to download
    #[arg(short = 'n', long)]
    pub days: u32,

    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct MonthlyArgs {
    /// First month to download (YYYY-MM-DD, the day is ignored)
    #[arg(short, long)]
    pub start: NaiveDate,

    /// Number of months to download
    #[arg(short = 'n', long)]
    pub months: u32,

    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Variable codes, comma separated or repeated [default: the product's list]
    #[arg(short, long = "variable", value_delimiter = ',')]
    pub variables: Vec<String>,

    /// Western edge, degrees east
    #[arg(long, default_value_t = -131.0, allow_negative_numbers = true)]
    pub west: f64,

    /// Eastern edge, degrees east
    #[arg(long, default_value_t = -122.0, allow_negative_numbers = true)]
    pub east: f64,

    /// Southern edge, degrees north
    #[arg(long, default_value_t = 39.0, allow_negative_numbers = true)]
    pub south: f64,

    /// Northern edge, degrees north
    #[arg(long, default_value_t = 53.0, allow_negative_numbers = true)]
    pub north: f64,

    /// Shallowest depth in metres [default: the product's]
    #[arg(long)]
    pub depth_min: Option<f64>,

    /// Deepest depth in metres [default: the product's]
    #[arg(long)]
    pub depth_max: Option<f64>,

    /// Where to save the files [default: ~/glorys/<product>]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Skip days whose file already exists instead of downloading them again
    #[arg(long)]
    pub keep_existing: bool,

    /// Copernicus Marine username, prompted for when absent
    #[arg(long, env = "GLORYS_USERNAME")]
    pub username: Option<String>,

    /// Copernicus Marine password, prompted for when absent
    #[arg(long, env = "GLORYS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Python interpreter with motuclient installed
    #[arg(long, env = "GLORYS_PYTHON", default_value = "python")]
    pub python: String,
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    ProgressBar::new(size).with_message(message).with_style(
        ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("##-"),
    )
}

// -- Tests -------------------------------------------------------------------
