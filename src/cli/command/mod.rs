pub mod daily;
pub mod monthly;
pub mod products;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
pub use daily::daily;
pub use monthly::monthly;
pub use products::products;

use crate::{
    bbox::BoundingBox,
    credentials::PromptCredentials,
    download::MotuClient,
    fetcher::{BatchFetcher, ExistingFile, RunParameters},
    product::Product,
    request::{dedup, Cadence, DepthRange},
    summary::RunSummary,
};

use super::RequestArgs;

/// `~/glorys/<product>`, plus the dataset's folder when the product splits its
/// variables across datasets.
pub fn default_output_dir(product: Product, variables: &[String]) -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine the home directory"))?;
    let subdirectory = product.info().output_subdirectory(&dedup(variables))?;

    Ok(home.join("glorys").join(subdirectory))
}

/// Validates the arguments, asks for credentials and downloads every period.
async fn fetch(
    args: &RequestArgs,
    product: Product,
    cadence: Cadence,
    start: NaiveDate,
    count: u32,
) -> Result<RunSummary> {
    let today = Local::now().date_naive();
    let params = run_parameters(args, product, cadence, start, count, today)?;

    let mut credentials = PromptCredentials::terminal(args.username.clone(), args.password.clone());
    let mut fetcher = BatchFetcher::new(MotuClient::new(&args.python));
    let summary = fetcher.run(&params, &mut credentials).await?;

    Ok(summary)
}

fn run_parameters(
    args: &RequestArgs,
    product: Product,
    cadence: Cadence,
    start: NaiveDate,
    count: u32,
    today: NaiveDate,
) -> Result<RunParameters> {
    let info = product.info();

    let variables = if args.variables.is_empty() {
        info.default_variables.iter().map(|v| v.to_string()).collect()
    } else {
        args.variables.clone()
    };

    // A single bound overrides the product default on that side only
    let depth = match (args.depth_min, args.depth_max) {
        (None, None) => None,
        (min, max) => {
            let (default_min, default_max) = info.default_depth;
            Some(DepthRange::new(
                min.unwrap_or(default_min),
                max.unwrap_or(default_max),
            )?)
        }
    };

    let output_directory = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => default_output_dir(product, &variables)?,
    };

    let existing = if args.keep_existing {
        ExistingFile::Keep
    } else {
        ExistingFile::Replace
    };

    Ok(RunParameters {
        product,
        cadence,
        start,
        count,
        bbox: BoundingBox::new(args.west, args.east, args.south, args.north)?,
        variables,
        depth,
        output_directory,
        existing,
        today,
    })
}

// -- Tests -------------------------------------------------------------------
