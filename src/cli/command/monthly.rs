//! Monthly means are only published for the biogeochemistry forecast.

use anyhow::Result;

use crate::{cli::MonthlyArgs, product::Product, request::Cadence, summary::RunSummary};

use super::fetch;

pub async fn monthly(args: &MonthlyArgs) -> Result<RunSummary> {
    fetch(
        &args.request,
        Product::ForecastBiogeochem,
        Cadence::Monthly,
        args.start,
        args.months,
    )
    .await
}
