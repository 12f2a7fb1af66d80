use anyhow::Result;

use crate::{cli::DailyArgs, request::Cadence, summary::RunSummary};

use super::fetch;

pub async fn daily(args: &DailyArgs) -> Result<RunSummary> {
    fetch(&args.request, args.product, Cadence::Daily, args.start, args.days).await
}
