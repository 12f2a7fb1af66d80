//! Builds one immutable request per period from a validated template.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
    bbox::BoundingBox,
    error::ValidationError,
    product::{Product, MAX_DEPTH},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How far apart consecutive requests are, and how much time each covers.
pub enum Cadence {
    Daily,
    Monthly,
}

impl Cadence {
    /// The `count` consecutive period starts beginning at `start`.
    pub fn periods(self, start: NaiveDate, count: u32) -> Result<Vec<NaiveDate>, ValidationError> {
        (0..count).map(|i| self.nth(start, i)).collect()
    }

    /// Start of the period `offset` steps after the one containing `start`.
    pub fn nth(self, start: NaiveDate, offset: u32) -> Result<NaiveDate, ValidationError> {
        let start = self.align(start);

        match self {
            Cadence::Daily => start.checked_add_days(Days::new(offset.into())),
            Cadence::Monthly => start.checked_add_months(Months::new(offset)),
        }
        .ok_or(ValidationError::DateOverflow(start))
    }

    pub fn align(self, date: NaiveDate) -> NaiveDate {
        match self {
            Cadence::Daily => date,
            Cadence::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// First and last instant covered by the period starting at `date`.
    pub fn time_bounds(self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let last_day = match self {
            Cadence::Daily => date,
            Cadence::Monthly => last_day_of_month(date),
        };
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();

        (
            self.align(date).and_time(NaiveTime::default()),
            last_day.and_time(end_of_day),
        )
    }

    pub fn file_name(self, date: NaiveDate) -> String {
        match self {
            Cadence::Daily => format!(
                "glorys_{}_{:02}_{:02}.nc",
                date.year(),
                date.month(),
                date.day()
            ),
            Cadence::Monthly => {
                format!("glorys_biogeochem_{}_{:02}.nc", date.year(), date.month())
            }
        }
    }

    /// Date stamp written to the run ledger.
    pub fn stamp(self, date: NaiveDate) -> String {
        match self {
            Cadence::Daily => date.format("%Y_%m_%d").to_string(),
            Cadence::Monthly => date.format("%Y_%m").to_string(),
        }
    }
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Vertical extent of a request, in metres.
pub struct DepthRange {
    pub min: f64,
    pub max: f64,
}

impl DepthRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ValidationError> {
        if !(0.0..=MAX_DEPTH).contains(&min) || !(0.0..=MAX_DEPTH).contains(&max) || min > max {
            return Err(ValidationError::DepthRange {
                min,
                max,
                limit: MAX_DEPTH,
            });
        }

        Ok(DepthRange { min, max })
    }

    pub fn product_default(product: Product) -> Self {
        let (min, max) = product.info().default_depth;
        DepthRange { min, max }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Everything the external client needs for one period.
pub struct RequestSpecification {
    pub service_id: &'static str,
    pub dataset_id: &'static str,
    pub motu_url: &'static str,
    pub variables: Vec<String>,
    pub bbox: BoundingBox,
    pub depth: DepthRange,
    pub date: NaiveDate,
    pub date_min: NaiveDateTime,
    pub date_max: NaiveDateTime,
    pub output_directory: PathBuf,
    pub output_filename: String,
}

impl RequestSpecification {
    pub fn output_path(&self) -> PathBuf {
        self.output_directory.join(&self.output_filename)
    }
}

#[derive(Debug, Clone)]
/// The validated, run-wide part of every request.
pub struct RequestTemplate {
    product: Product,
    cadence: Cadence,
    dataset_id: &'static str,
    variables: Vec<String>,
    bbox: BoundingBox,
    depth: DepthRange,
    output_directory: PathBuf,
}

impl RequestTemplate {
    pub fn new(
        product: Product,
        cadence: Cadence,
        variables: &[String],
        bbox: BoundingBox,
        depth: Option<DepthRange>,
        output_directory: &Path,
    ) -> Result<Self, ValidationError> {
        bbox.validate()?;

        let info = product.info();
        let variables = dedup(variables);
        let daily_dataset = info.resolve_dataset(&variables)?;

        let dataset_id = match cadence {
            Cadence::Daily => daily_dataset.id,
            Cadence::Monthly => info
                .monthly_dataset
                .ok_or(ValidationError::MonthlyUnsupported(product))?,
        };

        let depth = match depth {
            Some(depth) => DepthRange::new(depth.min, depth.max)?,
            None => DepthRange::product_default(product),
        };

        Ok(RequestTemplate {
            product,
            cadence,
            dataset_id,
            variables,
            bbox,
            depth,
            output_directory: output_directory.to_path_buf(),
        })
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn for_period(&self, date: NaiveDate) -> RequestSpecification {
        let info = self.product.info();
        let (date_min, date_max) = self.cadence.time_bounds(date);

        RequestSpecification {
            service_id: info.service_id,
            dataset_id: self.dataset_id,
            motu_url: info.motu_url,
            variables: self.variables.clone(),
            bbox: self.bbox,
            depth: self.depth,
            date: self.cadence.align(date),
            date_min,
            date_max,
            output_directory: self.output_directory.clone(),
            output_filename: self.cadence.file_name(date),
        }
    }
}

/// Trims and drops blank or repeated codes, keeping first occurrences in order.
pub fn dedup(variables: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(variables.len());
    for variable in variables {
        let variable = variable.trim();
        if !variable.is_empty() && !unique.iter().any(|v| v == variable) {
            unique.push(variable.to_string());
        }
    }

    unique
}

// -- Tests -------------------------------------------------------------------
