//! Per-period outcomes, the end-of-run summary and the run log.

use std::{
    fmt,
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::NaiveDate;

use crate::{error::FetchError, product::Product};

pub const LEDGER_FILE_NAME: &str = "log.txt";

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Completed,
    /// Output already present and kept.
    Skipped,
    Failed(FetchError),
}

impl Status {
    fn ledger_word(&self) -> &'static str {
        match self {
            Status::Completed => "success",
            Status::Skipped => "skipped",
            Status::Failed(_) => "fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub date: NaiveDate,
    pub file_name: String,
    pub status: Status,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub product: Product,
    pub output_directory: PathBuf,
    /// In date order.
    pub outcomes: Vec<Outcome>,
    /// The first submitted request failed authentication.
    pub first_request_rejected: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn completed(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == Status::Completed)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.status == Status::Skipped)
    }

    pub fn failed(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, Status::Failed(_)))
    }

    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "All {} downloads are completed.", self.product)?;
        writeln!(
            f,
            "Completed {} of {} into `{}`",
            self.completed().count(),
            self.outcomes.len(),
            self.output_directory.display()
        )?;

        let skipped = self.skipped().count();
        if skipped > 0 {
            writeln!(f, "Skipped {} existing file(s)", skipped)?;
        }

        let failed: Vec<&Outcome> = self.failed().collect();
        if !failed.is_empty() {
            writeln!(f, "Failed {}:", failed.len())?;
            for outcome in failed {
                if let Status::Failed(e) = &outcome.status {
                    writeln!(f, "  {} ({}): {}", outcome.date, outcome.file_name, e)?;
                }
            }
        }

        if self.first_request_rejected {
            writeln!(
                f,
                "The first request was rejected by authentication; check your username and password."
            )?;
        }

        write!(
            f,
            "Total time elapsed: {:.1} minutes",
            self.elapsed.as_secs_f64() / 60.0
        )
    }
}

/// Plain-text record of each attempted period, kept in the output directory.
pub struct Ledger {
    file: File,
}

impl Ledger {
    /// Truncates any previous log.
    pub fn create(output_directory: &Path) -> io::Result<Self> {
        let mut file = File::create(output_directory.join(LEDGER_FILE_NAME))?;
        write!(file, "\n\n** Working on GLORYS extraction **")?;

        Ok(Ledger { file })
    }

    pub fn record(&mut self, stamp: &str, status: &Status) -> io::Result<()> {
        write!(self.file, "\n {} {}", stamp, status.ledger_word())?;
        self.file.flush()
    }
}

// -- Tests -------------------------------------------------------------------
