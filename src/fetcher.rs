//! Drives one request per period through an external fetch capability.
//!
//! Requests are submitted strictly in date order, one at a time. A failed
//! period is recorded and the run moves on to the next one.

use std::{fs, future::Future, path::PathBuf, time::Instant};

use chrono::NaiveDate;
use log::{info, warn};

use crate::{
    bbox::BoundingBox,
    cli::create_progress_bar,
    credentials::{CredentialProvider, Credentials},
    error::{FetchError, RunError, ValidationError},
    product::Product,
    request::{Cadence, DepthRange, RequestSpecification, RequestTemplate},
    summary::{Ledger, Outcome, RunSummary, Status},
};

/// Something that can turn a request into a file on disk.
pub trait Fetch {
    fn submit(
        &mut self,
        request: &RequestSpecification,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<(), FetchError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// What to do when a period's output file is already present.
pub enum ExistingFile {
    #[default]
    Replace,
    Keep,
}

#[derive(Debug, Clone)]
pub struct RunParameters {
    pub product: Product,
    pub cadence: Cadence,
    pub start: NaiveDate,
    /// Number of days, or months for a monthly cadence.
    pub count: u32,
    pub bbox: BoundingBox,
    pub variables: Vec<String>,
    /// Product default when `None`.
    pub depth: Option<DepthRange>,
    pub output_directory: PathBuf,
    pub existing: ExistingFile,
    /// Anchors the rolling coverage window of forecast products.
    pub today: NaiveDate,
}

impl RunParameters {
    /// Validates the whole run in one pass and lists the period starts.
    pub fn plan(&self) -> Result<(RequestTemplate, Vec<NaiveDate>), ValidationError> {
        let template = RequestTemplate::new(
            self.product,
            self.cadence,
            &self.variables,
            self.bbox,
            self.depth,
            &self.output_directory,
        )?;

        let start = self.cadence.align(self.start);
        self.check_coverage(start)?;

        // Both ends are checked before any date list is built
        let end = match self.count.checked_sub(1) {
            Some(offset) => self.cadence.nth(start, offset)?,
            None => start,
        };
        self.check_coverage(end)?;

        let periods = self.cadence.periods(start, self.count)?;

        Ok((template, periods))
    }

    fn check_coverage(&self, date: NaiveDate) -> Result<(), ValidationError> {
        let (first, last) = self.product.info().coverage(self.today);

        if date < self.cadence.align(first) || date > last {
            return Err(ValidationError::OutsideCoverage {
                date,
                product: self.product,
                start: first,
                end: last,
            });
        }

        Ok(())
    }
}

pub struct BatchFetcher<F> {
    fetch: F,
    /// A request has reached the fetch capability during the current run.
    submitted: bool,
}

impl<F: Fetch> BatchFetcher<F> {
    pub fn new(fetch: F) -> Self {
        BatchFetcher {
            fetch,
            submitted: false,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> F {
        self.fetch
    }

    /// Validates, prepares the output directory, asks for credentials once and
    /// then submits every period in date order.
    pub async fn run<C: CredentialProvider>(
        &mut self,
        params: &RunParameters,
        credentials: &mut C,
    ) -> Result<RunSummary, RunError> {
        let tic = Instant::now();
        let (template, periods) = params.plan()?;
        self.submitted = false;

        let out_dir = template.output_directory();
        fs::create_dir_all(out_dir)
            .map_err(|e| RunError::OutputDirCreation(out_dir.to_path_buf(), e))?;
        let mut ledger =
            Ledger::create(out_dir).map_err(|e| RunError::OutputWrite(out_dir.to_path_buf(), e))?;

        let credentials = credentials.credentials().map_err(RunError::Credentials)?;

        info!(
            "Working on GLORYS extraction: {} file(s) of {} into {}",
            periods.len(),
            params.product,
            out_dir.display()
        );

        let cadence = template.cadence();
        let bar = create_progress_bar(periods.len() as u64, "Downloading...".to_string());
        let mut outcomes: Vec<Outcome> = Vec::with_capacity(periods.len());
        let mut first_request_rejected = false;

        for date in periods {
            let request = template.for_period(date);
            bar.set_message(request.output_filename.clone());

            let first_submission = !self.submitted;
            let started = Instant::now();
            let status = self.attempt(&request, &credentials, params.existing).await;
            let elapsed = started.elapsed();

            match &status {
                Status::Completed => bar.suspend(|| {
                    info!(
                        "{} downloaded in {:.1} seconds",
                        request.output_filename,
                        elapsed.as_secs_f64()
                    )
                }),
                Status::Skipped => {
                    bar.suspend(|| info!("{} already exists, skipping", request.output_filename))
                }
                Status::Failed(e) => bar.suspend(|| warn!("{} failed: {}", request.output_filename, e)),
            }

            if first_submission && matches!(&status, Status::Failed(e) if e.is_authentication()) {
                first_request_rejected = true;
                bar.suspend(|| {
                    warn!("The first request was rejected by authentication; later requests will likely fail the same way")
                });
            }

            if let Err(e) = ledger.record(&cadence.stamp(date), &status) {
                bar.suspend(|| warn!("Failed to update the run log: {}", e));
            }

            outcomes.push(Outcome {
                date: request.date,
                file_name: request.output_filename,
                status,
            });
            bar.inc(1);
        }

        bar.finish_with_message("Downloads finished");

        Ok(RunSummary {
            product: params.product,
            output_directory: out_dir.to_path_buf(),
            outcomes,
            first_request_rejected,
            elapsed: tic.elapsed(),
        })
    }

    async fn attempt(
        &mut self,
        request: &RequestSpecification,
        credentials: &Credentials,
        existing: ExistingFile,
    ) -> Status {
        let path = request.output_path();

        if path.exists() {
            match existing {
                ExistingFile::Keep => return Status::Skipped,
                ExistingFile::Replace => {
                    if let Err(e) = fs::remove_file(&path) {
                        return Status::Failed(FetchError::Output(format!(
                            "{}: {}",
                            path.display(),
                            e
                        )));
                    }
                }
            }
        }

        self.submitted = true;
        match self.fetch.submit(request, credentials).await {
            Ok(()) => Status::Completed,
            Err(e) => Status::Failed(e),
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, io, path::Path};
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeFetch {
        submitted: Vec<RequestSpecification>,
        failures: HashMap<NaiveDate, FetchError>,
        reject_all: Option<FetchError>,
    }

    impl Fetch for FakeFetch {
        async fn submit(
            &mut self,
            request: &RequestSpecification,
            _credentials: &Credentials,
        ) -> Result<(), FetchError> {
            self.submitted.push(request.clone());

            if let Some(e) = &self.reject_all {
                return Err(e.clone());
            }
            if let Some(e) = self.failures.get(&request.date) {
                return Err(e.clone());
            }

            fs::write(request.output_path(), b"CDF")
                .map_err(|e| FetchError::Transient(e.to_string()))
        }
    }

    struct NoCredentials;

    impl CredentialProvider for NoCredentials {
        fn credentials(&mut self) -> io::Result<Credentials> {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params(dir: &Path, start: NaiveDate, count: u32) -> RunParameters {
        RunParameters {
            product: Product::Reanalysis,
            cadence: Cadence::Daily,
            start,
            count,
            bbox: BoundingBox::default(),
            variables: vec!["so".to_string(), "thetao".to_string()],
            depth: None,
            output_directory: dir.join("daily"),
            existing: ExistingFile::Replace,
            today: date(2026, 10, 19),
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("ocean", "s3cret")
    }

    #[tokio::test]
    async fn should_issue_one_request_per_day() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = BatchFetcher::new(FakeFetch::default());

        let summary = fetcher
            .run(&params(dir.path(), date(2020, 2, 27), 4), &mut credentials())
            .await
            .unwrap();

        let dates: Vec<_> = fetcher.into_inner().submitted.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![date(2020, 2, 27), date(2020, 2, 28), date(2020, 2, 29), date(2020, 3, 1)]
        );
        assert_eq!(summary.completed().count(), 4);
        assert!(summary.is_complete());
        assert!(dir.path().join("daily/glorys_2020_02_29.nc").exists());
    }

    #[tokio::test]
    async fn should_issue_nothing_for_zero_days() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = BatchFetcher::new(FakeFetch::default());

        let summary = fetcher
            .run(&params(dir.path(), date(2020, 1, 1), 0), &mut credentials())
            .await
            .unwrap();

        assert!(summary.outcomes.is_empty());
        assert!(fetcher.into_inner().submitted.is_empty());
    }

    #[tokio::test]
    async fn should_name_files_across_year_boundary() {
        let dir = TempDir::new().unwrap();
        let mut run = params(dir.path(), date(2020, 12, 30), 3);
        run.product = Product::ForecastPhysics;
        run.variables = vec!["zos".to_string()];

        let mut fetcher = BatchFetcher::new(FakeFetch::default());
        let summary = fetcher.run(&run, &mut credentials()).await.unwrap();

        let names: Vec<_> = summary.outcomes.iter().map(|o| o.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["glorys_2020_12_30.nc", "glorys_2020_12_31.nc", "glorys_2021_01_01.nc"]
        );
    }

    #[tokio::test]
    async fn should_reject_inverted_box_before_any_request() {
        let dir = TempDir::new().unwrap();
        let mut run = params(dir.path(), date(2020, 1, 1), 3);
        run.bbox = BoundingBox {
            west: -122.0,
            east: -131.0,
            south: 39.0,
            north: 53.0,
        };

        let mut fetcher = BatchFetcher::new(FakeFetch::default());
        let err = fetcher.run(&run, &mut credentials()).await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Validation(ValidationError::InvertedLongitude { .. })
        ));
        assert!(fetcher.into_inner().submitted.is_empty());
        assert!(!dir.path().join("daily").exists());
    }

    #[tokio::test]
    async fn should_reject_dates_outside_coverage() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = BatchFetcher::new(FakeFetch::default());

        let before = params(dir.path(), date(1992, 12, 31), 1);
        let err = fetcher.run(&before, &mut credentials()).await.unwrap_err();
        assert!(matches!(
            err,
            RunError::Validation(ValidationError::OutsideCoverage { .. })
        ));

        // Starts inside the window but runs past its end.
        let across = params(dir.path(), date(2020, 12, 30), 3);
        let err = fetcher.run(&across, &mut credentials()).await.unwrap_err();
        assert!(matches!(
            err,
            RunError::Validation(ValidationError::OutsideCoverage { .. })
        ));

        assert!(fetcher.into_inner().submitted.is_empty());
    }

    #[tokio::test]
    async fn should_reject_forecast_dates_past_horizon() {
        let dir = TempDir::new().unwrap();
        let mut run = params(dir.path(), date(2026, 10, 20), 3);
        run.product = Product::ForecastPhysics;
        run.variables = vec!["thetao".to_string()];

        let mut fetcher = BatchFetcher::new(FakeFetch::default());
        let err = fetcher.run(&run, &mut credentials()).await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Validation(ValidationError::OutsideCoverage { .. })
        ));
    }

    #[tokio::test]
    async fn should_continue_after_failed_day() {
        let dir = TempDir::new().unwrap();
        let mut fake = FakeFetch::default();
        fake.failures.insert(
            date(2020, 1, 2),
            FetchError::Transient("socket timed out".to_string()),
        );

        let mut fetcher = BatchFetcher::new(fake);
        let summary = fetcher
            .run(&params(dir.path(), date(2020, 1, 1), 3), &mut credentials())
            .await
            .unwrap();

        assert_eq!(fetcher.into_inner().submitted.len(), 3);
        assert_eq!(summary.outcomes[0].status, Status::Completed);
        assert_eq!(
            summary.outcomes[1].status,
            Status::Failed(FetchError::Transient("socket timed out".to_string()))
        );
        assert_eq!(summary.outcomes[2].status, Status::Completed);
        assert!(!summary.first_request_rejected);
    }

    #[tokio::test]
    async fn should_flag_rejected_first_request_and_carry_on() {
        let dir = TempDir::new().unwrap();
        let fake = FakeFetch {
            reject_all: Some(FetchError::Authentication("HTTP Error 401".to_string())),
            ..Default::default()
        };

        let mut fetcher = BatchFetcher::new(fake);
        let summary = fetcher
            .run(&params(dir.path(), date(2020, 1, 1), 3), &mut credentials())
            .await
            .unwrap();

        assert!(summary.first_request_rejected);
        assert_eq!(summary.failed().count(), 3);
        assert_eq!(fetcher.into_inner().submitted.len(), 3);
    }

    #[tokio::test]
    async fn should_not_flag_later_authentication_failure() {
        let dir = TempDir::new().unwrap();
        let mut fake = FakeFetch::default();
        fake.failures.insert(
            date(2020, 1, 2),
            FetchError::Authentication("HTTP Error 401".to_string()),
        );

        let mut fetcher = BatchFetcher::new(fake);
        let summary = fetcher
            .run(&params(dir.path(), date(2020, 1, 1), 2), &mut credentials())
            .await
            .unwrap();

        assert!(!summary.first_request_rejected);
        assert_eq!(summary.failed().count(), 1);
    }

    #[tokio::test]
    async fn should_flag_first_submitted_request_after_unremovable_file() {
        let dir = TempDir::new().unwrap();
        let run = params(dir.path(), date(2020, 1, 1), 2);
        // A directory in the way cannot be removed as a file
        fs::create_dir_all(run.output_directory.join("glorys_2020_01_01.nc")).unwrap();

        let fake = FakeFetch {
            reject_all: Some(FetchError::Authentication("HTTP Error 401".to_string())),
            ..Default::default()
        };
        let mut fetcher = BatchFetcher::new(fake);
        let summary = fetcher.run(&run, &mut credentials()).await.unwrap();

        assert!(matches!(
            summary.outcomes[0].status,
            Status::Failed(FetchError::Output(_))
        ));
        assert!(matches!(
            summary.outcomes[1].status,
            Status::Failed(FetchError::Authentication(_))
        ));
        assert!(summary.first_request_rejected);
        assert_eq!(fetcher.into_inner().submitted.len(), 1);
    }

    #[test]
    fn should_reject_huge_count_without_listing_dates() {
        let dir = TempDir::new().unwrap();
        let mut run = params(dir.path(), date(2020, 1, 1), 4_000_000_000);
        run.product = Product::ForecastPhysics;
        run.variables = vec!["zos".to_string()];
        run.today = NaiveDate::MAX;

        let err = run.plan().unwrap_err();

        assert_eq!(err, ValidationError::DateOverflow(date(2020, 1, 1)));
    }

    #[tokio::test]
    async fn should_keep_physics_groups_in_separate_files() {
        let dir = TempDir::new().unwrap();
        let info = Product::ForecastPhysics.info();
        let mut fetcher = BatchFetcher::new(FakeFetch::default());
        let mut paths = Vec::new();

        for variable in ["so", "thetao"] {
            let variables = vec![variable.to_string()];
            let mut run = params(dir.path(), date(2021, 1, 1), 1);
            run.product = Product::ForecastPhysics;
            run.output_directory = dir
                .path()
                .join(info.output_subdirectory(&variables).unwrap());
            run.variables = variables;
            run.existing = ExistingFile::Keep;

            let summary = fetcher.run(&run, &mut credentials()).await.unwrap();
            assert_eq!(summary.outcomes[0].status, Status::Completed);
            paths.push(run.output_directory.join("glorys_2021_01_01.nc"));
        }

        assert_ne!(paths[0], paths[1]);
        assert!(paths.iter().all(|p| p.exists()));

        let datasets: Vec<_> = fetcher
            .into_inner()
            .submitted
            .iter()
            .map(|r| r.dataset_id)
            .collect();
        assert_eq!(
            datasets,
            vec![
                "cmems_mod_glo_phy-so_anfc_0.083deg_P1D-m",
                "cmems_mod_glo_phy-thetao_anfc_0.083deg_P1D-m"
            ]
        );
    }

    #[tokio::test]
    async fn should_keep_or_replace_existing_files() {
        let dir = TempDir::new().unwrap();
        let mut run = params(dir.path(), date(2020, 1, 1), 2);
        fs::create_dir_all(&run.output_directory).unwrap();
        let existing = run.output_directory.join("glorys_2020_01_01.nc");
        fs::write(&existing, b"old").unwrap();

        run.existing = ExistingFile::Keep;
        let mut fetcher = BatchFetcher::new(FakeFetch::default());
        let summary = fetcher.run(&run, &mut credentials()).await.unwrap();

        assert_eq!(summary.outcomes[0].status, Status::Skipped);
        assert_eq!(summary.outcomes[1].status, Status::Completed);
        assert_eq!(fs::read(&existing).unwrap(), b"old");

        run.existing = ExistingFile::Replace;
        let summary = fetcher.run(&run, &mut credentials()).await.unwrap();

        assert_eq!(summary.completed().count(), 2);
        assert_eq!(fs::read(&existing).unwrap(), b"CDF");
        assert_eq!(fetcher.into_inner().submitted.len(), 3);
    }

    #[tokio::test]
    async fn should_write_run_log() {
        let dir = TempDir::new().unwrap();
        let mut fake = FakeFetch::default();
        fake.failures
            .insert(date(2020, 1, 2), FetchError::Transient("down".to_string()));

        let run = params(dir.path(), date(2020, 1, 1), 2);
        let mut fetcher = BatchFetcher::new(fake);
        fetcher.run(&run, &mut credentials()).await.unwrap();

        let log = fs::read_to_string(run.output_directory.join("log.txt")).unwrap();
        assert!(log.ends_with("\n 2020_01_01 success\n 2020_01_02 fail"));
    }

    #[tokio::test]
    async fn should_stop_before_loop_without_credentials() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = BatchFetcher::new(FakeFetch::default());

        let err = fetcher
            .run(&params(dir.path(), date(2020, 1, 1), 2), &mut NoCredentials)
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Credentials(_)));
        assert!(fetcher.into_inner().submitted.is_empty());
    }

    #[tokio::test]
    async fn should_fail_when_output_directory_is_a_file() {
        let dir = TempDir::new().unwrap();
        let run = params(dir.path(), date(2020, 1, 1), 1);
        fs::write(&run.output_directory, b"not a directory").unwrap();

        let mut fetcher = BatchFetcher::new(FakeFetch::default());
        let err = fetcher.run(&run, &mut credentials()).await.unwrap_err();

        assert!(matches!(err, RunError::OutputDirCreation(..)));
        assert!(fetcher.into_inner().submitted.is_empty());
    }

    #[tokio::test]
    async fn should_fetch_monthly_biogeochemistry() {
        let dir = TempDir::new().unwrap();
        let run = RunParameters {
            product: Product::ForecastBiogeochem,
            cadence: Cadence::Monthly,
            start: date(2021, 11, 1),
            count: 3,
            bbox: BoundingBox::default(),
            variables: vec!["chl".to_string(), "nppv".to_string()],
            depth: Some(DepthRange { min: 0.0, max: 200.0 }),
            output_directory: dir.path().to_path_buf(),
            existing: ExistingFile::Replace,
            today: date(2026, 10, 19),
        };

        let mut fetcher = BatchFetcher::new(FakeFetch::default());
        let summary = fetcher.run(&run, &mut credentials()).await.unwrap();

        let names: Vec<_> = summary.outcomes.iter().map(|o| o.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "glorys_biogeochem_2021_11.nc",
                "glorys_biogeochem_2021_12.nc",
                "glorys_biogeochem_2022_01.nc"
            ]
        );

        let submitted = fetcher.into_inner().submitted;
        assert_eq!(submitted[1].date_max.to_string(), "2021-12-31 23:59:59");
        assert_eq!(submitted[1].depth.max, 200.0);
    }
}
