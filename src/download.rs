//! Runs motuclient as a child process to download one request.

use std::{ffi::OsString, process::Output};

use log::debug;
use tokio::process::Command;

use crate::{
    credentials::Credentials,
    error::FetchError,
    fetcher::Fetch,
    request::RequestSpecification,
};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The motuclient Python package, invoked as `<python> -m motuclient`.
#[derive(Debug, Clone)]
pub struct MotuClient {
    python: OsString,
}

impl MotuClient {
    pub fn new(python: impl Into<OsString>) -> Self {
        MotuClient {
            python: python.into(),
        }
    }

    /// Command line for one request, credentials included.
    pub fn arguments(request: &RequestSpecification, credentials: &Credentials) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-m".into(), "motuclient".into()];

        let mut push = |flag: &str, value: String| {
            args.push(flag.into());
            args.push(value.into());
        };

        push("--motu", request.motu_url.to_string());
        push("--service-id", request.service_id.to_string());
        push("--product-id", request.dataset_id.to_string());
        push("--longitude-min", request.bbox.west.to_string());
        push("--longitude-max", request.bbox.east.to_string());
        push("--latitude-min", request.bbox.south.to_string());
        push("--latitude-max", request.bbox.north.to_string());
        push("--date-min", request.date_min.format(DATE_FORMAT).to_string());
        push("--date-max", request.date_max.format(DATE_FORMAT).to_string());
        push("--depth-min", request.depth.min.to_string());
        push("--depth-max", request.depth.max.to_string());
        for variable in &request.variables {
            push("--variable", variable.clone());
        }
        push("--auth-mode", "cas".to_string());
        // motuclient reads the password from its arguments or its ini file;
        // as an argument it shows in the process list to other local users.
        push("--user", credentials.username.clone());
        push("--pwd", credentials.password().to_string());

        args.push("--out-dir".into());
        args.push(request.output_directory.clone().into_os_string());
        args.push("--out-name".into());
        args.push(request.output_filename.clone().into());

        args
    }
}

impl Default for MotuClient {
    fn default() -> Self {
        MotuClient::new("python")
    }
}

impl Fetch for MotuClient {
    async fn submit(
        &mut self,
        request: &RequestSpecification,
        credentials: &Credentials,
    ) -> Result<(), FetchError> {
        debug!(
            "Requesting {} from {} for {}",
            request.output_filename, request.dataset_id, request.date
        );

        let output = Command::new(&self.python)
            .args(Self::arguments(request, credentials))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| FetchError::Transient(format!("Failed to launch motuclient: {}", e)))?;

        check_output(&output)?;

        if !request.output_path().exists() {
            return Err(FetchError::Transient(format!(
                "motuclient finished without writing {}",
                request.output_filename
            )));
        }

        Ok(())
    }
}

// motuclient can log an error and still exit with status 0
fn check_output(output: &Output) -> Result<(), FetchError> {
    let log = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    if output.status.success() && !log.contains("[ERROR]") {
        return Ok(());
    }

    Err(classify_failure(&log, output.status.code()))
}

/// Sorts motuclient's complaint into one of the fetch error kinds.
pub fn classify_failure(log: &str, code: Option<i32>) -> FetchError {
    let message = log
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .rfind(|line| line.contains("ERROR") || line.contains("Error"))
        .or_else(|| log.lines().map(str::trim).rfind(|line| !line.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("motuclient exited with status {:?}", code));

    let lower = log.to_lowercase();

    if lower.contains("error 401")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("cas server")
    {
        FetchError::Authentication(message)
    } else if lower.contains("invalid")
        || lower.contains("out of bounds")
        || lower.contains("not found")
        || lower.contains("unknown product")
    {
        FetchError::InvalidParameter(message)
    } else {
        FetchError::Transient(message)
    }
}

// -- Tests -------------------------------------------------------------------
