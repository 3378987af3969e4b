pub mod config;
pub mod history;
pub mod reconstruct;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use cstate_core::ErrorCode;
use cstate_core::config::EffectiveConfig;
use serde::Serialize;

use crate::batch::{BatchOptions, Outcome};
use crate::input::{ChangesetBatch, read_batch};
use crate::output::{CliError, OutputMode, render_error};

/// Input arguments shared by the batch commands.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Changeset JSON file, or `-` for stdin.
    pub input: PathBuf,

    /// Skip the remaining changesets after the first failure.
    #[arg(long)]
    pub fail_fast: bool,
}

impl BatchArgs {
    pub const fn options(&self, config: &EffectiveConfig) -> BatchOptions {
        BatchOptions {
            workers: config.resolved_workers,
            fail_fast: self.fail_fast || config.project.sync.fail_fast,
        }
    }
}

/// Read the batch named by `path`, reporting parse failures as `E1001`.
pub fn load_batch(path: &Path, output: OutputMode) -> Result<ChangesetBatch> {
    match read_batch(path) {
        Ok(batch) => Ok(batch),
        Err(err) => {
            render_error(
                output,
                &CliError::from_code(ErrorCode::InputParseError, format!("{err:#}")),
            )?;
            Err(err)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Ok,
    Failed,
    Skipped,
}

impl ReportStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Why one changeset has no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Split an outcome into the pieces every report carries.
pub fn split_outcome<T>(outcome: Outcome<T>) -> (ReportStatus, Option<T>, Option<ErrorReport>) {
    match outcome {
        Outcome::Done(value) => (ReportStatus::Ok, Some(value), None),
        Outcome::Failed(err) => {
            let code = err.code();
            let report = ErrorReport {
                code: code.code().to_string(),
                message: err.to_string(),
                hint: code.hint().map(str::to_string),
            };
            (ReportStatus::Failed, None, Some(report))
        }
        Outcome::Unparsed(reason) => {
            let code = ErrorCode::InputParseError;
            let report = ErrorReport {
                code: code.code().to_string(),
                message: reason,
                hint: code.hint().map(str::to_string),
            };
            (ReportStatus::Failed, None, Some(report))
        }
        Outcome::Skipped => (ReportStatus::Skipped, None, None),
    }
}

/// Turn unsuccessful reports into a non-zero exit.
pub fn finish(output: OutputMode, total: usize, unsuccessful: usize) -> Result<()> {
    if unsuccessful == 0 {
        return Ok(());
    }
    let message = format!("{unsuccessful} of {total} changesets were not reconstructed");
    render_error(output, &CliError::new(message.clone()))?;
    anyhow::bail!(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsed_input_reports_input_error_code() {
        let (status, value, error) =
            split_outcome::<()>(Outcome::Unparsed("changeset #2 is malformed".into()));
        assert_eq!(status, ReportStatus::Failed);
        assert!(value.is_none());
        let error = error.expect("error report");
        assert_eq!(error.code, "E1001");
        assert_eq!(error.message, "changeset #2 is malformed");
    }

    #[test]
    fn skipped_has_no_error() {
        let (status, _, error) = split_outcome::<()>(Outcome::Skipped);
        assert_eq!(status, ReportStatus::Skipped);
        assert!(error.is_none());
    }
}
