//! `cstate history`: print the derived state samples of each changeset.

use std::io::{self, Write};

use chrono::SecondsFormat;
use cstate_core::config::EffectiveConfig;
use cstate_core::{History, StateSample, compute_history};
use serde::Serialize;

use super::{BatchArgs, ErrorReport, ReportStatus, finish, load_batch, split_outcome};
use crate::batch::run_batch;
use crate::output::{OutputMode, Renderable, pretty_section, render_item, render_list};

#[derive(Debug, Serialize)]
pub struct HistoryReport {
    pub id: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<StateSample>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

fn timestamp(sample: &StateSample) -> String {
    sample.at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Renderable for HistoryReport {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &format!("History {}", self.id))?;
        match (&self.samples, &self.error) {
            (Some(samples), _) => {
                for sample in samples {
                    writeln!(
                        w,
                        "{:<22} {:<9} {}",
                        timestamp(sample),
                        sample.external_state.as_str(),
                        sample.review_state.as_str()
                    )?;
                }
            }
            (None, Some(error)) => writeln!(w, "error[{}]: {}", error.code, error.message)?,
            (None, None) => writeln!(w, "skipped after an earlier failure")?,
        }
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(w, self).map_err(io::Error::from)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        match (&self.samples, &self.error) {
            (Some(samples), _) => {
                for sample in samples {
                    writeln!(
                        w,
                        "{}  {}  {}  {}",
                        self.id,
                        timestamp(sample),
                        sample.external_state.as_str(),
                        sample.review_state.as_str()
                    )?;
                }
                Ok(())
            }
            (None, Some(error)) => {
                writeln!(w, "{}  error[{}]  {}", self.id, error.code, error.message)
            }
            (None, None) => writeln!(w, "{}  {}", self.id, self.status.as_str()),
        }
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "AT", "EXTERNAL", "REVIEW"]
    }
}

/// Execute `cstate history`.
///
/// # Errors
///
/// Returns an error if the input cannot be read, output cannot be written,
/// or any changeset's history could not be derived.
pub fn run_history(
    args: &BatchArgs,
    output: OutputMode,
    config: &EffectiveConfig,
) -> anyhow::Result<()> {
    let batch = load_batch(&args.input, output)?;
    let outcomes = run_batch(&batch.items, args.options(config), |item| {
        let history = History::for_host(item.snapshot.host_kind(), &item.events)?;
        Ok(compute_history(&item.snapshot, &history))
    });

    let reports: Vec<HistoryReport> = outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| {
            let (status, samples, error) = split_outcome(outcome);
            HistoryReport {
                id: batch.items[index].display_id(index),
                status,
                samples,
                error,
            }
        })
        .collect();

    if batch.single {
        if let Some(report) = reports.first() {
            render_item(report, output)?;
        }
    } else {
        render_list(&reports, output)?;
    }

    let unsuccessful = reports
        .iter()
        .filter(|r| r.status != ReportStatus::Ok)
        .count();
    finish(output, reports.len(), unsuccessful)
}
