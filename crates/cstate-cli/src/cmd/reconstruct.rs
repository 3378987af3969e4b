//! `cstate reconstruct`: compute the canonical state of each changeset.

use std::io::{self, Write};

use cstate_core::{ChangesetState, Label, reconstruct};
use serde::Serialize;

use super::{BatchArgs, ErrorReport, ReportStatus, finish, load_batch, split_outcome};
use crate::batch::run_batch;
use crate::output::{OutputMode, Renderable, pretty_kv, pretty_section, render_item, render_list};
use cstate_core::config::EffectiveConfig;

/// Result for one changeset as printed by `reconstruct`.
#[derive(Debug, Serialize)]
pub struct ChangesetReport {
    pub id: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ChangesetState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

fn label_names(labels: &[Label]) -> String {
    labels
        .iter()
        .map(|label| label.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

impl Renderable for ChangesetReport {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &format!("Changeset {}", self.id))?;
        match (&self.state, &self.error) {
            (Some(state), _) => {
                pretty_kv(w, "External", state.external_state.as_str())?;
                pretty_kv(w, "Review", state.review_state.as_str())?;
                pretty_kv(w, "Checks", state.check_state.as_str())?;
                let labels = label_names(&state.labels);
                pretty_kv(w, "Labels", if labels.is_empty() { "-" } else { labels.as_str() })?;
            }
            (None, Some(error)) => {
                pretty_kv(w, "Error", format!("[{}] {}", error.code, error.message))?;
                if let Some(hint) = &error.hint {
                    pretty_kv(w, "Hint", hint)?;
                }
            }
            (None, None) => pretty_kv(w, "Status", "skipped after an earlier failure")?,
        }
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(w, self).map_err(io::Error::from)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        match (&self.state, &self.error) {
            (Some(state), _) => {
                let labels = label_names(&state.labels);
                writeln!(
                    w,
                    "{}  {}  {}  {}  {}",
                    self.id,
                    state.external_state.as_str(),
                    state.review_state.as_str(),
                    state.check_state.as_str(),
                    if labels.is_empty() { "-" } else { labels.as_str() }
                )
            }
            (None, Some(error)) => {
                writeln!(w, "{}  error[{}]  {}", self.id, error.code, error.message)
            }
            (None, None) => writeln!(w, "{}  {}", self.id, self.status.as_str()),
        }
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "EXTERNAL", "REVIEW", "CHECKS", "LABELS"]
    }
}

/// Execute `cstate reconstruct`.
///
/// # Errors
///
/// Returns an error if the input cannot be read, output cannot be written,
/// or any changeset was not reconstructed.
pub fn run_reconstruct(
    args: &BatchArgs,
    output: OutputMode,
    config: &EffectiveConfig,
) -> anyhow::Result<()> {
    let batch = load_batch(&args.input, output)?;
    let outcomes = run_batch(&batch.items, args.options(config), |item| {
        reconstruct(&item.snapshot, &item.events)
    });

    let reports: Vec<ChangesetReport> = outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| {
            let (status, state, error) = split_outcome(outcome);
            ChangesetReport {
                id: batch.items[index].display_id(index),
                status,
                state,
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
