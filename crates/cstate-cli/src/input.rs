//! Changeset input files.
//!
//! A file holds either one changeset `{"id", "snapshot", "events"}` or a JSON
//! array of them. `-` reads from stdin.
//!
//! Array elements are parsed one by one: a malformed element becomes a
//! [`BatchItem::Invalid`] entry and the rest of the batch still runs.

use anyhow::{Context, Result, bail};
use cstate_core::{ChangesetEvent, Snapshot};
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// One changeset as handed to the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangesetInput {
    /// Caller-chosen identifier echoed back in reports.
    #[serde(default)]
    pub id: Option<String>,
    pub snapshot: Snapshot,
    #[serde(default)]
    pub events: Vec<ChangesetEvent>,
}

impl ChangesetInput {
    /// The id to report under, falling back to the position in the batch.
    pub fn display_id(&self, index: usize) -> String {
        self.id.clone().unwrap_or_else(|| format!("#{index}"))
    }
}

/// An array element that did not match the changeset shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidChangeset {
    /// The element's `id`, when it had a string one.
    pub id: Option<String>,
    pub reason: String,
}

/// One element of the input, parsed or not.
#[derive(Debug, Clone)]
pub enum BatchItem {
    Changeset(ChangesetInput),
    Invalid(InvalidChangeset),
}

impl BatchItem {
    pub fn display_id(&self, index: usize) -> String {
        match self {
            Self::Changeset(input) => input.display_id(index),
            Self::Invalid(invalid) => invalid.id.clone().unwrap_or_else(|| format!("#{index}")),
        }
    }

    fn parse(index: usize, element: Value) -> Self {
        let id = element.get("id").and_then(Value::as_str).map(str::to_string);
        match serde_json::from_value::<ChangesetInput>(element) {
            Ok(input) => Self::Changeset(input),
            Err(err) => Self::Invalid(InvalidChangeset {
                id,
                reason: format!("changeset #{index} is malformed: {err}"),
            }),
        }
    }
}

/// Parsed input plus whether it was a bare object rather than an array.
#[derive(Debug, Clone)]
pub struct ChangesetBatch {
    pub items: Vec<BatchItem>,
    pub single: bool,
}

/// Read and parse changesets from `source` (`-` for stdin).
///
/// # Errors
///
/// Returns an error if the source cannot be read or does not hold a
/// changeset or an array of changesets.
pub fn read_batch(source: &Path) -> Result<ChangesetBatch> {
    let raw = if source.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read changesets from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read {}", source.display()))?
    };
    parse_batch(&raw)
}

/// Parse changesets from a JSON document.
///
/// # Errors
///
/// Returns an error when the document is not valid JSON, is neither an
/// object nor an array, or is a single object that does not match the
/// changeset shape.
pub fn parse_batch(raw: &str) -> Result<ChangesetBatch> {
    let value: Value = serde_json::from_str(raw).context("input is not valid JSON")?;
    match value {
        Value::Array(elements) => {
            let items = elements
                .into_iter()
                .enumerate()
                .map(|(i, element)| BatchItem::parse(i, element))
                .collect();
            Ok(ChangesetBatch {
                items,
                single: false,
            })
        }
        Value::Object(_) => {
            let item = serde_json::from_value::<ChangesetInput>(value)
                .context("changeset is malformed")?;
            Ok(ChangesetBatch {
                items: vec![BatchItem::Changeset(item)],
                single: true,
            })
        }
        other => bail!("expected a changeset object or array, found {}", type_name(&other)),
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
