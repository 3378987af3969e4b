//! Reconstruction entry point.
//!
//! [`reconstruct`] checks the events against the snapshot's host, orders
//! them once and runs every facet computation over the same history. Each
//! facet is also exposed on its own.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ReconstructError;
use crate::event::{ChangesetEvent, History};
use crate::history::{StateSample, compute_history, latest, latest_after};
use crate::host::Snapshot;
use crate::labels::compute_labels;
use crate::model::{CheckState, ExternalState, Label, ReviewState};

/// Canonical, host-independent state of one changeset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesetState {
    pub external_state: ExternalState,
    pub review_state: ReviewState,
    pub check_state: CheckState,
    /// Sorted by name, no duplicates.
    pub labels: Vec<Label>,
}

/// Derive the canonical state of a changeset from its latest snapshot and
/// event history.
///
/// `events` may be in any order; they are replayed by timestamp.
///
/// # Errors
///
/// - [`ReconstructError::HostKindMismatch`] if any event comes from a different
///   host than the snapshot.
/// - [`ReconstructError::MalformedPayload`] if the snapshot lacks structure
///   needed for a facet (a Bitbucket pull request whose commit list was never synced).
pub fn reconstruct(
    snapshot: &Snapshot,
    events: &[ChangesetEvent],
) -> Result<ChangesetState, ReconstructError> {
    let history = History::for_host(snapshot.host_kind(), events)?;
    let samples = compute_history(snapshot, &history);

    let state = ChangesetState {
        external_state: compute_external_state(snapshot, &samples),
        review_state: compute_review_state(snapshot, &samples),
        check_state: compute_check_state(snapshot, &history)?,
        labels: compute_labels(Some(snapshot), &history),
    };

    debug!(
        host = %snapshot.host_kind(),
        events = history.len(),
        samples = samples.len(),
        external = %state.external_state,
        review = %state.review_state,
        check = %state.check_state,
        labels = state.labels.len(),
        "reconstructed changeset state"
    );
    Ok(state)
}

/// Lifecycle state: deletion first, then a sample newer than the snapshot,
/// then the snapshot itself.
#[must_use]
pub fn compute_external_state(snapshot: &Snapshot, samples: &[StateSample]) -> ExternalState {
    if snapshot.is_deleted() {
        return ExternalState::Deleted;
    }
    latest_after(samples, snapshot.updated_at).map_or_else(
        || snapshot.adapter().external_state(),
        |sample| sample.external_state,
    )
}

/// Review verdict.
///
/// GitHub snapshots carry no verdict, so the newest sample decides whatever
/// its age. Elsewhere a sample newer than the snapshot overrides the
/// snapshot's own verdict.
#[must_use]
pub fn compute_review_state(snapshot: &Snapshot, samples: &[StateSample]) -> ReviewState {
    match snapshot.adapter().review_state() {
        None => latest(samples).map(|sample| sample.review_state).unwrap_or_default(),
        Some(from_snapshot) => latest_after(samples, snapshot.updated_at)
            .map_or(from_snapshot, |sample| sample.review_state),
    }
}

/// Aggregate CI state from the snapshot plus events newer than it.
///
/// # Errors
///
/// Returns [`ReconstructError::MalformedPayload`] when the snapshot cannot be
/// projected (see [`reconstruct`]).
pub fn compute_check_state(
    snapshot: &Snapshot,
    history: &History<'_>,
) -> Result<CheckState, ReconstructError> {
    snapshot
        .adapter()
        .check_state(snapshot.updated_at, history)
}
