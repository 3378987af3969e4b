//! History folding: derive point-in-time state samples from events.
//!
//! There is no stored state machine. Each call starts from the state the
//! changeset had when it was opened and folds its events oldest first,
//! emitting a [`StateSample`] every time the canonical external or review
//! state changes. Resolution then only has to ask "is there a sample newer
//! than the snapshot?" (see [`latest_after`]).
//!
//! The snapshot is authoritative as of `updated_at`. Before folding the first
//! event newer than that, the lifecycle state is reset to the snapshot's, so
//! a review landing on a closed changeset cannot resurrect the state the
//! fold had guessed from older events.
//!
//! # Transitions
//!
//! | Transition        | Effect                                          |
//! |-------------------|-------------------------------------------------|
//! | `Closed`          | `Closed`, unless already `Merged`               |
//! | `Merged`          | `Merged`                                        |
//! | `Reopened`        | `Open`, unless already `Merged`                 |
//! | `ConvertToDraft`  | `Open -> Draft` only                            |
//! | `ReadyForReview`  | `Draft -> Open` only                            |
//! | `Review`          | record the author's verdict, `Dismissed` clears |
//! | `Retract`         | clear the author's verdict                      |

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::event::History;
use crate::host::{HostAdapter, Snapshot};
use crate::model::{ExternalState, ReviewState};

/// Canonical state of a changeset as of `at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSample {
    pub at: DateTime<Utc>,
    pub external_state: ExternalState,
    pub review_state: ReviewState,
}

/// Host-independent meaning of one event for the lifecycle fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<'a> {
    Closed,
    Merged,
    Reopened,
    ConvertToDraft,
    ReadyForReview,
    /// A reviewer submitted a verdict. `None` authors are deleted accounts.
    Review {
        author: Option<&'a str>,
        state: ReviewState,
    },
    /// A reviewer withdrew whatever verdict they had given.
    Retract { author: Option<&'a str> },
}

/// Fold `history` into state samples, oldest first.
///
/// The first sample is always the state at the snapshot's creation time. A
/// sample at `updated_at` is added when the snapshot disagrees with the fold
/// at that point and newer events follow.
#[must_use]
pub fn compute_history(snapshot: &Snapshot, history: &History<'_>) -> Vec<StateSample> {
    let adapter = snapshot.adapter();
    let mut fold = Fold {
        samples: Vec::new(),
        external: initial_external_state(adapter, history),
        review: ReviewState::Pending,
        verdicts: BTreeMap::new(),
    };
    fold.push(adapter.opened_at());

    let mut anchored = false;
    for event in history.iter() {
        let at = event.timestamp();
        if at == DateTime::<Utc>::UNIX_EPOCH {
            trace!(kind = %event.kind(), "skipping event without a timestamp");
            continue;
        }
        let Some(transition) = adapter.transition(&event.payload) else {
            continue;
        };
        if !anchored && at > snapshot.updated_at {
            fold.anchor(snapshot.updated_at, adapter.external_state());
            anchored = true;
        }
        fold.apply(at, transition);
    }

    fold.samples
}

/// The newest sample strictly after `boundary`, if any.
///
/// Samples at or before the boundary are already reflected in the snapshot
/// taken at the boundary.
#[must_use]
pub fn latest_after(samples: &[StateSample], boundary: DateTime<Utc>) -> Option<&StateSample> {
    samples
        .iter()
        .filter(|sample| sample.at > boundary)
        .max_by_key(|sample| sample.at)
}

/// The newest sample regardless of the snapshot boundary.
#[must_use]
pub fn latest(samples: &[StateSample]) -> Option<&StateSample> {
    samples.iter().max_by_key(|sample| sample.at)
}

/// Work out whether the changeset started out as a draft.
///
/// The snapshot's draft flag describes *now*, so walk back from the newest
/// event: the most recent draft toggle tells us which side of it we started
/// on.
fn initial_external_state(adapter: &dyn HostAdapter, history: &History<'_>) -> ExternalState {
    for event in history.iter().rev() {
        match adapter.transition(&event.payload) {
            Some(Transition::ReadyForReview) => return ExternalState::Draft,
            Some(Transition::ConvertToDraft) => return ExternalState::Open,
            _ => {}
        }
    }
    if adapter.is_draft() {
        ExternalState::Draft
    } else {
        ExternalState::Open
    }
}

struct Fold<'a> {
    samples: Vec<StateSample>,
    external: ExternalState,
    review: ReviewState,
    verdicts: BTreeMap<&'a str, ReviewState>,
}

impl<'a> Fold<'a> {
    fn push(&mut self, at: DateTime<Utc>) {
        self.samples.push(StateSample {
            at,
            external_state: self.external,
            review_state: self.review,
        });
    }

    fn anchor(&mut self, at: DateTime<Utc>, external: ExternalState) {
        if external != self.external {
            trace!(from = %self.external, to = %external, "snapshot overrides folded state");
            self.external = external;
            self.push(at);
        }
    }

    fn apply(&mut self, at: DateTime<Utc>, transition: Transition<'a>) {
        match transition {
            Transition::Closed => {
                // Merged is final.
                if self.external != ExternalState::Merged {
                    self.external = ExternalState::Closed;
                    self.push(at);
                }
            }
            Transition::Merged => {
                self.external = ExternalState::Merged;
                self.push(at);
            }
            Transition::Reopened => {
                if self.external != ExternalState::Merged {
                    self.external = ExternalState::Open;
                    self.push(at);
                }
            }
            Transition::ConvertToDraft => {
                if self.external == ExternalState::Open {
                    self.external = ExternalState::Draft;
                    self.push(at);
                }
            }
            Transition::ReadyForReview => {
                if self.external == ExternalState::Draft {
                    self.external = ExternalState::Open;
                    self.push(at);
                }
            }
            Transition::Review { author, state } => {
                let Some(author) = author else {
                    trace!("skipping review by deleted user");
                    return;
                };
                match state {
                    ReviewState::Approved | ReviewState::ChangesRequested => {
                        self.verdicts.insert(author, state);
                    }
                    ReviewState::Dismissed => {
                        self.verdicts.remove(author);
                    }
                    ReviewState::Pending => return,
                }
                self.rereduce(at);
            }
            Transition::Retract { author } => {
                let Some(author) = author else {
                    return;
                };
                self.verdicts.remove(author);
                self.rereduce(at);
            }
        }
    }

    fn rereduce(&mut self, at: DateTime<Utc>) {
        let reduced = ReviewState::reduce(self.verdicts.values().copied());
        if reduced != self.review {
            self.review = reduced;
            self.push(at);
        }
    }
}
