//! cstate-core library.
//!
//! Reconstructs the canonical state of a code review changeset (pull or merge
//! request) from the last snapshot fetched from its code host and the events
//! observed since. GitHub, GitLab and Bitbucket Server are supported.
//!
//! ```text
//! Snapshot ──┐
//!            ├─ History::for_host ─┬─ compute_history ─┬─ external state
//! events ────┘                     │                   └─ review state
//!                                  ├─ check_state ────── check state
//!                                  └─ compute_labels ─── labels
//! ```
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums for engine failures, `anyhow::Result` for
//!   configuration loading.
//! - **Logging**: `tracing` macros only; the binary installs the subscriber.
//! - **Purity**: no I/O outside [`config`]; inputs are never mutated.

pub mod checks;
pub mod config;
pub mod credentials;
pub mod error;
pub mod event;
pub mod history;
pub mod host;
pub mod labels;
pub mod model;
pub mod reconstruct;

pub use error::{ErrorCode, ReconstructError};
pub use event::{ChangesetEvent, EventKind, EventPayload, History};
pub use history::{StateSample, compute_history};
pub use host::{HostAdapter, Snapshot, SnapshotPayload};
pub use labels::compute_labels;
pub use model::{CheckState, ExternalState, HostKind, Label, ReviewState};
pub use reconstruct::{
    ChangesetState, compute_check_state, compute_external_state, compute_review_state,
    reconstruct,
};
