//! Code host adapters.
//!
//! A [`Snapshot`] carries exactly one host payload ([`SnapshotPayload`]).
//! Each payload type implements [`HostAdapter`], the uniform capability set
//! the rest of the engine uses; dispatch happens once, in
//! [`Snapshot::adapter`].

pub mod bitbucket;
pub mod github;
pub mod gitlab;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReconstructError;
use crate::event::{EventPayload, History};
use crate::history::Transition;
use crate::model::{CheckState, ExternalState, HostKind, Label, RawState, ReviewState};

/// What the engine needs to know about a changeset from its host.
pub trait HostAdapter {
    fn kind(&self) -> HostKind;

    /// When the changeset was opened on the host.
    fn opened_at(&self) -> DateTime<Utc>;

    /// The host's own state word, mapped onto [`RawState`].
    fn raw_state(&self) -> RawState;

    fn is_draft(&self) -> bool;

    /// Canonical lifecycle according to the snapshot alone.
    fn external_state(&self) -> ExternalState {
        ExternalState::from_raw(self.raw_state(), self.is_draft())
    }

    /// Review verdict according to the snapshot alone.
    ///
    /// `None` means the host only reports reviews as events, so the snapshot
    /// has nothing to say.
    fn review_state(&self) -> Option<ReviewState>;

    /// Aggregate CI state from the snapshot plus events newer than
    /// `synced_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructError::MalformedPayload`] when the snapshot lacks
    /// structure the host's CI model depends on.
    fn check_state(
        &self,
        synced_at: DateTime<Utc>,
        history: &History<'_>,
    ) -> Result<CheckState, ReconstructError>;

    /// Labels according to the snapshot alone.
    fn labels(&self) -> Vec<Label>;

    /// What `event` means for the lifecycle fold, if anything.
    fn transition<'e>(&self, event: &'e EventPayload) -> Option<Transition<'e>>;
}

/// The host-specific part of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "host")]
pub enum SnapshotPayload {
    #[serde(rename = "github")]
    GitHub(github::PullRequest),
    #[serde(rename = "gitlab")]
    GitLab(gitlab::MergeRequest),
    #[serde(rename = "bitbucket_server")]
    BitbucketServer(bitbucket::PullRequest),
}

/// A changeset as last fetched from its code host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Sync boundary: events at or before this are already reflected here.
    pub updated_at: DateTime<Utc>,
    /// Set once the host reports the changeset no longer exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_deleted_at: Option<DateTime<Utc>>,
    pub metadata: SnapshotPayload,
}

impl Snapshot {
    /// Select the adapter for this snapshot's host.
    #[must_use]
    pub fn adapter(&self) -> &dyn HostAdapter {
        match &self.metadata {
            SnapshotPayload::GitHub(pr) => pr,
            SnapshotPayload::GitLab(mr) => mr,
            SnapshotPayload::BitbucketServer(pr) => pr,
        }
    }

    #[must_use]
    pub const fn host_kind(&self) -> HostKind {
        match self.metadata {
            SnapshotPayload::GitHub(_) => HostKind::GitHub,
            SnapshotPayload::GitLab(_) => HostKind::GitLab,
            SnapshotPayload::BitbucketServer(_) => HostKind::BitbucketServer,
        }
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.external_deleted_at.is_some()
    }
}
