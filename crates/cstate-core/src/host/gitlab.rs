//! GitLab merge requests.
//!
//! GitLab has no structured review API on the tiers we sync, so approvals are
//! read from system notes. Draft status is the `work_in_progress` flag (newer
//! API versions call it `draft`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::HostAdapter;
use crate::error::ReconstructError;
use crate::event::{EventPayload, History, Timestamped};
use crate::history::Transition;
use crate::model::{CheckState, HostKind, Label, RawState, ReviewState};

/// System note body GitLab writes when someone approves.
pub const APPROVED_NOTE: &str = "approved this merge request";
/// System note body GitLab writes when someone withdraws their approval.
pub const UNAPPROVED_NOTE: &str = "unapproved this merge request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeRequestState {
    Opened,
    Closed,
    Locked,
    Merged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    #[serde(default)]
    pub iid: i64,
    pub state: MergeRequestState,
    #[serde(default, alias = "draft")]
    pub work_in_progress: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub head_pipeline: Option<Pipeline>,
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub author: Option<String>,
    pub body: String,
    #[serde(default)]
    pub system: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Created,
    WaitingForResource,
    Preparing,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
    Scheduled,
    #[serde(other)]
    Unknown,
}

impl PipelineStatus {
    #[must_use]
    pub const fn check_state(self) -> CheckState {
        match self {
            Self::Success => CheckState::Passed,
            Self::Failed | Self::Canceled => CheckState::Failed,
            Self::Created
            | Self::WaitingForResource
            | Self::Preparing
            | Self::Pending
            | Self::Running => CheckState::Pending,
            Self::Skipped | Self::Manual | Self::Scheduled | Self::Unknown => {
                CheckState::Unknown
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub id: i64,
    pub status: PipelineStatus,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

/// Payload shared by the note-derived events (approvals, state changes,
/// draft toggles).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvent {
    #[serde(default)]
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for Pipeline {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for SystemEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Note {
    fn is_system(&self, body: &str) -> bool {
        self.system && self.body.trim() == body
    }
}

impl MergeRequest {
    /// The pipeline with the newest `created_at` out of the head pipeline, the
    /// pipeline list and pipeline events newer than `synced_at`. On equal
    /// timestamps the first one seen is kept.
    #[must_use]
    pub fn latest_pipeline<'a>(
        &'a self,
        synced_at: DateTime<Utc>,
        history: &History<'a>,
    ) -> Option<&'a Pipeline> {
        let events = history.since(synced_at).filter_map(|event| match &event.payload {
            EventPayload::GitLabPipeline(pipeline) => Some(pipeline),
            _ => None,
        });

        self.head_pipeline
            .iter()
            .chain(&self.pipelines)
            .chain(events)
            .fold(None, |current: Option<&Pipeline>, candidate| match current {
                Some(current) if candidate.created_at <= current.created_at => Some(current),
                _ => Some(candidate),
            })
    }
}

impl HostAdapter for MergeRequest {
    fn kind(&self) -> HostKind {
        HostKind::GitLab
    }

    fn opened_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn raw_state(&self) -> RawState {
        match self.state {
            MergeRequestState::Opened => RawState::Open,
            MergeRequestState::Closed => RawState::Closed,
            MergeRequestState::Locked => RawState::Locked,
            MergeRequestState::Merged => RawState::Merged,
        }
    }

    fn is_draft(&self) -> bool {
        self.work_in_progress
    }

    fn review_state(&self) -> Option<ReviewState> {
        // An unapproval anywhere in the notes wins over any approval, even a
        // later one.
        if self.notes.iter().any(|note| note.is_system(UNAPPROVED_NOTE)) {
            return Some(ReviewState::ChangesRequested);
        }
        if self.notes.iter().any(|note| note.is_system(APPROVED_NOTE)) {
            return Some(ReviewState::Approved);
        }
        Some(ReviewState::Pending)
    }

    fn check_state(
        &self,
        synced_at: DateTime<Utc>,
        history: &History<'_>,
    ) -> Result<CheckState, ReconstructError> {
        Ok(self
            .latest_pipeline(synced_at, history)
            .map_or(CheckState::Unknown, |pipeline| pipeline.status.check_state()))
    }

    fn labels(&self) -> Vec<Label> {
        self.labels.iter().map(|name| Label::named(name)).collect()
    }

    fn transition<'e>(&self, event: &'e EventPayload) -> Option<Transition<'e>> {
        match event {
            EventPayload::GitLabApproved(system) => Some(Transition::Review {
                author: system.author.as_deref(),
                state: ReviewState::Approved,
            }),
            EventPayload::GitLabUnapproved(system) => Some(Transition::Retract {
                author: system.author.as_deref(),
            }),
            EventPayload::GitLabClosed(_) => Some(Transition::Closed),
            EventPayload::GitLabReopened(_) => Some(Transition::Reopened),
            EventPayload::GitLabMerged(_) => Some(Transition::Merged),
            EventPayload::GitLabMarkWorkInProgress(_) => Some(Transition::ConvertToDraft),
            EventPayload::GitLabUnmarkWorkInProgress(_) => Some(Transition::ReadyForReview),
            _ => None,
        }
    }
}
