//! GitHub pull requests.
//!
//! The snapshot mirrors the GraphQL `PullRequest` shape we sync: state,
//! draft flag, labels and the head commit's status rollup. Review verdicts are
//! never read from the snapshot; they only exist as timeline events.
//!
//! CI arrives in two independent shapes, commit statuses (keyed by context)
//! and check suites (keyed by suite ID, with nested check runs). Both are
//! latest-wins per key, and a suite with no runs is ignored: GitHub creates
//! empty suites for every installed app, most of which never run anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::HostAdapter;
use crate::checks::{LatestByKey, combine};
use crate::error::ReconstructError;
use crate::event::{EventPayload, History, Timestamped};
use crate::history::Transition;
use crate::model::{CheckState, HostKind, Label, RawState, ReviewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub number: i64,
    pub state: PullRequestState,
    #[serde(default)]
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub head_commit: Option<Commit>,
}

/// The pull request's head commit with its status rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub oid: String,
    #[serde(default)]
    pub status_contexts: Vec<StatusContext>,
    #[serde(default)]
    pub check_suites: Vec<CheckSuite>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusContext {
    pub context: String,
    pub state: String,
}

/// A `status` webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    #[serde(default)]
    pub sha: String,
    pub context: String,
    pub state: String,
    pub received_at: DateTime<Utc>,
}

/// A check suite, either from the snapshot rollup or a `check_suite`
/// webhook delivery. Snapshot suites have no `received_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuite {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub conclusion: String,
    #[serde(default)]
    pub check_runs: Vec<CheckRun>,
    #[serde(default)]
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub conclusion: String,
}

/// `labeled` / `unlabeled` timeline item. The event kind says which.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEvent {
    #[serde(default)]
    pub actor: Option<String>,
    pub label: Label,
    pub created_at: DateTime<Utc>,
}

/// `PullRequestReview` timeline item.
///
/// GitHub rewrites the review's state to `DISMISSED` when it is dismissed,
/// so the separate dismissal item carries no extra information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub author: Option<String>,
    pub state: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDismissed {
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub review_author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Closed, reopened, merged and draft toggle timeline items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for CommitStatus {
    fn timestamp(&self) -> DateTime<Utc> {
        self.received_at
    }
}

impl Timestamped for CheckSuite {
    fn timestamp(&self) -> DateTime<Utc> {
        self.received_at
    }
}

impl Timestamped for LabelEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for Review {
    fn timestamp(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

impl Timestamped for ReviewDismissed {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for TimelineEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Map a commit status `state` onto a check signal.
#[must_use]
pub fn commit_status_state(state: &str) -> CheckState {
    match state.to_ascii_uppercase().as_str() {
        "SUCCESS" => CheckState::Passed,
        "ERROR" | "FAILURE" => CheckState::Failed,
        "PENDING" | "EXPECTED" => CheckState::Pending,
        _ => CheckState::Unknown,
    }
}

/// Map a check suite's `status` and `conclusion` onto a check signal.
#[must_use]
pub fn check_suite_state(status: &str, conclusion: &str) -> CheckState {
    match status.to_ascii_uppercase().as_str() {
        "QUEUED" | "IN_PROGRESS" | "REQUESTED" | "PENDING" | "WAITING" => {
            return CheckState::Pending;
        }
        "COMPLETED" => {}
        _ => return CheckState::Unknown,
    }

    match conclusion.to_ascii_uppercase().as_str() {
        "SUCCESS" | "NEUTRAL" | "SKIPPED" => CheckState::Passed,
        "FAILURE" | "TIMED_OUT" | "CANCELLED" | "ACTION_REQUIRED" | "STARTUP_FAILURE"
        | "STALE" => CheckState::Failed,
        _ => CheckState::Unknown,
    }
}

/// Map a review `state` onto a verdict. Comments and pending drafts are not
/// verdicts.
#[must_use]
pub fn review_verdict(state: &str) -> Option<ReviewState> {
    match state.to_ascii_uppercase().as_str() {
        "APPROVED" => Some(ReviewState::Approved),
        "CHANGES_REQUESTED" => Some(ReviewState::ChangesRequested),
        "DISMISSED" => Some(ReviewState::Dismissed),
        _ => None,
    }
}

impl CheckSuite {
    /// The suite's signal, or `None` for a suite without check runs.
    #[must_use]
    pub fn signal(&self) -> Option<CheckState> {
        if self.check_runs.is_empty() {
            return None;
        }
        Some(check_suite_state(&self.status, &self.conclusion))
    }
}

impl HostAdapter for PullRequest {
    fn kind(&self) -> HostKind {
        HostKind::GitHub
    }

    fn opened_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn raw_state(&self) -> RawState {
        match self.state {
            PullRequestState::Open => RawState::Open,
            PullRequestState::Closed => RawState::Closed,
            PullRequestState::Merged => RawState::Merged,
        }
    }

    fn is_draft(&self) -> bool {
        self.is_draft
    }

    fn review_state(&self) -> Option<ReviewState> {
        None
    }

    fn check_state(
        &self,
        synced_at: DateTime<Utc>,
        history: &History<'_>,
    ) -> Result<CheckState, ReconstructError> {
        let mut contexts = LatestByKey::default();
        let mut suites = LatestByKey::default();

        if let Some(commit) = &self.head_commit {
            for status in &commit.status_contexts {
                contexts.record(&status.context, commit_status_state(&status.state));
            }
            for suite in &commit.check_suites {
                if let Some(signal) = suite.signal() {
                    suites.record(&suite.id, signal);
                }
            }
        }

        for event in history.since(synced_at) {
            match &event.payload {
                EventPayload::GitHubCommitStatus(status) => {
                    contexts.record(&status.context, commit_status_state(&status.state));
                }
                EventPayload::GitHubCheckSuite(suite) => {
                    if let Some(signal) = suite.signal() {
                        suites.record(&suite.id, signal);
                    }
                }
                _ => {}
            }
        }

        Ok(combine(contexts.states().chain(suites.states())))
    }

    fn labels(&self) -> Vec<Label> {
        self.labels.clone()
    }

    fn transition<'e>(&self, event: &'e EventPayload) -> Option<Transition<'e>> {
        match event {
            EventPayload::GitHubClosed(_) => Some(Transition::Closed),
            EventPayload::GitHubMerged(_) => Some(Transition::Merged),
            EventPayload::GitHubReopened(_) => Some(Transition::Reopened),
            EventPayload::GitHubConvertToDraft(_) => Some(Transition::ConvertToDraft),
            EventPayload::GitHubReadyForReview(_) => Some(Transition::ReadyForReview),
            EventPayload::GitHubReviewed(review) => {
                review_verdict(&review.state).map(|state| Transition::Review {
                    author: review.author.as_deref(),
                    state,
                })
            }
            _ => None,
        }
    }
}
