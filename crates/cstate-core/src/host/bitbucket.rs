//! Bitbucket Server pull requests.
//!
//! Bitbucket timestamps are epoch milliseconds. Build statuses are attached
//! to commits, not to the pull request, so only statuses on the current head
//! commit count; statuses from superseded pushes are stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::HostAdapter;
use crate::checks::LatestByKey;
use crate::error::ReconstructError;
use crate::event::{EventPayload, History, Timestamped};
use crate::history::Transition;
use crate::model::{CheckState, HostKind, Label, RawState, ReviewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestState {
    Open,
    Declined,
    Merged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub id: i64,
    pub state: PullRequestState,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_date: DateTime<Utc>,
    /// Required for check state; `None` means the sync never fetched them.
    #[serde(default)]
    pub commits: Option<Vec<Commit>>,
    #[serde(default)]
    pub reviewers: Vec<Reviewer>,
    #[serde(default)]
    pub commit_statuses: Vec<CommitStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds")]
    pub committer_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub user: User,
    pub status: String,
}

/// A build status reported against one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub commit: String,
    pub status: BuildStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatus {
    pub state: String,
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date_added: DateTime<Utc>,
}

/// Pull request activity: approvals, reviews, declines, reopens and merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_date: DateTime<Utc>,
}

impl Timestamped for CommitStatus {
    fn timestamp(&self) -> DateTime<Utc> {
        self.status.date_added
    }
}

impl Timestamped for Activity {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_date
    }
}

#[must_use]
pub fn build_state(state: &str) -> CheckState {
    match state.to_ascii_uppercase().as_str() {
        "SUCCESSFUL" => CheckState::Passed,
        "INPROGRESS" => CheckState::Pending,
        "FAILED" => CheckState::Failed,
        _ => CheckState::Unknown,
    }
}

#[must_use]
pub fn reviewer_verdict(status: &str) -> Option<ReviewState> {
    match status.to_ascii_uppercase().as_str() {
        "NEEDS_WORK" => Some(ReviewState::ChangesRequested),
        "APPROVED" => Some(ReviewState::Approved),
        _ => None,
    }
}

impl PullRequest {
    /// The commit with the newest committer timestamp; the last listed one
    /// on ties. `None` when the pull request has no commits at all.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructError::MalformedPayload`] if the commit list was
    /// never synced.
    pub fn head_commit(&self) -> Result<Option<&Commit>, ReconstructError> {
        let commits = self.commits.as_deref().ok_or_else(|| {
            ReconstructError::malformed(HostKind::BitbucketServer, "pull request has no commit list")
        })?;
        Ok(commits.iter().max_by_key(|commit| commit.committer_timestamp))
    }
}

impl Activity {
    fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.name.as_str())
    }
}

impl HostAdapter for PullRequest {
    fn kind(&self) -> HostKind {
        HostKind::BitbucketServer
    }

    fn opened_at(&self) -> DateTime<Utc> {
        self.created_date
    }

    fn raw_state(&self) -> RawState {
        match self.state {
            PullRequestState::Open => RawState::Open,
            PullRequestState::Declined => RawState::Closed,
            PullRequestState::Merged => RawState::Merged,
        }
    }

    fn is_draft(&self) -> bool {
        false
    }

    fn review_state(&self) -> Option<ReviewState> {
        Some(ReviewState::reduce(
            self.reviewers
                .iter()
                .filter_map(|reviewer| reviewer_verdict(&reviewer.status)),
        ))
    }

    fn check_state(
        &self,
        synced_at: DateTime<Utc>,
        history: &History<'_>,
    ) -> Result<CheckState, ReconstructError> {
        let Some(head) = self.head_commit()?.map(|commit| &commit.id) else {
            return Ok(CheckState::Unknown);
        };
        let mut builds = LatestByKey::default();

        let events = history.since(synced_at).filter_map(|event| match &event.payload {
            EventPayload::BitbucketServerCommitStatus(status) => Some(status),
            _ => None,
        });
        for status in self.commit_statuses.iter().chain(events) {
            if &status.commit == head {
                builds.record(&status.status.key, build_state(&status.status.state));
            }
        }

        Ok(builds.combined())
    }

    fn labels(&self) -> Vec<Label> {
        Vec::new()
    }

    fn transition<'e>(&self, event: &'e EventPayload) -> Option<Transition<'e>> {
        match event {
            EventPayload::BitbucketServerApproved(activity) => Some(Transition::Review {
                author: activity.author(),
                state: ReviewState::Approved,
            }),
            EventPayload::BitbucketServerReviewed(activity) => Some(Transition::Review {
                author: activity.author(),
                state: ReviewState::ChangesRequested,
            }),
            EventPayload::BitbucketServerUnapproved(activity)
            | EventPayload::BitbucketServerDismissed(activity) => Some(Transition::Retract {
                author: activity.author(),
            }),
            EventPayload::BitbucketServerDeclined(_) => Some(Transition::Closed),
            EventPayload::BitbucketServerReopened(_) => Some(Transition::Reopened),
            EventPayload::BitbucketServerMerged(_) => Some(Transition::Merged),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangesetEvent;
    use chrono::{Duration, TimeZone};

    const SHA: &str = "abcdef";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn status(commit: &str, key: &str, state: &str) -> CommitStatus {
        CommitStatus {
            commit: commit.to_string(),
            status: BuildStatus {
                state: state.to_string(),
                key: key.to_string(),
                name: String::new(),
                url: String::new(),
                date_added: now() + Duration::seconds(1),
            },
        }
    }

    fn status_event(key: &str, state: &str) -> ChangesetEvent {
        ChangesetEvent::new(EventPayload::BitbucketServerCommitStatus(status(
            SHA, key, state,
        )))
    }

    fn pull_request() -> PullRequest {
        PullRequest {
            id: 1,
            state: PullRequestState::Open,
            created_date: now() - Duration::days(3),
            commits: Some(vec![Commit {
                id: SHA.to_string(),
                committer_timestamp: now() - Duration::days(1),
            }]),
            reviewers: Vec::new(),
            commit_statuses: Vec::new(),
        }
    }

    fn check_state(pr: &PullRequest, events: &[ChangesetEvent]) -> CheckState {
        let history =
            History::for_host(HostKind::BitbucketServer, events).expect("bitbucket events");
        pr.check_state(now() - Duration::minutes(1), &history)
            .expect("check state")
    }

    #[test]
    fn build_status_table() {
        let pr = pull_request();
        let cases: Vec<(&str, Vec<ChangesetEvent>, CheckState)> = vec![
            ("empty slice", vec![], CheckState::Unknown),
            (
                "single success",
                vec![status_event("ctx1", "SUCCESSFUL")],
                CheckState::Passed,
            ),
            (
                "single pending",
                vec![status_event("ctx1", "INPROGRESS")],
                CheckState::Pending,
            ),
            (
                "single error",
                vec![status_event("ctx1", "FAILED")],
                CheckState::Failed,
            ),
            (
                "pending + error",
                vec![status_event("ctx1", "INPROGRESS"), status_event("ctx2", "FAILED")],
                CheckState::Pending,
            ),
            (
                "pending + success",
                vec![
                    status_event("ctx1", "INPROGRESS"),
                    status_event("ctx2", "SUCCESSFUL"),
                ],
                CheckState::Pending,
            ),
            (
                "success + error",
                vec![status_event("ctx1", "SUCCESSFUL"), status_event("ctx2", "FAILED")],
                CheckState::Failed,
            ),
            (
                "success x2",
                vec![
                    status_event("ctx1", "SUCCESSFUL"),
                    status_event("ctx2", "SUCCESSFUL"),
                ],
                CheckState::Passed,
            ),
            (
                "later events have precedence",
                vec![
                    status_event("ctx1", "INPROGRESS"),
                    status_event("ctx1", "SUCCESSFUL"),
                ],
                CheckState::Passed,
            ),
        ];

        for (name, events, want) in cases {
            assert_eq!(check_state(&pr, &events), want, "case: {name}");
        }
    }

    #[test]
    fn statuses_on_stale_commits_are_ignored() {
        let mut pr = pull_request();
        pr.commit_statuses = vec![status("0ld5ha", "ctx1", "FAILED")];
        let stale = ChangesetEvent::new(EventPayload::BitbucketServerCommitStatus(status(
            "0ld5ha", "ctx2", "INPROGRESS",
        )));
        assert_eq!(check_state(&pr, &[stale]), CheckState::Unknown);
    }

    #[test]
    fn head_is_newest_commit() {
        let mut pr = pull_request();
        pr.commits = Some(vec![
            Commit {
                id: "newer".to_string(),
                committer_timestamp: now(),
            },
            Commit {
                id: SHA.to_string(),
                committer_timestamp: now() - Duration::days(1),
            },
        ]);
        assert_eq!(
            pr.head_commit().map(|c| c.map(|c| c.id.as_str())),
            Ok(Some("newer"))
        );
        assert_eq!(check_state(&pr, &[status_event("ctx1", "FAILED")]), CheckState::Unknown);
    }

    #[test]
    fn missing_commits_is_malformed() {
        let mut pr = pull_request();
        pr.commits = None;
        let history = History::default();
        let err = pr.check_state(now(), &history).unwrap_err();
        assert!(matches!(
            err,
            ReconstructError::MalformedPayload {
                host: HostKind::BitbucketServer,
                ..
            }
        ));
    }

    #[test]
    fn empty_commit_list_has_unknown_checks() {
        let mut pr = pull_request();
        pr.commits = Some(Vec::new());
        pr.commit_statuses = vec![status("abc", "ctx1", "FAILED")];
        assert_eq!(pr.head_commit(), Ok(None));
        assert_eq!(
            check_state(&pr, &[status_event("ctx1", "INPROGRESS")]),
            CheckState::Unknown
        );
    }

    #[test]
    fn needs_work_dominates_approval() {
        let reviewer = |name: &str, status: &str| Reviewer {
            user: User {
                name: name.to_string(),
            },
            status: status.to_string(),
        };
        let mut pr = pull_request();
        pr.reviewers = vec![
            reviewer("alice", "APPROVED"),
            reviewer("bob", "NEEDS_WORK"),
            reviewer("carol", "UNAPPROVED"),
        ];
        assert_eq!(pr.review_state(), Some(ReviewState::ChangesRequested));

        pr.reviewers.remove(1);
        assert_eq!(pr.review_state(), Some(ReviewState::Approved));

        pr.reviewers.clear();
        assert_eq!(pr.review_state(), Some(ReviewState::Pending));
    }

    #[test]
    fn declined_maps_to_closed() {
        let mut pr = pull_request();
        pr.state = PullRequestState::Declined;
        assert_eq!(
            pr.external_state(),
            crate::model::ExternalState::Closed
        );
    }
}
