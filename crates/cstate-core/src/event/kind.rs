//! Event kind enum covering every host event the engine understands.
//!
//! The string representation uses the `<host>:<verb>` format the sync layer
//! stores alongside each event payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::HostKind;

/// Kinds of host-emitted changeset events, grouped by host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GitHubCommitStatus,
    GitHubCheckSuite,
    GitHubLabeled,
    GitHubUnlabeled,
    GitHubReviewed,
    GitHubReviewDismissed,
    GitHubClosed,
    GitHubReopened,
    GitHubMerged,
    GitHubConvertToDraft,
    GitHubReadyForReview,

    GitLabPipeline,
    GitLabApproved,
    GitLabUnapproved,
    GitLabClosed,
    GitLabReopened,
    GitLabMerged,
    GitLabMarkWorkInProgress,
    GitLabUnmarkWorkInProgress,

    BitbucketServerCommitStatus,
    BitbucketServerApproved,
    BitbucketServerUnapproved,
    BitbucketServerReviewed,
    BitbucketServerDismissed,
    BitbucketServerDeclined,
    BitbucketServerReopened,
    BitbucketServerMerged,
}

/// Error returned when parsing an unknown event kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown event kind '{}': expected '<host>:<verb>', e.g. github:commit_status",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEventKind {}

impl EventKind {
    /// All known event kinds, GitHub first, then GitLab, then Bitbucket Server.
    pub const ALL: [Self; 27] = [
        Self::GitHubCommitStatus,
        Self::GitHubCheckSuite,
        Self::GitHubLabeled,
        Self::GitHubUnlabeled,
        Self::GitHubReviewed,
        Self::GitHubReviewDismissed,
        Self::GitHubClosed,
        Self::GitHubReopened,
        Self::GitHubMerged,
        Self::GitHubConvertToDraft,
        Self::GitHubReadyForReview,
        Self::GitLabPipeline,
        Self::GitLabApproved,
        Self::GitLabUnapproved,
        Self::GitLabClosed,
        Self::GitLabReopened,
        Self::GitLabMerged,
        Self::GitLabMarkWorkInProgress,
        Self::GitLabUnmarkWorkInProgress,
        Self::BitbucketServerCommitStatus,
        Self::BitbucketServerApproved,
        Self::BitbucketServerUnapproved,
        Self::BitbucketServerReviewed,
        Self::BitbucketServerDismissed,
        Self::BitbucketServerDeclined,
        Self::BitbucketServerReopened,
        Self::BitbucketServerMerged,
    ];

    /// Return the canonical `<host>:<verb>` string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitHubCommitStatus => "github:commit_status",
            Self::GitHubCheckSuite => "github:check_suite",
            Self::GitHubLabeled => "github:labeled",
            Self::GitHubUnlabeled => "github:unlabeled",
            Self::GitHubReviewed => "github:reviewed",
            Self::GitHubReviewDismissed => "github:review_dismissed",
            Self::GitHubClosed => "github:closed",
            Self::GitHubReopened => "github:reopened",
            Self::GitHubMerged => "github:merged",
            Self::GitHubConvertToDraft => "github:convert_to_draft",
            Self::GitHubReadyForReview => "github:ready_for_review",
            Self::GitLabPipeline => "gitlab:pipeline",
            Self::GitLabApproved => "gitlab:approved",
            Self::GitLabUnapproved => "gitlab:unapproved",
            Self::GitLabClosed => "gitlab:closed",
            Self::GitLabReopened => "gitlab:reopened",
            Self::GitLabMerged => "gitlab:merged",
            Self::GitLabMarkWorkInProgress => "gitlab:mark_wip",
            Self::GitLabUnmarkWorkInProgress => "gitlab:unmark_wip",
            Self::BitbucketServerCommitStatus => "bitbucketserver:commit_status",
            Self::BitbucketServerApproved => "bitbucketserver:approved",
            Self::BitbucketServerUnapproved => "bitbucketserver:unapproved",
            Self::BitbucketServerReviewed => "bitbucketserver:reviewed",
            Self::BitbucketServerDismissed => "bitbucketserver:participant_status:unapproved",
            Self::BitbucketServerDeclined => "bitbucketserver:declined",
            Self::BitbucketServerReopened => "bitbucketserver:reopened",
            Self::BitbucketServerMerged => "bitbucketserver:merged",
        }
    }

    /// The code host that emits events of this kind.
    #[must_use]
    pub const fn host(self) -> HostKind {
        match self {
            Self::GitHubCommitStatus
            | Self::GitHubCheckSuite
            | Self::GitHubLabeled
            | Self::GitHubUnlabeled
            | Self::GitHubReviewed
            | Self::GitHubReviewDismissed
            | Self::GitHubClosed
            | Self::GitHubReopened
            | Self::GitHubMerged
            | Self::GitHubConvertToDraft
            | Self::GitHubReadyForReview => HostKind::GitHub,
            Self::GitLabPipeline
            | Self::GitLabApproved
            | Self::GitLabUnapproved
            | Self::GitLabClosed
            | Self::GitLabReopened
            | Self::GitLabMerged
            | Self::GitLabMarkWorkInProgress
            | Self::GitLabUnmarkWorkInProgress => HostKind::GitLab,
            Self::BitbucketServerCommitStatus
            | Self::BitbucketServerApproved
            | Self::BitbucketServerUnapproved
            | Self::BitbucketServerReviewed
            | Self::BitbucketServerDismissed
            | Self::BitbucketServerDeclined
            | Self::BitbucketServerReopened
            | Self::BitbucketServerMerged => HostKind::BitbucketServer,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind { raw: s.to_string() })
    }
}

// Custom serde: serialize as the `<host>:<verb>` string.
impl Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
