//! Typed payloads for each event kind.
//!
//! The discriminant is the [`EventKind`], stored next to the JSON payload
//! rather than inside it, so `EventPayload` has no `Deserialize` of its own.
//! Use [`EventPayload::deserialize_for`] with the known kind.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::kind::EventKind;
use crate::host::{bitbucket, github, gitlab};

/// Payloads that know when the host says they happened.
pub trait Timestamped {
    /// Receipt or creation time as reported by the host.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Error produced when a JSON payload does not match its event kind's schema.
#[derive(Debug)]
pub struct PayloadParseError {
    /// The event kind whose schema was expected.
    pub kind: EventKind,
    /// The underlying `serde_json` error.
    pub source: serde_json::Error,
}

impl fmt::Display for PayloadParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} payload: {}", self.kind, self.source)
    }
}

impl std::error::Error for PayloadParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

macro_rules! event_payloads {
    ($($variant:ident($data:ty)),+ $(,)?) => {
        /// Typed payload of a changeset event, one variant per [`EventKind`].
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum EventPayload {
            $($variant($data),)+
        }

        impl EventPayload {
            /// The kind this payload belongs to.
            #[must_use]
            pub const fn kind(&self) -> EventKind {
                match self {
                    $(Self::$variant(_) => EventKind::$variant,)+
                }
            }

            /// Deserialize a JSON value into the variant selected by `kind`.
            ///
            /// # Errors
            ///
            /// Returns a [`PayloadParseError`] if the JSON does not match the
            /// schema of the given kind.
            pub fn deserialize_for(
                kind: EventKind,
                value: serde_json::Value,
            ) -> Result<Self, PayloadParseError> {
                let result = match kind {
                    $(EventKind::$variant => {
                        serde_json::from_value::<$data>(value).map(Self::$variant)
                    })+
                };
                result.map_err(|source| PayloadParseError { kind, source })
            }
        }

        impl Timestamped for EventPayload {
            fn timestamp(&self) -> DateTime<Utc> {
                match self {
                    $(Self::$variant(data) => data.timestamp(),)+
                }
            }
        }

        impl Serialize for EventPayload {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self {
                    $(Self::$variant(data) => data.serialize(serializer),)+
                }
            }
        }
    };
}

event_payloads! {
    GitHubCommitStatus(github::CommitStatus),
    GitHubCheckSuite(github::CheckSuite),
    GitHubLabeled(github::LabelEvent),
    GitHubUnlabeled(github::LabelEvent),
    GitHubReviewed(github::Review),
    GitHubReviewDismissed(github::ReviewDismissed),
    GitHubClosed(github::TimelineEvent),
    GitHubReopened(github::TimelineEvent),
    GitHubMerged(github::TimelineEvent),
    GitHubConvertToDraft(github::TimelineEvent),
    GitHubReadyForReview(github::TimelineEvent),

    GitLabPipeline(gitlab::Pipeline),
    GitLabApproved(gitlab::SystemEvent),
    GitLabUnapproved(gitlab::SystemEvent),
    GitLabClosed(gitlab::SystemEvent),
    GitLabReopened(gitlab::SystemEvent),
    GitLabMerged(gitlab::SystemEvent),
    GitLabMarkWorkInProgress(gitlab::SystemEvent),
    GitLabUnmarkWorkInProgress(gitlab::SystemEvent),

    BitbucketServerCommitStatus(bitbucket::CommitStatus),
    BitbucketServerApproved(bitbucket::Activity),
    BitbucketServerUnapproved(bitbucket::Activity),
    BitbucketServerReviewed(bitbucket::Activity),
    BitbucketServerDismissed(bitbucket::Activity),
    BitbucketServerDeclined(bitbucket::Activity),
    BitbucketServerReopened(bitbucket::Activity),
    BitbucketServerMerged(bitbucket::Activity),
}
