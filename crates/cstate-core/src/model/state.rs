use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Which code host a changeset lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostKind {
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "gitlab")]
    GitLab,
    #[serde(rename = "bitbucket_server")]
    BitbucketServer,
}

impl HostKind {
    pub const ALL: [Self; 3] = [Self::GitHub, Self::GitLab, Self::BitbucketServer];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::BitbucketServer => "bitbucket_server",
        }
    }
}

/// The host-independent lifecycle of a changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalState {
    Open,
    Closed,
    Merged,
    Draft,
    Deleted,
}

impl ExternalState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
            Self::Draft => "draft",
            Self::Deleted => "deleted",
        }
    }

    /// Project a host's raw state vocabulary onto the canonical lifecycle.
    ///
    /// Terminal states win over the draft flag: a closed draft is closed.
    #[must_use]
    pub const fn from_raw(raw: RawState, draft: bool) -> Self {
        match raw {
            RawState::Merged => Self::Merged,
            RawState::Closed | RawState::Locked => Self::Closed,
            RawState::Open if draft => Self::Draft,
            RawState::Open => Self::Open,
        }
    }
}

/// The common denominator of the hosts' own open/closed/merged/locked words.
///
/// Each adapter maps its protocol-specific state onto this before the
/// canonical projection in [`ExternalState::from_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawState {
    Open,
    Closed,
    Merged,
    Locked,
}

/// Aggregate code review verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    #[default]
    Pending,
    Approved,
    ChangesRequested,
    Dismissed,
}

impl ReviewState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
            Self::Dismissed => "dismissed",
        }
    }

    /// Reduce a set of reviewer verdicts to one.
    ///
    /// Any request for changes wins, then any approval, else pending.
    /// Dismissed and pending verdicts carry no weight here.
    pub fn reduce<I>(verdicts: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut approved = false;
        for verdict in verdicts {
            match verdict {
                Self::ChangesRequested => return Self::ChangesRequested,
                Self::Approved => approved = true,
                Self::Pending | Self::Dismissed => {}
            }
        }
        if approved { Self::Approved } else { Self::Pending }
    }
}

/// Aggregate CI verdict.
///
/// Variant order is the urgency order used when combining signals:
/// `Unknown < Passed < Failed < Pending`, so the combined state of a set of
/// signals is simply its maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    #[default]
    Unknown,
    Passed,
    Failed,
    Pending,
}

impl CheckState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

macro_rules! impl_text_enum {
    ($ty:ty, $expected:literal, [$($variant:ident),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                $(
                    if normalized == <$ty>::$variant.as_str() {
                        return Ok(<$ty>::$variant);
                    }
                )+
                Err(ParseEnumError {
                    expected: $expected,
                    got: s.to_string(),
                })
            }
        }
    };
}

impl_text_enum!(HostKind, "host kind", [GitHub, GitLab, BitbucketServer]);
impl_text_enum!(
    ExternalState,
    "external state",
    [Open, Closed, Merged, Draft, Deleted]
);
impl_text_enum!(
    ReviewState,
    "review state",
    [Pending, Approved, ChangesRequested, Dismissed]
);
impl_text_enum!(CheckState, "check state", [Unknown, Passed, Failed, Pending]);
