use std::fmt;

use crate::event::EventKind;
use crate::model::HostKind;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InputParseError,
    ConfigParseError,
    HostKindMismatch,
    MalformedPayload,
    MissingCredentials,
    CredentialStoreFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InputParseError => "E1001",
            Self::ConfigParseError => "E1002",
            Self::HostKindMismatch => "E2001",
            Self::MalformedPayload => "E2002",
            Self::MissingCredentials => "E4001",
            Self::CredentialStoreFailed => "E4002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InputParseError => "Changeset input parse error",
            Self::ConfigParseError => "Config file parse error",
            Self::HostKindMismatch => "Event does not belong to the changeset's code host",
            Self::MalformedPayload => "Malformed code host payload",
            Self::MissingCredentials => "No credential found",
            Self::CredentialStoreFailed => "Credential store lookup failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InputParseError => Some("Check the snapshot/events JSON against the documented shape."),
            Self::ConfigParseError => Some("Fix syntax in .cstate/config.toml and retry."),
            Self::HostKindMismatch => {
                Some("Only pass events fetched from the same code host as the snapshot.")
            }
            Self::MalformedPayload => {
                Some("Re-fetch the changeset; the stored state is kept until the next sync.")
            }
            Self::MissingCredentials => {
                Some("Add a personal or site-wide credential for this code host.")
            }
            Self::CredentialStoreFailed => None,
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures that abort reconstruction of one changeset.
///
/// No partial result is ever returned alongside one of these; the caller keeps
/// the previously persisted state and retries on a later sync.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconstructError {
    /// An event was fetched from a different code host than the snapshot.
    #[error("event {kind} belongs to {found}, but the changeset is hosted on {expected}")]
    HostKindMismatch {
        expected: HostKind,
        found: HostKind,
        kind: EventKind,
    },

    /// A host payload is missing structure the projection depends on.
    #[error("malformed {host} payload: {reason}")]
    MalformedPayload { host: HostKind, reason: String },
}

impl ReconstructError {
    pub(crate) fn malformed(host: HostKind, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            host,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::HostKindMismatch { .. } => ErrorCode::HostKindMismatch,
            Self::MalformedPayload { .. } => ErrorCode::MalformedPayload,
        }
    }
}
