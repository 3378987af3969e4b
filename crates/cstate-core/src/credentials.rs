//! Credential resolution for fetching changesets from a code host.
//!
//! The sync layer needs a credential before it can fetch a snapshot. Lookup
//! order for a user is their own credential, then the site-wide credential,
//! then (site admins only) the token configured on the external service that
//! mirrors the repository.
//!
//! Storage lives behind [`CredentialStore`]; nothing here does I/O.

use std::cmp::Reverse;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::HostKind;

/// A secret used to authenticate against a code host.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Authenticator {
    /// Personal access token or OAuth bearer token.
    Token { token: String },
    /// Username and password (or app password, on Bitbucket Server).
    Basic { username: String, password: String },
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { .. } => f.debug_struct("Token").field("token", &"<redacted>").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    User,
    Site,
    /// The token of the external service that syncs the repository.
    ExternalService { id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub source: CredentialSource,
    pub authenticator: Authenticator,
}

/// The repository a changeset belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub name: String,
    pub host: HostKind,
    /// Base URL of the code host instance.
    pub service_id: String,
    /// External services that mirror this repository.
    #[serde(default)]
    pub external_service_ids: Vec<i64>,
}

/// A configured code host connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalService {
    pub id: i64,
    pub host: HostKind,
    /// Owning user for user-added connections; `None` for site-owned ones.
    #[serde(default)]
    pub namespace_user_id: Option<i32>,
    #[serde(default)]
    pub token: String,
}

impl ExternalService {
    #[must_use]
    pub const fn is_site_owned(&self) -> bool {
        self.namespace_user_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("no credential found")]
    Missing,

    #[error("no external service with a token found for repo {repo:?}")]
    NoExternalService { repo: String },

    #[error("credential store lookup failed: {0}")]
    Store(String),
}

impl CredentialError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Missing | Self::NoExternalService { .. } => ErrorCode::MissingCredentials,
            Self::Store(_) => ErrorCode::CredentialStoreFailed,
        }
    }
}

/// Read access to stored credentials and external services.
///
/// "Not found" is `Ok(None)`; `Err` is reserved for store failures.
pub trait CredentialStore {
    /// The user's own credential for the repository's code host.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Store`] if the lookup itself fails.
    fn user_credential(
        &self,
        user_id: i32,
        repo: &RepoRef,
    ) -> Result<Option<Authenticator>, CredentialError>;

    /// The site-wide credential for the repository's code host.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Store`] if the lookup itself fails.
    fn site_credential(&self, repo: &RepoRef) -> Result<Option<Authenticator>, CredentialError>;

    /// # Errors
    ///
    /// Returns [`CredentialError::Store`] if the user cannot be loaded.
    fn is_site_admin(&self, user_id: i32) -> Result<bool, CredentialError>;

    /// The external services listed in `repo.external_service_ids`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Store`] if the lookup itself fails.
    fn external_services(&self, repo: &RepoRef) -> Result<Vec<ExternalService>, CredentialError>;
}

/// Resolve the credential to act as `user_id` on `repo`.
///
/// # Errors
///
/// - [`CredentialError::Missing`] if the user has no credential, there is no
///   site credential, and the user is not a site admin.
/// - [`CredentialError::NoExternalService`] if a site admin falls through to
///   the external service token and none is configured.
/// - [`CredentialError::Store`] on store failures.
pub fn resolve_for_user<S>(
    store: &S,
    user_id: i32,
    repo: &RepoRef,
) -> Result<ResolvedCredential, CredentialError>
where
    S: CredentialStore + ?Sized,
{
    if let Some(authenticator) = store.user_credential(user_id, repo)? {
        return Ok(ResolvedCredential {
            source: CredentialSource::User,
            authenticator,
        });
    }
    if let Some(authenticator) = store.site_credential(repo)? {
        return Ok(ResolvedCredential {
            source: CredentialSource::Site,
            authenticator,
        });
    }
    if store.is_site_admin(user_id)? {
        return external_service_credential(store, repo);
    }
    Err(CredentialError::Missing)
}

/// Resolve the credential for background syncing of `repo`.
///
/// # Errors
///
/// - [`CredentialError::NoExternalService`] if there is no site credential and
///   no external service token.
/// - [`CredentialError::Store`] on store failures.
pub fn resolve_for_site<S>(store: &S, repo: &RepoRef) -> Result<ResolvedCredential, CredentialError>
where
    S: CredentialStore + ?Sized,
{
    if let Some(authenticator) = store.site_credential(repo)? {
        return Ok(ResolvedCredential {
            source: CredentialSource::Site,
            authenticator,
        });
    }
    external_service_credential(store, repo)
}

/// Pick the external service whose token is used for a repository.
///
/// Site-owned services come before user-owned ones, newer (higher ID) before
/// older. The first one with a token wins.
#[must_use]
pub fn select_external_service(services: &[ExternalService]) -> Option<&ExternalService> {
    let mut ordered: Vec<&ExternalService> = services.iter().collect();
    ordered.sort_by_key(|service| (!service.is_site_owned(), Reverse(service.id)));
    ordered.into_iter().find(|service| !service.token.is_empty())
}

fn external_service_credential<S>(
    store: &S,
    repo: &RepoRef,
) -> Result<ResolvedCredential, CredentialError>
where
    S: CredentialStore + ?Sized,
{
    let services = store.external_services(repo)?;
    let service =
        select_external_service(&services).ok_or_else(|| CredentialError::NoExternalService {
            repo: repo.name.clone(),
        })?;
    Ok(ResolvedCredential {
        source: CredentialSource::ExternalService { id: service.id },
        authenticator: Authenticator::Token {
            token: service.token.clone(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeStore {
        user: HashMap<i32, Authenticator>,
        site: Option<Authenticator>,
        admins: Vec<i32>,
        services: Vec<ExternalService>,
        broken: bool,
    }

    impl CredentialStore for FakeStore {
        fn user_credential(
            &self,
            user_id: i32,
            _repo: &RepoRef,
        ) -> Result<Option<Authenticator>, CredentialError> {
            if self.broken {
                return Err(CredentialError::Store("connection reset".to_string()));
            }
            Ok(self.user.get(&user_id).cloned())
        }

        fn site_credential(
            &self,
            _repo: &RepoRef,
        ) -> Result<Option<Authenticator>, CredentialError> {
            Ok(self.site.clone())
        }

        fn is_site_admin(&self, user_id: i32) -> Result<bool, CredentialError> {
            Ok(self.admins.contains(&user_id))
        }

        fn external_services(
            &self,
            _repo: &RepoRef,
        ) -> Result<Vec<ExternalService>, CredentialError> {
            Ok(self.services.clone())
        }
    }

    fn repo() -> RepoRef {
        RepoRef {
            name: "github.com/acme/widgets".to_string(),
            host: HostKind::GitHub,
            service_id: "https://github.com/".to_string(),
            external_service_ids: vec![1, 2, 3],
        }
    }

    fn token(value: &str) -> Authenticator {
        Authenticator::Token {
            token: value.to_string(),
        }
    }

    fn service(id: i64, owner: Option<i32>, token: &str) -> ExternalService {
        ExternalService {
            id,
            host: HostKind::GitHub,
            namespace_user_id: owner,
            token: token.to_string(),
        }
    }

    #[test]
    fn user_credential_comes_first() {
        let store = FakeStore {
            user: HashMap::from([(7, token("user"))]),
            site: Some(token("site")),
            ..FakeStore::default()
        };
        let cred = resolve_for_user(&store, 7, &repo()).expect("credential");
        assert_eq!(cred.source, CredentialSource::User);
        assert_eq!(cred.authenticator, token("user"));
    }

    #[test]
    fn site_credential_is_the_fallback() {
        let store = FakeStore {
            site: Some(token("site")),
            ..FakeStore::default()
        };
        let cred = resolve_for_user(&store, 7, &repo()).expect("credential");
        assert_eq!(cred.source, CredentialSource::Site);
    }

    #[test]
    fn site_admin_falls_back_to_external_service() {
        let store = FakeStore {
            admins: vec![7],
            services: vec![service(1, None, "svc-token")],
            ..FakeStore::default()
        };
        let cred = resolve_for_user(&store, 7, &repo()).expect("credential");
        assert_eq!(cred.source, CredentialSource::ExternalService { id: 1 });
        assert_eq!(cred.authenticator, token("svc-token"));
    }

    #[test]
    fn regular_user_without_credentials_is_rejected() {
        let store = FakeStore {
            services: vec![service(1, None, "svc-token")],
            ..FakeStore::default()
        };
        let err = resolve_for_user(&store, 7, &repo()).unwrap_err();
        assert_eq!(err, CredentialError::Missing);
        assert_eq!(err.code(), ErrorCode::MissingCredentials);
    }

    #[test]
    fn store_failures_propagate() {
        let store = FakeStore {
            broken: true,
            ..FakeStore::default()
        };
        let err = resolve_for_user(&store, 7, &repo()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CredentialStoreFailed);
    }

    #[test]
    fn site_resolution_without_any_token_fails() {
        let store = FakeStore {
            services: vec![service(1, None, "")],
            ..FakeStore::default()
        };
        let err = resolve_for_site(&store, &repo()).unwrap_err();
        assert!(matches!(err, CredentialError::NoExternalService { .. }));
    }

    #[test]
    fn site_owned_services_are_preferred_then_newest() {
        let services = vec![
            service(9, Some(42), "user-owned"),
            service(2, None, "old-site"),
            service(5, None, "new-site"),
            service(7, None, ""),
        ];
        let picked = select_external_service(&services).map(|s| s.id);
        assert_eq!(picked, Some(5));
    }

    #[test]
    fn user_owned_service_used_when_nothing_else_has_a_token() {
        let services = vec![service(9, Some(42), "user-owned"), service(2, None, "")];
        assert_eq!(select_external_service(&services).map(|s| s.id), Some(9));
        assert_eq!(select_external_service(&[]), None);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let basic = Authenticator::Basic {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{basic:?} {:?}", token("ghp_secret"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("ghp_secret"));
    }
}
