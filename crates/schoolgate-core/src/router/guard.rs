//! Navigation guard evaluated before every page change.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::auth::{Parent, Role, SessionKind, SessionStore, Staff};
use crate::namespace::Namespace;
use crate::storage::DurableStorage;

use super::routes::{normalize_path, RouteTable};

/// Pages reachable without any session
pub const PUBLIC_PAGES: [&str; 2] = [Staff::LOGIN_PATH, Parent::LOGIN_PATH];

/// Fallback when a refused navigation has nowhere to return to
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// The staff subject's role does not match the destination.
/// The session itself stays valid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Access to {path} requires the {required} role")]
pub struct AuthorizationError {
    pub path: String,
    pub required: Role,
    pub actual: Option<Role>,
    /// Where the user should be sent instead
    pub redirect_to: String,
}

pub struct NavigationGuard {
    staff: SessionStore<Staff>,
    storage: Arc<dyn DurableStorage>,
    routes: RouteTable,
}

impl NavigationGuard {
    pub fn new(
        staff: SessionStore<Staff>,
        storage: Arc<dyn DurableStorage>,
        routes: RouteTable,
    ) -> Self {
        Self {
            staff,
            storage,
            routes,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide a navigation from `from` (None on first load) to `to`.
    ///
    /// Authentication is checked before roles; an anonymous visitor has no
    /// role to compare.
    pub fn check(&self, from: Option<&str>, to: &str) -> Result<GuardDecision, AuthorizationError> {
        let path = normalize_path(to);
        let namespace = Namespace::classify(&path);
        let route = self.routes.resolve(&path);
        let subject = self.staff.subject();

        if namespace == Namespace::Staff
            && !PUBLIC_PAGES.contains(&path.as_str())
            && subject.is_none()
        {
            debug!(path = %path, "Staff session required");
            return Ok(GuardDecision::Redirect(Staff::LOGIN_PATH.to_string()));
        }

        if let Some(required) = route.and_then(|r| r.role.as_ref()) {
            let actual = subject.as_ref().map(|s| s.role.clone());
            if actual.as_ref() != Some(required) {
                let redirect_to = from
                    .filter(|f| !f.is_empty())
                    .map(normalize_path)
                    .unwrap_or_else(|| HOME_PATH.to_string());
                return Err(AuthorizationError {
                    path,
                    required: required.clone(),
                    actual,
                    redirect_to,
                });
            }
        }

        if path == Staff::LOGIN_PATH {
            if let Some(subject) = &subject {
                let landing = subject.role.landing_path();
                debug!(role = %subject.role, landing, "Already signed in, leaving login page");
                return Ok(GuardDecision::Redirect(landing.to_string()));
            }
        }

        if route.is_some_and(|r| r.requires_parent_token) && !self.storage.contains(Parent::TOKEN_KEY)
        {
            debug!(path = %path, "Parent token missing");
            return Ok(GuardDecision::Redirect(Parent::LOGIN_PATH.to_string()));
        }

        Ok(GuardDecision::Allow)
    }
}
