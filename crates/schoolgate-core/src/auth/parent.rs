//! Parent/guardian login and logout.

use serde::Deserialize;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::auth::identity::{Credentials, GuardianIdentity};
use crate::auth::session::{Parent, SessionKind, SessionStore};
use crate::auth::AuthError;

const LOGIN_ENDPOINT: &str = "/parent/login";

/// Landing page after a successful parent login
pub const PORTAL_PATH: &str = "/parent/portal";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    student: GuardianIdentity,
    token: String,
}

#[derive(Clone)]
pub struct ParentAuth {
    store: SessionStore<Parent>,
    api: ApiClient,
}

impl ParentAuth {
    pub fn new(store: SessionStore<Parent>, api: ApiClient) -> Self {
        Self { store, api }
    }

    pub fn store(&self) -> &SessionStore<Parent> {
        &self.store
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn student(&self) -> Option<GuardianIdentity> {
        self.store.subject()
    }

    pub fn reset_idle_timer(&self) {
        self.store.reset_idle_timer();
    }

    /// Log in and head to the parent portal.
    ///
    /// Every failure, whatever its cause, is reported as
    /// `AuthError::InvalidCredentials`.
    pub async fn login(&self, credentials: &Credentials) -> Result<GuardianIdentity, AuthError> {
        self.store.clear_auth();

        match self
            .api
            .post::<LoginResponse, _>(LOGIN_ENDPOINT, credentials)
            .await
        {
            Ok(LoginResponse { student, token }) => {
                info!(student = student.display_name(), "Parent login successful");
                self.store.set_auth(student.clone(), token);
                self.store.navigator().go_to(PORTAL_PATH);
                Ok(student)
            }
            Err(e) => {
                warn!(username = %credentials.username, error = %e, "Parent login failed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Purely local: the backend is not told.
    pub fn logout(&self) {
        self.store.clear_auth();
        self.store.navigator().go_to(Parent::LOGIN_PATH);
    }
}
