//! Staff login, logout and profile refresh.

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::auth::identity::{Credentials, StaffIdentity};
use crate::auth::session::{SessionKind, SessionStore, Staff};
use crate::auth::AuthError;

const LOGIN_ENDPOINT: &str = "/login";
const LOGOUT_ENDPOINT: &str = "/logout";
const PROFILE_ENDPOINT: &str = "/user";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: StaffIdentity,
    token: String,
}

/// `/user` answers with the bare profile on some backends and wrapped in
/// `{ "user": ... }` on others
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileResponse {
    Wrapped { user: StaffIdentity },
    Bare(StaffIdentity),
}

impl ProfileResponse {
    fn into_user(self) -> StaffIdentity {
        match self {
            ProfileResponse::Wrapped { user } => user,
            ProfileResponse::Bare(user) => user,
        }
    }
}

/// Staff session workflows on top of the staff `SessionStore`.
#[derive(Clone)]
pub struct StaffAuth {
    store: SessionStore<Staff>,
    api: ApiClient,
}

impl StaffAuth {
    pub fn new(store: SessionStore<Staff>, api: ApiClient) -> Self {
        Self { store, api }
    }

    pub fn store(&self) -> &SessionStore<Staff> {
        &self.store
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn user(&self) -> Option<StaffIdentity> {
        self.store.subject()
    }

    pub fn reset_idle_timer(&self) {
        self.store.reset_idle_timer();
    }

    /// Log in with fresh credentials. Any existing staff session is dropped
    /// first and stays dropped if the login fails.
    pub async fn login(&self, credentials: &Credentials) -> Result<StaffIdentity, AuthError> {
        self.store.clear_auth();

        match self
            .api
            .post::<LoginResponse, _>(LOGIN_ENDPOINT, credentials)
            .await
        {
            Ok(LoginResponse { user, token }) => {
                info!(user_id = user.id, role = %user.role, "Staff login successful");
                self.store.set_auth(user.clone(), token);
                Ok(user)
            }
            Err(e) if e.is_credential_rejection() => {
                warn!(username = %credentials.username, error = %e, "Staff credentials rejected");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                error!(error = %e, "Staff login failed");
                Err(AuthError::Transport(e))
            }
        }
    }

    /// Log out. The server is told when possible, but the local session is
    /// always cleared and the user always lands on the login page.
    pub async fn logout(&self) {
        if self.store.is_authenticated() {
            if let Err(e) = self.api.post_empty(LOGOUT_ENDPOINT).await {
                warn!(error = %e, "Logout notification failed, clearing session anyway");
            }
        }
        self.store.clear_auth();
        self.store.navigator().go_to(Staff::LOGIN_PATH);
    }

    /// Re-fetch the signed-in user's profile.
    ///
    /// Returns `Ok(None)` without a session. Any fetch failure is taken to
    /// mean the token is no longer valid: the session is cleared and
    /// `AuthError::SessionExpired` returned.
    pub async fn refresh_profile(&self) -> Result<Option<StaffIdentity>, AuthError> {
        let Some(token) = self.store.token() else {
            return Ok(None);
        };

        match self.api.get::<ProfileResponse>(PROFILE_ENDPOINT).await {
            Ok(profile) => {
                let user = profile.into_user();
                if self.store.refresh_subject_for(&token, user.clone()) {
                    Ok(Some(user))
                } else {
                    warn!("Staff session changed during profile refresh, result dropped");
                    Ok(None)
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch user profile, token may be invalid");
                self.store.clear_auth_for(&token);
                Err(AuthError::SessionExpired)
            }
        }
    }

    /// Replace the stored profile after a local edit (e.g. "my account").
    pub fn update_user(&self, user: StaffIdentity) -> bool {
        self.store.replace_subject(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use httpmock::prelude::*;
    use httpmock::prelude::HttpMockRequest;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::auth::identity::Role;
    use crate::auth::session::Parent;
    use crate::config::Config;
    use crate::router::{ChannelNavigator, Navigator, Notice, ShellEvent};
    use crate::storage::{DurableStorage, MemoryStorage};

    struct Fixture {
        auth: StaffAuth,
        storage: Arc<MemoryStorage>,
        rx: UnboundedReceiver<ShellEvent>,
    }

    /// True when the request carries no Authorization header at all
    fn without_authorization(req: &HttpMockRequest) -> bool {
        req.headers
            .as_ref()
            .map_or(true, |headers| {
                !headers
                    .iter()
                    .any(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            })
    }

    fn fixture(base_url: &str) -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let shared: Arc<dyn DurableStorage> = storage.clone();
        let (nav, rx) = ChannelNavigator::new();
        let nav: Arc<dyn Navigator> = Arc::new(nav);
        let idle = Duration::from_secs(900);
        let staff: SessionStore<Staff> =
            SessionStore::new(Arc::clone(&shared), Arc::clone(&nav), idle);
        let parent: SessionStore<Parent> = SessionStore::new(shared, nav, idle);
        let config = Config {
            api_base_url: base_url.to_string(),
            ..Config::default()
        };
        let api = ApiClient::new(&config, staff.clone(), parent).unwrap();
        Fixture {
            auth: StaffAuth::new(staff, api),
            storage,
            rx,
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("siti@school.test", "rahasia")
    }

    #[tokio::test]
    async fn test_login_success_persists_session() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.url("/api/"));

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/login")
                    .json_body(json!({"username": "siti@school.test", "password": "rahasia"}));
                then.status(200).json_body(json!({
                    "user": {"id": 7, "name": "Siti", "role": "guru"},
                    "token": "staff-token"
                }));
            })
            .await;

        let user = fx.auth.login(&credentials()).await.unwrap();
        mock.assert_async().await;

        assert_eq!(user.role, Role::Teacher);
        assert!(fx.auth.is_authenticated());
        assert_eq!(fx.storage.get("admin_token").as_deref(), Some("staff-token"));
        assert!(fx.storage.get("user").unwrap().contains("Siti"));
    }

    #[tokio::test]
    async fn test_login_rejected_leaves_store_cleared() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.url("/api/"));
        fx.auth
            .store()
            .set_auth(StaffIdentity::new(1, "Old", Role::Admin), "old-token".into());

        let mock = server
            .mock_async(|when, then| {
                // The previous token must not ride along with the new login
                when.method(POST).path("/api/login").matches(without_authorization);
                then.status(401).json_body(json!({"message": "Unauthenticated."}));
            })
            .await;

        let err = fx.auth.login(&credentials()).await.unwrap_err();
        mock.assert_async().await;
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!fx.auth.is_authenticated());
        assert!(fx.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_login_server_error_is_transport() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.url("/api/"));

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/login");
                then.status(500).body("boom");
            })
            .await;

        let err = fx.auth.login(&credentials()).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
        assert!(!fx.auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_notifies_server_and_clears() {
        let server = MockServer::start_async().await;
        let mut fx = fixture(&server.url("/api/"));
        fx.auth
            .store()
            .set_auth(StaffIdentity::new(1, "Admin", Role::Admin), "staff-token".into());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/logout")
                    .header("authorization", "Bearer staff-token");
                then.status(204);
            })
            .await;

        fx.auth.logout().await;
        mock.assert_async().await;
        assert!(!fx.auth.is_authenticated());
        assert!(fx.storage.keys().is_empty());
        assert_eq!(fx.rx.try_recv().unwrap(), ShellEvent::Navigate("/login".into()));
    }

    #[tokio::test]
    async fn test_logout_survives_unreachable_server() {
        // Nothing listens on port 9 of localhost
        let mut fx = fixture("http://127.0.0.1:9/api/");
        fx.auth
            .store()
            .set_auth(StaffIdentity::new(1, "Admin", Role::Admin), "staff-token".into());

        fx.auth.logout().await;
        assert!(!fx.auth.is_authenticated());
        assert!(fx.storage.keys().is_empty());
        assert_eq!(fx.rx.try_recv().unwrap(), ShellEvent::Navigate("/login".into()));
    }

    #[tokio::test]
    async fn test_logout_without_session_skips_server() {
        let server = MockServer::start_async().await;
        let mut fx = fixture(&server.url("/api/"));

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/logout");
                then.status(204);
            })
            .await;

        fx.auth.logout().await;
        mock.assert_hits_async(0).await;
        assert_eq!(fx.rx.try_recv().unwrap(), ShellEvent::Navigate("/login".into()));
    }

    #[tokio::test]
    async fn test_refresh_profile_replaces_subject() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.url("/api/"));
        fx.auth
            .store()
            .set_auth(StaffIdentity::new(7, "Siti", Role::Teacher), "staff-token".into());

        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/user")
                    .header("authorization", "Bearer staff-token");
                then.status(200)
                    .json_body(json!({"id": 7, "name": "Siti Aminah", "role": "admin"}));
            })
            .await;

        let user = fx.auth.refresh_profile().await.unwrap().unwrap();
        assert_eq!(user.name, "Siti Aminah");
        assert_eq!(fx.auth.user().unwrap().role, Role::Admin);
        assert_eq!(fx.auth.store().token().as_deref(), Some("staff-token"));
        assert!(fx.storage.get("user").unwrap().contains("Siti Aminah"));
    }

    // The clock is only paused between requests so the HTTP round trip runs
    // in real time.
    #[tokio::test]
    async fn test_refresh_profile_restarts_idle_window() {
        let server = MockServer::start_async().await;
        let mut fx = fixture(&server.url("/api/"));
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/user");
                then.status(200)
                    .json_body(json!({"id": 7, "name": "Siti", "role": "guru"}));
            })
            .await;

        fx.auth
            .store()
            .set_auth(StaffIdentity::new(7, "Siti", Role::Teacher), "staff-token".into());
        tokio::time::pause();
        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        assert!(fx.auth.is_authenticated());

        tokio::time::resume();
        fx.auth.refresh_profile().await.unwrap().unwrap();

        // 20 minutes after login, 10 after the refresh
        tokio::time::pause();
        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        assert!(fx.auth.is_authenticated());
        assert!(fx.rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
        assert!(!fx.auth.is_authenticated());
        assert_eq!(
            fx.rx.try_recv().unwrap(),
            ShellEvent::Notice(Notice::SessionTimedOut { namespace: "staff" })
        );
        assert_eq!(fx.rx.try_recv().unwrap(), ShellEvent::Navigate("/login".into()));
    }

    #[tokio::test]
    async fn test_refresh_profile_accepts_wrapped_body() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.url("/api/"));
        fx.auth
            .store()
            .set_auth(StaffIdentity::new(1, "Admin", Role::Admin), "staff-token".into());

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/user");
                then.status(200)
                    .json_body(json!({"user": {"id": 1, "name": "Head", "role": "admin"}}));
            })
            .await;

        let user = fx.auth.refresh_profile().await.unwrap().unwrap();
        assert_eq!(user.name, "Head");
    }

    #[tokio::test]
    async fn test_refresh_profile_failure_clears_session() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.url("/api/"));
        fx.auth
            .store()
            .set_auth(StaffIdentity::new(1, "Admin", Role::Admin), "revoked".into());

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/user");
                then.status(401);
            })
            .await;

        let err = fx.auth.refresh_profile().await.unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired));
        assert!(!fx.auth.is_authenticated());
        assert!(fx.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_profile_without_session_is_noop() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.url("/api/"));

        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/user");
                then.status(200).json_body(json!({}));
            })
            .await;

        assert!(fx.auth.refresh_profile().await.unwrap().is_none());
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_update_user_requires_session() {
        let fx = fixture("http://127.0.0.1:9/api/");
        assert!(!fx.auth.update_user(StaffIdentity::new(1, "A", Role::Admin)));

        fx.auth
            .store()
            .set_auth(StaffIdentity::new(1, "A", Role::Admin), "t".into());
        assert!(fx.auth.update_user(StaffIdentity::new(1, "B", Role::Admin)));
        assert_eq!(fx.auth.user().unwrap().name, "B");
    }
}
