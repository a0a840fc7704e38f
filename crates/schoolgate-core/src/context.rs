//! Explicit wiring of the session layer.
//!
//! `AppContext` builds one instance of every component and hands each its
//! collaborators. There are no process-wide singletons; the presentation
//! layer owns the context and passes it wherever sessions are needed.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::auth::{Parent, ParentAuth, SessionStore, Staff, StaffAuth};
use crate::config::Config;
use crate::router::{ChannelNavigator, NavigationGuard, Navigator, RouteTable, Router};
use crate::storage::{DurableStorage, FileStorage};

pub struct AppContext {
    pub config: Config,
    pub api: ApiClient,
    pub staff: StaffAuth,
    pub parent: ParentAuth,
    pub router: Router,
}

impl AppContext {
    /// Wire every component over the given storage, hydrating both sessions.
    pub fn new(config: Config, storage: Arc<dyn DurableStorage>) -> Result<Self> {
        Self::with_routes(config, storage, RouteTable::school())
    }

    pub fn with_routes(
        config: Config,
        storage: Arc<dyn DurableStorage>,
        routes: RouteTable,
    ) -> Result<Self> {
        let (navigator, events) = ChannelNavigator::new();
        let navigator: Arc<dyn Navigator> = Arc::new(navigator);
        let idle_timeout = config.idle_timeout();

        let staff_store: SessionStore<Staff> =
            SessionStore::new(Arc::clone(&storage), Arc::clone(&navigator), idle_timeout);
        let parent_store: SessionStore<Parent> =
            SessionStore::new(Arc::clone(&storage), navigator, idle_timeout);
        debug!(
            staff = staff_store.is_authenticated(),
            parent = parent_store.is_authenticated(),
            "Sessions hydrated"
        );

        let api = ApiClient::new(&config, staff_store.clone(), parent_store.clone())
            .context("Failed to build HTTP client")?;
        let guard = NavigationGuard::new(staff_store.clone(), storage, routes);

        info!(api = %api.base_url(), "Session layer ready");
        Ok(Self {
            staff: StaffAuth::new(staff_store, api.clone()),
            parent: ParentAuth::new(parent_store, api.clone()),
            router: Router::new(guard, events),
            api,
            config,
        })
    }

    /// Open file-backed storage under the configured data directory and wire
    /// everything on top of it.
    pub fn open(config: Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let storage = FileStorage::open(&data_dir)
            .with_context(|| format!("Failed to open storage in {}", data_dir.display()))?;
        Self::new(config, Arc::new(storage))
    }

    /// Record user activity on whichever sessions are active.
    pub fn touch(&self) {
        self.staff.reset_idle_timer();
        self.parent.reset_idle_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::auth::{Role, StaffIdentity};
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_components_share_sessions() {
        let storage = Arc::new(MemoryStorage::new());
        let ctx = AppContext::new(Config::default(), storage.clone()).unwrap();
        assert!(!ctx.staff.is_authenticated());
        assert_eq!(ctx.api.base_url(), "http://127.0.0.1:8000/api");

        ctx.staff
            .store()
            .set_auth(StaffIdentity::new(3, "Rina", Role::Admin), "tok".into());
        assert_eq!(ctx.api.bearer_for(crate::Namespace::Staff).as_deref(), Some("tok"));
        assert_eq!(ctx.api.bearer_for(crate::Namespace::Parent), None);
        assert!(ctx.router.guard().check(None, "/students").is_ok());
    }

    #[tokio::test]
    async fn test_hydrates_from_storage() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("admin_token", "kept").unwrap();
        storage
            .set("user", r#"{"id":4,"name":"Dewi","role":"admin"}"#)
            .unwrap();
        // Token without its subject is discarded
        storage.set("token", "orphan").unwrap();

        let ctx = AppContext::new(Config::default(), storage.clone()).unwrap();
        assert_eq!(ctx.staff.user().unwrap().name, "Dewi");
        assert!(!ctx.parent.is_authenticated());
        assert!(!storage.contains("token"));
    }

    #[tokio::test]
    async fn test_oversized_idle_window_still_arms() {
        let config = Config {
            idle_timeout_minutes: u64::MAX,
            ..Config::default()
        };
        let ctx = AppContext::new(config, Arc::new(MemoryStorage::new())).unwrap();
        ctx.staff
            .store()
            .set_auth(StaffIdentity::new(3, "Rina", Role::Admin), "tok".into());
        assert!(ctx.staff.is_authenticated());
        assert_eq!(ctx.staff.store().idle_timeout(), Duration::from_secs(u64::MAX));
    }
}
