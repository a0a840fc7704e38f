//! Generic session store shared by the staff and parent domains.
//!
//! A `SessionStore<K>` holds one subject/token pair, persists it under the
//! storage keys of its `SessionKind`, and owns a single idle timer. The two
//! kinds never share keys, so the stores cannot observe each other.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::identity::{GuardianIdentity, StaffIdentity};
use crate::namespace::Namespace;
use crate::router::{Navigator, Notice};
use crate::storage::DurableStorage;

/// Static description of one identity domain.
pub trait SessionKind: Send + Sync + 'static {
    type Subject: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    const NAMESPACE: Namespace;

    /// Storage key holding the serialized subject
    const SUBJECT_KEY: &'static str;

    /// Storage key holding the bearer token
    const TOKEN_KEY: &'static str;

    /// Where the user is sent after logout or idle expiry
    const LOGIN_PATH: &'static str;
}

/// Staff and admin users
#[derive(Debug)]
pub enum Staff {}

impl SessionKind for Staff {
    type Subject = StaffIdentity;
    const NAMESPACE: Namespace = Namespace::Staff;
    const SUBJECT_KEY: &'static str = "user";
    const TOKEN_KEY: &'static str = "admin_token";
    const LOGIN_PATH: &'static str = "/login";
}

/// Parents and guardians
#[derive(Debug)]
pub enum Parent {}

impl SessionKind for Parent {
    type Subject = GuardianIdentity;
    const NAMESPACE: Namespace = Namespace::Parent;
    const SUBJECT_KEY: &'static str = "student";
    // Deliberately different from the staff token key
    const TOKEN_KEY: &'static str = "token";
    const LOGIN_PATH: &'static str = "/parent/login";
}

/// An authenticated subject together with its bearer token.
#[derive(Clone, PartialEq)]
pub struct SessionData<S> {
    pub subject: S,
    pub token: String,
}

impl<S: fmt::Debug> fmt::Debug for SessionData<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("subject", &self.subject)
            .field("token", &"<redacted>")
            .finish()
    }
}

struct SessionState<S> {
    // Subject and token live and die together
    data: Option<SessionData<S>>,
    idle_deadline: Option<DateTime<Utc>>,
    timer: Option<JoinHandle<()>>,
    // Bumped on every transition; a timer only fires for its own generation
    generation: u64,
}

struct Shared<K: SessionKind> {
    state: Mutex<SessionState<K::Subject>>,
    storage: Arc<dyn DurableStorage>,
    navigator: Arc<dyn Navigator>,
    idle_timeout: Duration,
    authenticated: watch::Sender<bool>,
    _kind: PhantomData<K>,
}

/// Session store for one identity domain. Clone is cheap and shares state.
pub struct SessionStore<K: SessionKind> {
    shared: Arc<Shared<K>>,
}

impl<K: SessionKind> Clone for SessionStore<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: SessionKind> SessionStore<K> {
    /// Create a store and hydrate it from durable storage.
    ///
    /// A restored session gets a fresh idle window when a tokio runtime is
    /// available.
    pub fn new(
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
        idle_timeout: Duration,
    ) -> Self {
        let data = Self::load(storage.as_ref());
        let (authenticated, _) = watch::channel(data.is_some());

        let store = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState {
                    data,
                    idle_deadline: None,
                    timer: None,
                    generation: 0,
                }),
                storage,
                navigator,
                idle_timeout,
                authenticated,
                _kind: PhantomData,
            }),
        };

        {
            let mut state = store.lock();
            if state.data.is_some() {
                debug!(namespace = %K::NAMESPACE, "Session restored from storage");
                store.arm_timer(&mut state);
            }
        }
        store
    }

    /// Read a persisted session. A half-written or unparseable pair is
    /// discarded and its keys removed.
    fn load(storage: &dyn DurableStorage) -> Option<SessionData<K::Subject>> {
        let token = storage.get(K::TOKEN_KEY);
        let subject = storage.get(K::SUBJECT_KEY);

        let data = match (token, subject) {
            (None, None) => return None,
            (Some(token), Some(raw)) if !token.is_empty() => {
                match serde_json::from_str::<K::Subject>(&raw) {
                    Ok(subject) => Some(SessionData { subject, token }),
                    Err(e) => {
                        warn!(namespace = %K::NAMESPACE, error = %e, "Stored subject is unreadable");
                        None
                    }
                }
            }
            _ => None,
        };

        if data.is_none() {
            debug!(namespace = %K::NAMESPACE, "Discarding incomplete stored session");
            Self::remove_keys(storage);
        }
        data
    }

    fn lock(&self) -> MutexGuard<'_, SessionState<K::Subject>> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically install a subject and token, persist both and restart the
    /// idle timer.
    pub fn set_auth(&self, subject: K::Subject, token: String) {
        let mut state = self.lock();
        self.persist_subject(&subject);
        if let Err(e) = self.shared.storage.set(K::TOKEN_KEY, &token) {
            warn!(namespace = %K::NAMESPACE, error = %e, "Failed to persist token");
        }
        state.data = Some(SessionData { subject, token });
        self.arm_timer(&mut state);
        self.shared.authenticated.send_replace(true);
        info!(namespace = %K::NAMESPACE, "Session established");
    }

    /// Atomically drop the session, its storage entries and its timer.
    /// Idempotent.
    pub fn clear_auth(&self) {
        let mut state = self.lock();
        let was_authenticated = state.data.is_some();
        self.clear_locked(&mut state);
        if was_authenticated {
            info!(namespace = %K::NAMESPACE, "Session cleared");
        }
    }

    /// Replace the subject of an active session, keeping its token.
    /// Returns false when there is no session to update.
    pub fn replace_subject(&self, subject: K::Subject) -> bool {
        let mut state = self.lock();
        match state.data.as_mut() {
            Some(data) => {
                self.persist_subject(&subject);
                data.subject = subject;
                true
            }
            None => false,
        }
    }

    /// Replace the subject and restart the idle timer, but only while the
    /// session still carries `token`. A login or logout that completed in
    /// the meantime wins.
    pub fn refresh_subject_for(&self, token: &str, subject: K::Subject) -> bool {
        let mut state = self.lock();
        match state.data.as_mut() {
            Some(data) if data.token == token => {
                self.persist_subject(&subject);
                data.subject = subject;
                self.arm_timer(&mut state);
                true
            }
            _ => false,
        }
    }

    /// Clear the session only while it still carries `token`.
    pub fn clear_auth_for(&self, token: &str) -> bool {
        let mut state = self.lock();
        if state.data.as_ref().is_some_and(|d| d.token == token) {
            self.clear_locked(&mut state);
            info!(namespace = %K::NAMESPACE, "Session cleared");
            true
        } else {
            false
        }
    }

    /// Restart the idle countdown. No-op without an active session.
    pub fn reset_idle_timer(&self) {
        let mut state = self.lock();
        if state.data.is_some() {
            self.arm_timer(&mut state);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().data.is_some()
    }

    /// Watch authentication changes. The current value is available
    /// immediately through `borrow()`.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.authenticated.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.lock().data.as_ref().map(|d| d.token.clone())
    }

    pub fn subject(&self) -> Option<K::Subject> {
        self.lock().data.as_ref().map(|d| d.subject.clone())
    }

    pub fn data(&self) -> Option<SessionData<K::Subject>> {
        self.lock().data.clone()
    }

    pub fn idle_deadline(&self) -> Option<DateTime<Utc>> {
        self.lock().idle_deadline
    }

    /// Time left before the idle timer fires, if one is running
    pub fn idle_remaining(&self) -> Option<chrono::Duration> {
        self.idle_deadline()
            .map(|deadline| (deadline - Utc::now()).max(chrono::Duration::zero()))
    }

    pub fn idle_timeout(&self) -> Duration {
        self.shared.idle_timeout
    }

    pub(crate) fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.shared.navigator
    }

    fn persist_subject(&self, subject: &K::Subject) {
        let result = serde_json::to_string(subject)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.shared.storage.set(K::SUBJECT_KEY, &raw));
        if let Err(e) = result {
            warn!(namespace = %K::NAMESPACE, error = %e, "Failed to persist subject");
        }
    }

    fn remove_keys(storage: &dyn DurableStorage) {
        for key in [K::SUBJECT_KEY, K::TOKEN_KEY] {
            if let Err(e) = storage.remove(key) {
                warn!(namespace = %K::NAMESPACE, key, error = %e, "Failed to remove stored value");
            }
        }
    }

    fn clear_locked(&self, state: &mut SessionState<K::Subject>) {
        state.data = None;
        state.idle_deadline = None;
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        Self::remove_keys(self.shared.storage.as_ref());
        self.shared.authenticated.send_replace(false);
    }

    /// Cancel any pending timer and start a fresh one.
    fn arm_timer(&self, state: &mut SessionState<K::Subject>) {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;
        let generation = state.generation;
        let timeout = self.shared.idle_timeout;

        state.idle_deadline = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d));

        let Ok(runtime) = Handle::try_current() else {
            warn!(namespace = %K::NAMESPACE, "No async runtime, idle timer not armed");
            return;
        };

        let weak: Weak<Shared<K>> = Arc::downgrade(&self.shared);
        state.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(shared) = weak.upgrade() {
                SessionStore { shared }.expire(generation);
            }
        }));
    }

    /// Idle expiry is a local logout for both kinds; the backend is not told.
    fn expire(&self, generation: u64) {
        {
            let mut state = self.lock();
            if state.generation != generation || state.data.is_none() {
                debug!(namespace = %K::NAMESPACE, "Stale idle timer ignored");
                return;
            }
            // This task is the live timer: detach its handle rather than abort itself
            drop(state.timer.take());
            self.clear_locked(&mut state);
        }

        info!(namespace = %K::NAMESPACE, "Session expired after inactivity");
        let navigator = &self.shared.navigator;
        navigator.notify(Notice::SessionTimedOut {
            namespace: K::NAMESPACE.as_str(),
        });
        navigator.go_to(K::LOGIN_PATH);
    }
}

impl<K: SessionKind> fmt::Debug for SessionStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("SessionStore")
            .field("namespace", &K::NAMESPACE)
            .field("data", &state.data)
            .field("idle_deadline", &state.idle_deadline)
            .finish()
    }
}
