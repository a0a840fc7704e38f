//! In-app navigation.
//!
//! This module provides:
//! - `NavigationGuard`: the allow/redirect/block decision for one navigation
//! - `Router`: the current location, with every navigation (user initiated
//!   or requested by a session store) passed through the guard
//! - `Navigator`: the imperative "go to path" seam used by stores and timers

pub mod guard;
pub mod navigator;
pub mod routes;

pub use guard::{AuthorizationError, GuardDecision, NavigationGuard};
pub use navigator::{ChannelNavigator, Navigator, Notice, ShellEvent};
pub use routes::{normalize_path, Route, RouteTable};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Redirect hops followed before a navigation is abandoned
const MAX_REDIRECTS: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error(transparent)]
    Forbidden(#[from] AuthorizationError),

    #[error("Too many redirects navigating to {0}")]
    RedirectLoop(String),
}

pub struct Router {
    guard: NavigationGuard,
    location: Option<String>,
    events: mpsc::UnboundedReceiver<ShellEvent>,
    notices: Vec<Notice>,
}

impl Router {
    pub fn new(guard: NavigationGuard, events: mpsc::UnboundedReceiver<ShellEvent>) -> Self {
        Self {
            guard,
            location: None,
            events,
            notices: Vec::new(),
        }
    }

    /// Current location; None before the first navigation
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// Follow guard redirects from the current location to a final, allowed
    /// destination without committing it.
    fn resolve(&self, to: &str) -> Result<String, NavigationError> {
        let mut target = normalize_path(to);
        for _ in 0..=MAX_REDIRECTS {
            match self.guard.check(self.location.as_deref(), &target)? {
                GuardDecision::Allow => return Ok(target),
                GuardDecision::Redirect(next) => {
                    debug!(from = %target, to = %next, "Navigation redirected");
                    target = next;
                }
            }
        }
        Err(NavigationError::RedirectLoop(normalize_path(to)))
    }

    /// Navigate to `to`, applying the guard and any redirects it asks for.
    ///
    /// A role mismatch records `Notice::AccessDenied`, sends the user back
    /// where they came from and is returned as the error.
    pub fn push(&mut self, to: &str) -> Result<&str, NavigationError> {
        match self.resolve(to) {
            Ok(destination) => {
                debug!(location = %destination, "Navigated");
                Ok(self.location.insert(destination).as_str())
            }
            Err(NavigationError::Forbidden(denied)) => {
                warn!(path = %denied.path, required = %denied.required, "Navigation refused");
                self.notices.push(Notice::AccessDenied {
                    path: denied.path.clone(),
                });
                match self.resolve(&denied.redirect_to) {
                    Ok(fallback) => self.location = Some(fallback),
                    Err(e) => warn!(error = %e, "Fallback navigation failed, staying put"),
                }
                Err(NavigationError::Forbidden(denied))
            }
            Err(e) => {
                warn!(error = %e, "Navigation abandoned");
                Err(e)
            }
        }
    }

    /// Apply navigation requests and collect notices raised by the session
    /// stores since the last call. Returns all notices not yet taken.
    pub fn process_pending(&mut self) -> Vec<Notice> {
        while let Ok(event) = self.events.try_recv() {
            match event {
                ShellEvent::Navigate(path) => {
                    if let Err(e) = self.push(&path) {
                        debug!(path = %path, error = %e, "Requested navigation not applied");
                    }
                }
                ShellEvent::Notice(notice) => self.notices.push(notice),
            }
        }
        self.take_notices()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
