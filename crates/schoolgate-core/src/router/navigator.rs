use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One-time message for the user, raised outside the normal request flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A session was cleared by its idle timer
    SessionTimedOut { namespace: &'static str },
    /// A navigation was refused because the staff role does not match
    AccessDenied { path: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SessionTimedOut { .. } => f.write_str(
                "Your session has ended because of inactivity. Please log in again.",
            ),
            Notice::AccessDenied { .. } => {
                f.write_str("You do not have permission to access this page.")
            }
        }
    }
}

/// Imperative navigation, usable from stores, timers and guards alike.
pub trait Navigator: Send + Sync {
    fn go_to(&self, path: &str);

    fn notify(&self, notice: Notice);
}

/// Something the session layer asked the presentation layer to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Navigate(String),
    Notice(Notice),
}

/// Navigator that forwards requests over a channel to the `Router`.
///
/// Requests are applied when the router drains them, so a store can ask for
/// navigation from inside a timer task without touching router state.
#[derive(Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<ShellEvent>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ShellEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ShellEvent) {
        if self.tx.send(event).is_err() {
            warn!("Navigation receiver dropped, event discarded");
        }
    }
}

impl Navigator for ChannelNavigator {
    fn go_to(&self, path: &str) {
        debug!(path, "Navigation requested");
        self.send(ShellEvent::Navigate(path.to_string()));
    }

    fn notify(&self, notice: Notice) {
        debug!(?notice, "Notice raised");
        self.send(ShellEvent::Notice(notice));
    }
}
