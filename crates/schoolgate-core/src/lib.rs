//! schoolgate - client-side session layer for a school administration app.
//!
//! Two identity domains live side by side and never share state:
//! staff/admin users and parents/guardians. Each has its own persisted
//! session and idle timer. A single request dispatcher attaches the right
//! bearer token per request path, and a navigation guard gates every page
//! change on the staff session and role.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod namespace;
pub mod router;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use auth::{
    AuthError, Credentials, GuardianIdentity, ParentAuth, Role, SessionStore, StaffAuth,
    StaffIdentity,
};
pub use config::Config;
pub use context::AppContext;
pub use namespace::Namespace;
pub use router::{AuthorizationError, NavigationError, Notice, Router};
pub use storage::{DurableStorage, FileStorage, MemoryStorage};
