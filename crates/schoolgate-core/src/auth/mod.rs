//! Authentication module for the staff and parent sessions.
//!
//! This module provides:
//! - `SessionStore`: one generic, persisted session with an idle timer,
//!   instantiated once per identity domain (`Staff`, `Parent`)
//! - `StaffAuth` / `ParentAuth`: login, logout and profile workflows
//! - Identity types for the two domains, which never mix
//!
//! Sessions are persisted to durable storage and cleared after a configurable
//! idle period (15 minutes by default).

pub mod error;
pub mod identity;
pub mod parent;
pub mod session;
pub mod staff;

pub use error::AuthError;
pub use identity::{Credentials, GuardianIdentity, Role, StaffIdentity};
pub use parent::ParentAuth;
pub use session::{Parent, SessionData, SessionKind, SessionStore, Staff};
pub use staff::StaffAuth;
