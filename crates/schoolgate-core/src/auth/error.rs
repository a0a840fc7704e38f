use thiserror::Error;

use crate::api::ApiError;

/// Failures of the login and profile workflows.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Shown to the user as-is; the underlying cause is only logged.
    #[error("The credentials you entered did not match")]
    InvalidCredentials,

    /// The profile refresh failed and the session was cleared
    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Login failed: {0}")]
    Transport(#[source] ApiError),
}
