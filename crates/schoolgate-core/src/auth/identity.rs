//! Authenticated subjects for the two identity domains.
//!
//! Staff and guardian identities are distinct types on purpose: nothing can
//! put a guardian into the staff session or the reverse.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Landing page for teachers
pub const TEACHER_HOME: &str = "/teacher/students";

/// Landing page for every other staff role
pub const STAFF_HOME: &str = "/";

/// Staff role as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Teacher,
    /// Any role this client has no special handling for, kept verbatim
    Other(String),
}

impl Role {
    /// Wire value. The backend reports teachers as `guru`.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "guru",
            Role::Other(name) => name,
        }
    }

    /// Where a freshly authenticated user of this role lands
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Teacher => TEACHER_HOME,
            _ => STAFF_HOME,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "guru" | "teacher" => Role::Teacher,
            _ => Role::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal staff or admin user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffIdentity {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    /// Remaining profile fields, preserved so storage round-trips losslessly
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StaffIdentity {
    pub fn new(id: i64, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            role,
            extra: Map::new(),
        }
    }
}

/// Parent/guardian session subject: the student the guardian signed in for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl GuardianIdentity {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown student")
    }
}

/// Login form contents, posted as JSON
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
