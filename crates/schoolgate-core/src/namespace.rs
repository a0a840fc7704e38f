//! Path namespaces shared by request dispatch and navigation.
//!
//! Every API request path and every in-app location belongs to exactly one
//! namespace. The request dispatcher uses it to pick which session supplies
//! the bearer token; the navigation guard uses it to decide whether the staff
//! session gates the destination.

use std::fmt;

/// Path prefix reserved for parent/guardian flows
pub const PARENT_PREFIX: &str = "/parent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Internal staff and admin users. Everything outside the parent prefix.
    Staff,
    /// Parent/guardian users
    Parent,
}

impl Namespace {
    /// Classify a request path or location.
    ///
    /// `/parent` and anything below `/parent/` is parent-facing; the leading
    /// slash is optional and query strings are ignored. `/parents` is not.
    pub fn classify(path: &str) -> Self {
        let path = path.split(&['?', '#'][..]).next().unwrap_or_default();
        let path = path.strip_prefix('/').unwrap_or(path);
        let prefix = &PARENT_PREFIX[1..];

        match path.strip_prefix(prefix) {
            Some("") => Namespace::Parent,
            Some(rest) if rest.starts_with('/') => Namespace::Parent,
            _ => Namespace::Staff,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Staff => "staff",
            Namespace::Parent => "parent",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_parent_paths() {
        assert_eq!(Namespace::classify("/parent/login"), Namespace::Parent);
        assert_eq!(Namespace::classify("/parent/portal"), Namespace::Parent);
        assert_eq!(Namespace::classify("/parent"), Namespace::Parent);
        assert_eq!(Namespace::classify("/parent/"), Namespace::Parent);
        // Relative request paths
        assert_eq!(Namespace::classify("parent/student/bills"), Namespace::Parent);
        assert_eq!(Namespace::classify("/parent/bills?month=7"), Namespace::Parent);
    }

    #[test]
    fn test_classify_staff_paths() {
        assert_eq!(Namespace::classify("/login"), Namespace::Staff);
        assert_eq!(Namespace::classify("/students"), Namespace::Staff);
        assert_eq!(Namespace::classify("/"), Namespace::Staff);
        assert_eq!(Namespace::classify(""), Namespace::Staff);
        // Prefix must end at a segment boundary
        assert_eq!(Namespace::classify("/parents"), Namespace::Staff);
        assert_eq!(Namespace::classify("/parentals/report"), Namespace::Staff);
        // Only a leading segment counts
        assert_eq!(Namespace::classify("/students/parent/1"), Namespace::Staff);
    }
}
