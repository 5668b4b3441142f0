//! Mount path matching.
//!
//! # Responsibilities
//! - Match a request path against a mount prefix on segment boundaries
//! - Split the path into the path base and the remainder below the mount
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A mount of `/` matches everything with an empty path base
//! - No regex to guarantee O(n) matching

/// Matches the request path against a mount prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountMatcher {
    /// Normalized mount: no trailing slash, empty for the root mount.
    mount: String,
}

impl MountMatcher {
    pub fn new(mount: impl Into<String>) -> Self {
        let mount = mount.into();
        Self {
            mount: mount.trim_end_matches('/').to_string(),
        }
    }

    /// Normalized mount path; empty for the root mount.
    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Split `path` into `(path_base, remainder)` when it lies under the mount.
    pub fn split<'a>(&self, path: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = path.strip_prefix(self.mount.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(path.split_at(self.mount.len()))
        } else {
            None
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.split(path).is_some()
    }
}
