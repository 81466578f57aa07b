//! Module path identity and version-segment handling
//!
//! A module path is a `/`-separated string such as `example.com/app/widget` or
//! `example.com/lib/v2`. Segments of the form `v<n>` (n >= 1) are major-version
//! markers; they take part in ordering tie-breaks but not in naming.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Module path of the native pseudo-module. Its unique name is always `C`.
pub const NATIVE_MODULE: &str = "C";

/// Pseudo module path under which the standard library is fetched.
pub const STD_MODULE: &str = "std";

/// Opaque identity of a source module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModulePath(String);

impl ModulePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Last path segment, ignoring version markers.
    pub fn base_name(&self) -> &str {
        self.segments()
            .filter(|s| version_segment(s).is_none())
            .last()
            .unwrap_or(&self.0)
    }

    /// Whether this path equals `root` or lies below it.
    pub fn is_within(&self, root: &str) -> bool {
        self.0 == root
            || self
                .0
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn is_std(&self) -> bool {
        is_std_path(&self.0)
    }

    pub fn is_internal(&self) -> bool {
        is_internal_path(&self.0)
    }

    pub fn stripped(&self) -> String {
        strip_version_segments(&self.0)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModulePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModulePath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ModulePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parses a major-version segment like `v2`.
///
/// # Examples
/// ```
/// use weave_core::module_path::version_segment;
/// assert_eq!(version_segment("v2"), Some(2));
/// assert_eq!(version_segment("v1"), Some(1));
/// assert_eq!(version_segment("v0"), None);
/// assert_eq!(version_segment("vendor"), None);
/// ```
pub fn version_segment(segment: &str) -> Option<u32> {
    let digits = segment.strip_prefix('v')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|v| *v >= 1)
}

/// Removes every version segment from a path.
///
/// # Examples
/// ```
/// use weave_core::module_path::strip_version_segments;
/// assert_eq!(strip_version_segments("example.com/lib/v2"), "example.com/lib");
/// assert_eq!(strip_version_segments("example.com/v3/lib"), "example.com/lib");
/// ```
pub fn strip_version_segments(path: &str) -> String {
    path.split('/')
        .filter(|s| version_segment(s).is_none())
        .collect::<Vec<_>>()
        .join("/")
}

/// A path whose first segment has no dot belongs to the standard library.
pub fn is_std_path(path: &str) -> bool {
    path.split('/')
        .next()
        .is_some_and(|first| !first.contains('.'))
}

pub fn is_internal_path(path: &str) -> bool {
    path.split('/').any(|s| s == "internal")
}
