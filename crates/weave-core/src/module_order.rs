//! Naming precedence between module paths
//!
//! Modules that sort first get the first pick of short names. Order of
//! importance, first decisive rule wins:
//!
//! 1. Standard library before everything else
//! 2. Paths under the preferred module
//! 3. Shorter path, ignoring version segments
//! 4. Lexicographically *larger* path, ignoring version segments
//! 5. Larger major version, then plain string order

use std::cmp::Ordering;

use crate::module_path::{is_std_path, strip_version_segments, version_segment, ModulePath};

/// Total order over module paths, biased toward a preferred module.
#[derive(Debug, Clone, Default)]
pub struct ModuleOrder {
    preferred: String,
}

impl ModuleOrder {
    pub fn new(preferred: impl Into<String>) -> Self {
        Self {
            preferred: preferred.into(),
        }
    }

    pub fn preferred(&self) -> &str {
        &self.preferred
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        compare_module_paths(&self.preferred, a, b)
    }

    /// Sorts paths in naming precedence order. Stable.
    pub fn sort(&self, paths: &mut [ModulePath]) {
        // Insertion sort: the version tie-break is not transitive across mixed
        // layouts such as `a/v2/x/v3` and `a/x/v2`, and `sort_by` may panic then.
        for i in 1..paths.len() {
            let mut j = i;
            while j > 0 && self.compare(paths[j - 1].as_str(), paths[j].as_str()) == Ordering::Greater {
                paths.swap(j - 1, j);
                j -= 1;
            }
        }
    }
}

pub fn compare_module_paths(preferred: &str, a_orig: &str, b_orig: &str) -> Ordering {
    let a = strip_version_segments(a_orig);
    let b = strip_version_segments(b_orig);

    match (is_std_path(&a), is_std_path(&b)) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    if !preferred.is_empty() {
        match (a_orig.starts_with(preferred), b_orig.starts_with(preferred)) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }

    match a.len().cmp(&b.len()) {
        Ordering::Equal => {}
        shorter_first => return shorter_first,
    }

    // Descending: the larger stripped path sorts first.
    match b.cmp(&a) {
        Ordering::Equal => {}
        larger_first => return larger_first,
    }

    compare_versions(a_orig, b_orig).unwrap_or_else(|| a_orig.cmp(b_orig))
}

/// Version tie-break for paths that are equal once version segments are gone.
fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a_segs: Vec<&str> = a.split('/').collect();
    let b_segs: Vec<&str> = b.split('/').collect();
    let a_ver = a_segs.last().and_then(|s| version_segment(s));
    let b_ver = b_segs.last().and_then(|s| version_segment(s));
    let above_one = |v: Option<u32>| v.is_some_and(|v| v > 1);

    if a_segs.len() == b_segs.len() && a_ver > b_ver {
        return Some(Ordering::Less);
    }
    if a_segs.len() == b_segs.len() + 1 && above_one(a_ver) {
        return Some(Ordering::Less);
    }
    if a_segs.len() == b_segs.len() && a_ver < b_ver {
        return Some(Ordering::Greater);
    }
    if a_segs.len() + 1 == b_segs.len() && above_one(b_ver) {
        return Some(Ordering::Greater);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(preferred: &str, paths: &[&str]) -> Vec<String> {
        let mut paths: Vec<ModulePath> = paths.iter().map(|p| ModulePath::new(*p)).collect();
        ModuleOrder::new(preferred).sort(&mut paths);
        paths.into_iter().map(|p| p.as_str().to_string()).collect()
    }

    #[test]
    fn test_std_sorts_first() {
        assert_eq!(
            compare_module_paths("", "fmt", "example.com/fmt"),
            Ordering::Less
        );
        assert_eq!(
            compare_module_paths("", "example.com/a", "image/color"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_preferred_prefix_beats_length() {
        assert_eq!(
            compare_module_paths("example.com/app", "example.com/app/deep/pkg", "x.io/y"),
            Ordering::Less
        );
        // Without a preference the shorter path wins.
        assert_eq!(
            compare_module_paths("", "example.com/app/deep/pkg", "x.io/y"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_equal_length_prefers_larger_string() {
        assert_eq!(compare_module_paths("", "a.io/b", "a.io/c"), Ordering::Greater);
        assert_eq!(compare_module_paths("", "a.io/c", "a.io/b"), Ordering::Less);
    }

    #[test]
    fn test_major_version_sorts_before_unversioned() {
        assert_eq!(
            compare_module_paths("", "example.com/lib", "example.com/lib/v2"),
            Ordering::Greater
        );
        assert_eq!(
            compare_module_paths("", "example.com/lib/v2", "example.com/lib"),
            Ordering::Less
        );
    }

    #[test]
    fn test_higher_version_first() {
        assert_eq!(
            sorted("", &["example.com/lib/v2", "example.com/lib", "example.com/lib/v3"]),
            vec!["example.com/lib/v3", "example.com/lib/v2", "example.com/lib"]
        );
    }

    #[test]
    fn test_explicit_v1_does_not_win() {
        // An extra v1 segment is not a newer major version.
        assert_eq!(
            compare_module_paths("", "example.com/lib/v1", "example.com/lib"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_full_ordering() {
        assert_eq!(
            sorted(
                "example.com/app",
                &[
                    "x.io/util",
                    "example.com/app/widget",
                    "fmt",
                    "example.com/app",
                    "image/color",
                ],
            ),
            vec![
                "fmt",
                "image/color",
                "example.com/app",
                "example.com/app/widget",
                "x.io/util",
            ]
        );
    }
}
