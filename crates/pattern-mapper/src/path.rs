//! Hierarchical path strings.
//!
//! Shapes and groups are located by `/`-separated paths such as
//! `/root/a/s1`. Empty segments are ignored, so `root/a`, `/root/a` and
//! `/root/a/` all name the same node. The empty path (and `/`) is the
//! root, which always exists.
//!
//! Everything that compares paths goes through [`normalize`] first.
//!
//! Segments starting with [`OVERLAY_MARK`] are reserved for groups that
//! gather shapes from elsewhere in the hierarchy (inferred and generated
//! groups). An overlay at `/a/#red` belongs to `/a` but is not a container:
//! its [`scope`] is `/a`.

use std::collections::HashSet;

/// First character of an overlay segment.
pub const OVERLAY_MARK: char = '#';

/// Split a path into its non-empty segments.
///
/// ## Rust Lesson #8: Iterators are lazy
///
/// `split` and `filter` don't allocate anything - they describe work that
/// happens only when someone pulls items out (here: the caller).
/// `impl DoubleEndedIterator` in the return type hides the concrete adapter
/// type but still lets callers walk the segments from the end.
pub fn segments(path: &str) -> impl DoubleEndedIterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Canonical form: a leading `/` per segment, no trailing slash.
///
/// The root normalizes to the empty string.
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in segments(path) {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Is this the root path?
pub fn is_root(path: &str) -> bool {
    segments(path).next().is_none()
}

/// Number of segments in the path (0 for the root).
pub fn segment_count(path: &str) -> usize {
    segments(path).count()
}

/// Nesting depth of a group at this path.
///
/// Top-level groups (one segment) sit at depth 0. Returns `None` for the
/// root, which has no depth of its own.
pub fn group_depth(path: &str) -> Option<usize> {
    segment_count(path).checked_sub(1)
}

/// Normalized parent path, or `None` for the root.
pub fn parent(path: &str) -> Option<String> {
    let normalized = normalize(path);
    if normalized.is_empty() {
        return None;
    }
    // Normalized paths always start with '/', so rfind can't miss.
    let cut = normalized.rfind('/').unwrap_or(0);
    Some(normalized[..cut].to_string())
}

/// Append one segment to a path.
pub fn join(parent: &str, segment: &str) -> String {
    let mut out = normalize(parent);
    for part in segments(segment) {
        out.push('/');
        out.push_str(part);
    }
    out
}

/// Is `path` equal to `ancestor` or nested somewhere below it?
///
/// Every path is within the root.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    let mut path_segments = segments(path);
    for expected in segments(ancestor) {
        match path_segments.next() {
            Some(actual) if actual == expected => {}
            _ => return false,
        }
    }
    true
}

/// Longest common ancestor of a set of paths (normalized).
pub fn common_ancestor<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let mut prefix: Option<Vec<&str>> = None;
    for path in paths {
        let parts: Vec<&str> = segments(path).collect();
        prefix = Some(match prefix {
            None => parts,
            Some(current) => current
                .into_iter()
                .zip(parts)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }
    normalize(&prefix.unwrap_or_default().join("/"))
}

/// Turn an arbitrary name into a single path segment.
///
/// Separators become `_`, as does a leading [`OVERLAY_MARK`]. Returns
/// `None` when nothing but whitespace is left.
pub fn segment_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut out = trimmed.replace('/', "_");
    if out.starts_with(OVERLAY_MARK) {
        out.replace_range(..1, "_");
    }
    Some(out)
}

/// Does the path end in an overlay segment?
pub fn is_overlay(path: &str) -> bool {
    segments(path)
        .last()
        .is_some_and(|s| s.starts_with(OVERLAY_MARK))
}

/// The container an overlay belongs to: the path with trailing overlay
/// segments removed. Other paths are their own scope.
pub fn scope(path: &str) -> String {
    let parts: Vec<&str> = segments(path).collect();
    let keep = parts
        .iter()
        .rposition(|s| !s.starts_with(OVERLAY_MARK))
        .map_or(0, |i| i + 1);
    normalize(&parts[..keep].join("/"))
}

/// Hands out overlay paths that collide with nothing already taken.
#[derive(Debug, Default)]
pub struct OverlayPaths {
    taken: HashSet<String>,
}

impl OverlayPaths {
    pub fn new<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            taken: existing.into_iter().map(normalize).collect(),
        }
    }

    /// `<ancestor>/#<label>`, with `~2`, `~3`, ... appended on collision.
    pub fn claim(&mut self, ancestor: &str, label: &str) -> String {
        let label = segment_name(label).unwrap_or_else(|| "_".to_string());
        let base = join(ancestor, &format!("{}{}", OVERLAY_MARK, label.trim_start_matches('_')));
        let mut candidate = base.clone();
        let mut n = 1;
        while self.taken.contains(&candidate) {
            n += 1;
            candidate = format!("{}~{}", base, n);
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_ignores_extra_slashes() {
        assert_eq!(normalize("/root/a"), "/root/a");
        assert_eq!(normalize("root/a/"), "/root/a");
        assert_eq!(normalize("//root//a"), "/root/a");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("/"), "");
    }

    #[test]
    fn depth_counts_from_top_level() {
        assert_eq!(group_depth("/root"), Some(0));
        assert_eq!(group_depth("/root/a"), Some(1));
        assert_eq!(group_depth("/"), None);
    }

    #[test]
    fn parent_of_nested_and_top_level() {
        assert_eq!(parent("/root/a/s1").as_deref(), Some("/root/a"));
        assert_eq!(parent("/root").as_deref(), Some(""));
        assert_eq!(parent(""), None);
    }

    #[test]
    fn within_is_segment_aware() {
        assert!(is_within("/root/a/s1", "/root/a"));
        assert!(is_within("/root/a", "/root/a"));
        assert!(is_within("/root/a", ""));
        // "/root/ab" shares a string prefix but is not nested
        assert!(!is_within("/root/ab", "/root/a"));
        assert!(!is_within("/root", "/root/a"));
    }

    #[test]
    fn join_and_common_ancestor() {
        assert_eq!(join("", "g1"), "/g1");
        assert_eq!(join("/g1", "_2"), "/g1/_2");
        assert_eq!(common_ancestor(["/a/b/c", "/a/b/d", "/a/b"]), "/a/b");
        assert_eq!(common_ancestor(["/a/x", "/b/y"]), "");
        assert_eq!(common_ancestor(std::iter::empty::<&str>()), "");
    }

    #[test]
    fn segment_names_stay_single_segments() {
        assert_eq!(segment_name(" petal ").as_deref(), Some("petal"));
        assert_eq!(segment_name("a/b").as_deref(), Some("a_b"));
        assert_eq!(segment_name("#red").as_deref(), Some("_red"));
        assert_eq!(segment_name("  "), None);
        assert_eq!(segment_name(""), None);
    }

    #[test]
    fn overlays_are_scoped_to_their_container() {
        assert!(is_overlay("/a/#red"));
        assert!(!is_overlay("/a/red"));
        assert!(!is_overlay(""));
        assert_eq!(scope("/a/#red"), "/a");
        assert_eq!(scope("/#all"), "");
        assert_eq!(scope("/a/b"), "/a/b");
    }

    #[test]
    fn overlay_paths_never_collide() {
        let mut paths = OverlayPaths::new(["/a", "/a/#left"]);
        assert_eq!(paths.claim("/a", "left"), "/a/#left~2");
        assert_eq!(paths.claim("/a", "left"), "/a/#left~3");
        assert_eq!(paths.claim("", "_3"), "/#3");
        assert_eq!(paths.claim("/a", "x/y"), "/a/#x_y");
    }
}
