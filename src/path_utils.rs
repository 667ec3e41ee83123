//! Path decomposition utilities for run classification
//!
//! Run directories encode their classification in the directory names, e.g.
//! `runs/2. DOCKER/1. BRIDGED/QOS1_s-c/CLIENT/run_3`. This module turns such a
//! path into the cleaned segment list the classifier scans.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path};
use tracing::debug;

/// Leading ordinal such as `"3. "` used to keep directories sorted
static ORDINAL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("Failed to compile ordinal prefix regex"));

/// Strip a leading `"N. "` ordinal and surrounding whitespace from one segment
///
/// # Examples
/// ```
/// use netbench::path_utils::clean_segment;
/// assert_eq!(clean_segment("2. DOCKER"), "DOCKER");
/// assert_eq!(clean_segment("  CROSS-HOSTS "), "CROSS-HOSTS");
/// ```
pub fn clean_segment(segment: &str) -> String {
    ORDINAL_PREFIX.replace(segment.trim(), "").trim().to_string()
}

/// Decompose `path` into cleaned segments, relative to `root` when possible
///
/// Ancestors of the runs root are excluded so that the location of the
/// checkout (e.g. `/home/vmuser/...`) never leaks into classification.
pub fn path_segments(path: &Path, root: &Path) -> Vec<String> {
    let relative = match path.strip_prefix(root) {
        Ok(rel) => rel,
        Err(_) => {
            debug!(
                "Path {:?} is not under runs root {:?}, classifying full path",
                path, root
            );
            path
        }
    };

    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(clean_segment(&name.to_string_lossy())),
            _ => None,
        })
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Display form of a path with forward slashes, used for the `path` column
pub fn display_path(path: &Path) -> String {
    let text = path.to_string_lossy();
    if cfg!(windows) {
        text.replace('\\', "/")
    } else {
        text.to_string()
    }
}
