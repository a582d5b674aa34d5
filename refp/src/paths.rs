//! Path helpers used to match reference hint paths against files found on disk.
//!
//! Project files keep Windows style paths (`..\lib\a.dll`) even when the tool
//! runs elsewhere, so every function here accepts both `\` and `/` separators
//! and treats drive letters (`c:`) as roots regardless of the host.

use std::path::{Component, Path, PathBuf};

use path_clean::PathClean;

const SEPARATORS: [char; 2] = ['/', '\\'];

/// Shows whether path is rooted i.e. starts from separator or drive letter followed by colon
#[must_use]
pub fn is_rooted(path: &str) -> bool {
    let bytes = path.as_bytes();
    match bytes {
        [b'/' | b'\\', ..] => true,
        [drive, b':', ..] => drive.is_ascii_alphabetic(),
        _ => false,
    }
}

/// Joins relative path to the directory specified.
#[must_use]
#[cfg(not(target_os = "windows"))]
pub fn make_path(dir: &Path, relative: &str) -> PathBuf {
    // Converts all possible Windows paths into Unix ones
    relative
        .split('\\')
        .filter(|s| !s.is_empty())
        .fold(PathBuf::from(&dir), |pb, s| pb.join(s))
}

/// Joins relative path to the directory specified.
#[must_use]
#[cfg(target_os = "windows")]
pub fn make_path(dir: &Path, relative: &str) -> PathBuf {
    PathBuf::from(&dir).join(relative)
}

#[cfg(not(target_os = "windows"))]
fn to_native(path: &str) -> PathBuf {
    PathBuf::from(path.replace('\\', "/"))
}

#[cfg(target_os = "windows")]
fn to_native(path: &str) -> PathBuf {
    PathBuf::from(path)
}

/// Makes path absolute using current directory and removes `.` and `..` parts.
/// Falls back to the cleaned path as is if current directory cannot be got.
#[must_use]
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .clean()
}

/// Resolves `path` against `root`. Rooted paths returned unchanged.
/// Relative ones joined to `root` and cleaned from `.` and `..` segments
#[must_use]
pub fn resolve_absolute(root: &Path, path: &str) -> PathBuf {
    if is_rooted(path) {
        return PathBuf::from(path);
    }
    make_path(root, path).clean()
}

/// Same as [`resolve_absolute`] but rooted paths are also cleaned and use native separators
#[must_use]
pub fn resolve_clean(root: &Path, path: &str) -> PathBuf {
    if is_rooted(path) {
        to_native(path).clean()
    } else {
        resolve_absolute(root, path)
    }
}

/// Builds relative path from the directory of `from_file` to `to_file`.
///
/// Returns empty string if any of paths is empty, `from_file` has no parent directory
/// or paths have no common root (different drives on Windows for example).
#[must_use]
pub fn relative_path(from_file: &Path, to_file: &Path) -> String {
    if from_file.as_os_str().is_empty() || to_file.as_os_str().is_empty() {
        return String::new();
    }
    let from = absolute(from_file);
    let Some(dir) = from.parent() else {
        return String::new();
    };
    let to = absolute(to_file);
    if prefix(dir) != prefix(&to) {
        return String::new();
    }
    pathdiff::diff_paths(&to, dir)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn prefix(path: &Path) -> Option<Component<'_>> {
    path.components()
        .next()
        .filter(|c| matches!(c, Component::Prefix(_)))
}

/// Normalizes path for comparison purposes: makes it absolute, cleans it,
/// strips trailing separators and converts to upper case.
#[must_use]
pub fn normalize(path: &str) -> String {
    let native = to_native(path);
    let full = if is_rooted(path) {
        native.clean()
    } else {
        absolute(&native)
    };
    let full = full.to_string_lossy();
    let trimmed = full.trim_end_matches(SEPARATORS);
    if trimmed.is_empty() {
        full.to_uppercase()
    } else {
        trimmed.to_uppercase()
    }
}

/// Replaces all `root` occurrences within `path` by `variable`. Root search is ASCII case insensitive.
#[must_use]
pub fn substitute_root(path: &str, root: &str, variable: &str) -> String {
    if root.is_empty() {
        return path.to_owned();
    }
    let haystack = path.to_ascii_lowercase();
    let needle = root.to_ascii_lowercase();

    let mut result = String::with_capacity(path.len());
    let mut last = 0;
    for (ix, _) in haystack.match_indices(&needle) {
        result.push_str(&path[last..ix]);
        result.push_str(variable);
        last = ix + needle.len();
    }
    result.push_str(&path[last..]);
    result
}

/// Last path segment. Both separators kind are considered
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches(SEPARATORS)
        .rsplit(SEPARATORS)
        .next()
        .unwrap_or(path)
}
