use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};

use crate::paths;

/// Extensions (without dot) of files that can be referenced by a project
pub const REFERENCE_EXTENSIONS: [&str; 6] = ["dll", "tlb", "olb", "ocx", "exe", "manifest"];

/// Set of files found under external references directory.
/// Files are keyed by normalized path so membership check
/// ignores case and separators difference.
#[derive(Debug, Default, Clone)]
pub struct ReferenceSet {
    files: BTreeMap<String, PathBuf>,
}

impl ReferenceSet {
    /// Scans directory tree specified by `root` recursively and collects all files
    /// with [`REFERENCE_EXTENSIONS`] extensions. Unreadable entries are skipped.
    #[must_use]
    pub fn scan(root: &Path) -> Self {
        WalkDir::new(crate::decorate_path(&root.to_string_lossy()))
            .skip_hidden(false)
            .follow_links(false)
            .parallelism(Parallelism::Serial)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|f| f.file_type().is_file())
            .map(|f| f.path())
            .filter(|p| is_reference_file(p))
            .collect()
    }

    /// Whether path specified is a known reference file
    #[must_use]
    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        let key = paths::normalize(&path.as_ref().to_string_lossy());
        self.files.contains_key(&key)
    }

    /// Iterates all files in the set as they were found on disk
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.values().map(PathBuf::as_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<PathBuf> for ReferenceSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let files = iter
            .into_iter()
            .map(|p| (paths::normalize(&p.to_string_lossy()), p))
            .collect();
        Self { files }
    }
}

fn is_reference_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            REFERENCE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}
