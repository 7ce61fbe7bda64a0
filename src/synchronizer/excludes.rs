use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Directories the inclusion policy told us not to descend into.
///
/// Items beneath an excluded directory were never visited, so their absence on disk must not be
/// mistaken for a deletion. The directory itself is visited and therefore not excluded.
#[derive(Debug, Default)]
pub(super) struct ExcludedDirs {
    dirs: BTreeSet<PathBuf>,
}

impl ExcludedDirs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dir: PathBuf) {
        self.dirs.insert(dir);
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Is the path strictly beneath one of the excluded directories?
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.dirs.is_empty() {
            return false;
        }

        path.ancestors()
            .skip(1)
            .any(|ancestor| self.dirs.contains(ancestor))
    }
}
