use super::*;
use std::collections::HashMap;

/// What the server believes exists locally, keyed by local path.
///
/// Entries are removed while the local disk is scanned, whatever is left afterwards was not
/// found on disk and is a deletion candidate.
#[derive(Debug, Default)]
pub(super) struct ServerFiles {
    files: HashMap<PathBuf, ContentHash>,
}

impl ServerFiles {
    /// Queries the workspace version of all roots and maps the returned items to local paths.
    ///
    /// Every ancestor of a returned item up to the queried root gets an empty (folder) hash, so
    /// intermediate directories are never reported as local adds.
    pub fn fetch<W: Workspace>(
        workspace: &W,
        roots: &[PathBuf],
        recursion: RecursionType,
        monitor: &dyn TaskMonitor,
    ) -> Result<Self> {
        let specs: Vec<ItemSpec> = roots
            .iter()
            .map(|root| ItemSpec::new(root.clone(), recursion))
            .collect();
        let item_sets =
            workspace.query_items(&specs, VersionSpec::Workspace, DeletedState::NonDeleted)?;
        if item_sets.len() != specs.len() {
            return Err(WorkspaceError::MismatchedResultCount {
                expected: specs.len(),
                actual: item_sets.len(),
            }
            .into());
        }

        let mut server_files = Self::default();
        for (spec, item_set) in specs.iter().zip(item_sets) {
            for item in item_set.items {
                check_canceled(monitor)?;

                let local_path = match workspace.server_to_local_path(&item.server_item) {
                    Some(local_path) => local_path,
                    None => {
                        trace!("Server item {} is not mapped locally", item.server_item);
                        continue;
                    }
                };
                server_files.add_local_parents(&spec.path, &local_path);
                server_files.files.insert(local_path, item.content_hash);
            }
        }

        Ok(server_files)
    }

    fn add_local_parents(&mut self, base: &Path, local_path: &Path) {
        let mut current = local_path;
        while current != base {
            let parent = match current.parent() {
                Some(parent) if parent.starts_with(base) => parent,
                _ => return,
            };
            if self.files.contains_key(parent) {
                return;
            }

            self.files.insert(parent.to_path_buf(), ContentHash::empty());
            current = parent;
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn insert(&mut self, path: PathBuf, hash: ContentHash) {
        self.files.insert(path, hash);
    }

    pub fn remove(&mut self, path: &Path) -> Option<ContentHash> {
        self.files.remove(path)
    }

    /// The remaining entries, sorted by path.
    pub fn into_sorted(self) -> Vec<(PathBuf, ContentHash)> {
        let mut remaining: Vec<_> = self.files.into_iter().collect();
        remaining.sort_by(|(left, _), (right, _)| left.cmp(right));
        remaining
    }
}

/// Folders are reported without a content hash.
pub(super) fn item_type_for_hash(hash: &ContentHash) -> ItemType {
    if hash.is_empty() {
        ItemType::Folder
    } else {
        ItemType::File
    }
}
