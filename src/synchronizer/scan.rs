use super::*;
use crate::fs_interaction::virtual_fs::{FileType, Metadata};
use crate::workspace::{select_matching, EXECUTABLE_KEY, PROPERTY_ENABLED, SYMBOLIC_KEY};

impl<'a, W, P, FS> OfflineSynchronizer<'a, W, P, FS>
where
    W: Workspace,
    P: OfflineSynchronizerProvider,
    FS: virtual_fs::FS,
{
    /// Walks the tree below root depth first, in sorted order.
    pub(super) fn scan_root(
        &self,
        root: &Path,
        state: &mut ScanState,
        monitor: &dyn TaskMonitor,
    ) -> Result<()> {
        debug!("Scanning {:?}", root);

        let mut pending: Vec<(PathBuf, usize)> = vec![(root.to_path_buf(), 0)];
        while let Some((path, depth)) = pending.pop() {
            check_canceled(monitor)?;

            let children = self.visit(&path, depth, state, monitor)?;
            // Reversed, so the smallest child is visited next.
            pending.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }

        Ok(())
    }

    /// Classifies a single path and returns the children that should be visited next.
    fn visit(
        &self,
        path: &Path,
        depth: usize,
        state: &mut ScanState,
        monitor: &dyn TaskMonitor,
    ) -> Result<Vec<PathBuf>> {
        let metadata = self.fs_access.metadata(path)?;
        let is_symlink = metadata.as_ref().map_or(false, Metadata::is_symlink);
        let key = self.fs_access.canonical_path(path);
        trace!("Visiting {:?}", key);

        if is_symlink && !self.workspace.service_level().supports_symlinks() {
            trace!("Skipping symlink {:?}, the server does not support them", key);
            state.server_files.remove(&key);
            return Ok(vec![]);
        }

        let expected_hash = state.server_files.remove(&key);
        let server_item_type = expected_hash.as_ref().map(item_type_for_hash);

        let metadata = match metadata {
            Some(metadata) => metadata,
            None => {
                // A missing root, leave it to the deletion detection.
                if let Some(expected_hash) = expected_hash {
                    state.server_files.insert(key, expected_hash);
                }
                return Ok(vec![]);
            }
        };

        match metadata.file_type() {
            FileType::File | FileType::Link => {
                let change = self.classify_file(
                    path,
                    &key,
                    &metadata,
                    expected_hash,
                    server_item_type,
                    monitor,
                )?;
                if let Some(change) = change {
                    debug!("Detected {}", change);
                    state.changes.push(change);
                }
                Ok(vec![])
            }
            FileType::Dir => {
                if expected_hash.is_none()
                    && self.detect_added
                    && self
                        .filter
                        .should_pend(&key, OfflineChangeType::Add, server_item_type)
                {
                    let change = OfflineChange::new(key.clone(), OfflineChangeType::Add, None);
                    debug!("Detected {}", change);
                    state.changes.push(change);
                }

                if !self.filter.should_recurse(&key) {
                    debug!("Not descending into excluded directory {:?}", key);
                    state.excluded_dirs.insert(key);
                    Ok(vec![])
                } else if self.should_recurse(depth) {
                    Ok(self.fs_access.list_dir(&key)?)
                } else {
                    Ok(vec![])
                }
            }
        }
    }

    fn should_recurse(&self, depth: usize) -> bool {
        if depth == 0 {
            self.recursion_type != RecursionType::None
        } else {
            self.recursion_type == RecursionType::Full
        }
    }

    /// Finds the content and property change of a file or link, filtered independently.
    fn classify_file(
        &self,
        path: &Path,
        key: &Path,
        metadata: &Metadata,
        expected_hash: Option<ContentHash>,
        server_item_type: Option<ItemType>,
        monitor: &dyn TaskMonitor,
    ) -> Result<Option<OfflineChange>> {
        let (content_type, property_type) = match expected_hash {
            None if self.detect_added => {
                let property_type = if metadata.is_symlink() {
                    Some(OfflineChangeType::SetSymlink)
                } else if metadata.executable() {
                    Some(OfflineChangeType::SetExecutable)
                } else {
                    None
                };
                (Some(OfflineChangeType::Add), property_type)
            }
            None => (None, None),
            Some(expected_hash) => {
                let content_type = if self.is_changed(path, metadata, &expected_hash, monitor)? {
                    Some(OfflineChangeType::Edit)
                } else {
                    None
                };
                let property_type = if self.workspace.service_level().supports_properties() {
                    self.detect_property_change(key, metadata)?
                } else {
                    None
                };
                (content_type, property_type)
            }
        };

        let mut change = None;
        if let Some(content_type) = content_type {
            if self.filter.should_pend(key, content_type, server_item_type) {
                change = Some(OfflineChange::new(key, content_type, server_item_type));
            }
        }
        if let Some(property_type) = property_type {
            if self.filter.should_pend(key, property_type, server_item_type) {
                change = match change {
                    Some(mut change) => {
                        change.add_secondary(property_type);
                        Some(change)
                    }
                    None => Some(OfflineChange::new(key, property_type, server_item_type)),
                };
            }
        }

        Ok(change)
    }

    fn is_changed(
        &self,
        path: &Path,
        metadata: &Metadata,
        expected_hash: &ContentHash,
        monitor: &dyn TaskMonitor,
    ) -> Result<bool> {
        if metadata.is_symlink() {
            let actual_hash = self.fs_access.calculate_symlink_hash(path)?;
            trace!("Link {:?}: {} (server {})", path, actual_hash, expected_hash);
            return Ok(&actual_hash != expected_hash);
        }

        // Writable files would end up as writable conflicts, always pend them as edits.
        if metadata.writable() {
            return Ok(true);
        }

        match self.method {
            OfflineSynchronizerMethod::Md5Hash => {
                check_canceled(monitor)?;
                let actual_hash = self.fs_access.calculate_hash(path, monitor)?;
                trace!("File {:?}: {} (server {})", path, actual_hash, expected_hash);
                Ok(&actual_hash != expected_hash)
            }
            OfflineSynchronizerMethod::WritableFiles => Ok(false),
        }
    }

    /// Compares the symlink and executable flags on the server with the local ones.
    /// A symlink mismatch takes priority, the executable flag only matters for non-links.
    fn detect_property_change(
        &self,
        key: &Path,
        metadata: &Metadata,
    ) -> Result<Option<OfflineChangeType>> {
        let item_sets = self.workspace.query_items_with_properties(
            &[ItemSpec::new(key, RecursionType::None)],
            VersionSpec::Latest,
            DeletedState::Any,
            &[SYMBOLIC_KEY, EXECUTABLE_KEY],
        )?;

        let (symlink_on_server, executable_on_server) = item_sets
            .first()
            .and_then(|item_set| item_set.items.first())
            .map_or((false, false), |item| {
                (
                    select_matching(&item.property_values, SYMBOLIC_KEY) == Some(PROPERTY_ENABLED),
                    select_matching(&item.property_values, EXECUTABLE_KEY)
                        == Some(PROPERTY_ENABLED),
                )
            });

        let is_symlink = metadata.is_symlink();
        if symlink_on_server != is_symlink {
            Ok(Some(if is_symlink {
                OfflineChangeType::SetSymlink
            } else {
                OfflineChangeType::ClearSymlink
            }))
        } else if !is_symlink && executable_on_server != metadata.executable() {
            Ok(Some(if metadata.executable() {
                OfflineChangeType::SetExecutable
            } else {
                OfflineChangeType::ClearExecutable
            }))
        } else {
            Ok(None)
        }
    }

    /// Reports every server path the scan did not account for as deleted.
    pub(super) fn detect_deletions(
        &self,
        state: &mut ScanState,
        monitor: &dyn TaskMonitor,
    ) -> Result<()> {
        if !self.detect_deleted {
            return Ok(());
        }

        let server_files = std::mem::take(&mut state.server_files);
        for (path, hash) in server_files.into_sorted() {
            check_canceled(monitor)?;

            let server_item_type = item_type_for_hash(&hash);
            if state.excluded_dirs.is_excluded(&path) {
                trace!("Ignoring {:?} below an excluded directory", path);
                continue;
            }
            if self
                .filter
                .should_pend(&path, OfflineChangeType::Delete, Some(server_item_type))
            {
                let change =
                    OfflineChange::new(path, OfflineChangeType::Delete, Some(server_item_type));
                debug!("Detected {}", change);
                state.changes.push(change);
            }
        }

        Ok(())
    }
}
