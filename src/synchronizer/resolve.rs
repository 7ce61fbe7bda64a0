use super::*;
use crate::workspace::ChangeKinds;

enum Resolution {
    Keep,
    Drop,
}

impl<'a, W, P, FS> OfflineSynchronizer<'a, W, P, FS>
where
    W: Workspace,
    P: OfflineSynchronizerProvider,
    FS: virtual_fs::FS,
{
    /// Rewrites the detected changes that collide with changes already pending on the server.
    ///
    /// Every pending change on the same local path is applied in turn, a dropped change is not
    /// examined further. Adds that turn out to be the retained source of a pending rename are
    /// removed at the end.
    pub(super) fn resolve_changes(
        &self,
        changes: Vec<OfflineChange>,
        server_changes: &[PendingChange],
        excluded_dirs: &ExcludedDirs,
        monitor: &dyn TaskMonitor,
    ) -> Result<Vec<OfflineChange>> {
        let mut resolved = Vec::with_capacity(changes.len());
        let mut superseded_adds: Vec<PathBuf> = vec![];

        'changes: for mut change in changes {
            for server_change in server_changes {
                check_canceled(monitor)?;

                match server_change.local_item {
                    Some(ref local_item) if local_item.as_path() == change.local_path() => (),
                    _ => continue,
                }

                let resolution = self.resolve_conflict(
                    &mut change,
                    server_change,
                    excluded_dirs,
                    &mut superseded_adds,
                )?;
                if let Resolution::Drop = resolution {
                    debug!("Dropping {}, already pending on the server", change);
                    continue 'changes;
                }
            }
            resolved.push(change);
        }

        if !superseded_adds.is_empty() {
            resolved.retain(|change| {
                !(change.primary() == OfflineChangeType::Add
                    && superseded_adds
                        .iter()
                        .any(|source| source.as_path() == change.local_path()))
            });
        }

        Ok(resolved)
    }

    fn resolve_conflict(
        &self,
        change: &mut OfflineChange,
        server_change: &PendingChange,
        excluded_dirs: &ExcludedDirs,
        superseded_adds: &mut Vec<PathBuf>,
    ) -> Result<Resolution> {
        let kinds = server_change.change_kinds;

        // Edited locally, but the server already has an add/edit pending.
        if change.has_change_type(OfflineChangeType::Edit)
            && (kinds.contains(ChangeKinds::ADD) || kinds.contains(ChangeKinds::EDIT))
        {
            return Ok(Resolution::Drop);
        }

        // Deleted locally, the server has a pending add we simply undo.
        if change.has_change_type(OfflineChangeType::Delete) && kinds.contains(ChangeKinds::ADD) {
            change.replace_primary(OfflineChangeType::Undo);
            debug!("Resolved to {}", change);
            return Ok(Resolution::Keep);
        }

        // Deleted locally, the server has a pending edit. Undo it and pend the delete.
        if change.has_change_type(OfflineChangeType::Delete) && kinds.contains(ChangeKinds::EDIT) {
            change.replace_primary(OfflineChangeType::Undo);
            change.add_secondary(OfflineChangeType::Delete);
            debug!("Resolved to {}", change);
            return Ok(Resolution::Keep);
        }

        // Present locally, but pending delete on the server. Undo the delete, pend an edit.
        if change.has_change_type(OfflineChangeType::Add) && kinds.contains(ChangeKinds::DELETE) {
            change.replace_primary(OfflineChangeType::Undo);
            change.add_secondary(OfflineChangeType::Edit);
            debug!("Resolved to {}", change);
            return Ok(Resolution::Keep);
        }

        // The target of a pending rename is gone locally.
        if change.has_change_type(OfflineChangeType::Delete) && kinds.contains(ChangeKinds::RENAME)
        {
            change.replace_primary(OfflineChangeType::Undo);
            self.resolve_rename_source(change, server_change, excluded_dirs, superseded_adds)?;
            debug!("Resolved to {}", change);
            return Ok(Resolution::Keep);
        }

        Ok(Resolution::Keep)
    }

    /// After undoing a rename, the source either got deleted (pend the delete) or it still
    /// exists (pend an edit and forget about it being a new file).
    fn resolve_rename_source(
        &self,
        change: &mut OfflineChange,
        server_change: &PendingChange,
        excluded_dirs: &ExcludedDirs,
        superseded_adds: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let source_local_path = match server_change
            .source_server_item
            .as_ref()
            .and_then(|source| self.workspace.server_to_local_path(source))
        {
            Some(source_local_path) => source_local_path,
            None => return Ok(()),
        };

        if !self.fs_access.exists(&source_local_path)? {
            if !excluded_dirs.is_excluded(&source_local_path)
                && self.filter.should_pend(
                    &source_local_path,
                    OfflineChangeType::Delete,
                    change.server_item_type(),
                )
            {
                change.add_secondary(OfflineChangeType::Delete);
                change.set_source_local_path(source_local_path);
            }
        } else {
            superseded_adds.push(source_local_path.clone());
            if !excluded_dirs.is_excluded(&source_local_path)
                && self
                    .filter
                    .should_pend(&source_local_path, OfflineChangeType::Edit, None)
            {
                change.add_secondary(OfflineChangeType::Edit);
                change.set_source_local_path(source_local_path);
            }
        }

        Ok(())
    }
}
