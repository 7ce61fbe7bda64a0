//! Turns detected offline changes into pend operations on the workspace.
use std::path::PathBuf;

use crate::change::{OfflineChange, OfflineChangeType};
use crate::workspace::{ItemSpec, PendOptions, RecursionType, Result, Workspace};

/// Pends offline changes in batches: undo, add, edit and delete, followed by one property
/// change per path and property (if the server supports properties at all).
///
/// All batches target the source local path of a change. A change carrying several content
/// kinds (e.g. undo + edit) takes part in each of the corresponding batches.
pub struct OfflinePender<'a, W: Workspace> {
    workspace: &'a W,
}

impl<'a, W: Workspace> OfflinePender<'a, W> {
    pub fn new(workspace: &'a W) -> Self {
        Self { workspace }
    }

    /// Pends all changes and returns the number of paths the workspace did not accept.
    ///
    /// Partial failures are not retried, errors talking to the server abort immediately.
    pub fn pend_changes(&self, changes: &[OfflineChange]) -> Result<usize> {
        let mut failures = 0;

        let undo_paths = paths_with(changes, OfflineChangeType::Undo);
        if !undo_paths.is_empty() {
            let specs: Vec<ItemSpec> = undo_paths
                .iter()
                .map(|path| ItemSpec::new(path.clone(), RecursionType::None))
                .collect();
            let options = PendOptions {
                no_disk_update: true,
                overwrite: true,
                ..PendOptions::default()
            };
            let succeeded = self.workspace.undo(&specs, options)?;
            failures += count_failures("undo", specs.len(), succeeded);
        }

        let add_paths = paths_with(changes, OfflineChangeType::Add);
        if !add_paths.is_empty() {
            let options = PendOptions {
                detect_encoding: true,
                ..PendOptions::default()
            };
            let succeeded = self.workspace.pend_add(&add_paths, options)?;
            failures += count_failures("add", add_paths.len(), succeeded);
        }

        let edit_paths = paths_with(changes, OfflineChangeType::Edit);
        if !edit_paths.is_empty() {
            // Otherwise the server hands out its latest version instead of keeping ours.
            let options = PendOptions {
                force_check_out_local_version: true,
                ..PendOptions::default()
            };
            let succeeded = self.workspace.pend_edit(&edit_paths, options)?;
            failures += count_failures("edit", edit_paths.len(), succeeded);
        }

        let delete_paths = paths_with(changes, OfflineChangeType::Delete);
        if !delete_paths.is_empty() {
            let options = PendOptions {
                no_disk_update: true,
                ..PendOptions::default()
            };
            let succeeded = self.workspace.pend_delete(&delete_paths, options)?;
            failures += count_failures("delete", delete_paths.len(), succeeded);
        }

        if self.workspace.service_level().supports_properties() {
            for change in changes {
                for property_type in change.property_types() {
                    let property = match property_type.property_value() {
                        Some(property) => property,
                        None => continue,
                    };
                    let succeeded = self.workspace.pend_property_change(
                        change.source_local_path(),
                        &property,
                        PendOptions::default(),
                    )?;
                    failures += count_failures("property change", 1, succeeded);
                }
            }
        }

        info!(
            "Pended {} offline changes, {} operations failed",
            changes.len(),
            failures
        );
        Ok(failures)
    }
}

fn paths_with(changes: &[OfflineChange], change_type: OfflineChangeType) -> Vec<PathBuf> {
    changes
        .iter()
        .filter(|change| change.has_change_type(change_type))
        .map(|change| change.source_local_path().to_path_buf())
        .collect()
}

fn count_failures(operation: &str, requested: usize, succeeded: usize) -> usize {
    let failed = requested - succeeded.min(requested);
    if failed > 0 {
        warn!("{} of {} {} operations failed", failed, requested, operation);
    }
    failed
}
