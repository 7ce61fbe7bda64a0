//! Detects what happened in a working folder while it was disconnected from the server.
//!
//! A run goes through four phases:
//! 1) Fetch the server state (items of the workspace version and the outstanding pending changes)
//! 2) Scan the local disk, classifying adds, edits and property changes
//! 3) Report everything the server knows about, but the scan did not find, as deleted
//! 4) Resolve the detected changes against the server's pending changes
//!
//! Nothing is sent to the server during a run, the resulting changes are pended separately
//! (see OfflinePender).
use std::path::{Path, PathBuf};

use crate::change::{ItemType, OfflineChange, OfflineChangeType};
use crate::filter::{AcceptAllFilter, OfflineSynchronizerFilter};
use crate::fs_interaction::hashing::ContentHash;
use crate::fs_interaction::virtual_fs;
use crate::fs_interaction::FSInteraction;
use crate::monitor::TaskMonitor;
use crate::provider::OfflineSynchronizerProvider;
use crate::workspace::{
    DeletedState, ItemSpec, PendingChange, RecursionType, VersionSpec, Workspace, WorkspaceError,
};

mod errors;
pub use self::errors::{Result, SynchronizerError};

mod excludes;
use self::excludes::ExcludedDirs;

mod server_state;
use self::server_state::{item_type_for_hash, ServerFiles};

mod resolve;
mod scan;

/// How existing, read-only files are compared against the server.
///
/// Writable files are always considered edited, independent of the method.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OfflineSynchronizerMethod {
    /// Compare the MD5 hash of the file content with the server's hash.
    Md5Hash,
    /// Only writable files are considered edited, content is never read.
    WritableFiles,
}

impl Default for OfflineSynchronizerMethod {
    fn default() -> Self {
        OfflineSynchronizerMethod::Md5Hash
    }
}

/// State owned by exactly one detect_changes run.
struct ScanState {
    server_files: ServerFiles,
    excluded_dirs: ExcludedDirs,
    changes: Vec<OfflineChange>,
}

pub struct OfflineSynchronizer<'a, W, P, FS>
where
    W: Workspace,
    P: OfflineSynchronizerProvider,
    FS: virtual_fs::FS,
{
    workspace: &'a W,
    provider: P,
    fs_access: FSInteraction<FS>,
    filter: Box<dyn OfflineSynchronizerFilter + 'a>,
    method: OfflineSynchronizerMethod,
    recursion_type: RecursionType,
    detect_added: bool,
    detect_deleted: bool,
    changes: Vec<OfflineChange>,
}
pub type DefaultOfflineSynchronizer<'a, W, P> =
    OfflineSynchronizer<'a, W, P, virtual_fs::WrapperFS>;

impl<'a, W, P, FS> OfflineSynchronizer<'a, W, P, FS>
where
    W: Workspace,
    P: OfflineSynchronizerProvider,
    FS: virtual_fs::FS,
{
    /// Same as with_fs, but uses the default FS abstraction (OS native calls).
    pub fn new(workspace: &'a W, provider: P) -> Self {
        Self::with_fs(workspace, provider, FS::default())
    }

    /// Creates a synchronizer scanning the resources of the provider.
    /// Defaults: detect adds and deletes, one level of recursion, MD5 comparison, accept all.
    pub fn with_fs(workspace: &'a W, provider: P, fs: FS) -> Self {
        Self {
            workspace,
            provider,
            fs_access: FSInteraction::with_fs(fs),
            filter: Box::new(AcceptAllFilter),
            method: OfflineSynchronizerMethod::default(),
            recursion_type: RecursionType::OneLevel,
            detect_added: true,
            detect_deleted: true,
            changes: vec![],
        }
    }

    pub fn set_detect_added(&mut self, detect_added: bool) {
        self.detect_added = detect_added;
    }

    pub fn set_detect_deleted(&mut self, detect_deleted: bool) {
        self.detect_deleted = detect_deleted;
    }

    pub fn set_filter<F: OfflineSynchronizerFilter + 'a>(&mut self, filter: F) {
        self.filter = Box::new(filter);
    }

    pub fn set_method(&mut self, method: OfflineSynchronizerMethod) {
        self.method = method;
    }

    pub fn set_recursion_type(&mut self, recursion_type: RecursionType) {
        self.recursion_type = recursion_type;
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The changes found by the last successful detect_changes run.
    pub fn changes(&self) -> &[OfflineChange] {
        &self.changes
    }

    /// Detects the offline changes of all provider resources.
    ///
    /// Running this twice without touching the disk or the server yields equal results.
    /// On any error (including cancellation) no partial result is kept.
    pub fn detect_changes(&mut self, monitor: &dyn TaskMonitor) -> Result<Vec<OfflineChange>> {
        self.changes.clear();

        monitor.begin("Detecting offline changes", 400);
        let result = self.run_phases(monitor);
        monitor.done();

        let changes = result?;
        info!("Detected {} offline changes", changes.len());
        self.changes = changes.clone();

        Ok(changes)
    }

    fn run_phases(&self, monitor: &dyn TaskMonitor) -> Result<Vec<OfflineChange>> {
        let roots = self.local_roots();

        // Phase 1: server state
        monitor.set_current_work_description("Examining server state");
        check_canceled(monitor)?;
        let server_files =
            ServerFiles::fetch(self.workspace, &roots, self.recursion_type, monitor)?;
        check_canceled(monitor)?;
        let server_changes = self.workspace.pending_changes()?;
        info!(
            "Server knows {} local paths and {} pending changes",
            server_files.len(),
            server_changes.len()
        );
        monitor.worked(100);

        // Phase 2: local disk
        monitor.set_current_work_description("Examining local filesystem");
        let mut state = ScanState {
            server_files,
            excluded_dirs: ExcludedDirs::new(),
            changes: vec![],
        };
        for root in &roots {
            self.scan_root(root, &mut state, monitor)?;
        }
        info!("Local scan found {} changes", state.changes.len());
        monitor.worked(100);

        // Phase 3: deletions
        monitor.set_current_work_description("Examining local filesystem for deletions");
        self.detect_deletions(&mut state, monitor)?;
        monitor.worked(100);

        // Phase 4: conflicts with pending changes
        monitor.set_current_work_description("Resolving conflicting changes");
        let resolved =
            self.resolve_changes(state.changes, &server_changes, &state.excluded_dirs, monitor)?;
        monitor.worked(100);

        Ok(resolved)
    }

    /// The canonical local paths of all provider resources that have one.
    fn local_roots(&self) -> Vec<PathBuf> {
        self.provider
            .resources()
            .iter()
            .filter_map(|resource| {
                let local_path = self.provider.local_path_for_resource(resource);
                if local_path.is_none() {
                    warn!("Skipping a resource without local path");
                }
                local_path
            })
            .map(|local_path| self.fs_access.canonical_path(&local_path))
            .collect()
    }
}

fn check_canceled(monitor: &dyn TaskMonitor) -> Result<()> {
    if monitor.is_canceled() {
        Err(SynchronizerError::Canceled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests;
