//! Contracts of the version control workspace the offline synchronization talks to.
//!
//! The server/client itself is not part of this crate. Everything we need from it (item
//! queries, pending changes, pend operations and path mappings) is expressed through the
//! Workspace trait, all calls are synchronous and blocking from our point of view.
use std::ops::BitOr;
use std::path::{Path, PathBuf};

use crate::fs_interaction::hashing::ContentHash;

mod errors;
pub use self::errors::{Result, WorkspaceError};

mod in_memory;
pub use self::in_memory::{InMemoryWorkspace, PendCall, PendOperation};

/// Property holding the symbolic link flag of an item.
pub const SYMBOLIC_KEY: &str = "Microsoft.TeamFoundation.VersionControl.SymbolicLink";
/// Property holding the executable flag of an item.
pub const EXECUTABLE_KEY: &str = "Microsoft.TeamFoundation.VersionControl.Executable";
pub const PROPERTY_ENABLED: &str = "true";
pub const PROPERTY_DISABLED: &str = "false";

/// How deep an item query reaches below the named path.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecursionType {
    /// Exactly the named path.
    None,
    /// The named path and its immediate children.
    OneLevel,
    /// The whole subtree.
    Full,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// The version the workspace currently has on disk.
    Workspace,
    Latest,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeletedState {
    NonDeleted,
    Deleted,
    Any,
}

/// Server feature levels, ordered by age.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServiceLevel {
    Tfs2010,
    /// First level supporting item properties (executable bit).
    Tfs2012,
    /// First level supporting symbolic links.
    Tfs2012_2,
}

impl ServiceLevel {
    pub fn supports_properties(self) -> bool {
        self >= ServiceLevel::Tfs2012
    }

    pub fn supports_symlinks(self) -> bool {
        self >= ServiceLevel::Tfs2012_2
    }
}

/// A local path plus the recursion used when querying/pending it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpec {
    pub path: PathBuf,
    pub recursion: RecursionType,
}

impl ItemSpec {
    pub fn new<P: Into<PathBuf>>(path: P, recursion: RecursionType) -> Self {
        Self {
            path: path.into(),
            recursion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    pub name: String,
    pub value: String,
}

impl PropertyValue {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Returns the value of the first property with the given name.
pub fn select_matching<'a>(values: &'a [PropertyValue], name: &str) -> Option<&'a str> {
    values
        .iter()
        .find(|value| value.name == name)
        .map(|value| value.value.as_str())
}

/// One item as reported by the server. Folders have an empty content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub server_item: String,
    pub content_hash: ContentHash,
    pub change_set_id: i32,
    pub property_values: Vec<PropertyValue>,
}

/// The items found for one queried ItemSpec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemSet {
    pub items: Vec<Item>,
}

/// The kinds of a pending change, several kinds can be combined (e.g. rename and edit).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ChangeKinds(u8);

impl ChangeKinds {
    pub const NONE: ChangeKinds = ChangeKinds(0);
    pub const ADD: ChangeKinds = ChangeKinds(1);
    pub const EDIT: ChangeKinds = ChangeKinds(1 << 1);
    pub const DELETE: ChangeKinds = ChangeKinds(1 << 2);
    pub const RENAME: ChangeKinds = ChangeKinds(1 << 3);
    pub const BRANCH: ChangeKinds = ChangeKinds(1 << 4);

    pub fn contains(self, other: ChangeKinds) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl BitOr for ChangeKinds {
    type Output = ChangeKinds;

    fn bitor(self, other: ChangeKinds) -> ChangeKinds {
        ChangeKinds(self.0 | other.0)
    }
}

/// A change the server already knows to be pending in the workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub local_item: Option<PathBuf>,
    pub server_item: String,
    /// The server item a rename/branch originates from.
    pub source_server_item: Option<String>,
    pub change_kinds: ChangeKinds,
}

/// Options passed along with pend/undo operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendOptions {
    /// Pend the edit against the local version instead of fetching a newer one.
    pub force_check_out_local_version: bool,
    /// Do not touch the local disk while performing the operation.
    pub no_disk_update: bool,
    /// Overwrite local conflicts.
    pub overwrite: bool,
    /// Detect the encoding of added files automatically.
    pub detect_encoding: bool,
}

/// The capabilities of a version control workspace consumed by the synchronizer and pender.
///
/// Pend operations return the number of paths actually pended, which may be lower than the
/// number requested (e.g. because the server state changed in the meantime).
pub trait Workspace {
    fn service_level(&self) -> ServiceLevel;

    /// Returns exactly one ItemSet per spec, in the same order.
    fn query_items(
        &self,
        specs: &[ItemSpec],
        version: VersionSpec,
        deleted_state: DeletedState,
    ) -> Result<Vec<ItemSet>>;

    /// Same as query_items, but attaches the requested properties to each item.
    fn query_items_with_properties(
        &self,
        specs: &[ItemSpec],
        version: VersionSpec,
        deleted_state: DeletedState,
        property_filters: &[&str],
    ) -> Result<Vec<ItemSet>>;

    fn pending_changes(&self) -> Result<Vec<PendingChange>>;

    fn local_to_server_path(&self, local_path: &Path) -> Option<String>;
    fn server_to_local_path(&self, server_path: &str) -> Option<PathBuf>;

    fn undo(&self, specs: &[ItemSpec], options: PendOptions) -> Result<usize>;
    fn pend_add(&self, paths: &[PathBuf], options: PendOptions) -> Result<usize>;
    fn pend_edit(&self, paths: &[PathBuf], options: PendOptions) -> Result<usize>;
    fn pend_delete(&self, paths: &[PathBuf], options: PendOptions) -> Result<usize>;
    fn pend_property_change(
        &self,
        path: &Path,
        property: &PropertyValue,
        options: PendOptions,
    ) -> Result<usize>;
}
