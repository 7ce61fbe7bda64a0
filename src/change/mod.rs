use std::fmt;
use std::path::{Path, PathBuf};

use crate::workspace::{
    PropertyValue, EXECUTABLE_KEY, PROPERTY_DISABLED, PROPERTY_ENABLED, SYMBOLIC_KEY,
};

/// The server side type of an item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ItemType {
    File,
    Folder,
}

/// The two independent property axes a change can toggle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PropertyAxis {
    Executable,
    Symlink,
}

/// The kind of an offline change.
///
/// Edit, Add, Delete and Undo describe the content of an item. The remaining kinds toggle a
/// property on the server and carry a property value when pended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OfflineChangeType {
    Edit,
    Add,
    Delete,
    Undo,
    SetExecutable,
    ClearExecutable,
    SetSymlink,
    ClearSymlink,
}

impl OfflineChangeType {
    pub fn is_content(self) -> bool {
        self.property_axis().is_none()
    }

    pub fn property_axis(self) -> Option<PropertyAxis> {
        match self {
            OfflineChangeType::Edit
            | OfflineChangeType::Add
            | OfflineChangeType::Delete
            | OfflineChangeType::Undo => None,
            OfflineChangeType::SetExecutable | OfflineChangeType::ClearExecutable => {
                Some(PropertyAxis::Executable)
            }
            OfflineChangeType::SetSymlink | OfflineChangeType::ClearSymlink => {
                Some(PropertyAxis::Symlink)
            }
        }
    }

    /// The property value the server needs to apply this kind, None for content kinds.
    pub fn property_value(self) -> Option<PropertyValue> {
        match self {
            OfflineChangeType::Edit
            | OfflineChangeType::Add
            | OfflineChangeType::Delete
            | OfflineChangeType::Undo => None,
            OfflineChangeType::SetExecutable => {
                Some(PropertyValue::new(EXECUTABLE_KEY, PROPERTY_ENABLED))
            }
            OfflineChangeType::ClearExecutable => {
                Some(PropertyValue::new(EXECUTABLE_KEY, PROPERTY_DISABLED))
            }
            OfflineChangeType::SetSymlink => {
                Some(PropertyValue::new(SYMBOLIC_KEY, PROPERTY_ENABLED))
            }
            OfflineChangeType::ClearSymlink => {
                Some(PropertyValue::new(SYMBOLIC_KEY, PROPERTY_DISABLED))
            }
        }
    }
}

impl fmt::Display for OfflineChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OfflineChangeType::Edit => "edit",
            OfflineChangeType::Add => "add",
            OfflineChangeType::Delete => "delete",
            OfflineChangeType::Undo => "undo",
            OfflineChangeType::SetExecutable => "+x",
            OfflineChangeType::ClearExecutable => "-x",
            OfflineChangeType::SetSymlink => "+symlink",
            OfflineChangeType::ClearSymlink => "-symlink",
        };
        write!(f, "{}", name)
    }
}

/// The drift detected for one local path while working offline.
///
/// A change always carries at least one kind. The first kind is the primary one, further
/// kinds are appended during conflict resolution (e.g. undo + edit). Each property axis is
/// present at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineChange {
    local_path: PathBuf,
    source_local_path: Option<PathBuf>,
    server_item_type: Option<ItemType>,
    change_types: Vec<OfflineChangeType>,
}

impl OfflineChange {
    pub fn new<P: Into<PathBuf>>(
        local_path: P,
        change_type: OfflineChangeType,
        server_item_type: Option<ItemType>,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            source_local_path: None,
            server_item_type,
            change_types: vec![change_type],
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// The path operations are pended against, the local path unless resolution redirected it.
    pub fn source_local_path(&self) -> &Path {
        self.source_local_path
            .as_ref()
            .map_or(&self.local_path, |source| source)
    }

    pub fn set_source_local_path<P: Into<PathBuf>>(&mut self, source_local_path: P) {
        self.source_local_path = Some(source_local_path.into());
    }

    pub fn server_item_type(&self) -> Option<ItemType> {
        self.server_item_type
    }

    pub fn change_types(&self) -> &[OfflineChangeType] {
        &self.change_types
    }

    pub fn primary(&self) -> OfflineChangeType {
        self.change_types[0]
    }

    pub fn has_change_type(&self, change_type: OfflineChangeType) -> bool {
        self.change_types.contains(&change_type)
    }

    pub fn property_types(&self) -> impl Iterator<Item = OfflineChangeType> + '_ {
        self.change_types
            .iter()
            .copied()
            .filter(|change_type| !change_type.is_content())
    }

    /// Drops all kinds and makes the given one the only (primary) kind.
    pub fn replace_primary(&mut self, change_type: OfflineChangeType) {
        self.change_types.clear();
        self.change_types.push(change_type);
    }

    /// Appends a kind. A property kind replaces any kind on the same property axis,
    /// a content kind that is already present is not added twice.
    pub fn add_secondary(&mut self, change_type: OfflineChangeType) {
        match change_type.property_axis() {
            Some(axis) => {
                if let Some(existing) = self
                    .change_types
                    .iter_mut()
                    .find(|existing| existing.property_axis() == Some(axis))
                {
                    *existing = change_type;
                } else {
                    self.change_types.push(change_type);
                }
            }
            None => {
                if !self.has_change_type(change_type) {
                    self.change_types.push(change_type);
                }
            }
        }
    }
}

impl fmt::Display for OfflineChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<String> = self.change_types.iter().map(|kind| kind.to_string()).collect();
        write!(f, "{} [{}]", self.local_path.display(), kinds.join(", "))?;
        if let Some(source) = &self.source_local_path {
            write!(f, " (from {})", source.display())?;
        }
        Ok(())
    }
}
