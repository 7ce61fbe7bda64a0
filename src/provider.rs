use std::path::PathBuf;

/// Supplies the resources a synchronization run covers and maps them onto local paths.
pub trait OfflineSynchronizerProvider {
    type Resource;

    fn resources(&self) -> Vec<Self::Resource>;

    /// The local path of a resource, None if the resource has no local representation.
    fn local_path_for_resource(&self, resource: &Self::Resource) -> Option<PathBuf>;
}

/// Provider over a plain list of local paths.
#[derive(Debug, Clone, Default)]
pub struct PathListProvider {
    paths: Vec<PathBuf>,
}

impl PathListProvider {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl OfflineSynchronizerProvider for PathListProvider {
    type Resource = PathBuf;

    fn resources(&self) -> Vec<PathBuf> {
        self.paths.clone()
    }

    fn local_path_for_resource(&self, resource: &PathBuf) -> Option<PathBuf> {
        Some(resource.clone())
    }
}
