use super::*;
use crate::fs_interaction::hashing;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PendOperation {
    Undo,
    Add,
    Edit,
    Delete,
    PropertyChange,
}

/// One recorded call of a pend operation against an InMemoryWorkspace.
#[derive(Debug, Clone, PartialEq)]
pub struct PendCall {
    pub operation: PendOperation,
    pub paths: Vec<PathBuf>,
    pub options: PendOptions,
    pub property: Option<PropertyValue>,
}

/// A workspace that keeps the 'server' in memory, used to test the synchronizer and pender.
///
/// Maps one server folder (e.g. $/Project) onto one local folder. Items are stored by their
/// server path. Every pend call is recorded and can optionally be limited to accept only a
/// number of paths, simulating partial failures on the server side.
pub struct InMemoryWorkspace {
    server_root: String,
    local_root: PathBuf,
    service_level: Cell<ServiceLevel>,
    items: RefCell<BTreeMap<String, Item>>,
    pending_changes: RefCell<Vec<PendingChange>>,
    unreachable: Cell<bool>,
    accept_limits: RefCell<HashMap<PendOperation, usize>>,
    calls: RefCell<Vec<PendCall>>,
    next_change_set: Cell<i32>,
}

impl InMemoryWorkspace {
    pub fn new<P: Into<PathBuf>>(server_root: &str, local_root: P) -> Self {
        Self {
            server_root: server_root.trim_end_matches('/').to_string(),
            local_root: local_root.into(),
            service_level: Cell::new(ServiceLevel::Tfs2012_2),
            items: RefCell::new(BTreeMap::new()),
            pending_changes: RefCell::new(Vec::new()),
            unreachable: Cell::new(false),
            accept_limits: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
            next_change_set: Cell::new(1),
        }
    }

    pub fn set_service_level(&self, level: ServiceLevel) {
        self.service_level.set(level);
    }

    /// While unreachable, every query and pend call fails with a communication error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.set(unreachable);
    }

    /// Lets the given operation accept at most `limit` paths per call.
    pub fn set_accept_limit(&self, operation: PendOperation, limit: usize) {
        self.accept_limits.borrow_mut().insert(operation, limit);
    }

    pub fn add_folder(&self, server_item: &str) {
        self.insert_item(server_item, ContentHash::empty(), Vec::new());
    }

    pub fn add_file(&self, server_item: &str, content: &[u8]) {
        self.insert_item(server_item, hashing::hash_bytes(content), Vec::new());
    }

    pub fn add_symlink(&self, server_item: &str, target: &str) {
        self.insert_item(
            server_item,
            hashing::hash_string(target),
            vec![PropertyValue::new(SYMBOLIC_KEY, PROPERTY_ENABLED)],
        );
    }

    pub fn set_property(&self, server_item: &str, name: &str, value: &str) {
        if let Some(item) = self.items.borrow_mut().get_mut(server_item) {
            item.property_values.retain(|property| property.name != name);
            item.property_values.push(PropertyValue::new(name, value));
        }
    }

    pub fn remove_item(&self, server_item: &str) {
        self.items.borrow_mut().remove(server_item);
    }

    pub fn add_pending_change(&self, change: PendingChange) {
        self.pending_changes.borrow_mut().push(change);
    }

    /// All pend calls performed so far, in call order.
    pub fn calls(&self) -> Vec<PendCall> {
        self.calls.borrow().clone()
    }

    fn insert_item(
        &self,
        server_item: &str,
        content_hash: ContentHash,
        properties: Vec<PropertyValue>,
    ) {
        let change_set_id = self.next_change_set.get();
        self.next_change_set.set(change_set_id + 1);

        self.items.borrow_mut().insert(
            server_item.to_string(),
            Item {
                server_item: server_item.to_string(),
                content_hash,
                change_set_id,
                property_values: properties,
            },
        );
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.get() {
            Err(WorkspaceError::Communication {
                message: String::from("server unreachable"),
            })
        } else {
            Ok(())
        }
    }

    fn matches(queried: &str, server_item: &str, recursion: RecursionType) -> bool {
        if queried == server_item {
            return true;
        }

        match recursion {
            RecursionType::None => false,
            RecursionType::OneLevel => {
                server_item.rsplitn(2, '/').nth(1).map_or(false, |parent| parent == queried)
            }
            RecursionType::Full => server_item.starts_with(&format!("{}/", queried)),
        }
    }

    fn query(&self, specs: &[ItemSpec], with_properties: bool) -> Result<Vec<ItemSet>> {
        self.check_reachable()?;

        let items = self.items.borrow();
        let result = specs
            .iter()
            .map(|spec| {
                let queried = match self.local_to_server_path(&spec.path) {
                    Some(queried) => queried,
                    None => return ItemSet::default(),
                };
                ItemSet {
                    items: items
                        .values()
                        .filter(|item| Self::matches(&queried, &item.server_item, spec.recursion))
                        .map(|item| {
                            let mut item = item.clone();
                            if !with_properties {
                                item.property_values.clear();
                            }
                            item
                        })
                        .collect(),
                }
            })
            .collect();

        Ok(result)
    }

    fn record(
        &self,
        operation: PendOperation,
        paths: Vec<PathBuf>,
        options: PendOptions,
        property: Option<PropertyValue>,
    ) -> Result<usize> {
        self.check_reachable()?;

        let requested = paths.len();
        self.calls.borrow_mut().push(PendCall {
            operation,
            paths,
            options,
            property,
        });

        Ok(match self.accept_limits.borrow().get(&operation) {
            Some(limit) => requested.min(*limit),
            None => requested,
        })
    }
}

impl Workspace for InMemoryWorkspace {
    fn service_level(&self) -> ServiceLevel {
        self.service_level.get()
    }

    fn query_items(
        &self,
        specs: &[ItemSpec],
        _version: VersionSpec,
        _deleted_state: DeletedState,
    ) -> Result<Vec<ItemSet>> {
        self.query(specs, false)
    }

    fn query_items_with_properties(
        &self,
        specs: &[ItemSpec],
        _version: VersionSpec,
        _deleted_state: DeletedState,
        _property_filters: &[&str],
    ) -> Result<Vec<ItemSet>> {
        self.query(specs, true)
    }

    fn pending_changes(&self) -> Result<Vec<PendingChange>> {
        self.check_reachable()?;
        Ok(self.pending_changes.borrow().clone())
    }

    fn local_to_server_path(&self, local_path: &Path) -> Option<String> {
        let relative = local_path.strip_prefix(&self.local_root).ok()?;

        let mut server_path = self.server_root.clone();
        for component in relative.components() {
            server_path.push('/');
            server_path.push_str(&component.as_os_str().to_string_lossy());
        }
        Some(server_path)
    }

    fn server_to_local_path(&self, server_path: &str) -> Option<PathBuf> {
        if server_path == self.server_root {
            return Some(self.local_root.clone());
        }

        let relative = server_path.strip_prefix(&format!("{}/", self.server_root))?;
        Some(
            relative
                .split('/')
                .fold(self.local_root.clone(), |path, segment| path.join(segment)),
        )
    }

    fn undo(&self, specs: &[ItemSpec], options: PendOptions) -> Result<usize> {
        let paths = specs.iter().map(|spec| spec.path.clone()).collect();
        self.record(PendOperation::Undo, paths, options, None)
    }

    fn pend_add(&self, paths: &[PathBuf], options: PendOptions) -> Result<usize> {
        self.record(PendOperation::Add, paths.to_vec(), options, None)
    }

    fn pend_edit(&self, paths: &[PathBuf], options: PendOptions) -> Result<usize> {
        self.record(PendOperation::Edit, paths.to_vec(), options, None)
    }

    fn pend_delete(&self, paths: &[PathBuf], options: PendOptions) -> Result<usize> {
        self.record(PendOperation::Delete, paths.to_vec(), options, None)
    }

    fn pend_property_change(
        &self,
        path: &Path,
        property: &PropertyValue,
        options: PendOptions,
    ) -> Result<usize> {
        self.record(
            PendOperation::PropertyChange,
            vec![path.to_path_buf()],
            options,
            Some(property.clone()),
        )
    }
}
