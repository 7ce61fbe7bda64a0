use super::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// In-memory file system used to test scans.
///
/// Clones share the same underlying items, so a test can keep one handle to modify the
/// 'disk' while the synchronizer reads through another one.
/// All paths are absolute, the root '/' always exists.
#[derive(Clone)]
pub struct InMemoryFS {
    items: Rc<RefCell<HashMap<PathBuf, InMemoryItem>>>,
}

impl InMemoryFS {
    pub fn new() -> InMemoryFS {
        let mut initial_items = HashMap::new();
        initial_items.insert(PathBuf::from("/"), InMemoryItem::new(FileType::Dir));

        InMemoryFS {
            items: Rc::new(RefCell::new(initial_items)),
        }
    }

    fn parent_exists(&self, path: &Path) -> bool {
        if let Some(parent) = path.parent() {
            self.items
                .borrow()
                .get(parent)
                .map_or(false, |entry| entry.metadata.file_type() == FileType::Dir)
        } else {
            false
        }
    }

    fn insert(&self, path: &Path, item: InMemoryItem) -> io::Result<()> {
        if !self.parent_exists(path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        if self.items.borrow().contains_key(path) {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }

        self.items.borrow_mut().insert(path.to_path_buf(), item);
        Ok(())
    }

    fn modify<P: AsRef<Path>, F: FnOnce(&mut InMemoryItem)>(
        &self,
        path: P,
        change: F,
    ) -> io::Result<()> {
        match self.items.borrow_mut().get_mut(path.as_ref()) {
            Some(item) => {
                change(item);
                Ok(())
            }
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }

    pub fn create_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        self.insert(path.as_ref(), InMemoryItem::new(FileType::Dir))
    }

    /// Creates a writable, non-executable file with the given content.
    pub fn create_file<P: AsRef<Path>>(&self, path: P, content: &[u8]) -> io::Result<()> {
        let mut item = InMemoryItem::new(FileType::File);
        item.content = content.to_vec();
        self.insert(path.as_ref(), item)
    }

    pub fn create_symlink<P: AsRef<Path>, T: AsRef<Path>>(
        &self,
        path: P,
        target: T,
    ) -> io::Result<()> {
        let mut item = InMemoryItem::new(FileType::Link);
        item.link_target = Some(target.as_ref().to_path_buf());
        self.insert(path.as_ref(), item)
    }

    /// Removes the item at path and everything below it.
    pub fn remove<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        if path == Path::new("/") {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        if !self.items.borrow().contains_key(path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        self.items
            .borrow_mut()
            .retain(|item_path, _| !item_path.starts_with(path));
        Ok(())
    }

    pub fn set_read_only<P: AsRef<Path>>(&self, path: P, read_only: bool) -> io::Result<()> {
        self.modify(path, |item| item.metadata.read_only = read_only)
    }

    pub fn set_executable<P: AsRef<Path>>(&self, path: P, executable: bool) -> io::Result<()> {
        self.modify(path, |item| item.metadata.executable = executable)
    }

    pub fn test_set_file_content<P: AsRef<Path>>(
        &self,
        path: P,
        content: Vec<u8>,
    ) -> io::Result<()> {
        self.modify(path, |item| item.content = content)
    }

    /// Makes reads of the given file fail, e.g. to simulate missing permissions.
    pub fn test_set_unreadable<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        self.modify(path, |item| item.unreadable = true)
    }
}

impl FS for InMemoryFS {
    fn default() -> Self {
        Self::new()
    }

    fn canonicalize<P: AsRef<Path>>(&self, path: P) -> io::Result<PathBuf> {
        let path = path.as_ref();

        if self.items.borrow().contains_key(path) {
            Ok(path.to_path_buf())
        } else {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
    }
    fn metadata<P: AsRef<Path>>(&self, path: P) -> io::Result<Metadata> {
        if let Some(item) = self.items.borrow().get(path.as_ref()) {
            Ok(item.metadata.clone())
        } else {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn list_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<Vec<DirEntry>> {
        let path = path.as_ref();

        match self.items.borrow().get(path) {
            Some(item) if item.metadata.file_type() == FileType::Dir => (),
            Some(_) => return Err(io::Error::from(io::ErrorKind::Other)),
            None => return Err(io::Error::from(io::ErrorKind::NotFound)),
        }

        let items = self
            .items
            .borrow()
            .keys()
            .filter(|item_path| item_path.parent() == Some(path))
            .map(|item_path| DirEntry {
                path: item_path.clone(),
            })
            .collect();

        Ok(items)
    }

    fn read_file<P: AsRef<Path>>(&self, path: P) -> io::Result<Box<dyn io::Read>> {
        match self.items.borrow().get(path.as_ref()) {
            Some(item) if item.unreadable => {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            }
            Some(item) if item.metadata.file_type() == FileType::File => {
                Ok(Box::new(io::Cursor::new(item.content.clone())))
            }
            Some(_) => Err(io::Error::from(io::ErrorKind::Other)),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }

    fn read_link<P: AsRef<Path>>(&self, path: P) -> io::Result<PathBuf> {
        match self.items.borrow().get(path.as_ref()) {
            Some(InMemoryItem {
                link_target: Some(target),
                ..
            }) => Ok(target.clone()),
            Some(_) => Err(io::Error::from(io::ErrorKind::InvalidInput)),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }
}

#[derive(Debug)]
struct InMemoryItem {
    metadata: Metadata,
    content: Vec<u8>,
    link_target: Option<PathBuf>,
    unreadable: bool,
}
impl InMemoryItem {
    fn new(file_type: FileType) -> InMemoryItem {
        Self {
            metadata: Metadata {
                read_only: false,
                executable: false,
                file_type,
            },
            content: Vec::new(),
            link_target: None,
            unreadable: false,
        }
    }
}
