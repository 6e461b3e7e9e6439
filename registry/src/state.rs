use crate::entry::{EntryId, EntryKind, RegistryEntry, ROOT_ID};
use beam_service::ServiceRequestException;
use hashbrown::HashMap;
use std::sync::Mutex;

pub struct RegistryState {
    next_id: EntryId,
    entries: HashMap<EntryId, RegistryEntry>,
    values: HashMap<EntryId, Vec<u8>>,
}

impl RegistryState {
    fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(ROOT_ID, RegistryEntry::new(EntryKind::Directory, ROOT_ID, "/", None));
        RegistryState { next_id: ROOT_ID + 1, entries, values: HashMap::new() }
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn directory(&self, id: EntryId) -> Result<&RegistryEntry, ServiceRequestException> {
        match self.entries.get(&id) {
            Some(entry) if entry.kind == EntryKind::Directory => Ok(entry),
            Some(_) => Err(ServiceRequestException::new("Entry is not a directory.")),
            None => Err(ServiceRequestException::new("Entry does not exist.")),
        }
    }

    pub fn make_directory(&mut self, name: &str, parent: EntryId) -> Result<EntryId, ServiceRequestException> {
        self.directory(parent)?;
        let id = self.allocate_id();
        let entry = RegistryEntry::new(EntryKind::Directory, id, name, Some(parent));
        self.entries.insert(id, entry);
        self.entries.get_mut(&parent).unwrap().children.insert(id);
        Ok(id)
    }

    pub fn make_value(&mut self, name: &str, parent: EntryId) -> Result<EntryId, ServiceRequestException> {
        self.directory(parent)?;
        let id = self.allocate_id();
        let entry = RegistryEntry::new(EntryKind::Value, id, name, Some(parent));
        self.entries.insert(id, entry);
        self.entries.get_mut(&parent).unwrap().children.insert(id);
        self.values.insert(id, Vec::new());
        Ok(id)
    }

    pub fn store_value(&mut self, id: EntryId, bytes: Vec<u8>) -> Result<(), ServiceRequestException> {
        match self.entries.get(&id) {
            Some(entry) if entry.kind == EntryKind::Value => {
                self.values.insert(id, bytes);
                Ok(())
            }
            Some(_) => Err(ServiceRequestException::new("Entry is not a value.")),
            None => Err(ServiceRequestException::new("Entry does not exist.")),
        }
    }

    pub fn load_value(&self, id: EntryId) -> Result<Vec<u8>, ServiceRequestException> {
        self.values.get(&id).cloned().ok_or_else(|| ServiceRequestException::new("Entry does not exist."))
    }

    pub fn load_path(&self, id: EntryId) -> Result<Vec<EntryId>, ServiceRequestException> {
        if !self.entries.contains_key(&id) {
            return Err(ServiceRequestException::new("Entry does not exist."));
        }
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.entries.get(&current).and_then(|e| e.parent) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    pub fn load_parent(&self, id: EntryId) -> Result<Option<EntryId>, ServiceRequestException> {
        self.entries.get(&id).map(|e| e.parent).ok_or_else(|| ServiceRequestException::new("Entry does not exist."))
    }

    pub fn load_children(&self, id: EntryId) -> Result<Vec<EntryId>, ServiceRequestException> {
        self.directory(id).map(|e| e.children.iter().copied().collect())
    }

    /// Deep-copies the subtree rooted at `source` under `new_parent` as
    /// `new_name`, returning the copy's root id.
    pub fn copy(&mut self, source: EntryId, new_parent: EntryId, new_name: &str) -> Result<EntryId, ServiceRequestException> {
        self.directory(new_parent)?;
        let entry = self.entries.get(&source).cloned().ok_or_else(|| ServiceRequestException::new("Entry does not exist."))?;
        let new_id = self.allocate_id();
        self.entries.insert(new_id, RegistryEntry::new(entry.kind, new_id, new_name, Some(new_parent)));
        self.entries.get_mut(&new_parent).unwrap().children.insert(new_id);
        match entry.kind {
            EntryKind::Value => {
                let bytes = self.values.get(&source).cloned().unwrap_or_default();
                self.values.insert(new_id, bytes);
            }
            EntryKind::Directory => {
                let children: Vec<EntryId> = entry.children.iter().copied().collect();
                for child in children {
                    let child_name = self.entries.get(&child).map(|e| e.name.clone()).unwrap_or_default();
                    self.copy(child, new_id, &child_name)?;
                }
            }
        }
        Ok(new_id)
    }

    pub fn move_entry(&mut self, id: EntryId, new_parent: EntryId) -> Result<(), ServiceRequestException> {
        if id == ROOT_ID {
            return Err(ServiceRequestException::new("Cannot move the root directory."));
        }
        self.directory(new_parent)?;
        let old_parent =
            self.entries.get(&id).and_then(|e| e.parent).ok_or_else(|| ServiceRequestException::new("Entry does not exist."))?;
        self.entries.get_mut(&old_parent).unwrap().children.remove(&id);
        self.entries.get_mut(&new_parent).unwrap().children.insert(id);
        self.entries.get_mut(&id).unwrap().parent = Some(new_parent);
        Ok(())
    }

    pub fn delete(&mut self, id: EntryId) -> Result<(), ServiceRequestException> {
        if id == ROOT_ID {
            return Err(ServiceRequestException::new("Cannot delete the root directory."));
        }
        let entry = self.entries.remove(&id).ok_or_else(|| ServiceRequestException::new("Entry does not exist."))?;
        if let Some(parent) = entry.parent {
            if let Some(parent_entry) = self.entries.get_mut(&parent) {
                parent_entry.children.remove(&id);
            }
        }
        self.values.remove(&id);
        let children: Vec<EntryId> = entry.children.iter().copied().collect();
        for child in children {
            self.delete(child)?;
        }
        Ok(())
    }
}

/// Owns the registry's content tree behind a single mutex; every
/// exposed mutation runs inside `with_transaction`, matching the
/// locator's data-store contract (§4.10, §4.11).
pub struct DataStore {
    state: Mutex<RegistryState>,
}

impl DataStore {
    pub fn new() -> Self {
        DataStore { state: Mutex::new(RegistryState::new()) }
    }

    pub fn with_transaction<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }
}
