use crate::entry::{DirectoryEntry, EntryId, EntryKind, STAR_ID};
use crate::permissions::{PermissionTable, Permissions};
use beam_service::{ClientHandle, ServiceRequestException};
use beam_support::crypto;
use beam_support::timestamp_secs;
use hashbrown::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub id: i32,
    pub name: String,
    pub properties: String,
    pub owner: EntryId,
}

/// Per-name/per-entry/global subscriber lists (§4.10). Dead handles are
/// pruned lazily on the next notify rather than eagerly on close, since
/// the servlet's `handle_close` already has the client handle in hand
/// and can remove it directly.
#[derive(Default)]
pub struct Subscriptions {
    pub availability: HashMap<String, Vec<ClientHandle>>,
    pub directory_entries: HashMap<EntryId, Vec<ClientHandle>>,
    pub accounts: Vec<ClientHandle>,
}

impl Subscriptions {
    pub fn remove_client(&mut self, client: &ClientHandle) {
        for subscribers in self.availability.values_mut() {
            subscribers.retain(|c| !std::sync::Arc::ptr_eq(c, client));
        }
        for subscribers in self.directory_entries.values_mut() {
            subscribers.retain(|c| !std::sync::Arc::ptr_eq(c, client));
        }
        self.accounts.retain(|c| !std::sync::Arc::ptr_eq(c, client));
    }
}

pub struct LocatorState {
    next_entry_id: EntryId,
    next_service_id: i32,
    pub entries: HashMap<EntryId, DirectoryEntry>,
    accounts_by_name: HashMap<String, EntryId>,
    passwords: HashMap<EntryId, String>,
    pub permissions: PermissionTable,
    services: HashMap<String, Vec<ServiceEntry>>,
    sessions: HashMap<String, EntryId>,
    registered_at: HashMap<EntryId, u64>,
    last_login_at: HashMap<EntryId, u64>,
    pub subscriptions: Subscriptions,
}

impl LocatorState {
    fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(STAR_ID, DirectoryEntry::new(EntryKind::Directory, STAR_ID, "*"));
        LocatorState {
            next_entry_id: STAR_ID + 1,
            next_service_id: 1,
            entries,
            accounts_by_name: HashMap::new(),
            passwords: HashMap::new(),
            permissions: PermissionTable::new(),
            services: HashMap::new(),
            sessions: HashMap::new(),
            registered_at: HashMap::new(),
            last_login_at: HashMap::new(),
            subscriptions: Subscriptions::default(),
        }
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        id
    }

    pub fn make_directory(&mut self, name: &str, parent: EntryId) -> Result<EntryId, ServiceRequestException> {
        if !self.entries.contains_key(&parent) {
            return Err(ServiceRequestException::new("Parent directory does not exist."));
        }
        let id = self.allocate_id();
        let mut entry = DirectoryEntry::new(EntryKind::Directory, id, name);
        entry.parents.insert(parent);
        self.entries.insert(id, entry);
        self.entries.get_mut(&parent).unwrap().children.insert(id);
        Ok(id)
    }

    pub fn make_account(
        &mut self,
        name: &str,
        password: &str,
        parent: EntryId,
    ) -> Result<EntryId, ServiceRequestException> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ServiceRequestException::new("Account name must not be empty."));
        }
        if self.accounts_by_name.contains_key(trimmed) {
            return Err(ServiceRequestException::new("Account already exists."));
        }
        if !self.entries.contains_key(&parent) {
            return Err(ServiceRequestException::new("Parent directory does not exist."));
        }
        let id = self.allocate_id();
        let mut entry = DirectoryEntry::new(EntryKind::Account, id, trimmed);
        entry.parents.insert(parent);
        self.entries.insert(id, entry);
        self.entries.get_mut(&parent).unwrap().children.insert(id);
        self.accounts_by_name.insert(trimmed.to_string(), id);
        let hashed = crypto::hash_password(password)
            .map_err(|e| ServiceRequestException::new(format!("could not hash password: {}", e)))?;
        self.passwords.insert(id, hashed);
        self.registered_at.insert(id, timestamp_secs());
        Ok(id)
    }

    /// Creates `name` under the star directory and grants it every
    /// permission over the star directory, the way the original
    /// constructs its own root account directly against the data store
    /// rather than through a gated service call, so it can administer
    /// the tree from a cold start (`ServiceLocatorServlet`'s
    /// constructor, `set_permissions(root_account, star_directory,
    /// ~0)`). Not exposed over the wire — only `beam_server`'s startup
    /// bootstrap and tests call this directly.
    pub fn bootstrap_root_account(&mut self, name: &str, password: &str) -> Result<EntryId, ServiceRequestException> {
        let id = self.make_account(name, password, STAR_ID)?;
        self.permissions.store(id, STAR_ID, Permissions(crate::permissions::READ | crate::permissions::MOVE | crate::permissions::ADMINISTRATE));
        Ok(id)
    }

    pub fn find_account(&self, name: &str) -> Option<EntryId> {
        self.accounts_by_name.get(name.trim()).copied()
    }

    /// A login succeeds iff `name` resolves to an account and
    /// `password` validates against the stored hash (§4.10); records
    /// last-login time and installs a fresh session id on success.
    pub fn login(&mut self, name: &str, password: &str) -> Result<(EntryId, String), ServiceRequestException> {
        let id = self.find_account(name).ok_or_else(|| ServiceRequestException::new("Login failed."))?;
        let stored = self.passwords.get(&id).ok_or_else(|| ServiceRequestException::new("Login failed."))?;
        if !crypto::verify_password(password, stored) {
            return Err(ServiceRequestException::new("Login failed."));
        }
        let session_id = crypto::generate_session_id();
        self.sessions.insert(session_id.clone(), id);
        self.last_login_at.insert(id, timestamp_secs());
        Ok((id, session_id))
    }

    /// Finds the open session whose id makes `UPPER(SHA1(key||id))`
    /// equal `sha` (§4.9, §6); returns its account on a match.
    pub fn authenticate_session(&self, key: &str, sha: &str) -> Option<i64> {
        for (session_id, account) in self.sessions.iter() {
            if crypto::sha1_hex_upper(format!("{}{}", key, session_id).as_bytes()) == sha {
                return Some(*account as i64);
            }
        }
        None
    }

    pub fn store_password(&mut self, account: EntryId, password: &str) -> Result<(), ServiceRequestException> {
        if !self.entries.contains_key(&account) {
            return Err(ServiceRequestException::new("Account does not exist."));
        }
        let hashed = crypto::hash_password(password)
            .map_err(|e| ServiceRequestException::new(format!("could not hash password: {}", e)))?;
        self.passwords.insert(account, hashed);
        Ok(())
    }

    pub fn has_permission(&self, source: EntryId, target: EntryId, mask: u8) -> bool {
        self.permissions.has_permission(source, target, mask, &self.entries)
    }

    pub fn store_permissions(&mut self, source: EntryId, target: EntryId, permissions: Permissions) {
        self.permissions.store(source, target, permissions);
    }

    pub fn associate(&mut self, child: EntryId, parent: EntryId) -> Result<(), ServiceRequestException> {
        if !self.entries.contains_key(&child) || !self.entries.contains_key(&parent) {
            return Err(ServiceRequestException::new("Entry does not exist."));
        }
        self.entries.get_mut(&parent).unwrap().children.insert(child);
        self.entries.get_mut(&child).unwrap().parents.insert(parent);
        Ok(())
    }

    pub fn detach(&mut self, child: EntryId, parent: EntryId) -> Result<(), ServiceRequestException> {
        let parent_count = self.entries.get(&child).map(|e| e.parents.len()).unwrap_or(0);
        if parent_count <= 1 {
            return Err(ServiceRequestException::new("Cannot detach the only parent; delete instead."));
        }
        if let Some(entry) = self.entries.get_mut(&parent) {
            entry.children.remove(&child);
        }
        if let Some(entry) = self.entries.get_mut(&child) {
            entry.parents.remove(&parent);
        }
        Ok(())
    }

    /// Deletes `id`, recursively removing any child whose only parent
    /// was `id` (§3 lifecycle rule).
    pub fn delete(&mut self, id: EntryId) -> Result<(), ServiceRequestException> {
        if id == STAR_ID {
            return Err(ServiceRequestException::new("Cannot delete the star directory."));
        }
        let entry =
            self.entries.remove(&id).ok_or_else(|| ServiceRequestException::new("Entry does not exist."))?;
        for parent in &entry.parents {
            if let Some(parent_entry) = self.entries.get_mut(parent) {
                parent_entry.children.remove(&id);
            }
        }
        if entry.kind == EntryKind::Account {
            self.accounts_by_name.remove(&entry.name);
            self.passwords.remove(&id);
        }
        let children: Vec<EntryId> = entry.children.iter().copied().collect();
        for child in children {
            if let Some(child_entry) = self.entries.get_mut(&child) {
                child_entry.parents.remove(&id);
            }
            let only_parent = self.entries.get(&child).map(|e| e.parents.is_empty()).unwrap_or(false);
            if only_parent {
                self.delete(child)?;
            }
        }
        Ok(())
    }

    pub fn rename(&mut self, id: EntryId, name: &str) -> Result<(), ServiceRequestException> {
        let entry =
            self.entries.get_mut(&id).ok_or_else(|| ServiceRequestException::new("Entry does not exist."))?;
        entry.name = name.to_string();
        Ok(())
    }

    pub fn register_service(&mut self, name: &str, properties: &str, owner: EntryId) -> i32 {
        let id = self.next_service_id;
        self.next_service_id += 1;
        self.services.entry(name.to_string()).or_insert_with(Vec::new).push(ServiceEntry {
            id,
            name: name.to_string(),
            properties: properties.to_string(),
            owner,
        });
        id
    }

    pub fn unregister_service(&mut self, name: &str, id: i32) {
        if let Some(list) = self.services.get_mut(name) {
            list.retain(|entry| entry.id != id);
        }
    }

    pub fn locate(&self, name: &str) -> Vec<ServiceEntry> {
        self.services.get(name).cloned().unwrap_or_default()
    }

    pub fn registration_time(&self, id: EntryId) -> Option<u64> {
        self.registered_at.get(&id).copied()
    }

    pub fn last_login_time(&self, id: EntryId) -> Option<u64> {
        self.last_login_at.get(&id).copied()
    }

    pub fn all_accounts(&self) -> Vec<EntryId> {
        self.accounts_by_name.values().copied().collect()
    }
}

/// Owns the locator's entire mutable state behind a single mutex; every
/// exposed mutation runs inside `with_transaction` (§4.10, §5), the
/// serialisation primitive the data-store contract is built around.
/// Two operations on the same entry are serialised by the lock itself;
/// nothing here prevents unrelated requests from queuing briefly behind
/// it, which is acceptable for the in-memory reference store.
pub struct DataStore {
    state: Mutex<LocatorState>,
}

impl DataStore {
    pub fn new() -> Self {
        DataStore { state: Mutex::new(LocatorState::new()) }
    }

    pub fn with_transaction<R>(&self, f: impl FnOnce(&mut LocatorState) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_account_rejects_duplicate_names() {
        let mut state = LocatorState::new();
        state.make_account("root", "hunter2", STAR_ID).unwrap();
        assert!(state.make_account("root", "other", STAR_ID).is_err());
    }

    #[test]
    fn login_round_trips_through_bcrypt() {
        let mut state = LocatorState::new();
        state.make_account("root", "hunter2", STAR_ID).unwrap();
        assert!(state.login("root", "wrong").is_err());
        let (account, session_id) = state.login("root", "hunter2").unwrap();
        assert_eq!(state.find_account("root"), Some(account));
        assert_eq!(session_id.len(), 32);
    }

    #[test]
    fn delete_cascades_to_only_children() {
        let mut state = LocatorState::new();
        let dir = state.make_directory("a", STAR_ID).unwrap();
        let nested = state.make_directory("b", dir).unwrap();
        state.delete(dir).unwrap();
        assert!(!state.entries.contains_key(&nested));
    }

    #[test]
    fn detach_keeps_entry_alive_with_remaining_parent() {
        let mut state = LocatorState::new();
        let a = state.make_directory("a", STAR_ID).unwrap();
        let b = state.make_directory("b", STAR_ID).unwrap();
        let shared = state.make_directory("shared", a).unwrap();
        state.associate(shared, b).unwrap();
        state.detach(shared, a).unwrap();
        assert!(state.entries.contains_key(&shared));
        assert!(state.detach(shared, b).is_err());
    }
}
