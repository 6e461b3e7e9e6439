use crate::entry::{DirectoryEntry, EntryId};
use beam_serialize::{ReceiveResult, Receiver, Sender, Shuttle};
use hashbrown::{HashMap, HashSet};

pub const READ: u8 = 1 << 0;
pub const MOVE: u8 = 1 << 1;
pub const ADMINISTRATE: u8 = 1 << 2;

/// Bitset over `{READ, MOVE, ADMINISTRATE}` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions(pub u8);

impl Permissions {
    pub fn none() -> Self {
        Permissions(0)
    }

    pub fn contains(&self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    pub fn with(&self, mask: u8) -> Self {
        Permissions(self.0 | mask)
    }
}

impl Shuttle for Permissions {
    fn send<S: Sender>(&self, sender: &mut S, _version: u32) {
        sender.send_u8(self.0);
    }

    fn receive<R: Receiver>(receiver: &mut R, _version: u32) -> ReceiveResult<Self> {
        Ok(Permissions(receiver.receive_u8()?))
    }
}

/// `(source, target) -> Permissions` granted directly, plus the
/// ancestor-reachability check of §3: a source has permission `P` on a
/// target iff the direct edge grants it, or some ancestor of target
/// (via parent links) does; self always has `READ`.
#[derive(Default)]
pub struct PermissionTable {
    grants: HashMap<(EntryId, EntryId), Permissions>,
}

impl PermissionTable {
    pub fn new() -> Self {
        PermissionTable::default()
    }

    pub fn store(&mut self, source: EntryId, target: EntryId, permissions: Permissions) {
        self.grants.insert((source, target), permissions);
    }

    /// DFS from `target` up through parent links, cycle-safe via a
    /// visited set, short-circuiting as soon as `mask` is satisfied.
    pub fn has_permission(
        &self,
        source: EntryId,
        target: EntryId,
        mask: u8,
        entries: &HashMap<EntryId, DirectoryEntry>,
    ) -> bool {
        if source == target {
            return mask == READ || mask == 0;
        }
        let mut visited = HashSet::new();
        let mut frontier = vec![target];
        while let Some(current) = frontier.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(granted) = self.grants.get(&(source, current)) {
                if granted.contains(mask) {
                    return true;
                }
            }
            if let Some(entry) = entries.get(&current) {
                frontier.extend(entry.parents.iter().copied());
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;

    #[test]
    fn self_always_has_read() {
        let table = PermissionTable::new();
        let entries = HashMap::new();
        assert!(table.has_permission(5, 5, READ, &entries));
    }

    #[test]
    fn permission_on_ancestor_reaches_descendant() {
        let mut entries = HashMap::new();
        let mut child = DirectoryEntry::new(EntryKind::Directory, 2, "child");
        child.parents.insert(1);
        entries.insert(1, DirectoryEntry::new(EntryKind::Directory, 1, "parent"));
        entries.insert(2, child);

        let mut table = PermissionTable::new();
        table.store(9, 1, Permissions(READ));
        assert!(table.has_permission(9, 2, READ, &entries));
        assert!(!table.has_permission(9, 2, ADMINISTRATE, &entries));
    }

    #[test]
    fn cycles_terminate() {
        let mut entries = HashMap::new();
        let mut a = DirectoryEntry::new(EntryKind::Directory, 1, "a");
        a.parents.insert(2);
        let mut b = DirectoryEntry::new(EntryKind::Directory, 2, "b");
        b.parents.insert(1);
        entries.insert(1, a);
        entries.insert(2, b);

        let table = PermissionTable::new();
        assert!(!table.has_permission(9, 1, READ, &entries));
    }
}
