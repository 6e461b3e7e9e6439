use hashbrown::HashSet;

pub type EntryId = u32;

/// `id = -1` in the source; the star directory is always `id = 0`.
pub const NONE_ID: EntryId = u32::MAX;
pub const STAR_ID: EntryId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Account,
    Directory,
}

/// A node in the service-locator DAG (§3, §4.10): an account or a
/// directory, identified by `(kind, id)`. A directory may have several
/// parents; `detach` is only legal while more than one remains —
/// otherwise the caller must `delete`.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub kind: EntryKind,
    pub id: EntryId,
    pub name: String,
    pub parents: HashSet<EntryId>,
    pub children: HashSet<EntryId>,
}

impl DirectoryEntry {
    pub fn new(kind: EntryKind, id: EntryId, name: impl Into<String>) -> Self {
        DirectoryEntry { kind, id, name: name.into(), parents: HashSet::new(), children: HashSet::new() }
    }
}
