use crate::EntryId;

/// Ordered set of live registrations.
///
/// Each entry gets its own [`EntryId`], so the same underlying value can
/// never collide with itself. Removing an id that is not present is a no-op
/// and never disturbs other entries.
#[derive(Debug)]
pub struct Registry<T> {
    entries: Vec<(EntryId, T)>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry under a fresh id
    pub fn add(&mut self, entry: T) -> EntryId {
        let id = EntryId::new();
        self.insert(id, entry);
        id
    }

    /// Append an entry under a caller-chosen id. Returns false if the id is
    /// already registered, leaving the registry unchanged.
    pub fn insert(&mut self, id: EntryId, entry: T) -> bool {
        if self.contains(id) {
            return false;
        }
        self.entries.push((id, entry));
        true
    }

    /// Remove the entry with this id, returning it if it was present
    pub fn remove(&mut self, id: EntryId) -> Option<T> {
        let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.iter().any(|(entry_id, _)| *entry_id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> Registry<T> {
    /// Copy of the current entries, used as the working set of a drain phase
    pub fn snapshot(&self) -> Vec<(EntryId, T)> {
        self.entries.clone()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
