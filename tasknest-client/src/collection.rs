use std::collections::HashMap;

use crate::model::{Note, RowId, Task};

pub trait Record: Clone {
    fn id(&self) -> RowId;
}

impl Record for Note {
    fn id(&self) -> RowId {
        self.id
    }
}

impl Record for Task {
    fn id(&self) -> RowId {
        self.id
    }
}

/// Last known-good state of a row with mutations in flight.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    index: usize,
    row: Option<T>,
}

#[derive(Debug)]
struct Pending<T> {
    snapshot: Snapshot<T>,
    in_flight: usize,
    /// Placeholder whose create has not been confirmed yet.
    creating: bool,
}

/// Ordered rows plus the snapshots needed to undo optimistic changes.
#[derive(Debug)]
pub struct Collection<T> {
    rows: Vec<T>,
    pending: HashMap<RowId, Pending<T>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            pending: HashMap::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn get(&self, id: RowId) -> Option<&T> {
        self.rows.iter().find(|row| row.id() == id)
    }

    fn position(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == id)
    }

    pub fn replace_all(&mut self, rows: Vec<T>) {
        self.rows = rows;
        self.pending.clear();
    }

    pub fn clear(&mut self) {
        self.replace_all(Vec::new());
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn snapshot(&self, id: RowId) -> Snapshot<T> {
        match self.position(id) {
            Some(index) => Snapshot {
                index,
                row: Some(self.rows[index].clone()),
            },
            None => Snapshot {
                index: self.rows.len(),
                row: None,
            },
        }
    }

    /// Registers a mutation in flight for `id`. The oldest snapshot wins while others are pending.
    ///
    /// A snapshot without a row marks `id` as a placeholder until [`Collection::commit`].
    pub fn track(&mut self, id: RowId, snapshot: Snapshot<T>) {
        let creating = snapshot.row.is_none();
        self.pending
            .entry(id)
            .or_insert(Pending {
                snapshot,
                in_flight: 0,
                creating,
            })
            .in_flight += 1;
    }

    /// The server has not assigned `id` yet, so it cannot be addressed remotely.
    pub fn is_creating(&self, id: RowId) -> bool {
        self.pending.get(&id).is_some_and(|pending| pending.creating)
    }

    pub fn push_front(&mut self, row: T) {
        self.rows.insert(0, row);
    }

    pub fn push_back(&mut self, row: T) {
        self.rows.push(row);
    }

    pub fn update(&mut self, id: RowId, change: impl FnOnce(&mut T)) -> Option<T> {
        let index = self.position(id)?;
        change(&mut self.rows[index]);
        Some(self.rows[index].clone())
    }

    pub fn remove(&mut self, id: RowId) -> Option<T> {
        let index = self.position(id)?;
        Some(self.rows.remove(index))
    }

    /// The server confirmed a mutation of `id`; `confirmed` is its canonical row, `None` once deleted.
    ///
    /// The confirmed row may carry a new id (a placeholder replaced by the stored row).
    /// Rows removed locally in the meantime are not brought back.
    pub fn commit(&mut self, id: RowId, confirmed: Option<T>) {
        if let Some(row) = &confirmed {
            if let Some(index) = self.position(id) {
                self.rows[index] = row.clone();
            }
        }

        let new_id = confirmed.as_ref().map(Record::id);
        if let Some(pending) = self.pending.get_mut(&id) {
            pending.snapshot.row = confirmed;
            pending.creating = false;
            if let Some(index) = self.rows.iter().position(|row| Some(row.id()) == new_id) {
                pending.snapshot.index = index;
            }
        }
        self.settle(id);

        // changes still in flight follow the row to its stored id
        if let Some(new_id) = new_id.filter(|new_id| *new_id != id) {
            if let Some(pending) = self.pending.remove(&id) {
                self.pending.insert(new_id, pending);
            }
        }
    }

    /// Restores the last known-good state of `id`.
    pub fn rollback(&mut self, id: RowId) {
        let Some(Pending { snapshot, .. }) = self.pending.get(&id) else {
            return;
        };
        let Snapshot { index, row } = snapshot.clone();

        match (self.position(id), row) {
            (Some(current), Some(row)) => self.rows[current] = row,
            (Some(current), None) => {
                self.rows.remove(current);
            }
            (None, Some(row)) => self.rows.insert(index.min(self.rows.len()), row),
            (None, None) => {}
        }
        self.settle(id);
    }

    fn settle(&mut self, id: RowId) {
        if let Some(pending) = self.pending.get_mut(&id) {
            pending.in_flight -= 1;
            if pending.in_flight == 0 {
                self.pending.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: RowId, title: &str) -> Note {
        Note {
            id,
            title: title.into(),
            content: String::new(),
            creation_date: None,
            is_pinned: false,
            user_id: Some(1),
        }
    }

    fn titles(collection: &Collection<Note>) -> Vec<&str> {
        collection.rows().iter().map(|note| note.title.as_str()).collect()
    }

    fn collection() -> Collection<Note> {
        let mut collection = Collection::default();
        collection.replace_all(vec![note(1, "a"), note(2, "b"), note(3, "c")]);
        collection
    }

    #[test]
    fn rollback_restores_deleted_row_in_place() {
        let mut notes = collection();

        notes.track(2, notes.snapshot(2));
        notes.remove(2);
        assert_eq!(titles(&notes), ["a", "c"]);

        notes.rollback(2);
        assert_eq!(titles(&notes), ["a", "b", "c"]);
        assert!(!notes.has_pending());
    }

    #[test]
    fn rollback_removes_placeholder() {
        let mut notes = collection();

        notes.track(99, notes.snapshot(99));
        notes.push_front(note(99, "draft"));
        notes.rollback(99);

        assert_eq!(titles(&notes), ["a", "b", "c"]);
    }

    #[test]
    fn commit_replaces_placeholder_with_stored_row() {
        let mut notes = collection();

        notes.track(99, notes.snapshot(99));
        notes.push_front(note(99, "draft"));
        notes.commit(99, Some(note(4, "stored")));

        assert_eq!(notes.rows()[0].id, 4);
        assert_eq!(titles(&notes), ["stored", "a", "b", "c"]);
        assert!(!notes.has_pending());
    }

    #[test]
    fn placeholder_is_creating_until_committed() {
        let mut notes = collection();

        notes.track(99, notes.snapshot(99));
        notes.push_front(note(99, "draft"));
        assert!(notes.is_creating(99));
        assert!(!notes.is_creating(1));

        notes.commit(99, Some(note(4, "stored")));
        assert!(!notes.is_creating(99));
        assert!(!notes.is_creating(4));
    }

    #[test]
    fn pending_changes_move_to_the_stored_id() {
        let mut notes = collection();

        notes.track(99, notes.snapshot(99));
        notes.push_front(note(99, "draft"));
        notes.track(99, notes.snapshot(99));
        notes.commit(99, Some(note(4, "stored")));

        assert!(notes.has_pending());
        notes.rollback(4);

        assert_eq!(titles(&notes), ["stored", "a", "b", "c"]);
        assert!(!notes.has_pending());
    }

    #[test]
    fn rollback_returns_to_last_confirmed_state() {
        let mut notes = collection();

        notes.track(1, notes.snapshot(1));
        notes.update(1, |n| n.title = "first edit".into());
        notes.track(1, notes.snapshot(1));
        notes.update(1, |n| n.title = "second edit".into());

        notes.commit(1, Some(note(1, "first edit")));
        notes.rollback(1);

        assert_eq!(titles(&notes), ["first edit", "b", "c"]);
        assert!(!notes.has_pending());
    }

    #[test]
    fn confirmed_update_does_not_resurrect_deleted_row() {
        let mut notes = collection();

        notes.track(3, notes.snapshot(3));
        notes.update(3, |n| n.is_pinned = true);
        notes.track(3, notes.snapshot(3));
        notes.remove(3);

        notes.commit(3, Some(note(3, "c")));
        notes.commit(3, None);

        assert_eq!(titles(&notes), ["a", "b"]);
        assert!(!notes.has_pending());
    }
}
