use std::collections::BTreeSet;

/// The set of item ids the user currently has selected.
///
/// Selection lives outside the store and outside the query functions: it is
/// plain view state. [`select_all`](Self::select_all) replaces the selection
/// with exactly the visible ids, so selecting everything inside a folder view
/// never reaches items in other folders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one id. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn select(&mut self, id: impl Into<String>) {
        self.ids.insert(id.into());
    }

    pub fn deselect(&mut self, id: &str) {
        self.ids.remove(id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Replace the selection with exactly the visible ids.
    pub fn select_all<I, S>(&mut self, visible: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = visible.into_iter().map(Into::into).collect();
    }

    /// Drop ids that no longer exist, e.g. after a delete.
    pub fn retain_existing<'a>(&mut self, existing: impl IntoIterator<Item = &'a str>) {
        let existing: BTreeSet<&str> = existing.into_iter().collect();
        self.ids.retain(|id| existing.contains(id.as_str()));
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}
