use super::chat::ChatDoc;

/// Client-side view of the user's chats.
///
/// The remote store does not guarantee return order, so the list is kept
/// sorted here by descending creation time (newest first, id as tie-break
/// for determinism). The active id always references a chat in the list or
/// is `None`.
#[derive(Debug, Default)]
pub struct ChatListStore {
    chats: Vec<ChatDoc>,
    active_id: Option<String>,
}

impl ChatListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with a store snapshot. Idempotent; may be applied
    /// any number of times. Returns true if the active id changed (the
    /// caller must resubscribe to the new active chat's document).
    pub fn apply_snapshot(&mut self, mut chats: Vec<ChatDoc>) -> bool {
        sort_descending(&mut chats);
        self.chats = chats;
        self.reconcile_active()
    }

    /// Select a chat by id, falling back to the first chat (or none) when
    /// the id is unknown. Returns true if the active id changed.
    pub fn select(&mut self, id: &str) -> bool {
        let previous = self.active_id.clone();
        if self.contains(id) {
            self.active_id = Some(id.to_string());
        } else {
            self.active_id = self.first_id();
        }
        previous != self.active_id
    }

    /// Insert a chat optimistically (before the snapshot confirming it
    /// arrives), keeping the sort order.
    pub fn insert(&mut self, doc: ChatDoc) {
        self.chats.retain(|c| c.id != doc.id);
        self.chats.push(doc);
        sort_descending(&mut self.chats);
    }

    /// Remove a chat optimistically. If it was active, the first remaining
    /// chat (or none) becomes active. Returns true if the active id changed.
    pub fn remove(&mut self, id: &str) -> bool {
        self.chats.retain(|c| c.id != id);
        self.reconcile_active()
    }

    pub fn set_active(&mut self, id: Option<String>) -> bool {
        let previous = std::mem::replace(&mut self.active_id, id);
        self.reconcile_active();
        previous != self.active_id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.chats.iter().any(|c| c.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&ChatDoc> {
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&ChatDoc> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn first_id(&self) -> Option<String> {
        self.chats.first().map(|c| c.id.clone())
    }

    pub fn list(&self) -> &[ChatDoc] {
        &self.chats
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn clear(&mut self) {
        self.chats.clear();
        self.active_id = None;
    }

    /// Enforce the invariant that the active id references an existing chat
    /// or nothing; dangling ids fall back to the first chat in sort order.
    fn reconcile_active(&mut self) -> bool {
        let previous = self.active_id.clone();
        match &self.active_id {
            Some(id) if !self.contains(id) => self.active_id = self.first_id(),
            None if !self.chats.is_empty() => self.active_id = self.first_id(),
            _ => {}
        }
        previous != self.active_id
    }
}

fn sort_descending(chats: &mut [ChatDoc]) {
    chats.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(id: &str, created_at: i64) -> ChatDoc {
        let mut doc = ChatDoc::new(ChatDoc::DEFAULT_TITLE, created_at);
        doc.id = id.to_string();
        doc
    }

    #[test]
    fn snapshot_sorts_by_descending_creation_time() {
        let mut store = ChatListStore::new();
        store.apply_snapshot(vec![chat("a", 100), chat("b", 200)]);

        let ids: Vec<&str> = store.list().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn selecting_unknown_id_falls_back_to_first() {
        let mut store = ChatListStore::new();
        store.apply_snapshot(vec![chat("a", 100), chat("b", 200)]);

        store.select("c");
        assert_eq!(store.active_id(), Some("b"));
    }

    #[test]
    fn first_snapshot_auto_selects_newest_chat() {
        let mut store = ChatListStore::new();
        let changed = store.apply_snapshot(vec![chat("a", 100), chat("b", 200)]);
        assert!(changed);
        assert_eq!(store.active_id(), Some("b"));
    }

    #[test]
    fn removing_active_chat_reselects_first_remaining() {
        let mut store = ChatListStore::new();
        store.apply_snapshot(vec![chat("a", 100), chat("b", 200), chat("c", 300)]);
        store.select("c");

        let changed = store.remove("c");
        assert!(changed);
        assert_eq!(store.active_id(), Some("b"));
    }

    #[test]
    fn removing_last_chat_clears_active() {
        let mut store = ChatListStore::new();
        store.apply_snapshot(vec![chat("a", 100)]);
        assert_eq!(store.active_id(), Some("a"));

        store.remove("a");
        assert_eq!(store.active_id(), None);
    }

    #[test]
    fn removing_inactive_chat_keeps_selection() {
        let mut store = ChatListStore::new();
        store.apply_snapshot(vec![chat("a", 100), chat("b", 200)]);
        store.select("a");

        let changed = store.remove("b");
        assert!(!changed);
        assert_eq!(store.active_id(), Some("a"));
    }

    #[test]
    fn snapshot_missing_active_chat_falls_back() {
        let mut store = ChatListStore::new();
        store.apply_snapshot(vec![chat("a", 100), chat("b", 200)]);
        store.select("a");

        // The active chat disappeared from the store (deleted elsewhere)
        let changed = store.apply_snapshot(vec![chat("b", 200)]);
        assert!(changed);
        assert_eq!(store.active_id(), Some("b"));
    }

    #[test]
    fn optimistic_insert_keeps_sort_order() {
        let mut store = ChatListStore::new();
        store.apply_snapshot(vec![chat("a", 100), chat("c", 300)]);

        store.insert(chat("b", 200));
        let ids: Vec<&str> = store.list().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }
}
