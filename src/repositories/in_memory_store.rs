use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};
use uuid::Uuid;

use super::error::{StoreError, StoreResult};
use super::store_gateway::{BoxFuture, StoreGateway, Subscription, paths};
use crate::models::{ChatDoc, ChatPatch, PromptTemplate, SettingsPatch, TemplatePatch, UserSettings};

/// In-memory store gateway for tests and development.
///
/// Mirrors the remote store's live-query behavior: every subscription
/// receives the current snapshot immediately and a fresh one after each
/// mutation of its scope. Snapshot order for the chat list is map-iteration
/// order, deliberately not creation order, so consumers must sort.
#[derive(Clone)]
pub struct InMemoryStore {
    app_id: String,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    chats: HashMap<String, BTreeMap<String, ChatDoc>>,
    settings: HashMap<String, UserSettings>,
    templates: HashMap<String, BTreeMap<String, PromptTemplate>>,
    chat_list_subs: Vec<(String, UnboundedSender<Vec<ChatDoc>>)>,
    chat_doc_subs: Vec<(String, String, UnboundedSender<Option<ChatDoc>>)>,
    settings_subs: Vec<(String, UnboundedSender<Option<UserSettings>>)>,
    template_subs: Vec<(String, UnboundedSender<Vec<PromptTemplate>>)>,
    fail_next_write: bool,
}

impl Inner {
    fn chat_list_snapshot(&self, uid: &str) -> Vec<ChatDoc> {
        self.chats
            .get(uid)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    fn chat_doc_snapshot(&self, uid: &str, chat_id: &str) -> Option<ChatDoc> {
        self.chats.get(uid).and_then(|m| m.get(chat_id)).cloned()
    }

    fn template_snapshot(&self, uid: &str) -> Vec<PromptTemplate> {
        self.templates
            .get(uid)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    fn notify_chat_list(&mut self, uid: &str) {
        let snapshot = self.chat_list_snapshot(uid);
        self.chat_list_subs
            .retain(|(sub_uid, tx)| sub_uid != uid || tx.send(snapshot.clone()).is_ok());
    }

    fn notify_chat_doc(&mut self, uid: &str, chat_id: &str) {
        let snapshot = self.chat_doc_snapshot(uid, chat_id);
        self.chat_doc_subs.retain(|(sub_uid, sub_chat, tx)| {
            sub_uid != uid || sub_chat != chat_id || tx.send(snapshot.clone()).is_ok()
        });
    }

    fn notify_settings(&mut self, uid: &str) {
        let snapshot = self.settings.get(uid).copied();
        self.settings_subs
            .retain(|(sub_uid, tx)| sub_uid != uid || tx.send(snapshot).is_ok());
    }

    fn notify_templates(&mut self, uid: &str) {
        let snapshot = self.template_snapshot(uid);
        self.template_subs
            .retain(|(sub_uid, tx)| sub_uid != uid || tx.send(snapshot.clone()).is_ok());
    }

    fn check_write_allowed(&mut self, path: String) -> StoreResult<()> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(StoreError::WriteRejected {
                message: format!("injected write failure at {path}"),
            });
        }
        Ok(())
    }
}

impl InMemoryStore {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Make the next create/update/delete fail, to exercise write-failure
    /// handling in consumers.
    pub fn fail_next_write(&self) {
        self.inner.lock().fail_next_write = true;
    }

    /// Terminate every live subscription, simulating a subscription error.
    /// Consumers observe ended channels and keep their last-known state.
    pub fn terminate_subscriptions(&self) {
        let mut inner = self.inner.lock();
        inner.chat_list_subs.clear();
        inner.chat_doc_subs.clear();
        inner.settings_subs.clear();
        inner.template_subs.clear();
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("default-app-id")
    }
}

impl StoreGateway for InMemoryStore {
    fn create_chat(&self, uid: &str, doc: ChatDoc) -> BoxFuture<'static, StoreResult<String>> {
        let inner = self.inner.clone();
        let path = paths::chats(&self.app_id, uid);
        let uid = uid.to_string();

        Box::pin(async move {
            let mut inner = inner.lock();
            inner.check_write_allowed(path)?;

            let id = Uuid::new_v4().to_string();
            let mut doc = doc;
            doc.id = id.clone();
            inner.chats.entry(uid.clone()).or_default().insert(id.clone(), doc);

            inner.notify_chat_list(&uid);
            inner.notify_chat_doc(&uid, &id);
            Ok(id)
        })
    }

    fn update_chat(
        &self,
        uid: &str,
        chat_id: &str,
        patch: ChatPatch,
    ) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        let path = paths::chat_doc(&self.app_id, uid, chat_id);
        let uid = uid.to_string();
        let chat_id = chat_id.to_string();

        Box::pin(async move {
            let mut inner = inner.lock();
            inner.check_write_allowed(path.clone())?;

            let doc = inner
                .chats
                .get_mut(&uid)
                .and_then(|m| m.get_mut(&chat_id))
                .ok_or(StoreError::NotFound { path })?;
            patch.apply_to(doc);

            inner.notify_chat_list(&uid);
            inner.notify_chat_doc(&uid, &chat_id);
            Ok(())
        })
    }

    fn delete_chat(&self, uid: &str, chat_id: &str) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        let path = paths::chat_doc(&self.app_id, uid, chat_id);
        let uid = uid.to_string();
        let chat_id = chat_id.to_string();

        Box::pin(async move {
            let mut inner = inner.lock();
            inner.check_write_allowed(path)?;

            // Deleting a missing document is a no-op, like the real store
            if let Some(chats) = inner.chats.get_mut(&uid) {
                chats.remove(&chat_id);
            }

            inner.notify_chat_list(&uid);
            inner.notify_chat_doc(&uid, &chat_id);
            Ok(())
        })
    }

    fn set_settings(&self, uid: &str, patch: SettingsPatch) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        let path = paths::settings_doc(&self.app_id, uid);
        let uid = uid.to_string();

        Box::pin(async move {
            let mut inner = inner.lock();
            inner.check_write_allowed(path)?;

            let settings = inner.settings.entry(uid.clone()).or_default();
            patch.apply_to(settings);

            inner.notify_settings(&uid);
            Ok(())
        })
    }

    fn create_template(
        &self,
        uid: &str,
        doc: PromptTemplate,
    ) -> BoxFuture<'static, StoreResult<String>> {
        let inner = self.inner.clone();
        let path = paths::templates(&self.app_id, uid);
        let uid = uid.to_string();

        Box::pin(async move {
            let mut inner = inner.lock();
            inner.check_write_allowed(path)?;

            let id = Uuid::new_v4().to_string();
            let mut doc = doc;
            doc.id = id.clone();
            inner
                .templates
                .entry(uid.clone())
                .or_default()
                .insert(id.clone(), doc);

            inner.notify_templates(&uid);
            Ok(id)
        })
    }

    fn update_template(
        &self,
        uid: &str,
        template_id: &str,
        patch: TemplatePatch,
    ) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        let path = paths::template_doc(&self.app_id, uid, template_id);
        let uid = uid.to_string();
        let template_id = template_id.to_string();

        Box::pin(async move {
            let mut inner = inner.lock();
            inner.check_write_allowed(path.clone())?;

            let doc = inner
                .templates
                .get_mut(&uid)
                .and_then(|m| m.get_mut(&template_id))
                .ok_or(StoreError::NotFound { path })?;
            patch.apply_to(doc);

            inner.notify_templates(&uid);
            Ok(())
        })
    }

    fn delete_template(
        &self,
        uid: &str,
        template_id: &str,
    ) -> BoxFuture<'static, StoreResult<()>> {
        let inner = self.inner.clone();
        let path = paths::template_doc(&self.app_id, uid, template_id);
        let uid = uid.to_string();
        let template_id = template_id.to_string();

        Box::pin(async move {
            let mut inner = inner.lock();
            inner.check_write_allowed(path)?;

            if let Some(templates) = inner.templates.get_mut(&uid) {
                templates.remove(&template_id);
            }

            inner.notify_templates(&uid);
            Ok(())
        })
    }

    fn subscribe_chats(&self, uid: &str) -> Subscription<Vec<ChatDoc>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let _ = tx.send(inner.chat_list_snapshot(uid));
        inner.chat_list_subs.push((uid.to_string(), tx));
        Subscription::new(rx)
    }

    fn subscribe_chat(&self, uid: &str, chat_id: &str) -> Subscription<Option<ChatDoc>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let _ = tx.send(inner.chat_doc_snapshot(uid, chat_id));
        inner
            .chat_doc_subs
            .push((uid.to_string(), chat_id.to_string(), tx));
        Subscription::new(rx)
    }

    fn subscribe_settings(&self, uid: &str) -> Subscription<Option<UserSettings>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let _ = tx.send(inner.settings.get(uid).copied());
        inner.settings_subs.push((uid.to_string(), tx));
        Subscription::new(rx)
    }

    fn subscribe_templates(&self, uid: &str) -> Subscription<Vec<PromptTemplate>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let _ = tx.send(inner.template_snapshot(uid));
        inner.template_subs.push((uid.to_string(), tx));
        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now_millis;

    #[tokio::test]
    async fn create_assigns_id_and_notifies_subscribers() {
        let store = InMemoryStore::new("test-app");
        let mut sub = store.subscribe_chats("u1");
        assert_eq!(sub.next().await.unwrap().len(), 0, "initial snapshot");

        let id = store
            .create_chat("u1", ChatDoc::new("New Chat", now_millis()))
            .await
            .unwrap();
        assert!(!id.is_empty());

        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
    }

    #[tokio::test]
    async fn update_missing_chat_is_not_found() {
        let store = InMemoryStore::new("test-app");
        let err = store
            .update_chat("u1", "nope", ChatPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn chat_doc_subscription_sees_deletes_as_none() {
        let store = InMemoryStore::new("test-app");
        let id = store
            .create_chat("u1", ChatDoc::new("New Chat", now_millis()))
            .await
            .unwrap();

        let mut sub = store.subscribe_chat("u1", &id);
        assert!(sub.next().await.unwrap().is_some());

        store.delete_chat("u1", &id).await.unwrap();
        assert!(sub.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_failure_rejects_exactly_one_write() {
        let store = InMemoryStore::new("test-app");
        store.fail_next_write();

        let err = store
            .create_chat("u1", ChatDoc::new("New Chat", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::WriteRejected { .. }));

        // Next write goes through
        store.create_chat("u1", ChatDoc::new("New Chat", 2)).await.unwrap();
    }

    #[tokio::test]
    async fn settings_merge_creates_singleton() {
        let store = InMemoryStore::new("test-app");
        let mut sub = store.subscribe_settings("u1");
        assert!(sub.next().await.unwrap().is_none(), "absent before first write");

        store
            .set_settings(
                "u1",
                SettingsPatch {
                    high_contrast_mode: Some(true),
                    ..SettingsPatch::default()
                },
            )
            .await
            .unwrap();

        let settings = sub.next().await.unwrap().unwrap();
        assert!(settings.high_contrast_mode);
    }

    #[tokio::test]
    async fn dropped_subscription_is_pruned() {
        let store = InMemoryStore::new("test-app");
        let sub = store.subscribe_chats("u1");
        drop(sub);

        // The next mutation notices the closed channel and prunes it
        store.create_chat("u1", ChatDoc::new("New Chat", 1)).await.unwrap();
        assert!(store.inner.lock().chat_list_subs.is_empty());
    }

    #[tokio::test]
    async fn subscriptions_are_scoped_per_user() {
        let store = InMemoryStore::new("test-app");
        let mut sub_a = store.subscribe_chats("a");
        let mut sub_b = store.subscribe_chats("b");
        sub_a.next().await.unwrap();
        sub_b.next().await.unwrap();

        store.create_chat("a", ChatDoc::new("New Chat", 1)).await.unwrap();

        assert_eq!(sub_a.next().await.unwrap().len(), 1);
        assert!(sub_b.try_next().is_none(), "other user saw nothing");
    }
}
