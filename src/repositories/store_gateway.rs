use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use super::error::StoreResult;
use crate::models::{ChatDoc, ChatPatch, PromptTemplate, SettingsPatch, TemplatePatch, UserSettings};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Live-query handle for one collection or document.
///
/// The store pushes a full, self-consistent snapshot on subscribe and after
/// every relevant mutation. Snapshots may arrive repeatedly and must be
/// idempotent to apply. Dropping the handle is the teardown contract: the
/// store notices the closed channel and stops delivering.
///
/// A failed subscription terminates the channel (`next()` returns `None`);
/// the consumer logs it and keeps its last-known state.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    pub fn new(rx: mpsc::UnboundedReceiver<T>) -> Self {
        Self { rx }
    }

    /// Wait for the next snapshot. `None` means the subscription ended.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take a snapshot if one is already queued, without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

/// Remote document store scoped under a per-user namespace.
///
/// Three collections: chats (full chat document including the message
/// list), the settings singleton, and prompt templates. Create assigns and
/// returns the document id; updates are merge-patches. No ordering is
/// guaranteed across different collections' subscriptions.
pub trait StoreGateway: Send + Sync + 'static {
    fn create_chat(&self, uid: &str, doc: ChatDoc) -> BoxFuture<'static, StoreResult<String>>;

    fn update_chat(
        &self,
        uid: &str,
        chat_id: &str,
        patch: ChatPatch,
    ) -> BoxFuture<'static, StoreResult<()>>;

    fn delete_chat(&self, uid: &str, chat_id: &str) -> BoxFuture<'static, StoreResult<()>>;

    /// Merge a partial update into the settings singleton, creating it if
    /// absent.
    fn set_settings(&self, uid: &str, patch: SettingsPatch) -> BoxFuture<'static, StoreResult<()>>;

    fn create_template(
        &self,
        uid: &str,
        doc: PromptTemplate,
    ) -> BoxFuture<'static, StoreResult<String>>;

    fn update_template(
        &self,
        uid: &str,
        template_id: &str,
        patch: TemplatePatch,
    ) -> BoxFuture<'static, StoreResult<()>>;

    fn delete_template(&self, uid: &str, template_id: &str)
    -> BoxFuture<'static, StoreResult<()>>;

    /// All of the user's chats. Snapshot order is unspecified; the consumer
    /// sorts.
    fn subscribe_chats(&self, uid: &str) -> Subscription<Vec<ChatDoc>>;

    /// One chat document. `None` snapshots mean the document does not exist
    /// (yet, or any more).
    fn subscribe_chat(&self, uid: &str, chat_id: &str) -> Subscription<Option<ChatDoc>>;

    fn subscribe_settings(&self, uid: &str) -> Subscription<Option<UserSettings>>;

    fn subscribe_templates(&self, uid: &str) -> Subscription<Vec<PromptTemplate>>;
}

/// Logical store paths, used in log fields and error messages.
pub mod paths {
    pub fn chats(app_id: &str, uid: &str) -> String {
        format!("artifacts/{app_id}/users/{uid}/chats")
    }

    pub fn chat_doc(app_id: &str, uid: &str, chat_id: &str) -> String {
        format!("artifacts/{app_id}/users/{uid}/chats/{chat_id}")
    }

    pub fn settings_doc(app_id: &str, uid: &str) -> String {
        format!("artifacts/{app_id}/users/{uid}/settings/userSettings")
    }

    pub fn templates(app_id: &str, uid: &str) -> String {
        format!("artifacts/{app_id}/users/{uid}/promptTemplates")
    }

    pub fn template_doc(app_id: &str, uid: &str, template_id: &str) -> String {
        format!("artifacts/{app_id}/users/{uid}/promptTemplates/{template_id}")
    }
}
