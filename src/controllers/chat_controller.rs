use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::auth::AuthState;
use crate::models::{
    ChatDoc, ChatListStore, ChatMessage, ChatPatch, ConfirmationPrompt, FontSize, MessageFeedback,
    Personality, PromptTemplate, Role, SettingUpdate, SettingsPatch, TemplatePatch, Theme,
    UserSettings, now_millis,
};
use crate::repositories::{StoreGateway, Subscription};
use crate::services::{
    DEFAULT_MODEL, GenerationClient, GenerationError, GenerationTurn, derive_title,
    is_supported_model, needs_title_backfill,
};

/// Fallback assistant message for a response without the expected shape.
pub const STRUCTURAL_FALLBACK: &str = "Sorry, I couldn't generate a response. Please try again.";

/// Fallback assistant message for a network-level failure or timeout.
pub const NETWORK_FALLBACK: &str =
    "An error occurred while connecting to the AI. Please check your network.";

const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

const DELETE_CHAT_PROMPT: &str = "Are you sure you want to delete this chat?";
const DELETE_TEMPLATE_PROMPT: &str = "Are you sure you want to delete this template?";

/// Where the send sequence currently is. Send is only accepted while Idle;
/// every exit path, success or failure, returns here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Idle,
    Sending,
    AwaitingGeneration,
    Settling,
}

/// One store change, applied atomically to its slice of controller state.
enum StoreChange {
    ChatList(Vec<ChatDoc>),
    ActiveChat(Option<ChatDoc>),
    Settings(Option<UserSettings>),
    Templates(Vec<PromptTemplate>),
}

enum SubKind {
    ChatList,
    ActiveChat,
    Settings,
    Templates,
}

/// Single source of truth for what the UI displays.
///
/// Reconciles the live subscriptions (chat list, active chat document,
/// settings, templates) into local state and drives every user intent:
/// select/create/delete chat, send message, feedback, settings and template
/// edits. All mutation goes through `&mut self`, so operations from one
/// embedding task serialize; in particular a second send always builds on
/// the first send's already-appended message list.
pub struct ChatController {
    store: Arc<dyn StoreGateway>,
    generator: Arc<dyn GenerationClient>,
    confirm: Arc<dyn ConfirmationPrompt>,

    user_id: Option<String>,
    chats: ChatListStore,
    active_messages: Vec<ChatMessage>,
    /// Mirrors of the active chat document, kept in sync by snapshots.
    personality: Personality,
    context_memory_enabled: bool,
    settings: UserSettings,
    templates: Vec<PromptTemplate>,
    selected_model: String,
    phase: SendPhase,
    generation_timeout: Duration,

    chats_sub: Option<Subscription<Vec<ChatDoc>>>,
    chat_sub: Option<Subscription<Option<ChatDoc>>>,
    settings_sub: Option<Subscription<Option<UserSettings>>>,
    templates_sub: Option<Subscription<Vec<PromptTemplate>>>,

    on_scroll_to_latest: Option<Box<dyn Fn() + Send>>,
}

impl ChatController {
    pub fn new(
        store: Arc<dyn StoreGateway>,
        generator: Arc<dyn GenerationClient>,
        confirm: Arc<dyn ConfirmationPrompt>,
    ) -> Self {
        Self {
            store,
            generator,
            confirm,
            user_id: None,
            chats: ChatListStore::new(),
            active_messages: Vec::new(),
            personality: Personality::default(),
            context_memory_enabled: true,
            settings: UserSettings::default(),
            templates: Vec::new(),
            selected_model: DEFAULT_MODEL.to_string(),
            phase: SendPhase::Idle,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            chats_sub: None,
            chat_sub: None,
            settings_sub: None,
            templates_sub: None,
            on_scroll_to_latest: None,
        }
    }

    /// Cap on a single generation call, so a hung network call cannot leave
    /// the controller stuck out of Idle.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Presentation hook fired after every settled send and message
    /// snapshot.
    pub fn set_on_scroll_to_latest(&mut self, callback: impl Fn() + Send + 'static) {
        self.on_scroll_to_latest = Some(Box::new(callback));
    }

    // ===== identity =====

    /// Apply an auth-state change. Signing in opens the per-user
    /// subscriptions; signing out tears everything down and blocks data
    /// operations until the provider recovers.
    pub fn handle_auth_state(&mut self, state: AuthState) {
        match state {
            AuthState::Authenticated { user_id } => {
                if self.user_id.as_deref() == Some(user_id.as_str()) {
                    return;
                }
                info!(user_id = %user_id, "Authenticated");
                self.reset_user_state();
                self.chats_sub = Some(self.store.subscribe_chats(&user_id));
                self.settings_sub = Some(self.store.subscribe_settings(&user_id));
                self.templates_sub = Some(self.store.subscribe_templates(&user_id));
                self.user_id = Some(user_id);
            }
            AuthState::Unauthenticated => {
                info!("Signed out");
                self.reset_user_state();
            }
        }
    }

    fn reset_user_state(&mut self) {
        self.user_id = None;
        self.chats_sub = None;
        self.chat_sub = None;
        self.settings_sub = None;
        self.templates_sub = None;
        self.chats.clear();
        self.active_messages.clear();
        self.templates.clear();
        self.settings = UserSettings::default();
        self.personality = Personality::default();
        self.context_memory_enabled = true;
        self.phase = SendPhase::Idle;
    }

    // ===== subscription reconciliation =====

    /// Wait for the next store change and apply it. Returns false when
    /// there are no live subscriptions left to wait on.
    pub async fn pump(&mut self) -> bool {
        match self.next_change().await {
            Some(change) => {
                self.apply_change(change).await;
                true
            }
            None => false,
        }
    }

    /// Apply every immediately-available snapshot, in a fixed order per
    /// collection. Snapshots produced while draining (for example the
    /// default-settings write) are picked up in the same call.
    pub async fn pump_pending(&mut self) {
        loop {
            let change = if let Some(snap) =
                self.settings_sub.as_mut().and_then(Subscription::try_next)
            {
                StoreChange::Settings(snap)
            } else if let Some(snap) = self.templates_sub.as_mut().and_then(Subscription::try_next)
            {
                StoreChange::Templates(snap)
            } else if let Some(snap) = self.chats_sub.as_mut().and_then(Subscription::try_next) {
                StoreChange::ChatList(snap)
            } else if let Some(snap) = self.chat_sub.as_mut().and_then(Subscription::try_next) {
                StoreChange::ActiveChat(snap)
            } else {
                break;
            };
            self.apply_change(change).await;
        }
    }

    async fn next_change(&mut self) -> Option<StoreChange> {
        loop {
            if self.chats_sub.is_none()
                && self.chat_sub.is_none()
                && self.settings_sub.is_none()
                && self.templates_sub.is_none()
            {
                return None;
            }

            let ended;
            {
                let Self {
                    chats_sub,
                    chat_sub,
                    settings_sub,
                    templates_sub,
                    ..
                } = self;
                tokio::select! {
                    res = recv_or_pending(chats_sub) => match res {
                        Some(snap) => return Some(StoreChange::ChatList(snap)),
                        None => ended = SubKind::ChatList,
                    },
                    res = recv_or_pending(chat_sub) => match res {
                        Some(snap) => return Some(StoreChange::ActiveChat(snap)),
                        None => ended = SubKind::ActiveChat,
                    },
                    res = recv_or_pending(settings_sub) => match res {
                        Some(snap) => return Some(StoreChange::Settings(snap)),
                        None => ended = SubKind::Settings,
                    },
                    res = recv_or_pending(templates_sub) => match res {
                        Some(snap) => return Some(StoreChange::Templates(snap)),
                        None => ended = SubKind::Templates,
                    },
                }
            }

            // A subscription errored out; last-known state stays as is.
            match ended {
                SubKind::ChatList => {
                    warn!("Chat list subscription ended");
                    self.chats_sub = None;
                }
                SubKind::ActiveChat => {
                    warn!("Active chat subscription ended");
                    self.chat_sub = None;
                }
                SubKind::Settings => {
                    warn!("Settings subscription ended");
                    self.settings_sub = None;
                }
                SubKind::Templates => {
                    warn!("Templates subscription ended");
                    self.templates_sub = None;
                }
            }
        }
    }

    async fn apply_change(&mut self, change: StoreChange) {
        match change {
            StoreChange::ChatList(chats) => {
                let active_changed = self.chats.apply_snapshot(chats);
                debug!(count = self.chats.len(), active_changed, "Applied chat list snapshot");
                if active_changed {
                    self.resubscribe_active_chat();
                }
            }
            StoreChange::ActiveChat(Some(doc)) => {
                if self.chats.active_id() == Some(doc.id.as_str()) {
                    self.active_messages = doc.messages;
                    self.personality = doc.personality;
                    self.context_memory_enabled = doc.context_memory_enabled;
                    self.emit_scroll();
                } else {
                    debug!(chat_id = %doc.id, "Ignoring snapshot for non-active chat");
                }
            }
            StoreChange::ActiveChat(None) => {
                warn!("Active chat document does not exist");
                self.active_messages.clear();
            }
            StoreChange::Settings(Some(settings)) => {
                self.settings = settings;
            }
            StoreChange::Settings(None) => {
                debug!("No settings document, writing defaults");
                self.settings = UserSettings::default();
                if let Some(uid) = self.user_id.clone() {
                    let patch = SettingsPatch {
                        high_contrast_mode: Some(false),
                        font_size: Some(FontSize::Base),
                    };
                    if let Err(e) = self.store.set_settings(&uid, patch).await {
                        error!(error = %e, "Failed to write default settings");
                    }
                }
            }
            StoreChange::Templates(templates) => {
                self.templates = templates;
            }
        }
    }

    /// Swap the active-chat document subscription. Dropping the previous
    /// handle tears the old subscription down, so stale snapshots cannot
    /// write into the new selection.
    ///
    /// The message list is seeded from the chat-list copy of the document
    /// rather than left empty: a send issued before the first document
    /// snapshot is pumped must build on the chat's known history, or its
    /// whole-list persist would erase the stored turns.
    fn resubscribe_active_chat(&mut self) {
        self.chat_sub = None;
        self.active_messages.clear();
        let (Some(uid), Some(chat_id)) = (self.user_id.as_deref(), self.chats.active_id()) else {
            return;
        };
        if let Some(doc) = self.chats.get(chat_id) {
            self.active_messages = doc.messages.clone();
            self.personality = doc.personality;
            self.context_memory_enabled = doc.context_memory_enabled;
        }
        debug!(chat_id = %chat_id, "Subscribing to active chat");
        self.chat_sub = Some(self.store.subscribe_chat(uid, chat_id));
    }

    // ===== chat operations =====

    /// Make a chat active. Unknown ids fall back to the first chat in the
    /// sorted list, or to no selection when the list is empty.
    pub fn select_chat(&mut self, id: &str) {
        if self.chats.select(id) {
            self.resubscribe_active_chat();
        }
    }

    /// Create an empty chat and make it active. Store failures are
    /// reported, never fatal.
    pub async fn create_chat(&mut self) {
        let Some(uid) = self.user_id.clone() else {
            debug!("No identity, ignoring new chat");
            return;
        };

        let doc = ChatDoc::new(ChatDoc::DEFAULT_TITLE, now_millis());
        match self.store.create_chat(&uid, doc.clone()).await {
            Ok(id) => {
                info!(chat_id = %id, "Created chat");
                let mut doc = doc;
                doc.id = id.clone();
                self.chats.insert(doc);
                self.chats.set_active(Some(id));
                self.resubscribe_active_chat();
            }
            Err(e) => error!(error = %e, "Failed to create chat"),
        }
    }

    /// Delete a chat after an explicit, cancelable confirmation. Deleting
    /// the active chat reselects the first remaining chat or none.
    pub async fn delete_chat(&mut self, id: &str) {
        let Some(uid) = self.user_id.clone() else {
            debug!("No identity, ignoring delete");
            return;
        };
        if !self.confirm.confirm(DELETE_CHAT_PROMPT).await {
            debug!(chat_id = %id, "Chat delete canceled");
            return;
        }

        match self.store.delete_chat(&uid, id).await {
            Ok(()) => {
                info!(chat_id = %id, "Deleted chat");
                if self.chats.remove(id) {
                    self.resubscribe_active_chat();
                }
            }
            Err(e) => error!(error = %e, chat_id = %id, "Failed to delete chat"),
        }
    }

    // ===== send sequence =====

    /// The send state machine:
    /// Idle → Sending (optimistic append + persist) → AwaitingGeneration →
    /// Settling (persist reply or fallback) → Idle.
    ///
    /// Empty input, a missing identity, or an in-flight send are rejected
    /// up front. No failure is retried; every exit returns to Idle.
    pub async fn send_message(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("Ignoring empty message");
            return;
        }
        let Some(uid) = self.user_id.clone() else {
            debug!("No identity, ignoring send");
            return;
        };
        if self.phase != SendPhase::Idle {
            debug!(phase = ?self.phase, "Send already in flight, ignoring");
            return;
        }

        self.phase = SendPhase::Sending;

        let mut updated = self.active_messages.clone();
        updated.push(ChatMessage::user(trimmed));

        // First send with no active chat creates one, titled from the text
        let chat_id = match self.chats.active_id() {
            Some(id) => id.to_string(),
            None => {
                let mut doc = ChatDoc::new(derive_title(trimmed), now_millis());
                doc.personality = self.personality;
                doc.context_memory_enabled = self.context_memory_enabled;
                match self.store.create_chat(&uid, doc.clone()).await {
                    Ok(id) => {
                        debug!(chat_id = %id, "Created chat for message");
                        doc.id = id.clone();
                        self.chats.insert(doc);
                        self.chats.set_active(Some(id.clone()));
                        self.resubscribe_active_chat();
                        id
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to create chat for message");
                        self.phase = SendPhase::Idle;
                        return;
                    }
                }
            }
        };

        // Optimistic local append; not rolled back if the persist fails
        self.active_messages = updated.clone();

        let mut patch = ChatPatch::messages(updated.clone());
        if let Some(doc) = self.chats.get(&chat_id) {
            if needs_title_backfill(&doc.title) {
                patch.title = Some(derive_title(trimmed));
            }
        }
        if let Err(e) = self.store.update_chat(&uid, &chat_id, patch).await {
            error!(error = %e, chat_id = %chat_id, "Failed to persist user message");
            self.phase = SendPhase::Idle;
            return;
        }

        self.phase = SendPhase::AwaitingGeneration;

        let mut history = vec![GenerationTurn::new(
            Role::System,
            self.personality.system_instruction(),
        )];
        if self.context_memory_enabled {
            history.extend(
                updated
                    .iter()
                    .map(|m| GenerationTurn::new(m.role, m.text.clone())),
            );
        } else {
            history.push(GenerationTurn::new(Role::User, trimmed));
        }

        let result = tokio::time::timeout(
            self.generation_timeout,
            self.generator.generate(&history, &self.selected_model),
        )
        .await;

        self.phase = SendPhase::Settling;

        let reply = match result {
            Ok(Ok(text)) => text,
            Ok(Err(GenerationError::Structural(e))) => {
                error!(error = %e, "Unexpected generation response");
                STRUCTURAL_FALLBACK.to_string()
            }
            Ok(Err(e)) => {
                error!(error = %e, "Generation call failed");
                NETWORK_FALLBACK.to_string()
            }
            Err(_) => {
                error!(timeout = ?self.generation_timeout, "Generation call timed out");
                NETWORK_FALLBACK.to_string()
            }
        };

        let mut settled = self.active_messages.clone();
        settled.push(ChatMessage::ai(reply));
        self.active_messages = settled.clone();

        if let Err(e) = self
            .store
            .update_chat(&uid, &chat_id, ChatPatch::messages(settled))
            .await
        {
            error!(error = %e, chat_id = %chat_id, "Failed to persist assistant message");
        }

        self.phase = SendPhase::Idle;
        self.emit_scroll();
    }

    /// Set feedback on the message at `index` and persist the whole list
    /// back (the store's mutation granularity is the full chat document).
    pub async fn set_feedback(&mut self, index: usize, kind: MessageFeedback) {
        let Some(uid) = self.user_id.clone() else {
            debug!("No identity, ignoring feedback");
            return;
        };
        let Some(chat_id) = self.chats.active_id().map(str::to_string) else {
            debug!("No active chat, ignoring feedback");
            return;
        };
        if index >= self.active_messages.len() {
            warn!(index, len = self.active_messages.len(), "Feedback index out of range");
            return;
        }

        let mut messages = self.active_messages.clone();
        messages[index].feedback = Some(kind);
        self.active_messages = messages.clone();

        if let Err(e) = self
            .store
            .update_chat(&uid, &chat_id, ChatPatch::messages(messages))
            .await
        {
            error!(error = %e, chat_id = %chat_id, "Failed to persist feedback");
        }
    }

    // ===== chat configuration =====

    /// Persisted to the active chat; used as the default for the next
    /// created chat when none is active.
    pub async fn set_personality(&mut self, personality: Personality) {
        self.personality = personality;
        self.persist_chat_config(ChatPatch {
            personality: Some(personality),
            ..ChatPatch::default()
        })
        .await;
    }

    pub async fn set_context_memory(&mut self, enabled: bool) {
        self.context_memory_enabled = enabled;
        self.persist_chat_config(ChatPatch {
            context_memory_enabled: Some(enabled),
            ..ChatPatch::default()
        })
        .await;
    }

    async fn persist_chat_config(&mut self, patch: ChatPatch) {
        let (Some(uid), Some(chat_id)) = (
            self.user_id.clone(),
            self.chats.active_id().map(str::to_string),
        ) else {
            return;
        };
        if let Err(e) = self.store.update_chat(&uid, &chat_id, patch).await {
            error!(error = %e, chat_id = %chat_id, "Failed to persist chat configuration");
        }
    }

    /// Switch the generation model; identifiers outside the allow-list are
    /// rejected.
    pub fn select_model(&mut self, model_id: &str) {
        if is_supported_model(model_id) {
            self.selected_model = model_id.to_string();
        } else {
            warn!(model_id = %model_id, "Unsupported model, keeping current selection");
        }
    }

    // ===== settings =====

    /// Persist a settings change. The local mirror updates optimistically
    /// and converges to store truth on the next snapshot.
    pub async fn update_setting(&mut self, update: SettingUpdate) {
        let Some(uid) = self.user_id.clone() else {
            debug!("No identity, ignoring settings update");
            return;
        };

        let patch = update.into_patch();
        patch.apply_to(&mut self.settings);

        if let Err(e) = self.store.set_settings(&uid, patch).await {
            error!(error = %e, "Failed to persist settings");
        }
    }

    // ===== prompt templates =====

    /// Create a template, or update the one named by `editing_id`. A blank
    /// trimmed name or content makes the whole operation a no-op.
    pub async fn save_prompt_template(
        &mut self,
        name: &str,
        content: &str,
        editing_id: Option<&str>,
    ) {
        let Some(uid) = self.user_id.clone() else {
            debug!("No identity, ignoring template save");
            return;
        };
        let name = name.trim();
        let content = content.trim();
        if name.is_empty() || content.is_empty() {
            debug!("Blank template name or content, ignoring save");
            return;
        }

        let result = match editing_id {
            Some(id) => self
                .store
                .update_template(
                    &uid,
                    id,
                    TemplatePatch {
                        name: Some(name.to_string()),
                        template: Some(content.to_string()),
                        updated_at: Some(now_millis()),
                    },
                )
                .await,
            None => self
                .store
                .create_template(&uid, PromptTemplate::new(name, content, now_millis()))
                .await
                .map(|_| ()),
        };

        if let Err(e) = result {
            error!(error = %e, "Failed to save prompt template");
        }
    }

    pub async fn delete_prompt_template(&mut self, id: &str) {
        let Some(uid) = self.user_id.clone() else {
            debug!("No identity, ignoring template delete");
            return;
        };
        if !self.confirm.confirm(DELETE_TEMPLATE_PROMPT).await {
            debug!(template_id = %id, "Template delete canceled");
            return;
        }
        if let Err(e) = self.store.delete_template(&uid, id).await {
            error!(error = %e, template_id = %id, "Failed to delete prompt template");
        }
    }

    // ===== read access for presentation =====

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn chats(&self) -> &[ChatDoc] {
        self.chats.list()
    }

    pub fn active_chat_id(&self) -> Option<&str> {
        self.chats.active_id()
    }

    pub fn active_messages(&self) -> &[ChatMessage] {
        &self.active_messages
    }

    pub fn personality(&self) -> Personality {
        self.personality
    }

    pub fn context_memory_enabled(&self) -> bool {
        self.context_memory_enabled
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn templates(&self) -> &[PromptTemplate] {
        &self.templates
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    /// Whether the send action should be enabled.
    pub fn can_send(&self) -> bool {
        self.phase == SendPhase::Idle && self.user_id.is_some()
    }

    pub fn theme(&self) -> Theme {
        Theme::resolve(self.settings.high_contrast_mode)
    }

    fn emit_scroll(&self) {
        if let Some(callback) = &self.on_scroll_to_latest {
            callback();
        }
    }
}

async fn recv_or_pending<T>(sub: &mut Option<Subscription<T>>) -> Option<T> {
    match sub {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}
