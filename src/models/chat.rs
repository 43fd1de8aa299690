use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::ChatMessage;

/// Named response style prepended to every generation request for a chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Personality {
    #[default]
    Professional,
    Funny,
    Mentor,
    Sarcastic,
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Personality::Professional => "Professional",
            Personality::Funny => "Funny",
            Personality::Mentor => "Mentor",
            Personality::Sarcastic => "Sarcastic",
        };
        f.write_str(name)
    }
}

impl Personality {
    /// The system instruction embedded in every generation request.
    pub fn system_instruction(&self) -> String {
        format!("You are an AI with a '{self}' personality. Respond in that style.")
    }
}

fn default_context_memory() -> bool {
    true
}

/// A full chat document as stored remotely.
///
/// The store's mutation granularity for messages is the whole list; there is
/// no per-message update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatDoc {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    /// Epoch milliseconds; the chat list is sorted by this, descending.
    pub created_at: i64,
    #[serde(default)]
    pub personality: Personality,
    #[serde(default = "default_context_memory")]
    pub context_memory_enabled: bool,
}

impl ChatDoc {
    pub const DEFAULT_TITLE: &'static str = "New Chat";

    /// A fresh chat with no messages. The id is assigned by the store on
    /// create; callers leave it empty.
    pub fn new(title: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            messages: Vec::new(),
            created_at,
            personality: Personality::default(),
            context_memory_enabled: true,
        }
    }
}

/// Partial update for a chat document. `None` fields are left untouched
/// (merge semantics).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<Personality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_memory_enabled: Option<bool>,
}

impl ChatPatch {
    pub fn messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: Some(messages),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, doc: &mut ChatDoc) {
        if let Some(title) = &self.title {
            doc.title = title.clone();
        }
        if let Some(messages) = &self.messages {
            doc.messages = messages.clone();
        }
        if let Some(personality) = self.personality {
            doc.personality = personality;
        }
        if let Some(enabled) = self.context_memory_enabled {
            doc.context_memory_enabled = enabled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_instruction_embeds_personality() {
        assert_eq!(
            Personality::Sarcastic.system_instruction(),
            "You are an AI with a 'Sarcastic' personality. Respond in that style."
        );
    }

    #[test]
    fn chat_doc_defaults_survive_sparse_documents() {
        // Older documents may lack personality and context memory fields
        let doc: ChatDoc = serde_json::from_str(
            r#"{"id":"c1","title":"New Chat","messages":[],"created_at":100}"#,
        )
        .unwrap();
        assert_eq!(doc.personality, Personality::Professional);
        assert!(doc.context_memory_enabled);
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut doc = ChatDoc::new("New Chat", 100);
        doc.context_memory_enabled = false;

        ChatPatch {
            title: Some("Renamed".into()),
            ..ChatPatch::default()
        }
        .apply_to(&mut doc);

        assert_eq!(doc.title, "Renamed");
        assert!(!doc.context_memory_enabled);
        assert!(doc.messages.is_empty());
    }
}
