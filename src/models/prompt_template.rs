use serde::{Deserialize, Serialize};

/// A reusable prompt snippet managed from the settings panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    pub template: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl PromptTemplate {
    /// A template pending creation; the store assigns the id.
    pub fn new(name: impl Into<String>, template: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            template: template.into(),
            created_at,
            updated_at: None,
        }
    }
}

/// Merge-update for an existing template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl TemplatePatch {
    pub fn apply_to(&self, doc: &mut PromptTemplate) {
        if let Some(name) = &self.name {
            doc.name = name.clone();
        }
        if let Some(template) = &self.template {
            doc.template = template.clone();
        }
        if let Some(updated_at) = self.updated_at {
            doc.updated_at = Some(updated_at);
        }
    }
}
