mod chat;
mod chat_list;
mod confirm;
mod message;
mod prompt_template;
mod settings;
mod theme;

pub use chat::{ChatDoc, ChatPatch, Personality};
pub use chat_list::ChatListStore;
pub use confirm::{AutoConfirm, AutoDeny, ConfirmationPrompt};
pub use message::{ChatMessage, MessageFeedback, Role, now_millis};
pub use prompt_template::{PromptTemplate, TemplatePatch};
pub use settings::{FontSize, SettingUpdate, SettingsPatch, UserSettings};
pub use theme::Theme;
