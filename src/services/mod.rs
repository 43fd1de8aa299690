mod generation;
mod title;

pub use generation::{
    DEFAULT_MODEL, GeminiClient, GenerationClient, GenerationError, GenerationTurn,
    SUPPORTED_MODELS, is_supported_model,
};
pub use title::{derive_title, needs_title_backfill};
