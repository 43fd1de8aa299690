mod chat_controller;

pub use chat_controller::{
    ChatController, NETWORK_FALLBACK, STRUCTURAL_FALLBACK, SendPhase,
};
