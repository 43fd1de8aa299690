//! Headless engine for a chat client backed by a remote document store and
//! a hosted text-generation endpoint.
//!
//! The [`controllers::ChatController`] is the entry point: feed it an auth
//! state, pump its store subscriptions, and drive user intents (send,
//! select, delete, feedback, settings, templates) through its methods. Store
//! and generation backends plug in behind the [`repositories::StoreGateway`]
//! and [`services::GenerationClient`] traits.

pub mod auth;
pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use auth::{AnonymousAuth, AuthProvider, AuthState};
pub use controllers::{ChatController, SendPhase};
pub use repositories::{InMemoryStore, StoreGateway, Subscription};
pub use services::{GeminiClient, GenerationClient};

/// Initialize structured logging for binaries and examples embedding the
/// engine. Respects `RUST_LOG`, defaulting to info.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}
