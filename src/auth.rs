use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};
use uuid::Uuid;

use crate::repositories::{BoxFuture, Subscription};

/// Identity state pushed by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated { user_id: String },
}

impl AuthState {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthState::Authenticated { user_id } => Some(user_id),
            AuthState::Unauthenticated => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Sign-in rejected: {0}")]
    SignInRejected(String),
}

/// External authentication provider. The controller only consumes the state
/// subscription; sign-in entry points are driven by the app bootstrap,
/// which retries through the provider's own mechanism on failure.
pub trait AuthProvider: Send + Sync {
    fn subscribe(&self) -> Subscription<AuthState>;

    fn sign_in_anonymously(&self) -> BoxFuture<'static, Result<String, AuthError>>;

    fn sign_in_with_token(&self, token: &str) -> BoxFuture<'static, Result<String, AuthError>>;
}

/// Provider issuing anonymous or token-derived identities, for tests and
/// development. Anonymous sign-in mints a fresh uuid; token sign-in uses
/// the token as the user id.
#[derive(Clone, Default)]
pub struct AnonymousAuth {
    inner: Arc<Mutex<AuthInner>>,
}

#[derive(Default)]
struct AuthInner {
    state: Option<AuthState>,
    subscribers: Vec<UnboundedSender<AuthState>>,
}

impl AnonymousAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_out(&self) {
        self.broadcast(AuthState::Unauthenticated);
    }

    fn broadcast(&self, state: AuthState) {
        let mut inner = self.inner.lock();
        inner.state = Some(state.clone());
        inner.subscribers.retain(|tx| tx.send(state.clone()).is_ok());
    }
}

impl AuthProvider for AnonymousAuth {
    fn subscribe(&self) -> Subscription<AuthState> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        if let Some(state) = &inner.state {
            let _ = tx.send(state.clone());
        }
        inner.subscribers.push(tx);
        Subscription::new(rx)
    }

    fn sign_in_anonymously(&self) -> BoxFuture<'static, Result<String, AuthError>> {
        let this = self.clone();
        Box::pin(async move {
            let user_id = Uuid::new_v4().to_string();
            this.broadcast(AuthState::Authenticated {
                user_id: user_id.clone(),
            });
            Ok(user_id)
        })
    }

    fn sign_in_with_token(&self, token: &str) -> BoxFuture<'static, Result<String, AuthError>> {
        let this = self.clone();
        let token = token.to_string();
        Box::pin(async move {
            if token.trim().is_empty() {
                return Err(AuthError::SignInRejected("empty token".to_string()));
            }
            this.broadcast(AuthState::Authenticated {
                user_id: token.clone(),
            });
            Ok(token)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anonymous_sign_in_broadcasts_identity() {
        let auth = AnonymousAuth::new();
        let mut sub = auth.subscribe();

        let uid = auth.sign_in_anonymously().await.unwrap();
        assert_eq!(
            sub.next().await.unwrap(),
            AuthState::Authenticated { user_id: uid }
        );
    }

    #[tokio::test]
    async fn late_subscriber_sees_current_state() {
        let auth = AnonymousAuth::new();
        let uid = auth.sign_in_anonymously().await.unwrap();

        let mut sub = auth.subscribe();
        assert_eq!(sub.next().await.unwrap().user_id(), Some(uid.as_str()));
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let auth = AnonymousAuth::new();
        assert!(auth.sign_in_with_token("  ").await.is_err());
        assert!(auth.inner.lock().state.is_none());
    }
}
