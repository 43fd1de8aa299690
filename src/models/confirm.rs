use async_trait::async_trait;

/// Blocking yes/no prompt gating destructive actions (chat delete, template
/// delete). The presentation layer supplies the real implementation; the
/// mutation only proceeds on `true`.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Approves every prompt. For tests and non-interactive embeddings.
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationPrompt for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Denies every prompt.
pub struct AutoDeny;

#[async_trait]
impl ConfirmationPrompt for AutoDeny {
    async fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}
