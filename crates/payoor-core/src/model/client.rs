use async_trait::async_trait;

use super::types::{Completion, PromptPair};

/// Completion client interface used by the dispatcher.
///
/// Implementations never fail out-of-band: every transport or service fault is
/// reported through the returned [`Completion`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short provider/model label for logs.
    fn describe(&self) -> String;

    async fn complete(&self, prompt: &PromptPair) -> Completion;
}
