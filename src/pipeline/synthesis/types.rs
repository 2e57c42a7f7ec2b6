use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::{CompletionError, ImageError};

/// One line of a recipe's ingredient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    pub quantity: String,
}

/// Fully normalized recipe produced by the pipeline. Every field is always
/// populated; `image` is an empty string when no illustration is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<String>,
    pub image: String,
}

impl RecipeDraft {
    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}

/// A role/content pair sent to the text-completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Everything the text-completion service needs for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// Text-generation capability (allows mocking).
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Return the complete generated text for the request.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Image-generation capability (allows mocking).
#[async_trait]
pub trait ImageSynthesis: Send + Sync {
    /// Return raw image bytes for the prompt.
    async fn synthesize(&self, prompt: &str) -> Result<Vec<u8>, ImageError>;
}

/// Caller-side cancellation for an in-flight pipeline call.
///
/// Created in pairs with [`CancelHandle`]; flipping the handle aborts whichever
/// external call is currently awaited.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Triggers a [`CancelSignal`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelSignal {
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    #[cfg(test)]
    fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}
