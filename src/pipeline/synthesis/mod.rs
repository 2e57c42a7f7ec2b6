//! Recipe synthesis pipeline.
//!
//! ingredients → prompt → text completion → JSON extract/repair →
//! normalize → image synthesis → `RecipeDraft`.
//!
//! Only two failures escape the pipeline: too few usable ingredients and an
//! unavailable text-completion service. Extraction and image failures are
//! absorbed into fallback values on the draft.

pub mod completion;
pub mod extract;
pub mod image;
pub mod ingredients;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;
pub mod repair;
pub mod types;

pub use completion::*;
pub use extract::*;
pub use image::*;
pub use ingredients::*;
pub use normalize::*;
pub use orchestrator::*;
pub use prompt::*;
pub use repair::*;
pub use types::*;

use thiserror::Error;

/// Fatal pipeline failures. Everything else degrades the draft instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("At least {required} ingredients are required ({found} provided)")]
    InsufficientIngredients { found: usize, required: usize },

    #[error("Recipe generation unavailable: {0}")]
    GenerationUnavailable(String),
}

/// Failures of the text-completion service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Text generation service unreachable: {0}")]
    Connection(String),

    #[error("Text generation timed out after {0}s")]
    Timeout(u64),

    #[error("Text generation service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("Could not read text generation response: {0}")]
    ResponseParsing(String),

    #[error("Text generation cancelled")]
    Cancelled,
}

/// Failures of the image-synthesis service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("Image service unreachable: {0}")]
    Connection(String),

    #[error("Image generation timed out after {0}s")]
    Timeout(u64),

    #[error("Image service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("Image service returned an empty payload")]
    EmptyPayload,

    #[error("Image generation cancelled")]
    Cancelled,
}

impl From<CompletionError> for SynthesisError {
    fn from(err: CompletionError) -> Self {
        SynthesisError::GenerationUnavailable(err.to_string())
    }
}
