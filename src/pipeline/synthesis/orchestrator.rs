use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::extract::{extract_recipe_json, ExtractionResult};
use super::image::to_data_uri;
use super::ingredients::{validate_ingredients, IngredientInput};
use super::normalize::normalize_recipe;
use super::prompt::{build_image_prompt, build_recipe_prompt};
use super::types::{
    CancelSignal, ChatMessage, CompletionRequest, ImageSynthesis, RecipeDraft, TextCompletion,
};
use super::{CompletionError, ImageError, SynthesisError};

/// Model and threshold parameters for one synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisSettings {
    pub model: String,
    pub max_tokens: u32,
    pub min_ingredients: usize,
}

/// Orchestrates the recipe pipeline:
/// validate → prompt → complete → extract → normalize → illustrate
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct RecipeSynthesizer {
    completion: Arc<dyn TextCompletion>,
    images: Option<Arc<dyn ImageSynthesis>>,
    settings: SynthesisSettings,
}

impl RecipeSynthesizer {
    pub fn new(
        completion: Arc<dyn TextCompletion>,
        images: Option<Arc<dyn ImageSynthesis>>,
        settings: SynthesisSettings,
    ) -> Self {
        Self {
            completion,
            images,
            settings,
        }
    }

    pub fn settings(&self) -> &SynthesisSettings {
        &self.settings
    }

    /// Produce a complete draft from the caller's ingredients.
    pub async fn generate_recipe(
        &self,
        input: impl Into<IngredientInput>,
    ) -> Result<RecipeDraft, SynthesisError> {
        // The handle is kept alive so the signal never fires.
        let (_handle, cancel) = CancelSignal::pair();
        self.generate_recipe_with_cancel(input, cancel).await
    }

    /// Same as [`generate_recipe`](Self::generate_recipe), aborting the
    /// in-flight external call when `cancel` fires.
    pub async fn generate_recipe_with_cancel(
        &self,
        input: impl Into<IngredientInput>,
        cancel: CancelSignal,
    ) -> Result<RecipeDraft, SynthesisError> {
        let input = input.into();
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("generate_recipe", request_id = %request_id);
        self.run(input, cancel).instrument(span).await
    }

    async fn run(
        &self,
        input: IngredientInput,
        mut cancel: CancelSignal,
    ) -> Result<RecipeDraft, SynthesisError> {
        let ingredients = validate_ingredients(&input, self.settings.min_ingredients)?;
        tracing::info!(
            ingredient_count = ingredients.len(),
            model = %self.settings.model,
            "Generating recipe"
        );

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage::user(build_recipe_prompt(&ingredients))],
            max_tokens: self.settings.max_tokens,
        };

        let completed = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CompletionError::Cancelled),
            result = self.completion.complete(&request) => result,
        };
        let text = completed.map_err(|e| {
            tracing::warn!(error = %e, "Text completion failed");
            match e {
                CompletionError::Cancelled => {
                    SynthesisError::GenerationUnavailable("cancelled".into())
                }
                other => SynthesisError::from(other),
            }
        })?;

        let extraction = extract_recipe_json(&text);
        match &extraction {
            ExtractionResult::Parsed(_) => {}
            ExtractionResult::NotFound => {
                tracing::warn!("No fenced JSON block in completion, using fallback recipe")
            }
            ExtractionResult::ParseFailed(reason) => {
                tracing::warn!(
                    reason = %reason,
                    "Recipe JSON unparseable after repair, using fallback recipe"
                )
            }
        }

        let mut draft = normalize_recipe(&extraction, &ingredients);
        draft.image = self.illustrate(&draft.title, &mut cancel).await;

        tracing::info!(
            title = %draft.title,
            ingredient_lines = draft.ingredients.len(),
            steps = draft.instructions.len(),
            has_image = draft.has_image(),
            "Recipe generated"
        );
        Ok(draft)
    }

    /// Data URI for the dish, or an empty string on any failure.
    async fn illustrate(&self, title: &str, cancel: &mut CancelSignal) -> String {
        let Some(images) = &self.images else {
            return String::new();
        };
        let prompt = build_image_prompt(title);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ImageError::Cancelled),
            result = images.synthesize(&prompt) => result,
        };

        match result {
            Ok(bytes) => to_data_uri(&bytes),
            Err(e) => {
                tracing::warn!(error = %e, "Image synthesis failed, continuing without image");
                String::new()
            }
        }
    }
}
