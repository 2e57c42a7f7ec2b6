//! Shared types for the API layer.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::core_state::CoreState;
use crate::models::StoredRecipe;
use crate::pipeline::synthesis::RecipeIngredient;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Caller identity, injected into request extensions by the identity
/// middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: String,
}

/// Recipe as returned to clients. The owner's id is never exposed.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub title: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<String>,
    pub image: String,
    pub shared: bool,
    pub created_at: String,
}

impl From<StoredRecipe> for RecipeView {
    fn from(recipe: StoredRecipe) -> Self {
        Self {
            id: recipe.id,
            shared: recipe.is_shared(),
            title: recipe.title,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            image: recipe.image,
            created_at: recipe.created_at.and_utc().to_rfc3339(),
        }
    }
}
