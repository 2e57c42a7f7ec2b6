//! Recipe endpoints.
//!
//! - `POST /api/generate-recipe`: run the pipeline and store the result
//! - `GET /api/my-recipes`: caller's recipes, newest first
//! - `DELETE /api/recipes/:id`: delete an owned recipe
//! - `POST /api/recipes/:id/share`: publish an owned recipe
//! - `GET /api/shared/:share_id`: public read of a shared recipe

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, RecipeView, UserContext};
use crate::db;
use crate::models::StoredRecipe;
use crate::pipeline::synthesis::IngredientInput;

#[derive(Deserialize)]
pub struct GenerateRecipeRequest {
    #[serde(rename = "selectedIngredients", default)]
    pub selected_ingredients: Value,
}

#[derive(Serialize)]
pub struct GenerateRecipeResponse {
    pub message: &'static str,
    pub recipe: RecipeView,
}

#[derive(Serialize)]
pub struct RecipeListResponse {
    pub recipes: Vec<RecipeView>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct ShareResponse {
    pub message: &'static str,
    pub share_url: String,
}

/// `POST /api/generate-recipe`
pub async fn generate(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    payload: Result<Json<GenerateRecipeRequest>, JsonRejection>,
) -> Result<Json<GenerateRecipeResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let input = IngredientInput::from_json(&request.selected_ingredients);

    let draft = ctx.core.synthesizer().generate_recipe(input).await?;
    let recipe = StoredRecipe::from_draft(&user.user_id, draft);

    {
        let conn = ctx.core.db()?;
        db::insert_recipe(&conn, &recipe)?;
    }
    tracing::info!(recipe_id = %recipe.id, "Recipe stored");

    Ok(Json(GenerateRecipeResponse {
        message: "Recipe generated and saved",
        recipe: recipe.into(),
    }))
}

/// `GET /api/my-recipes`
pub async fn list_mine(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<RecipeListResponse>, ApiError> {
    let recipes = {
        let conn = ctx.core.db()?;
        db::list_recipes_for_user(&conn, &user.user_id)?
    };

    Ok(Json(RecipeListResponse {
        recipes: recipes.into_iter().map(RecipeView::from).collect(),
    }))
}

/// `DELETE /api/recipes/:id`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    let deleted = {
        let conn = ctx.core.db()?;
        db::delete_owned_recipe(&conn, &id, &user.user_id)?
    };

    if !deleted {
        return Err(ApiError::NotFound("Recipe not found".into()));
    }
    Ok(Json(MessageResponse {
        message: "Recipe deleted",
    }))
}

/// `POST /api/recipes/:id/share`
pub async fn share(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ShareResponse>, ApiError> {
    let id = parse_id(&id)?;
    let share_id = {
        let conn = ctx.core.db()?;
        db::assign_share_id(&conn, &id, &user.user_id)?
    }
    .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;

    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
    Ok(Json(ShareResponse {
        message: "Recipe shared",
        share_url: ctx.core.share_url(&share_id, host),
    }))
}

/// `GET /api/shared/:share_id`
pub async fn shared(
    State(ctx): State<ApiContext>,
    Path(share_id): Path<String>,
) -> Result<Json<RecipeView>, ApiError> {
    // Malformed ids are reported like unknown ones.
    let share_id =
        Uuid::parse_str(&share_id).map_err(|_| ApiError::NotFound("Recipe not found".into()))?;

    let recipe = {
        let conn = ctx.core.db()?;
        db::get_recipe_by_share_id(&conn, &share_id)?
    };

    recipe
        .map(|r| Json(RecipeView::from(r)))
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid recipe id".into()))
}
