//! Recipe creation.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use recipe_box_common::{AddRecipeRequest, AddRecipeResponse};
use serde_json::json;

use super::is_truthy;
use crate::auth::AuthContext;
use crate::error::{ApiError, Result};
use crate::extract::JsonBody;
use crate::models::{recipe, user, RecipeRecord};
use crate::store::{to_document, StoreError};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/add_recipe", post(add_recipe))
}

/// POST /add_recipe - create a recipe owned by the authenticated caller.
async fn add_recipe(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    JsonBody(request): JsonBody<AddRecipeRequest>,
) -> Result<(StatusCode, Json<AddRecipeResponse>)> {
    let provided = |field: &Option<serde_json::Value>| field.as_ref().filter(|v| is_truthy(v)).cloned();
    let (Some(title), Some(ingredients), Some(instructions)) = (
        provided(&request.title),
        provided(&request.ingredients),
        provided(&request.instructions),
    ) else {
        return Err(ApiError::Validation("Missing required fields".to_string()));
    };

    let recipe_ref = state.store.new_ref(recipe::COLLECTION);
    let record = RecipeRecord {
        recipe_id: recipe_ref.id.clone(),
        user_id: auth.user_id.clone(),
        title,
        ingredients,
        instructions,
        image_url: request.image_url.unwrap_or_default(),
    };

    let failed = |e: StoreError| {
        tracing::error!("Error adding recipe for user {}: {}", auth.user_id, e);
        ApiError::internal(e)
    };

    state
        .store
        .set(&recipe_ref, to_document(&record).map_err(failed)?)
        .await
        .map_err(failed)?;

    match state
        .store
        .array_union(&auth.user_ref, user::CREATED_RECIPES, vec![json!(recipe_ref.id)])
        .await
    {
        Ok(()) => {}
        Err(StoreError::NotFound(_)) => {
            tracing::warn!(
                "No user record for {}; recipe {} not linked",
                auth.user_id,
                recipe_ref.id
            );
        }
        Err(e) => return Err(failed(e)),
    }

    tracing::info!("User {} created recipe {}", auth.user_id, recipe_ref.id);
    Ok((
        StatusCode::CREATED,
        Json(AddRecipeResponse {
            message: "Recipe added successfully".to_string(),
            recipe_id: recipe_ref.id,
        }),
    ))
}
