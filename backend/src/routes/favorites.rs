//! Favorite recipe references kept on the user record.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use recipe_box_common::{FavoritesResponse, MessageResponse, SaveFavoritesRequest};
use serde_json::Value;

use super::{is_truthy, present};
use crate::error::{ApiError, Result};
use crate::extract::JsonBody;
use crate::models::user;
use crate::AppState;

/// Toggle key of a favorite reference. Never stored.
const IS_FAVORITE: &str = "isFavorite";
const RECIPE_ID: &str = "recipeId";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/save-favorites", post(save_favorites))
        .route("/fetch-favorites/", get(missing_user_id))
        .route("/fetch-favorites/:user_id", get(fetch_favorites))
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("Error accessing favorite recipes: {}", e);
    ApiError::internal("Internal Server Error")
}

/// POST /save-favorites - add or remove one recipe reference.
///
/// The reference is stored without its `isFavorite` flag, and removal only
/// matches a stored reference whose remaining fields are all identical.
async fn save_favorites(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<SaveFavoritesRequest>,
) -> Result<Json<MessageResponse>> {
    let recipe = request
        .recipes
        .filter(|recipe| recipe.get(RECIPE_ID).map(is_truthy).unwrap_or(false));
    let (Some(user_id), Some(mut recipe)) = (present(&request.user_id), recipe) else {
        return Err(ApiError::Validation("Missing userId or recipeId".to_string()));
    };

    let user_ref = user::doc_ref(user_id);
    if state.store.get(&user_ref).await.map_err(internal)?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let favorite = recipe
        .remove(IS_FAVORITE)
        .map(|flag| is_truthy(&flag))
        .unwrap_or(false);
    let reference = Value::Object(recipe);

    if favorite {
        state
            .store
            .array_union(&user_ref, user::FAVORITE_RECIPES, vec![reference])
            .await
            .map_err(internal)?;
        tracing::info!("Added favorite for user {}", user_id);
        Ok(Json(MessageResponse::new("Recipe added to favorites")))
    } else {
        state
            .store
            .array_remove(&user_ref, user::FAVORITE_RECIPES, vec![reference])
            .await
            .map_err(internal)?;
        tracing::info!("Removed favorite for user {}", user_id);
        Ok(Json(MessageResponse::new("Recipe removed from favorites")))
    }
}

/// GET /fetch-favorites/:user_id
async fn fetch_favorites(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<FavoritesResponse>> {
    if user_id.is_empty() {
        return missing_user_id().await;
    }

    let data = state
        .store
        .get(&user::doc_ref(&user_id))
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let favorite_recipes = data
        .get(user::FAVORITE_RECIPES)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(Json(FavoritesResponse { favorite_recipes }))
}

async fn missing_user_id() -> Result<Json<FavoritesResponse>> {
    Err(ApiError::Validation("Missing userId".to_string()))
}
