//! Recipe and favorite types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// POST /save-favorites body.
///
/// `recipes` is a free-form recipe reference. Its `recipeId` must be present and
/// its `isFavorite` flag decides whether the reference is added or removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveFavoritesRequest {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub recipes: Option<Map<String, Value>>,
}

/// GET /fetch-favorites/:userId reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesResponse {
    #[serde(rename = "favoriteRecipes")]
    pub favorite_recipes: Vec<Value>,
}

/// POST /add_recipe body. Recipe content is stored as given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddRecipeRequest {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub ingredients: Option<Value>,
    #[serde(default)]
    pub instructions: Option<Value>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRecipeResponse {
    pub message: String,
    pub recipe_id: String,
}
