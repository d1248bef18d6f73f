use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COLLECTION: &str = "recipes";

/// Recipe record. Written once at creation, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRecord {
    /// Mirrors the record key.
    pub recipe_id: String,
    /// Owning user's uid.
    pub user_id: String,
    pub title: Value,
    pub ingredients: Value,
    pub instructions: Value,
    #[serde(default)]
    pub image_url: String,
}
