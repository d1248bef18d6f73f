use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::DocRef;

pub const COLLECTION: &str = "users";

pub const EMAIL: &str = "email";
pub const SESSION_ID: &str = "session_id";
pub const FAVORITE_RECIPES: &str = "favorite_recipes";
pub const CREATED_RECIPES: &str = "created_recipes";

/// User record, keyed by the identity provider's uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    #[serde(default, rename = "firstName")]
    pub first_name: String,
    #[serde(default, rename = "lastName")]
    pub last_name: String,
    /// Recipe references as the client sent them, minus the `isFavorite` toggle.
    #[serde(default)]
    pub favorite_recipes: Vec<Value>,
    /// Ids of recipes this user created, oldest first.
    #[serde(default)]
    pub created_recipes: Vec<String>,
    /// Empty or absent while logged out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl UserRecord {
    pub fn new(email: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            favorite_recipes: Vec::new(),
            created_recipes: Vec::new(),
            session_id: None,
        }
    }
}

pub fn doc_ref(uid: &str) -> DocRef {
    DocRef::new(COLLECTION, uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{from_document, to_document};

    #[test]
    fn test_new_user_has_empty_lists_and_no_session() {
        let doc = to_document(&UserRecord::new("ada@example.com", "Ada", "Lovelace")).unwrap();
        assert_eq!(doc["firstName"], "Ada");
        assert!(doc[FAVORITE_RECIPES].as_array().unwrap().is_empty());
        assert!(doc[CREATED_RECIPES].as_array().unwrap().is_empty());
        assert!(!doc.contains_key(SESSION_ID));
    }

    #[test]
    fn test_sparse_document_reads_with_defaults() {
        let doc = serde_json::json!({ "email": "ada@example.com" });
        let user: UserRecord = from_document(doc.as_object().cloned().unwrap()).unwrap();
        assert!(user.favorite_recipes.is_empty());
        assert!(user.first_name.is_empty());
    }
}
