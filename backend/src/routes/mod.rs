//! HTTP routes.

pub mod accounts;
pub mod admin;
pub mod favorites;
pub mod health;
pub mod recipes;

use std::sync::Arc;

use axum::Router;
use serde_json::Value;

use crate::config::Config;
use crate::AppState;

/// Build the API router. Destructive admin routes are only mounted when enabled.
pub fn router(config: &Config) -> Router<Arc<AppState>> {
    let router = Router::new()
        .merge(accounts::router())
        .merge(favorites::router())
        .merge(recipes::router())
        .merge(health::router());

    if config.admin.allow_bulk_delete {
        router.merge(admin::router())
    } else {
        router
    }
}

/// A string field counts as provided when present and non-empty.
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Truthiness of a loosely typed JSON field, as the web client means it:
/// null, false, 0 and "" are falsy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(null), false)]
    #[case(json!(false), false)]
    #[case(json!(0), false)]
    #[case(json!(0.0), false)]
    #[case(json!(""), false)]
    #[case(json!(true), true)]
    #[case(json!(42), true)]
    #[case(json!("abc"), true)]
    #[case(json!([]), true)]
    #[case(json!({}), true)]
    fn test_is_truthy(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_truthy(&value), expected);
    }

    #[test]
    fn test_present_rejects_empty_strings() {
        assert_eq!(present(&Some("a".to_string())), Some("a"));
        assert_eq!(present(&Some(String::new())), None);
        assert_eq!(present(&None), None);
    }
}
