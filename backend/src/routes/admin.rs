//! Maintenance routes for disposable environments.
//!
//! Mounted only when `admin.allow_bulk_delete` is set.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use futures_util::future::join_all;
use recipe_box_common::MessageResponse;

use crate::error::{ApiError, Result};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/delete_users", post(delete_users))
}

/// POST /delete_users - delete every account in the identity provider.
///
/// Deletions run concurrently and every one is attempted; the first failure is
/// reported after all have finished. User records in the document store are
/// left in place.
async fn delete_users(State(state): State<Arc<AppState>>) -> Result<Json<MessageResponse>> {
    let accounts = state
        .identity
        .list_accounts()
        .await
        .map_err(ApiError::bad_request)?;

    let results = join_all(
        accounts
            .iter()
            .map(|account| state.identity.delete_account(&account.uid)),
    )
    .await;

    let mut deleted = 0;
    let mut first_error = None;
    for (account, result) in accounts.iter().zip(results) {
        match result {
            Ok(()) => deleted += 1,
            Err(e) => {
                tracing::error!("Error deleting account {}: {}", account.uid, e);
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        tracing::warn!("Deleted {} of {} accounts", deleted, accounts.len());
        return Err(ApiError::bad_request(e));
    }

    tracing::warn!("Deleted all {} accounts", accounts.len());
    Ok(Json(MessageResponse::new("All users deleted successfully")))
}
