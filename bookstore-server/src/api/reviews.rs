//! Customer review submission

use axum::extract::State;
use axum::{Extension, Json};

use shared::models::{Review, ReviewCreate};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{book, review};
use crate::utils::{AppError, AppResult};

pub async fn submit(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(data): Json<ReviewCreate>,
) -> AppResult<Json<Review>> {
    if book::find_active_by_id(&state.pool, data.book_id).await?.is_none() {
        return Err(AppError::not_found("Book not found"));
    }
    Ok(Json(review::create(&state.pool, user.id, data).await?))
}
