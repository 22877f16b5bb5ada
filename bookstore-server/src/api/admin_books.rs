//! Admin book management

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;

use shared::models::{
    Author, Book, BookCreate, BookImage, BookListItem, BookUpdate, Category, Publisher,
};
use shared::response::Page;

use crate::core::ServerState;
use crate::db::repository::{author, book, category, publisher};
use crate::utils::{AppError, AppResult};

#[derive(Debug, serde::Deserialize)]
pub struct SearchPageQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

pub async fn list(
    State(state): State<ServerState>,
    Query(q): Query<SearchPageQuery>,
) -> AppResult<Json<Page<BookListItem>>> {
    let (items, total) = book::list(&state.pool, &q.search, q.page, q.page_size).await?;
    Ok(Json(Page::new(items, total, q.page, q.page_size)))
}

/// Form data for the create/edit screens
#[derive(Debug, Serialize)]
pub struct BookFormData {
    pub authors: Vec<Author>,
    pub categories: Vec<Category>,
    pub publishers: Vec<Publisher>,
}

pub async fn form_data(State(state): State<ServerState>) -> AppResult<Json<BookFormData>> {
    Ok(Json(BookFormData {
        authors: author::find_all(&state.pool, "").await?,
        categories: category::find_all(&state.pool).await?,
        publishers: publisher::find_all(&state.pool, "").await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct AdminBookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub author_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
    pub images: Vec<BookImage>,
}

pub async fn get_one(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AdminBookDetails>> {
    let b = book::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Book {id} not found")))?;
    Ok(Json(AdminBookDetails {
        author_ids: book::authors_of(&state.pool, id)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect(),
        category_ids: book::categories_of(&state.pool, id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect(),
        images: book::images_of(&state.pool, id).await?,
        book: b,
    }))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(data): Json<BookCreate>,
) -> AppResult<Json<Book>> {
    Ok(Json(book::create(&state.pool, data).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(data): Json<BookUpdate>,
) -> AppResult<Json<Book>> {
    Ok(Json(book::update(&state.pool, id, data).await?))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(book::delete(&state.pool, id).await?))
}

pub async fn delete_image(
    State(state): State<ServerState>,
    Path(image_id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(book::delete_image(&state.pool, image_id).await?))
}

pub async fn set_main_image(
    State(state): State<ServerState>,
    Path(image_id): Path<i64>,
) -> AppResult<Json<shared::AppResponse<()>>> {
    book::set_main_image(&state.pool, image_id).await?;
    Ok(Json(shared::AppResponse::success(())))
}
