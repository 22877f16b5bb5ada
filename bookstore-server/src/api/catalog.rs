//! Public catalog API — home feed, book details, category browse, search

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use shared::models::{Author, Book, BookImage, BookListItem, Category, ReviewRow};
use shared::response::Page;

use crate::core::ServerState;
use crate::db::repository::{book, category, review};
use crate::db::repository::book::{BrowseFilter, SortOrder};
use crate::utils::{AppError, AppResult};

// ========== Home feed ==========

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub newest: Vec<BookListItem>,
    pub best_sellers: Vec<BookListItem>,
    pub discounted: Vec<BookListItem>,
    pub categories: Vec<Category>,
}

pub async fn home(State(state): State<ServerState>) -> AppResult<Json<HomeResponse>> {
    Ok(Json(HomeResponse {
        newest: book::newest(&state.pool, 12).await?,
        best_sellers: book::best_sellers(&state.pool, 12).await?,
        discounted: book::discounted(&state.pool, 12).await?,
        categories: category::find_all(&state.pool).await?,
    }))
}

/// Category menu (site-wide navigation)
pub async fn categories(State(state): State<ServerState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(category::find_all(&state.pool).await?))
}

// ========== Book details ==========

#[derive(Debug, Serialize)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub authors: Vec<Author>,
    pub categories: Vec<Category>,
    pub images: Vec<BookImage>,
    pub reviews: Vec<ReviewRow>,
    pub average_rating: Option<f64>,
    pub related: Vec<BookListItem>,
}

pub async fn details(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<BookDetails>> {
    let b = book::find_active_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Book {id} not found")))?;

    Ok(Json(BookDetails {
        authors: book::authors_of(&state.pool, id).await?,
        categories: book::categories_of(&state.pool, id).await?,
        images: book::images_of(&state.pool, id).await?,
        reviews: review::for_book(&state.pool, id).await?,
        average_rating: review::average_rating(&state.pool, id).await?,
        related: book::related(&state.pool, id, 8).await?,
        book: b,
    }))
}

// ========== Browse ==========

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    /// Price bucket "min-max"; either bound may be omitted ("-200000")
    pub price_range: Option<String>,
    pub cover_type: Option<String>,
    #[serde(default)]
    pub sort: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    12
}

fn parse_price_range(range: &str) -> (Option<f64>, Option<f64>) {
    let mut parts = range.splitn(2, '-');
    let min = parts.next().and_then(|p| p.trim().parse().ok());
    let max = parts.next().and_then(|p| p.trim().parse().ok());
    (min, max)
}

pub async fn browse(
    State(state): State<ServerState>,
    Query(q): Query<BrowseQuery>,
) -> AppResult<Json<Page<BookListItem>>> {
    let (price_min, price_max) = q
        .price_range
        .as_deref()
        .map(parse_price_range)
        .unwrap_or((None, None));

    let filter = BrowseFilter {
        category_id: q.category_id,
        search: q.search,
        price_min,
        price_max,
        cover_type: q.cover_type,
    };

    let (items, total) = book::browse(
        &state.pool,
        &filter,
        SortOrder::parse(&q.sort),
        q.page,
        q.page_size,
    )
    .await?;
    Ok(Json(Page::new(items, total, q.page, q.page_size)))
}

// ========== Search suggestions ==========

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub term: String,
}

pub async fn suggestions(
    State(state): State<ServerState>,
    Query(q): Query<SuggestQuery>,
) -> AppResult<Json<Vec<BookListItem>>> {
    if q.term.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(book::suggestions(&state.pool, q.term.trim(), 8).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_range_parsing() {
        assert_eq!(parse_price_range("100-200"), (Some(100.0), Some(200.0)));
        assert_eq!(parse_price_range("-200"), (None, Some(200.0)));
        assert_eq!(parse_price_range("100-"), (Some(100.0), None));
        assert_eq!(parse_price_range("junk"), (None, None));
    }
}
