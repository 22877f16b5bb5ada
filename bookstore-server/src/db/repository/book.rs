//! Book Repository
//!
//! Catalog queries (public storefront) and admin CRUD.

use super::{page_bounds, RepoError, RepoResult};
use shared::models::{Author, Book, BookCreate, BookImage, BookListItem, BookUpdate, Category};
use shared::util::{now_millis, snowflake_id};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const BOOK_SELECT: &str = "SELECT id, title, isbn, price, discount_price, description, publish_year, page_count, cover_type, stock_quantity, sold_quantity, publisher_id, status, created_at FROM book";

/// List-row projection with publisher name and main image
const LIST_SELECT: &str = "SELECT b.id, b.title, b.price, b.discount_price, b.stock_quantity, b.sold_quantity, b.status, p.name AS publisher_name, (SELECT image_url FROM book_image WHERE book_id = b.id AND is_main = 1 LIMIT 1) AS main_image_url FROM book b LEFT JOIN publisher p ON p.id = b.publisher_id";

/// Storefront sort orders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Newest,
    PriceAsc,
    PriceDesc,
    BestSelling,
}

impl SortOrder {
    pub fn parse(s: &str) -> Self {
        match s {
            "price_asc" => SortOrder::PriceAsc,
            "price_desc" => SortOrder::PriceDesc,
            "best_selling" => SortOrder::BestSelling,
            _ => SortOrder::Newest,
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            SortOrder::Newest => "b.created_at DESC",
            SortOrder::PriceAsc => "COALESCE(b.discount_price, b.price) ASC",
            SortOrder::PriceDesc => "COALESCE(b.discount_price, b.price) DESC",
            SortOrder::BestSelling => "b.sold_quantity DESC",
        }
    }
}

/// Storefront browse filters
#[derive(Debug, Clone, Default)]
pub struct BrowseFilter {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub cover_type: Option<String>,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Book>> {
    let sql = format!("{BOOK_SELECT} WHERE id = ?");
    let book = sqlx::query_as::<_, Book>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(book)
}

/// Storefront lookup: hidden books behave as missing
pub async fn find_active_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Book>> {
    let sql = format!("{BOOK_SELECT} WHERE id = ? AND status = 'Active'");
    let book = sqlx::query_as::<_, Book>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(book)
}

// ========== Storefront queries ==========

pub async fn newest(pool: &SqlitePool, limit: i64) -> RepoResult<Vec<BookListItem>> {
    let sql = format!("{LIST_SELECT} WHERE b.status = 'Active' ORDER BY b.created_at DESC LIMIT ?");
    Ok(sqlx::query_as::<_, BookListItem>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

pub async fn best_sellers(pool: &SqlitePool, limit: i64) -> RepoResult<Vec<BookListItem>> {
    let sql =
        format!("{LIST_SELECT} WHERE b.status = 'Active' ORDER BY b.sold_quantity DESC LIMIT ?");
    Ok(sqlx::query_as::<_, BookListItem>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

pub async fn discounted(pool: &SqlitePool, limit: i64) -> RepoResult<Vec<BookListItem>> {
    let sql = format!(
        "{LIST_SELECT} WHERE b.status = 'Active' AND b.discount_price IS NOT NULL ORDER BY (b.price - b.discount_price) / b.price DESC LIMIT ?"
    );
    Ok(sqlx::query_as::<_, BookListItem>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

/// Category/search browse with filters, sort and pagination
pub async fn browse(
    pool: &SqlitePool,
    filter: &BrowseFilter,
    sort: SortOrder,
    page: i64,
    page_size: i64,
) -> RepoResult<(Vec<BookListItem>, i64)> {
    let (limit, offset) = page_bounds(page, page_size);

    fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a BrowseFilter) {
        qb.push(" WHERE b.status = 'Active'");
        if let Some(category_id) = filter.category_id {
            qb.push(" AND b.id IN (SELECT book_id FROM book_category WHERE category_id = ")
                .push_bind(category_id)
                .push(")");
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND (b.title LIKE ").push_bind(format!("%{search}%"));
            qb.push(" OR b.isbn LIKE ")
                .push_bind(format!("%{search}%"))
                .push(")");
        }
        if let Some(min) = filter.price_min {
            qb.push(" AND COALESCE(b.discount_price, b.price) >= ")
                .push_bind(min);
        }
        if let Some(max) = filter.price_max {
            qb.push(" AND COALESCE(b.discount_price, b.price) <= ")
                .push_bind(max);
        }
        if let Some(cover) = filter.cover_type.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND b.cover_type = ").push_bind(cover);
        }
    }

    let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM book b");
    push_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(LIST_SELECT);
    push_filters(&mut qb, filter);
    qb.push(format!(" ORDER BY {}", sort.sql()));
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
    let items = qb.build_query_as::<BookListItem>().fetch_all(pool).await?;

    Ok((items, total))
}

/// Title suggestions for the search box
pub async fn suggestions(
    pool: &SqlitePool,
    term: &str,
    limit: i64,
) -> RepoResult<Vec<BookListItem>> {
    let sql = format!(
        "{LIST_SELECT} WHERE b.status = 'Active' AND b.title LIKE ? ORDER BY b.sold_quantity DESC LIMIT ?"
    );
    Ok(sqlx::query_as::<_, BookListItem>(&sql)
        .bind(format!("%{term}%"))
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

pub async fn authors_of(pool: &SqlitePool, book_id: i64) -> RepoResult<Vec<Author>> {
    Ok(sqlx::query_as::<_, Author>(
        "SELECT a.id, a.name, a.bio, a.created_at FROM author a JOIN book_author ba ON ba.author_id = a.id WHERE ba.book_id = ? ORDER BY a.name",
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?)
}

pub async fn categories_of(pool: &SqlitePool, book_id: i64) -> RepoResult<Vec<Category>> {
    Ok(sqlx::query_as::<_, Category>(
        "SELECT c.id, c.name, c.parent_id, c.description, c.created_at FROM category c JOIN book_category bc ON bc.category_id = c.id WHERE bc.book_id = ? ORDER BY c.name",
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?)
}

pub async fn images_of(pool: &SqlitePool, book_id: i64) -> RepoResult<Vec<BookImage>> {
    Ok(sqlx::query_as::<_, BookImage>(
        "SELECT id, book_id, image_url, is_main FROM book_image WHERE book_id = ? ORDER BY is_main DESC, id",
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?)
}

/// Books sharing a category with `book_id`, for the details page
pub async fn related(pool: &SqlitePool, book_id: i64, limit: i64) -> RepoResult<Vec<BookListItem>> {
    let sql = format!(
        "{LIST_SELECT} WHERE b.status = 'Active' AND b.id != ?1 AND b.id IN (SELECT book_id FROM book_category WHERE category_id IN (SELECT category_id FROM book_category WHERE book_id = ?1)) ORDER BY b.sold_quantity DESC LIMIT ?2"
    );
    Ok(sqlx::query_as::<_, BookListItem>(&sql)
        .bind(book_id)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

// ========== Admin CRUD ==========

pub async fn list(
    pool: &SqlitePool,
    search: &str,
    page: i64,
    page_size: i64,
) -> RepoResult<(Vec<BookListItem>, i64)> {
    let (limit, offset) = page_bounds(page, page_size);
    let pattern = format!("%{search}%");

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM book WHERE title LIKE ?1 OR isbn LIKE ?1")
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

    let sql = format!(
        "{LIST_SELECT} WHERE b.title LIKE ?1 OR b.isbn LIKE ?1 ORDER BY b.created_at DESC LIMIT ?2 OFFSET ?3"
    );
    let items = sqlx::query_as::<_, BookListItem>(&sql)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok((items, total))
}

pub async fn create(pool: &SqlitePool, data: BookCreate) -> RepoResult<Book> {
    if data.price < 0.0 {
        return Err(RepoError::Validation("Price cannot be negative".into()));
    }

    let id = snowflake_id();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO book (id, title, isbn, price, discount_price, description, publish_year, page_count, cover_type, stock_quantity, publisher_id, status, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'Active', ?)",
    )
    .bind(id)
    .bind(&data.title)
    .bind(&data.isbn)
    .bind(data.price)
    .bind(data.discount_price)
    .bind(&data.description)
    .bind(data.publish_year)
    .bind(data.page_count)
    .bind(&data.cover_type)
    .bind(data.stock_quantity)
    .bind(data.publisher_id)
    .bind(now_millis())
    .execute(&mut *tx)
    .await?;

    for author_id in &data.author_ids {
        sqlx::query("INSERT OR IGNORE INTO book_author (book_id, author_id) VALUES (?, ?)")
            .bind(id)
            .bind(author_id)
            .execute(&mut *tx)
            .await?;
    }
    for category_id in &data.category_ids {
        sqlx::query("INSERT OR IGNORE INTO book_category (book_id, category_id) VALUES (?, ?)")
            .bind(id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
    }
    for (idx, url) in data.image_urls.iter().enumerate() {
        sqlx::query("INSERT INTO book_image (id, book_id, image_url, is_main) VALUES (?, ?, ?, ?)")
            .bind(snowflake_id())
            .bind(id)
            .bind(url)
            .bind(idx == 0)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create book".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: BookUpdate) -> RepoResult<Book> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "UPDATE book SET title = COALESCE(?1, title), isbn = COALESCE(?2, isbn), price = COALESCE(?3, price), discount_price = COALESCE(?4, discount_price), description = COALESCE(?5, description), publish_year = COALESCE(?6, publish_year), page_count = COALESCE(?7, page_count), cover_type = COALESCE(?8, cover_type), publisher_id = COALESCE(?9, publisher_id), status = COALESCE(?10, status) WHERE id = ?11",
    )
    .bind(&data.title)
    .bind(&data.isbn)
    .bind(data.price)
    .bind(data.discount_price)
    .bind(&data.description)
    .bind(data.publish_year)
    .bind(data.page_count)
    .bind(&data.cover_type)
    .bind(data.publisher_id)
    .bind(&data.status)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Book {id} not found")));
    }

    if let Some(author_ids) = &data.author_ids {
        sqlx::query("DELETE FROM book_author WHERE book_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for author_id in author_ids {
            sqlx::query("INSERT OR IGNORE INTO book_author (book_id, author_id) VALUES (?, ?)")
                .bind(id)
                .bind(author_id)
                .execute(&mut *tx)
                .await?;
        }
    }
    if let Some(category_ids) = &data.category_ids {
        sqlx::query("DELETE FROM book_category WHERE book_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for category_id in category_ids {
            sqlx::query("INSERT OR IGNORE INTO book_category (book_id, category_id) VALUES (?, ?)")
                .bind(id)
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }
    }
    if let Some(urls) = &data.image_urls {
        // Appended images; an existing main image is kept
        let has_main: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_image WHERE book_id = ? AND is_main = 1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        for (idx, url) in urls.iter().enumerate() {
            sqlx::query(
                "INSERT INTO book_image (id, book_id, image_url, is_main) VALUES (?, ?, ?, ?)",
            )
            .bind(snowflake_id())
            .bind(id)
            .bind(url)
            .bind(has_main == 0 && idx == 0)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Book {id} not found")))
}

/// Delete a book unless orders reference it
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let referenced: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_detail WHERE book_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if referenced > 0 {
        return Err(RepoError::Business(
            "Book appears in orders; hide it instead of deleting".to_string(),
        ));
    }

    let rows = sqlx::query("DELETE FROM book WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete_image(pool: &SqlitePool, image_id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM book_image WHERE id = ?")
        .bind(image_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn set_main_image(pool: &SqlitePool, image_id: i64) -> RepoResult<()> {
    let book_id: Option<i64> = sqlx::query_scalar("SELECT book_id FROM book_image WHERE id = ?")
        .bind(image_id)
        .fetch_optional(pool)
        .await?;
    let book_id =
        book_id.ok_or_else(|| RepoError::NotFound(format!("Image {image_id} not found")))?;

    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE book_image SET is_main = 0 WHERE book_id = ?")
        .bind(book_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE book_image SET is_main = 1 WHERE id = ?")
        .bind(image_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    fn new_book(title: &str, price: f64) -> BookCreate {
        BookCreate {
            title: title.to_string(),
            isbn: None,
            price,
            discount_price: None,
            description: None,
            publish_year: None,
            page_count: None,
            cover_type: Some("Paperback".to_string()),
            stock_quantity: 5,
            publisher_id: None,
            author_ids: vec![],
            category_ids: vec![],
            image_urls: vec!["/img/a.jpg".to_string(), "/img/b.jpg".to_string()],
        }
    }

    #[tokio::test]
    async fn create_with_images_marks_first_as_main() {
        let db = DbService::in_memory().await.unwrap();
        let book = create(&db.pool, new_book("Dune", 120.0)).await.unwrap();
        let images = images_of(&db.pool, book.id).await.unwrap();
        assert_eq!(images.len(), 2);
        assert!(images[0].is_main);
        assert!(!images[1].is_main);
    }

    #[tokio::test]
    async fn browse_filters_and_sorts() {
        let db = DbService::in_memory().await.unwrap();
        create(&db.pool, new_book("Cheap", 50.0)).await.unwrap();
        create(&db.pool, new_book("Expensive", 500.0)).await.unwrap();

        let filter = BrowseFilter {
            price_max: Some(100.0),
            ..Default::default()
        };
        let (items, total) = browse(&db.pool, &filter, SortOrder::PriceAsc, 1, 10)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].title, "Cheap");

        let (all, total) = browse(
            &db.pool,
            &BrowseFilter::default(),
            SortOrder::PriceDesc,
            1,
            10,
        )
        .await
        .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all[0].title, "Expensive");
    }

    #[tokio::test]
    async fn hidden_books_invisible_to_storefront() {
        let db = DbService::in_memory().await.unwrap();
        let book = create(&db.pool, new_book("Ghost", 10.0)).await.unwrap();
        update(
            &db.pool,
            book.id,
            BookUpdate {
                status: Some("Hidden".to_string()),
                title: None,
                isbn: None,
                price: None,
                discount_price: None,
                description: None,
                publish_year: None,
                page_count: None,
                cover_type: None,
                publisher_id: None,
                author_ids: None,
                category_ids: None,
                image_urls: None,
            },
        )
        .await
        .unwrap();

        assert!(find_active_by_id(&db.pool, book.id).await.unwrap().is_none());
        assert!(find_by_id(&db.pool, book.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn set_main_image_is_exclusive() {
        let db = DbService::in_memory().await.unwrap();
        let book = create(&db.pool, new_book("Art", 10.0)).await.unwrap();
        let images = images_of(&db.pool, book.id).await.unwrap();
        set_main_image(&db.pool, images[1].id).await.unwrap();

        let after = images_of(&db.pool, book.id).await.unwrap();
        assert_eq!(after.iter().filter(|i| i.is_main).count(), 1);
        assert!(after.iter().find(|i| i.id == images[1].id).unwrap().is_main);
    }
}
