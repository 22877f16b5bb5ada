//! User Repository

use super::{page_bounds, RepoError, RepoResult};
use shared::models::{Role, User, UserAddress, UserAddressSave, UserResponse};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const USER_SELECT: &str = "SELECT id, full_name, email, phone, password_hash, avatar_url, email_verified, is_active, created_at FROM user";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let sql = format!("{USER_SELECT} WHERE id = ?");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<User>> {
    let sql = format!("{USER_SELECT} WHERE email = ? COLLATE NOCASE LIMIT 1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn create(
    pool: &SqlitePool,
    full_name: &str,
    email: &str,
    phone: Option<&str>,
    password_hash: &str,
    email_verified: bool,
) -> RepoResult<User> {
    if find_by_email(pool, email).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Email '{email}' is already registered"
        )));
    }

    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO user (id, full_name, email, phone, password_hash, email_verified, is_active, created_at) VALUES (?, ?, ?, ?, ?, ?, 1, ?)",
    )
    .bind(id)
    .bind(full_name)
    .bind(email)
    .bind(phone)
    .bind(password_hash)
    .bind(email_verified)
    .bind(now_millis())
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

pub async fn list(
    pool: &SqlitePool,
    search: &str,
    page: i64,
    page_size: i64,
) -> RepoResult<(Vec<UserResponse>, i64)> {
    let (limit, offset) = page_bounds(page, page_size);
    let pattern = format!("%{search}%");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user WHERE full_name LIKE ?1 OR email LIKE ?1",
    )
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    let users = sqlx::query_as::<_, UserResponse>(
        "SELECT id, full_name, email, phone, avatar_url, is_active, created_at FROM user WHERE full_name LIKE ?1 OR email LIKE ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
    )
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((users, total))
}

/// Flip the active flag; inactive users cannot log in
pub async fn toggle_status(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE user SET is_active = NOT is_active WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    let active: bool = sqlx::query_scalar("SELECT is_active FROM user WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(active)
}

pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    full_name: Option<&str>,
    phone: Option<&str>,
    avatar_url: Option<&str>,
    password_hash: Option<&str>,
) -> RepoResult<User> {
    let rows = sqlx::query(
        "UPDATE user SET full_name = COALESCE(?1, full_name), phone = COALESCE(?2, phone), avatar_url = COALESCE(?3, avatar_url), password_hash = COALESCE(?4, password_hash) WHERE id = ?5",
    )
    .bind(full_name)
    .bind(phone)
    .bind(avatar_url)
    .bind(password_hash)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("User {id} not found")))
}

// ========== Roles ==========

pub async fn roles_of(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>(
        "SELECT r.id, r.name, r.description, r.permissions, r.is_system, r.is_active, r.created_at, r.updated_at FROM role r JOIN user_role ur ON ur.role_id = r.id WHERE ur.user_id = ? AND r.is_active = 1 ORDER BY r.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

pub async fn set_roles(pool: &SqlitePool, user_id: i64, role_ids: &[i64]) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM user_role WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    for role_id in role_ids {
        sqlx::query("INSERT OR IGNORE INTO user_role (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn assign_role_by_name(
    pool: &SqlitePool,
    user_id: i64,
    role_name: &str,
) -> RepoResult<()> {
    let role_id: Option<i64> = sqlx::query_scalar("SELECT id FROM role WHERE name = ?")
        .bind(role_name)
        .fetch_optional(pool)
        .await?;
    let role_id =
        role_id.ok_or_else(|| RepoError::NotFound(format!("Role '{role_name}' not found")))?;
    sqlx::query("INSERT OR IGNORE INTO user_role (user_id, role_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(role_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// The role used for the session: highest privilege first
/// (Super Admin > Admin > Staff > everything else by name).
pub async fn primary_role(pool: &SqlitePool, user_id: i64) -> RepoResult<Option<Role>> {
    let roles = roles_of(pool, user_id).await?;
    let rank = |name: &str| match name {
        "Super Admin" => 0,
        "Admin" => 1,
        "Staff" => 2,
        _ => 3,
    };
    Ok(roles.into_iter().min_by_key(|r| rank(&r.name)))
}

// ========== Addresses ==========

const ADDRESS_SELECT: &str = "SELECT id, user_id, receiver_name, phone, province_name, district_name, ward_name, address_detail, is_default FROM user_address";

pub async fn addresses_of(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<UserAddress>> {
    let sql = format!("{ADDRESS_SELECT} WHERE user_id = ? ORDER BY is_default DESC, id");
    let rows = sqlx::query_as::<_, UserAddress>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_address(
    pool: &SqlitePool,
    user_id: i64,
    address_id: i64,
) -> RepoResult<Option<UserAddress>> {
    let sql = format!("{ADDRESS_SELECT} WHERE id = ? AND user_id = ?");
    let row = sqlx::query_as::<_, UserAddress>(&sql)
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn save_address(
    pool: &SqlitePool,
    user_id: i64,
    data: UserAddressSave,
) -> RepoResult<UserAddress> {
    let mut tx = pool.begin().await?;

    if data.is_default {
        sqlx::query("UPDATE user_address SET is_default = 0 WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    let id = match data.id {
        Some(id) => {
            let rows = sqlx::query(
                "UPDATE user_address SET receiver_name = ?, phone = ?, province_name = ?, district_name = ?, ward_name = ?, address_detail = ?, is_default = ? WHERE id = ? AND user_id = ?",
            )
            .bind(&data.receiver_name)
            .bind(&data.phone)
            .bind(&data.province_name)
            .bind(&data.district_name)
            .bind(&data.ward_name)
            .bind(&data.address_detail)
            .bind(data.is_default)
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            if rows.rows_affected() == 0 {
                return Err(RepoError::NotFound(format!("Address {id} not found")));
            }
            id
        }
        None => {
            let id = snowflake_id();
            sqlx::query(
                "INSERT INTO user_address (id, user_id, receiver_name, phone, province_name, district_name, ward_name, address_detail, is_default) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(user_id)
            .bind(&data.receiver_name)
            .bind(&data.phone)
            .bind(&data.province_name)
            .bind(&data.district_name)
            .bind(&data.ward_name)
            .bind(&data.address_detail)
            .bind(data.is_default)
            .execute(&mut *tx)
            .await?;
            id
        }
    };

    tx.commit().await?;
    find_address(pool, user_id, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to save address".into()))
}

pub async fn delete_address(pool: &SqlitePool, user_id: i64, address_id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM user_address WHERE id = ? AND user_id = ?")
        .bind(address_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn seed_user(pool: &SqlitePool) -> User {
        create(pool, "Alice", "alice@example.com", None, "hash", true)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let db = DbService::in_memory().await.unwrap();
        seed_user(&db.pool).await;
        let err = create(&db.pool, "Bob", "ALICE@example.com", None, "h", true)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn role_assignment_and_primary_role() {
        let db = DbService::in_memory().await.unwrap();
        let user = seed_user(&db.pool).await;
        assign_role_by_name(&db.pool, user.id, "Customer")
            .await
            .unwrap();
        assign_role_by_name(&db.pool, user.id, "Admin").await.unwrap();

        let primary = primary_role(&db.pool, user.id).await.unwrap().unwrap();
        assert_eq!(primary.name, "Admin");
    }

    #[tokio::test]
    async fn default_address_is_exclusive() {
        let db = DbService::in_memory().await.unwrap();
        let user = seed_user(&db.pool).await;

        let make = |is_default| UserAddressSave {
            id: None,
            receiver_name: "Alice".to_string(),
            phone: "0900000000".to_string(),
            province_name: "HCM".to_string(),
            district_name: "D1".to_string(),
            ward_name: "W1".to_string(),
            address_detail: "12 Main".to_string(),
            is_default,
        };

        save_address(&db.pool, user.id, make(true)).await.unwrap();
        save_address(&db.pool, user.id, make(true)).await.unwrap();

        let addresses = addresses_of(&db.pool, user.id).await.unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses.iter().filter(|a| a.is_default).count(), 1);
    }
}
