//! Role Repository

use super::{RepoError, RepoResult};
use shared::models::{Role, RoleCreate, RoleUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const ROLE_SELECT: &str =
    "SELECT id, name, description, permissions, is_system, is_active, created_at, updated_at FROM role";

/// Roles that ship with the system and must never be deleted
pub const PROTECTED_ROLES: &[&str] = &["Super Admin", "Admin", "Customer", "Staff"];

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Role>> {
    let sql = format!("{ROLE_SELECT} ORDER BY name");
    let roles = sqlx::query_as::<_, Role>(&sql).fetch_all(pool).await?;
    Ok(roles)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Role>> {
    let sql = format!("{ROLE_SELECT} WHERE id = ?");
    let role = sqlx::query_as::<_, Role>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<Role>> {
    let sql = format!("{ROLE_SELECT} WHERE name = ? LIMIT 1");
    let role = sqlx::query_as::<_, Role>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

pub async fn create(pool: &SqlitePool, data: RoleCreate) -> RepoResult<Role> {
    if find_by_name(pool, &data.name).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Role '{}' already exists",
            data.name
        )));
    }

    let invalid: Vec<_> = data
        .permissions
        .iter()
        .filter(|p| !crate::auth::permissions::is_valid_permission(p))
        .collect();
    if !invalid.is_empty() {
        return Err(RepoError::Validation(format!(
            "Unknown permissions: {invalid:?}"
        )));
    }

    let id = snowflake_id();
    let permissions_json =
        serde_json::to_string(&data.permissions).unwrap_or_else(|_| "[]".to_string());
    sqlx::query(
        "INSERT INTO role (id, name, description, permissions, is_system, is_active, created_at) VALUES (?, ?, ?, ?, 0, 1, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(&permissions_json)
    .bind(now_millis())
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create role".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: RoleUpdate) -> RepoResult<Role> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Role {id} not found")))?;

    // Super Admin 的权限不可修改
    let permissions_json = if existing.name == "Super Admin" {
        None
    } else {
        data.permissions
            .as_ref()
            .map(|p| serde_json::to_string(p).unwrap_or_else(|_| "[]".to_string()))
    };

    // System roles keep their name
    let name = if existing.is_system { None } else { data.name };

    sqlx::query(
        "UPDATE role SET name = COALESCE(?1, name), description = COALESCE(?2, description), permissions = COALESCE(?3, permissions), is_active = COALESCE(?4, is_active), updated_at = ?5 WHERE id = ?6",
    )
    .bind(name)
    .bind(data.description)
    .bind(permissions_json)
    .bind(data.is_active)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Role {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Role {id} not found")))?;

    if existing.is_system || PROTECTED_ROLES.contains(&existing.name.as_str()) {
        return Err(RepoError::Business(
            "Cannot delete a system role".to_string(),
        ));
    }

    let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_role WHERE role_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if in_use > 0 {
        return Err(RepoError::Business(
            "Cannot delete a role that is assigned to users".to_string(),
        ));
    }

    sqlx::query("DELETE FROM role WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn create_update_delete_role() {
        let db = DbService::in_memory().await.unwrap();
        let role = create(
            &db.pool,
            RoleCreate {
                name: "Moderator".to_string(),
                description: None,
                permissions: vec!["Review.View".to_string(), "Review.Delete".to_string()],
            },
        )
        .await
        .unwrap();
        assert_eq!(role.permissions.len(), 2);
        assert!(!role.is_system);

        let updated = update(
            &db.pool,
            role.id,
            RoleUpdate {
                name: None,
                description: Some("trusted".to_string()),
                permissions: Some(vec!["Review.*".to_string()]),
                is_active: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.permissions, vec!["Review.*".to_string()]);

        assert!(delete(&db.pool, role.id).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_unknown_permissions() {
        let db = DbService::in_memory().await.unwrap();
        let err = create(
            &db.pool,
            RoleCreate {
                name: "Broken".to_string(),
                description: None,
                permissions: vec!["Nope.View".to_string()],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[tokio::test]
    async fn system_roles_are_protected() {
        let db = DbService::in_memory().await.unwrap();
        let admin = find_by_name(&db.pool, "Admin").await.unwrap().unwrap();
        let err = delete(&db.pool, admin.id).await.unwrap_err();
        assert!(matches!(err, RepoError::Business(_)));
    }

    #[tokio::test]
    async fn super_admin_permissions_immutable() {
        let db = DbService::in_memory().await.unwrap();
        let sa = find_by_name(&db.pool, "Super Admin").await.unwrap().unwrap();
        let updated = update(
            &db.pool,
            sa.id,
            RoleUpdate {
                name: None,
                description: None,
                permissions: Some(vec!["User.View".to_string()]),
                is_active: None,
            },
        )
        .await
        .unwrap();
        assert!(updated.permissions.is_empty());
    }
}
