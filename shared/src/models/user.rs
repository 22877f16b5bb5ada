//! User Model

use serde::{Deserialize, Serialize};

/// User entity (includes the password hash — never serialize to clients)
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    pub created_at: i64,
}

/// Client-safe projection of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserResponse {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name,
            email: u.email,
            phone: u.phone,
            avatar_url: u.avatar_url,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

/// Saved shipping address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserAddress {
    pub id: i64,
    pub user_id: i64,
    pub receiver_name: String,
    pub phone: String,
    pub province_name: String,
    pub district_name: String,
    pub ward_name: String,
    pub address_detail: String,
    pub is_default: bool,
}

/// Save-address payload (id = None creates, Some updates)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAddressSave {
    pub id: Option<i64>,
    pub receiver_name: String,
    pub phone: String,
    pub province_name: String,
    pub district_name: String,
    pub ward_name: String,
    pub address_detail: String,
    #[serde(default)]
    pub is_default: bool,
}

impl UserAddress {
    /// 下单时拼接的完整收货地址
    pub fn full_address(&self) -> String {
        format!(
            "{} | {} | {}, {}, {}, {}",
            self.receiver_name,
            self.phone,
            self.address_detail,
            self.ward_name,
            self.district_name,
            self.province_name
        )
    }
}
