//! Permission Definitions
//!
//! 权限字符串统一为 `Module.Action`（如 `Order.View`），另支持
//! `Module.*` 通配符。`Super Admin` / `Admin` 角色绕过全部检查。

/// 可授权的功能模块
pub const MODULES: &[&str] = &[
    "User",
    "Role",
    "Product", // Covers books
    "Order",
    "Category",
    "Report",
    "Setting",
    "Author",
    "Publisher",
    "Shipping",
    "Payment",
    "Review",
    "Promotion",
    "Inventory",
    "Chat",
];

pub const ACTIONS: &[&str] = &["View", "Create", "Update", "Delete"];

/// Generate a permission string, e.g. `permission("User", "View")` → `"User.View"`
pub fn permission(module: &str, action: &str) -> String {
    format!("{module}.{action}")
}

/// All grantable permissions grouped by module (role form data)
pub fn all_permissions() -> Vec<(String, Vec<String>)> {
    MODULES
        .iter()
        .map(|m| {
            (
                m.to_string(),
                ACTIONS.iter().map(|a| permission(m, a)).collect(),
            )
        })
        .collect()
}

/// Validate a stored permission string
pub fn is_valid_permission(perm: &str) -> bool {
    if let Some(module) = perm.strip_suffix(".*") {
        return MODULES.contains(&module);
    }
    match perm.split_once('.') {
        Some((module, action)) => MODULES.contains(&module) && ACTIONS.contains(&action),
        None => false,
    }
}

/// 检查权限列表是否覆盖 `module.action`
///
/// 精确匹配或 `Module.*` 通配符。列表为空一律拒绝。
pub fn list_grants(permissions: &[String], module: &str, action: &str) -> bool {
    let required = permission(module, action);
    let wildcard = format!("{module}.*");
    permissions.iter().any(|p| p == &required || p == &wildcard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_wildcard_match() {
        let perms = vec!["Order.View".to_string(), "Product.*".to_string()];
        assert!(list_grants(&perms, "Order", "View"));
        assert!(!list_grants(&perms, "Order", "Delete"));
        assert!(list_grants(&perms, "Product", "Create"));
        assert!(list_grants(&perms, "Product", "Delete"));
        assert!(!list_grants(&perms, "User", "View"));
    }

    #[test]
    fn empty_list_denies() {
        assert!(!list_grants(&[], "Order", "View"));
    }

    #[test]
    fn validates_permission_strings() {
        assert!(is_valid_permission("User.View"));
        assert!(is_valid_permission("Chat.*"));
        assert!(!is_valid_permission("User"));
        assert!(!is_valid_permission("Bogus.View"));
        assert!(!is_valid_permission("User.Bogus"));
    }

    #[test]
    fn catalog_covers_all_modules() {
        let all = all_permissions();
        assert_eq!(all.len(), MODULES.len());
        assert!(all.iter().all(|(_, perms)| perms.len() == ACTIONS.len()));
    }
}
