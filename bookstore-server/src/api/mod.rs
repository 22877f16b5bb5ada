//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`catalog`] - 公开书目（首页/详情/分类浏览/搜索）
//! - [`account`] - 注册登录、个人资料、地址、通知
//! - [`cart`] - 会话购物车、结算、支付
//! - [`orders`] / [`reviews`] - 客户订单与评价
//! - [`chat`] - WebSocket 聊天 + 管理端会话列表
//! - `admin_*` - 后台管理（全部经过权限门）
//!
//! 后台路由按 `Module.Action` 精确挂权限中间件；`Super Admin` /
//! `Admin` 角色在门内直接放行。

pub mod account;
pub mod admin_authors;
pub mod admin_books;
pub mod admin_categories;
pub mod admin_inventory;
pub mod admin_orders;
pub mod admin_payments;
pub mod admin_promotions;
pub mod admin_publishers;
pub mod admin_reports;
pub mod admin_reviews;
pub mod admin_roles;
pub mod admin_shipping;
pub mod admin_users;
pub mod cart;
pub mod catalog;
pub mod chat;
pub mod health;
pub mod orders;
pub mod reviews;

use axum::routing::{delete, get, post, put};
use axum::{middleware, Router};

use crate::auth::{require_admin, require_login, require_permission};
use crate::core::ServerState;

/// Assemble every API route (session middleware is layered on top by
/// [`crate::core::Server::build_app`]).
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .route("/api/health", get(health::health))
        .merge(public_routes())
        .merge(customer_routes())
        .nest("/api/admin", admin_routes())
}

fn public_routes() -> Router<ServerState> {
    Router::new()
        // Catalog
        .route("/api/home", get(catalog::home))
        .route("/api/categories", get(catalog::categories))
        .route("/api/books", get(catalog::browse))
        .route("/api/books/suggestions", get(catalog::suggestions))
        .route("/api/books/{id}", get(catalog::details))
        // Auth
        .route("/api/account/login", post(account::login))
        .route("/api/account/logout", post(account::logout))
        .route("/api/account/otp", post(account::send_otp))
        .route("/api/account/register", post(account::register))
        .route("/api/account/initialize-admin", post(account::initialize_admin))
        // Cart works for anonymous sessions too
        .route("/api/cart", get(cart::get_cart))
        .route("/api/cart/items", post(cart::add_item))
        .route("/api/cart/buy-now/{id}", post(cart::buy_now))
        .route(
            "/api/cart/items/{book_id}",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route(
            "/api/cart/coupon",
            post(cart::apply_coupon).delete(cart::remove_coupon),
        )
        .route("/api/cart/shipping-address", post(cart::set_shipping_address))
        // Payment gateway callbacks are unauthenticated
        .route("/api/payments/webhook", post(cart::payment_webhook))
        .route("/api/payments/{order_id}/status", get(cart::payment_status))
        .route("/api/payments/{order_id}/simulate", post(cart::simulate_payment))
        // Chat WS authenticates inside the handler (token query param)
        .route("/api/chat/ws", get(chat::chat_ws))
}

fn customer_routes() -> Router<ServerState> {
    Router::new()
        // Profile
        .route("/api/account/me", get(account::me))
        .route("/api/account/profile", put(account::update_profile))
        // Addresses
        .route(
            "/api/account/addresses",
            get(account::list_addresses).post(account::save_address),
        )
        .route("/api/account/addresses/{id}", delete(account::delete_address))
        // Notifications
        .route("/api/account/notifications", get(account::list_notifications))
        .route(
            "/api/account/notifications/unread-count",
            get(account::unread_count),
        )
        .route(
            "/api/account/notifications/read-all",
            post(account::mark_all_notifications_read),
        )
        .route(
            "/api/account/notifications/{id}",
            get(account::notification_details),
        )
        .route(
            "/api/account/notifications/{id}/read",
            post(account::mark_notification_read),
        )
        // Checkout
        .route(
            "/api/cart/checkout",
            get(cart::checkout_info).post(cart::place_order),
        )
        .route("/api/cart/payment/{order_id}", get(cart::payment_page))
        .route("/api/cart/orders/{order_id}/success", get(cart::order_success))
        // Orders & reviews
        .route("/api/orders", get(orders::history))
        .route("/api/orders/{id}", get(orders::details))
        .route("/api/reviews", post(reviews::submit))
        .layer(middleware::from_fn(require_login))
}

fn admin_routes() -> Router<ServerState> {
    Router::new()
        .route("/dashboard", get(admin_reports::dashboard))
        .layer(middleware::from_fn(require_admin))
        .merge(crud_routes(
            "/books",
            "Product",
            admin_books_routes(),
        ))
        .merge(crud_routes("/authors", "Author", admin_author_routes()))
        .merge(crud_routes(
            "/publishers",
            "Publisher",
            admin_publisher_routes(),
        ))
        .merge(crud_routes(
            "/categories",
            "Category",
            admin_category_routes(),
        ))
        .merge(inventory_routes())
        .merge(order_routes())
        .merge(payment_routes())
        .merge(crud_routes(
            "/promotions",
            "Promotion",
            admin_promotion_routes(),
        ))
        .merge(review_routes())
        .merge(user_routes())
        .merge(role_routes())
        .merge(crud_routes(
            "/shipping-methods",
            "Shipping",
            admin_shipping_routes(),
        ))
        .merge(report_routes())
        .merge(chat_routes())
        .layer(middleware::from_fn(require_login))
}

/// View/Create/Update/Delete route bundle under one permission module
struct CrudHandlers {
    view: Router<ServerState>,
    create: Router<ServerState>,
    update: Router<ServerState>,
    delete: Router<ServerState>,
}

fn crud_routes(prefix: &str, module: &'static str, handlers: CrudHandlers) -> Router<ServerState> {
    let CrudHandlers {
        view,
        create,
        update,
        delete,
    } = handlers;
    let combined = view
        .layer(middleware::from_fn(require_permission(module, "View")))
        .merge(create.layer(middleware::from_fn(require_permission(module, "Create"))))
        .merge(update.layer(middleware::from_fn(require_permission(module, "Update"))))
        .merge(delete.layer(middleware::from_fn(require_permission(module, "Delete"))));
    Router::new().nest(prefix, combined)
}

fn admin_books_routes() -> CrudHandlers {
    CrudHandlers {
        view: Router::new()
            .route("/", get(admin_books::list))
            .route("/form-data", get(admin_books::form_data))
            .route("/{id}", get(admin_books::get_one)),
        create: Router::new().route("/", post(admin_books::create)),
        update: Router::new()
            .route("/{id}", put(admin_books::update))
            .route("/images/{image_id}/main", post(admin_books::set_main_image)),
        delete: Router::new()
            .route("/{id}", delete(admin_books::delete))
            .route("/images/{image_id}", delete(admin_books::delete_image)),
    }
}

fn admin_author_routes() -> CrudHandlers {
    CrudHandlers {
        view: Router::new().route("/", get(admin_authors::list)),
        create: Router::new().route("/", post(admin_authors::create)),
        update: Router::new().route("/{id}", put(admin_authors::update)),
        delete: Router::new().route("/{id}", delete(admin_authors::delete)),
    }
}

fn admin_publisher_routes() -> CrudHandlers {
    CrudHandlers {
        view: Router::new().route("/", get(admin_publishers::list)),
        create: Router::new().route("/", post(admin_publishers::create)),
        update: Router::new().route("/{id}", put(admin_publishers::update)),
        delete: Router::new().route("/{id}", delete(admin_publishers::delete)),
    }
}

fn admin_category_routes() -> CrudHandlers {
    CrudHandlers {
        view: Router::new().route("/", get(admin_categories::list)),
        create: Router::new().route("/", post(admin_categories::create)),
        update: Router::new().route("/{id}", put(admin_categories::update)),
        delete: Router::new().route("/{id}", delete(admin_categories::delete)),
    }
}

fn admin_promotion_routes() -> CrudHandlers {
    CrudHandlers {
        view: Router::new().route("/", get(admin_promotions::list)),
        create: Router::new().route("/", post(admin_promotions::create)),
        update: Router::new().route("/{id}", put(admin_promotions::update)),
        delete: Router::new().route("/{id}", delete(admin_promotions::delete)),
    }
}

fn admin_shipping_routes() -> CrudHandlers {
    CrudHandlers {
        view: Router::new().route("/", get(admin_shipping::list)),
        create: Router::new().route("/", post(admin_shipping::create)),
        update: Router::new().route("/{id}", put(admin_shipping::update)),
        delete: Router::new().route("/{id}", delete(admin_shipping::delete)),
    }
}

fn inventory_routes() -> Router<ServerState> {
    let view = Router::new()
        .route("/inventory", get(admin_inventory::list))
        .route("/inventory/{book_id}/logs", get(admin_inventory::logs))
        .layer(middleware::from_fn(require_permission("Inventory", "View")));
    let update = Router::new()
        .route("/inventory/{book_id}", put(admin_inventory::update_stock))
        .layer(middleware::from_fn(require_permission("Inventory", "Update")));
    view.merge(update)
}

fn order_routes() -> Router<ServerState> {
    let view = Router::new()
        .route("/orders", get(admin_orders::list))
        .route("/orders/{id}", get(admin_orders::details))
        .layer(middleware::from_fn(require_permission("Order", "View")));
    let update = Router::new()
        .route("/orders/{id}/status", post(admin_orders::update_status))
        .route("/orders/{id}/shipping", post(admin_orders::update_shipping))
        .layer(middleware::from_fn(require_permission("Order", "Update")));
    view.merge(update)
}

fn payment_routes() -> Router<ServerState> {
    let view = Router::new()
        .route("/payments", get(admin_payments::list))
        .route("/payments/settings", get(admin_payments::settings))
        .layer(middleware::from_fn(require_permission("Payment", "View")));
    let update = Router::new()
        .route("/payments/settings/{id}", put(admin_payments::update_setting))
        .route("/payments/{id}/status", post(admin_payments::update_status))
        .layer(middleware::from_fn(require_permission("Payment", "Update")));
    view.merge(update)
}

fn review_routes() -> Router<ServerState> {
    let view = Router::new()
        .route("/reviews", get(admin_reviews::list))
        .layer(middleware::from_fn(require_permission("Review", "View")));
    let del = Router::new()
        .route("/reviews/{id}", delete(admin_reviews::delete))
        .layer(middleware::from_fn(require_permission("Review", "Delete")));
    view.merge(del)
}

fn user_routes() -> Router<ServerState> {
    let view = Router::new()
        .route("/users", get(admin_users::list))
        .route("/users/{id}/roles", get(admin_users::get_roles))
        .layer(middleware::from_fn(require_permission("User", "View")));
    let update = Router::new()
        .route("/users/{id}/toggle-status", post(admin_users::toggle_status))
        .route("/users/{id}/roles", put(admin_users::update_roles))
        .layer(middleware::from_fn(require_permission("User", "Update")));
    view.merge(update)
}

fn role_routes() -> Router<ServerState> {
    let view = Router::new()
        .route("/roles", get(admin_roles::list))
        .route("/roles/permissions", get(admin_roles::permission_catalog))
        .layer(middleware::from_fn(require_permission("Role", "View")));
    let create = Router::new()
        .route("/roles", post(admin_roles::create))
        .layer(middleware::from_fn(require_permission("Role", "Create")));
    let update = Router::new()
        .route("/roles/{id}", put(admin_roles::update))
        .layer(middleware::from_fn(require_permission("Role", "Update")));
    let del = Router::new()
        .route("/roles/{id}", delete(admin_roles::delete))
        .layer(middleware::from_fn(require_permission("Role", "Delete")));
    view.merge(create).merge(update).merge(del)
}

fn report_routes() -> Router<ServerState> {
    Router::new()
        .route("/reports", get(admin_reports::sales))
        .layer(middleware::from_fn(require_permission("Report", "View")))
}

fn chat_routes() -> Router<ServerState> {
    Router::new()
        .route("/chat/rooms", get(chat::admin_rooms))
        .route("/chat/rooms/{room_id}/messages", get(chat::admin_room_messages))
        .route("/chat/users/{user_id}", get(chat::admin_chat_user))
        .layer(middleware::from_fn(require_permission("Chat", "View")))
}
