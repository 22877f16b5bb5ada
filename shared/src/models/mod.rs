//! Domain models
//!
//! Entity structs shared between the server and clients. Database row
//! mapping (`sqlx::FromRow`) is gated behind the `db` feature so client
//! builds stay free of sqlx.

mod author;
mod book;
mod category;
mod chat;
mod inventory;
mod notification;
mod order;
mod payment;
mod promotion;
mod publisher;
mod review;
mod role;
mod shipping;
mod user;

pub use author::*;
pub use book::*;
pub use category::*;
pub use chat::*;
pub use inventory::*;
pub use notification::*;
pub use order::*;
pub use payment::*;
pub use promotion::*;
pub use publisher::*;
pub use review::*;
pub use role::*;
pub use shipping::*;
pub use user::*;
