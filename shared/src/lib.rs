//! Shared types for the bookstore platform
//!
//! Common types used by the server and its clients: domain models,
//! the chat wire protocol, response envelopes and ID utilities.

pub mod chat;
pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Chat protocol re-exports (for convenient access)
pub use chat::{ChatEvent, ClientCommand};
pub use response::AppResponse;
