//! Data models
//!
//! Shared between counter-server and clients (via API). Structs serialize
//! camelCase, enum values snake_case, times as epoch-millisecond `i64`.

pub mod notification;
pub mod order;
pub mod status;

// Re-exports
pub use notification::*;
pub use order::*;
pub use status::*;
