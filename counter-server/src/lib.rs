//! Counter Server - café counter backend
//!
//! # Architecture
//!
//! - **Order Store** (`store`): in-memory order map with transactional
//!   key lookup, filtering and pagination
//! - **Event Fan-out** (`fanout`): topic-indexed broadcast to live
//!   WebSocket subscribers
//! - **Stats Aggregator** (`stats`): on-demand dashboard rollups
//! - **Auth** (`auth`): JWT verification for live connections
//! - **HTTP API** (`api`): RESTful routes and the WS upgrade
//!
//! # Module structure
//!
//! ```text
//! counter-server/src/
//! ├── core/          # config, state, server
//! ├── auth/          # JWT service
//! ├── api/           # HTTP routes and handlers
//! ├── store/         # order store
//! ├── fanout/        # event hub + WS sessions
//! ├── stats/         # analytics rollups
//! └── utils/         # errors, logging
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod fanout;
pub mod stats;
pub mod store;
pub mod utils;

// Re-export common types
pub use auth::{Claims, JwtService};
pub use core::{Config, Server, ServerState};
pub use fanout::FanoutHub;
pub use store::OrderStore;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load .env, parse config and initialize logging
///
/// Returns the parsed config so `main` boots from the same snapshot of
/// the environment.
pub fn setup_environment() -> Config {
    let _ = dotenv::dotenv();
    let config = Config::from_env();
    utils::logger::init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );
    config
}

pub fn print_banner() {
    println!(
        r#"
   ______                  __
  / ____/___  __  ______  / /____  _____
 / /   / __ \/ / / / __ \/ __/ _ \/ ___/
/ /___/ /_/ / /_/ / / / / /_/  __/ /
\____/\____/\__,_/_/ /_/\__/\___/_/
    "#
    );
}
