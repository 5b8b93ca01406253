//! Tenant Admin - multi-tenant administration service.
//!
//! Organizations, users, roles with permission strings, and per-organization
//! system variables including incremental document numbering, exposed as a
//! JSON API under `/api/admin`.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **services**: Application use cases and business logic
//! - **infra**: Infrastructure concerns (database, Redis, health probes)
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (pagination, responses)
//! - **errors**: Centralized error handling
//!
//! Domain entities and rules live in the `domain` workspace crate.
//!
//! # CLI Usage
//!
//! ```bash
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Create the first super administrator
//! cargo run -- bootstrap --email root@example.com --password 'change-me-now'
//!
//! # Start the server
//! cargo run -- serve --port 3000
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use infra::{Cache, Database};
