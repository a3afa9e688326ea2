//! planner-server: HTTP API server for the notes board API
//!
//! This crate provides:
//! - REST endpoints for boards, membership, groups and notes
//! - Bearer token (and optional dev header) authentication
//! - Hyperlinked JSON representations built from declarative schemas
//!
//! # Architecture
//!
//! The server is built on Axum with a middleware stack for:
//! - Request tracing and logging
//! - CORS handling
//! - Request ID generation
//! - JSON error responses
//!
//! Boards, membership and groups live in the relational store; notes live in
//! the document store. Every handler authorizes against the relational board
//! before it touches any note.
//!
//! # Usage
//!
//! ```rust,ignore
//! use planner_server::{ServerConfig, AppState, routes::build_router};
//!
//! let config = ServerConfig::from_env()?;
//! let state = AppState::in_memory(config)?;
//! let app = build_router(state);
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod schemas;
pub mod state;
pub mod views;

// Re-exports for convenience
pub use config::{ConfigError, Environment, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

// Re-export dependent crates
pub use planner_core;
pub use planner_store;
