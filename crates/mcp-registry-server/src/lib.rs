//! MCP Registry Server - HTTP front end for the registry core.
//!
//! Exposes the `/v0` REST routes over a [`RegistryService`], with optional
//! token authentication on publish. The binary in `main.rs` wires this up
//! from command-line and environment configuration.
//!
//! [`RegistryService`]: mcp_registry::RegistryService

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod server;

pub use config::Args;
pub use error::ApiError;
pub use server::{build_router, start_server, AppState};
