//! MCP Registry - storage core for a registry of MCP server versions.
//!
//! This crate holds everything below the HTTP layer: the data model, the
//! version comparator, two storage backends behind one contract, seed import
//! and the service wrapper clients call through. It can be used without any
//! server.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_registry::{open_backend, ListFilter, RegistryService, StorageSettings};
//!
//! #[tokio::main]
//! async fn main() -> mcp_registry::Result<()> {
//!     let backend = open_backend(&StorageSettings::sqlite("data/registry.sqlite"))?;
//!     let service = RegistryService::new(backend);
//!
//!     let page = service.list(&ListFilter::new().name("weather"), None, 0).await?;
//!     println!("Found {} servers", page.servers.len());
//!
//!     service.close().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod storage;
pub mod version;

// Re-export commonly used types
pub use config::{BackendKind, StorageSettings};
pub use error::{ErrorKind, RegistryError, Result};
pub use models::{Repository, Server, ServerDetail, VersionDetail};
pub use service::RegistryService;
pub use storage::{
    open_backend, ConnectionInfo, ListFilter, ListPage, MemoryBackend, SeedReport, SqliteBackend,
    StorageBackend,
};
pub use version::compare_versions;
