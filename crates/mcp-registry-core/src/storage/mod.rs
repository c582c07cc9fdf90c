//! Storage backends for registry entries.
//!
//! Two interchangeable implementations sit behind [`StorageBackend`]:
//! - [`MemoryBackend`] keeps everything in a locked map, for tests and
//!   throwaway deployments
//! - [`SqliteBackend`] persists entries to a SQLite file
//!
//! Both enforce the same publish rules (see [`check_version`]) and agree on
//! every contract point except where `list` is documented as backend-specific.

mod factory;
mod filter;
mod memory;
mod publish;
mod seed;
mod sqlite;
mod traits;

pub use factory::open_backend;
pub use filter::{normalize_limit, validate_cursor, FilterField, ListFilter, ListPage};
pub use memory::MemoryBackend;
pub use publish::{check_version, stamp_new_entry, validate_publish};
pub use seed::{load_seed_file, parse_seed_record, SeedReport};
pub use sqlite::SqliteBackend;
pub use traits::{ConnectionInfo, StorageBackend};
