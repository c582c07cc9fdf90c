//! Data models flowing through the registry.

mod package;
mod server;

pub use package::{Argument, ArgumentType, Format, Input, KeyValueInput, Package, Remote};
pub use server::{Repository, Server, ServerDetail, VersionDetail};
