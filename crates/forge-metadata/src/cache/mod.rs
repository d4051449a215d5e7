//! Scoped, file-backed cache for fetched metadata documents.
//!
//! Two independent scopes share one layout:
//! - `User`: under the home directory, shared by every project on the machine
//! - `Workspace`: under the current project, overriding nothing implicitly
//!
//! Every write is an atomic whole-file replacement.

mod atomic;
mod store;

pub use atomic::{atomic_write_bytes, atomic_write_json};
pub use store::{is_fresh, MetadataCache};
