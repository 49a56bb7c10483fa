//! Domain entities and value types
//!
//! - Newtypes for identifiers, file names and millisecond timestamps
//! - Local and remote file entries as seen by a reconciliation pass
//! - Domain-specific error types

pub mod entries;
pub mod errors;
pub mod newtypes;

pub use entries::{LocalFileEntry, RemoteFileEntry, RemoteFolder};
pub use errors::DomainError;
pub use newtypes::*;
