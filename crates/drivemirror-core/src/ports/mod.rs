//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the sync engine depends on while their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Folder-scoped remote object storage (Google Drive, test fakes)

pub mod remote_store;

pub use remote_store::IRemoteStore;
