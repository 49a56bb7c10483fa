//! DriveMirror Core - Domain types, ports and configuration
//!
//! This crate holds the pieces every other DriveMirror crate depends on:
//! - **Domain values** - `Timestamp`, `FileName`, `RemoteId`, `FolderId`
//! - **Domain entries** - `LocalFileEntry`, `RemoteFileEntry`, `RemoteFolder`
//! - **Port definitions** - `IRemoteStore`, the only network-facing boundary
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module has no I/O. Ports define the trait the sync engine
//! consumes; adapter crates (e.g. `drivemirror-gdrive`) implement it.

pub mod config;
pub mod domain;
pub mod ports;
