//! Board-agnostic core of the Airlift firmware update service
//!
//! This crate contains everything between "the transport delivered some
//! bytes" and "the flash controller programmed a word":
//!
//! - Streaming CRC-32 validator
//! - Flow-control acknowledgment gate
//! - Transfer session state machine
//! - Storage backend capability trait with a thin (host-managed) and a
//!   raw (direct flash) implementation
//!
//! All entry points are synchronous and expect serialized delivery from a
//! single task; no locking happens here.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to later modules
mod fmt;

pub mod checksum;
pub mod config;
pub mod flow;
pub mod session;
pub mod state;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod sim;

pub use checksum::Crc32;
pub use config::OtaConfig;
pub use session::Session;
pub use state::{ErrorKind, State};
pub use traits::{OtaEvents, StorageBackend, StorageError, Transport};
