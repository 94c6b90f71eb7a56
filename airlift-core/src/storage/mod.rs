//! Storage backends
//!
//! - [`raw::RawFlashBackend`] owns a staging region of internal flash and
//!   programs it directly through an [`airlift_hal::NvmController`].
//! - [`managed::ManagedBackend`] forwards to a vendor updater
//!   ([`airlift_hal::ManagedUpdater`]) that handles flash on its own.
//!
//! Targets pick one at build time; the session only sees
//! [`crate::traits::StorageBackend`].

pub mod managed;
pub mod raw;

pub use managed::ManagedBackend;
pub use raw::{RawFlashBackend, StagingLayout};
