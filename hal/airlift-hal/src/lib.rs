//! Airlift Hardware Abstraction Layer
//!
//! This crate defines the hardware capabilities the update engine needs
//! from a target. Chip-specific crates implement them; the portable logic
//! in `airlift-core` is written against these traits only.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  airlift-core (session, raw engine)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  airlift-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ airlift-hal-  │       │ host-managed  │
//! │    nrf52      │       │   updater     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::NvmController`] - Raw page erase / word program / ready poll
//! - [`updater::ManagedUpdater`] - Vendor "begin/write/end" partition update API

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
pub mod updater;

// Re-export key traits at crate root for convenience
pub use flash::{FlashGeometry, NvmController, ERASED_BYTE, ERASED_WORD, WORD_SIZE};
pub use updater::ManagedUpdater;
