//! Capability traits
//!
//! These traits define the interface between the session logic and the
//! pieces supplied from outside it: where the image is stored, how
//! notifications leave the device, and what the host application hears.

pub mod events;
pub mod storage;
pub mod transport;

pub use events::OtaEvents;
pub use storage::{StorageBackend, StorageError};
pub use transport::Transport;
