//! Transfer state machine
//!
//! Defines which session phase follows which. The machine is explicit,
//! finite and deterministic; side effects (storage, notifications) live in
//! [`crate::session`].

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::{ErrorKind, State};
