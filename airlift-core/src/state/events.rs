//! Events that trigger state transitions

use super::machine::ErrorKind;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Transfer lifecycle
    /// Init packet validated and the backend is ready
    InitAccepted,
    /// Received byte count reached the declared size
    ImageComplete,
    /// Client asked to finalize what the backend already holds
    ApplyRequested,
    /// Checksum passed and the backend closed the image
    Validated,

    // Failures
    /// Any fatal condition
    Fault(ErrorKind),

    // Client control
    /// Client cancelled the transfer
    Abort,
    /// Client (or host) asked for a clean slate
    Reset,
}
