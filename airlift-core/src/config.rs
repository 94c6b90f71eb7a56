//! Update service configuration
//!
//! Fixed at build time by the host application; nothing here is negotiated
//! with the client.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of accepted chunks between flow-control acknowledgments
pub const DEFAULT_ACK_INTERVAL: u32 = 200;

/// Default pause before apply so the final notification can leave the radio
pub const DEFAULT_APPLY_GRACE_MS: u32 = 100;

/// Session behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OtaConfig {
    /// Compare the running CRC against the declared one at finalize
    pub verify_checksum: bool,
    /// Chunks between acknowledgments; 0 disables flow control
    pub ack_interval: u32,
    /// Delay between the completion callback and apply
    pub apply_grace_ms: u32,
}

impl Default for OtaConfig {
    fn default() -> Self {
        Self {
            verify_checksum: true,
            ack_interval: DEFAULT_ACK_INTERVAL,
            apply_grace_ms: DEFAULT_APPLY_GRACE_MS,
        }
    }
}

impl OtaConfig {
    /// Whether acknowledgments are sent at all
    pub fn flow_control_enabled(&self) -> bool {
        self.ack_interval > 0
    }
}
