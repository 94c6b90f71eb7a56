//! Control channel commands
//!
//! The control characteristic carries single-byte commands from the client
//! and single-byte flow-control acknowledgments back to it. New commands may
//! be appended; existing values are frozen.

/// Byte notified on the control characteristic after every ack interval
pub const ACK_VALUE: u8 = 0x01;

// Command values: Client → Device
pub const CMD_ABORT: u8 = 0x00;
pub const CMD_RESET: u8 = 0x01;
pub const CMD_APPLY: u8 = 0x02;
pub const CMD_GET_STATUS: u8 = 0x03;

/// Commands written to the control characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlCommand {
    /// Cancel the transfer (fires the abort callback) and return to idle
    Abort,
    /// Return to idle unconditionally
    Reset,
    /// Finalize whatever the backend already holds and apply it
    Apply,
    /// Request a progress notification
    GetStatus,
}

impl ControlCommand {
    /// Decode a command byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CMD_ABORT => Some(ControlCommand::Abort),
            CMD_RESET => Some(ControlCommand::Reset),
            CMD_APPLY => Some(ControlCommand::Apply),
            CMD_GET_STATUS => Some(ControlCommand::GetStatus),
            _ => None,
        }
    }

    /// Encode to the command byte
    pub fn to_byte(self) -> u8 {
        match self {
            ControlCommand::Abort => CMD_ABORT,
            ControlCommand::Reset => CMD_RESET,
            ControlCommand::Apply => CMD_APPLY,
            ControlCommand::GetStatus => CMD_GET_STATUS,
        }
    }
}
