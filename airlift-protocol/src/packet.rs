//! Init and progress packet layouts
//!
//! Both packets are packed little-endian structures:
//! - Init (9 bytes): firmware_size:u32, firmware_crc:u32, flags:u8
//! - Progress (15 bytes): state:u8, error:u8, percent:u8,
//!   bytes_received:u32, bytes_expected:u32, crc:u32

/// Exact size of the init packet
pub const INIT_PACKET_SIZE: usize = 9;

/// Size of the progress packet
pub const PROGRESS_PACKET_SIZE: usize = 15;

// Session state wire values. 1 ("waiting for init") is reserved.
pub const STATE_IDLE: u8 = 0;
pub const STATE_WAITING_INIT: u8 = 1;
pub const STATE_RECEIVING: u8 = 2;
pub const STATE_VALIDATING: u8 = 3;
pub const STATE_APPLYING: u8 = 4;
pub const STATE_ERROR: u8 = 5;

/// Display name of a state wire value
pub fn state_name(state: u8) -> &'static str {
    match state {
        STATE_IDLE => "Idle",
        STATE_WAITING_INIT => "Waiting",
        STATE_RECEIVING => "Receiving",
        STATE_VALIDATING => "Validating",
        STATE_APPLYING => "Applying",
        STATE_ERROR => "Error",
        _ => "Unknown",
    }
}

/// Display name of an error wire value
pub fn error_name(error: u8) -> &'static str {
    match error {
        0 => "None",
        1 => "Invalid init packet",
        2 => "Firmware too large",
        3 => "Storage begin failed",
        4 => "Write failed",
        5 => "CRC mismatch",
        6 => "Size mismatch",
        7 => "Finalize failed",
        8 => "Timeout",
        9 => "Aborted",
        10 => "Not supported",
        _ => "Unknown",
    }
}

/// Errors from packet decoding or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Input is not the length the layout requires
    InvalidLength,
    /// Buffer too small for encoding
    BufferTooSmall,
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// First write of every transfer: what is about to be sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InitPacket {
    /// Image length in bytes
    pub firmware_size: u32,
    /// CRC-32 of the whole image; 0 skips verification
    pub firmware_crc: u32,
    /// Reserved. Unknown bits are ignored.
    pub flags: u8,
}

impl InitPacket {
    /// Decode an init packet
    ///
    /// The payload must be exactly [`INIT_PACKET_SIZE`] bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() != INIT_PACKET_SIZE {
            return Err(PacketError::InvalidLength);
        }

        Ok(Self {
            firmware_size: read_u32(bytes, 0),
            firmware_crc: read_u32(bytes, 4),
            flags: bytes[8],
        })
    }

    /// Encode for sending (client side)
    pub fn to_bytes(&self) -> [u8; INIT_PACKET_SIZE] {
        let mut out = [0u8; INIT_PACKET_SIZE];
        out[0..4].copy_from_slice(&self.firmware_size.to_le_bytes());
        out[4..8].copy_from_slice(&self.firmware_crc.to_le_bytes());
        out[8] = self.flags;
        out
    }

    /// Whether the sender asked for checksum verification
    pub fn wants_verification(&self) -> bool {
        self.firmware_crc != 0
    }
}

/// Snapshot of transfer progress, notified on the progress characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProgressPacket {
    /// Session state wire value
    pub state: u8,
    /// Last error wire value (0 = none)
    pub error: u8,
    /// Integer percent, truncated
    pub percent: u8,
    /// Bytes accepted so far
    pub bytes_received: u32,
    /// Declared image size
    pub bytes_expected: u32,
    /// Finalized CRC-32 of the bytes accepted so far
    pub crc: u32,
}

impl ProgressPacket {
    /// Encode this packet into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PacketError> {
        if buffer.len() < PROGRESS_PACKET_SIZE {
            return Err(PacketError::BufferTooSmall);
        }
        buffer[..PROGRESS_PACKET_SIZE].copy_from_slice(&self.to_bytes());
        Ok(PROGRESS_PACKET_SIZE)
    }

    /// Encode into a fixed array
    pub fn to_bytes(&self) -> [u8; PROGRESS_PACKET_SIZE] {
        let mut out = [0u8; PROGRESS_PACKET_SIZE];
        out[0] = self.state;
        out[1] = self.error;
        out[2] = self.percent;
        out[3..7].copy_from_slice(&self.bytes_received.to_le_bytes());
        out[7..11].copy_from_slice(&self.bytes_expected.to_le_bytes());
        out[11..15].copy_from_slice(&self.crc.to_le_bytes());
        out
    }

    pub fn state_name(&self) -> &'static str {
        state_name(self.state)
    }

    pub fn error_name(&self) -> &'static str {
        error_name(self.error)
    }

    /// Decode a notification (client side)
    ///
    /// Trailing bytes beyond the known layout are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < PROGRESS_PACKET_SIZE {
            return Err(PacketError::InvalidLength);
        }

        Ok(Self {
            state: bytes[0],
            error: bytes[1],
            percent: bytes[2],
            bytes_received: read_u32(bytes, 3),
            bytes_expected: read_u32(bytes, 7),
            crc: read_u32(bytes, 11),
        })
    }
}
