//! Client side of a transfer
//!
//! [`Uploader`] holds no radio of its own. The caller moves bytes between
//! it and whatever BLE stack it uses:
//!
//! ```text
//!  uploader.init_packet()      ──▶ DATA write
//!  uploader.next_chunk()       ──▶ DATA write (None while an ACK is due)
//!  CONTROL notification        ──▶ uploader.on_control()
//!  PROGRESS notification       ──▶ uploader.on_progress() ──▶ Outcome
//! ```
//!
//! The device acknowledges every `ack_interval` chunks with a single
//! [`ACK_VALUE`] byte. The uploader stops handing out chunks at each such
//! boundary until that byte arrives, so the client never runs more than one
//! window ahead of the flash writes. The interval must match the device's.

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::control::ACK_VALUE;
use crate::packet::{
    InitPacket, PacketError, ProgressPacket, INIT_PACKET_SIZE, STATE_APPLYING, STATE_ERROR,
};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Bytes of an ATT write taken by the opcode and handle
pub const ATT_HEADER_SIZE: usize = 3;

/// Device-side default for chunks between acknowledgments
pub const DEFAULT_ACK_INTERVAL: u32 = 200;

/// Reasons an upload cannot be set up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadError {
    /// Nothing to send
    EmptyImage,
    /// Size does not fit the init packet
    ImageTooLarge,
    /// Chunks must carry at least one byte
    InvalidChunkSize,
}

/// How the device ended the transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Image accepted; the device is resetting into it
    Applying,
    /// Device reported an error (wire value)
    Failed(u8),
}

/// Client-side counters for one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferStats {
    pub bytes_sent: u32,
    pub bytes_total: u32,
    pub chunks_sent: u32,
    pub chunks_total: u32,
}

impl TransferStats {
    /// Integer percent of bytes handed out, truncated
    pub fn percent(&self) -> u8 {
        if self.bytes_total == 0 {
            return 0;
        }
        let percent = u64::from(self.bytes_sent) * 100 / u64::from(self.bytes_total);
        percent.min(100) as u8
    }

    /// Throughput in bytes per second after `elapsed_ms`
    pub fn bytes_per_second(&self, elapsed_ms: u64) -> u64 {
        if elapsed_ms == 0 {
            return 0;
        }
        u64::from(self.bytes_sent) * 1000 / elapsed_ms
    }

    /// Estimated milliseconds left at the current throughput
    pub fn eta_ms(&self, elapsed_ms: u64) -> u64 {
        if self.bytes_sent == 0 || elapsed_ms == 0 {
            return 0;
        }
        let remaining = u64::from(self.bytes_total.saturating_sub(self.bytes_sent));
        remaining * elapsed_ms / u64::from(self.bytes_sent)
    }
}

/// Sans-IO firmware uploader
pub struct Uploader<'a> {
    image: &'a [u8],
    init: InitPacket,
    chunk_size: usize,
    ack_interval: u32,
    offset: usize,
    chunks_sent: u32,
    awaiting_ack: bool,
    device: ProgressPacket,
    outcome: Option<Outcome>,
}

impl<'a> Uploader<'a> {
    /// Prepare an upload of `image` in chunks of at most `chunk_size` bytes
    ///
    /// `ack_interval` of 0 sends without waiting for acknowledgments.
    pub fn new(image: &'a [u8], chunk_size: usize, ack_interval: u32) -> Result<Self, UploadError> {
        if image.is_empty() {
            return Err(UploadError::EmptyImage);
        }
        if chunk_size == 0 {
            return Err(UploadError::InvalidChunkSize);
        }
        let firmware_size = u32::try_from(image.len()).map_err(|_| UploadError::ImageTooLarge)?;

        Ok(Self {
            image,
            init: InitPacket {
                firmware_size,
                firmware_crc: CRC32.checksum(image),
                flags: 0,
            },
            chunk_size,
            ack_interval,
            offset: 0,
            chunks_sent: 0,
            awaiting_ack: false,
            device: ProgressPacket::default(),
            outcome: None,
        })
    }

    /// Chunks sized to fill one write at the negotiated MTU
    pub fn with_mtu(image: &'a [u8], mtu: usize, ack_interval: u32) -> Result<Self, UploadError> {
        Self::new(image, mtu.saturating_sub(ATT_HEADER_SIZE), ack_interval)
    }

    /// First write on the data characteristic
    pub fn init_packet(&self) -> [u8; INIT_PACKET_SIZE] {
        self.init.to_bytes()
    }

    /// CRC-32 of the whole image, as declared in the init packet
    pub fn firmware_crc(&self) -> u32 {
        self.init.firmware_crc
    }

    /// Next chunk to write
    ///
    /// `None` when everything is sent, an acknowledgment is due, or the
    /// device already ended the transfer.
    pub fn next_chunk(&mut self) -> Option<&'a [u8]> {
        if self.awaiting_ack || self.outcome.is_some() || self.is_sent() {
            return None;
        }

        let end = self.image.len().min(self.offset + self.chunk_size);
        let chunk = &self.image[self.offset..end];
        self.offset = end;
        self.chunks_sent += 1;

        // The final chunk leads into apply, not into another window
        if self.ack_interval != 0 && self.chunks_sent % self.ack_interval == 0 && !self.is_sent() {
            self.awaiting_ack = true;
        }

        Some(chunk)
    }

    /// Whether sending is paused until the device acknowledges
    pub fn awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }

    /// Whether every image byte has been handed out
    pub fn is_sent(&self) -> bool {
        self.offset >= self.image.len()
    }

    /// A notification arrived on the control characteristic
    pub fn on_control(&mut self, value: &[u8]) {
        if value.first() == Some(&ACK_VALUE) {
            self.awaiting_ack = false;
        }
    }

    /// A notification arrived on the progress characteristic
    ///
    /// Returns the outcome once the device reports Applying or Error.
    pub fn on_progress(&mut self, value: &[u8]) -> Result<Option<Outcome>, PacketError> {
        self.device = ProgressPacket::decode(value)?;

        if self.outcome.is_none() {
            self.outcome = match self.device.state {
                STATE_APPLYING => Some(Outcome::Applying),
                STATE_ERROR => Some(Outcome::Failed(self.device.error)),
                _ => None,
            };
        }

        Ok(self.outcome)
    }

    /// Last progress reported by the device
    pub fn device(&self) -> &ProgressPacket {
        &self.device
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn stats(&self) -> TransferStats {
        TransferStats {
            bytes_sent: self.offset as u32,
            bytes_total: self.init.firmware_size,
            chunks_sent: self.chunks_sent,
            chunks_total: self.image.len().div_ceil(self.chunk_size) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{STATE_IDLE, STATE_RECEIVING};

    fn progress(state: u8, error: u8) -> [u8; 15] {
        ProgressPacket {
            state,
            error,
            ..ProgressPacket::default()
        }
        .to_bytes()
    }

    #[test]
    fn test_init_packet_declares_size_and_crc() {
        let uploader = Uploader::new(b"123456789", 4, 0).unwrap();
        let init = InitPacket::parse(&uploader.init_packet()).unwrap();
        assert_eq!(init.firmware_size, 9);
        assert_eq!(init.firmware_crc, 0xCBF4_3926);
        assert_eq!(init.flags, 0);
        assert_eq!(uploader.firmware_crc(), 0xCBF4_3926);
    }

    #[test]
    fn test_rejects_bad_setup() {
        assert_eq!(Uploader::new(&[], 20, 0).err(), Some(UploadError::EmptyImage));
        assert_eq!(
            Uploader::new(&[1], 0, 0).err(),
            Some(UploadError::InvalidChunkSize)
        );
        assert_eq!(
            Uploader::with_mtu(&[1], ATT_HEADER_SIZE, 0).err(),
            Some(UploadError::InvalidChunkSize)
        );
    }

    #[test]
    fn test_chunks_cover_image() {
        let image = [7u8; 10];
        let mut uploader = Uploader::new(&image, 4, 0).unwrap();

        assert_eq!(uploader.next_chunk().map(<[u8]>::len), Some(4));
        assert_eq!(uploader.next_chunk().map(<[u8]>::len), Some(4));
        assert_eq!(uploader.next_chunk().map(<[u8]>::len), Some(2));
        assert_eq!(uploader.next_chunk(), None);
        assert!(uploader.is_sent());

        let stats = uploader.stats();
        assert_eq!(stats.chunks_sent, 3);
        assert_eq!(stats.chunks_total, 3);
        assert_eq!(stats.percent(), 100);
    }

    #[test]
    fn test_mtu_sets_chunk_size() {
        let image = [0u8; 100];
        let mut uploader = Uploader::with_mtu(&image, 23, 0).unwrap();
        assert_eq!(uploader.next_chunk().map(<[u8]>::len), Some(20));
    }

    #[test]
    fn test_pauses_for_ack_every_interval() {
        let image = [0u8; 40];
        let mut uploader = Uploader::new(&image, 4, 3).unwrap();

        for _ in 0..3 {
            assert!(uploader.next_chunk().is_some());
        }
        assert!(uploader.awaiting_ack());
        assert_eq!(uploader.next_chunk(), None);

        // Anything but the ACK byte keeps the window closed
        uploader.on_control(&[0x00]);
        uploader.on_control(&[]);
        assert_eq!(uploader.next_chunk(), None);

        uploader.on_control(&[ACK_VALUE]);
        assert!(uploader.next_chunk().is_some());
        assert_eq!(uploader.stats().chunks_sent, 4);
    }

    #[test]
    fn test_no_pause_after_final_chunk() {
        let image = [0u8; 12];
        let mut uploader = Uploader::new(&image, 4, 3).unwrap();
        for _ in 0..3 {
            assert!(uploader.next_chunk().is_some());
        }
        assert!(!uploader.awaiting_ack());
        assert!(uploader.is_sent());
    }

    #[test]
    fn test_interval_zero_never_pauses() {
        let image = [0u8; 1000];
        let mut uploader = Uploader::new(&image, 1, 0).unwrap();
        let mut count = 0;
        while uploader.next_chunk().is_some() {
            count += 1;
        }
        assert_eq!(count, 1000);
    }

    #[test]
    fn test_progress_reaches_outcome() {
        let image = [0u8; 8];
        let mut uploader = Uploader::new(&image, 4, 0).unwrap();

        assert_eq!(uploader.on_progress(&progress(STATE_RECEIVING, 0)), Ok(None));
        assert_eq!(uploader.device().state_name(), "Receiving");
        assert_eq!(
            uploader.on_progress(&progress(STATE_APPLYING, 0)),
            Ok(Some(Outcome::Applying))
        );

        // The first terminal report sticks
        assert_eq!(
            uploader.on_progress(&progress(STATE_IDLE, 0)),
            Ok(Some(Outcome::Applying))
        );
    }

    #[test]
    fn test_device_error_stops_sending() {
        let image = [0u8; 8];
        let mut uploader = Uploader::new(&image, 4, 0).unwrap();

        assert_eq!(
            uploader.on_progress(&progress(STATE_ERROR, 2)),
            Ok(Some(Outcome::Failed(2)))
        );
        assert_eq!(uploader.device().error_name(), "Firmware too large");
        assert_eq!(uploader.next_chunk(), None);
    }

    #[test]
    fn test_short_progress_rejected() {
        let image = [0u8; 8];
        let mut uploader = Uploader::new(&image, 4, 0).unwrap();
        assert_eq!(
            uploader.on_progress(&[STATE_APPLYING; 4]),
            Err(PacketError::InvalidLength)
        );
        assert_eq!(uploader.outcome(), None);
    }

    #[test]
    fn test_speed_and_eta() {
        let stats = TransferStats {
            bytes_sent: 2000,
            bytes_total: 10_000,
            chunks_sent: 10,
            chunks_total: 50,
        };
        assert_eq!(stats.percent(), 20);
        assert_eq!(stats.bytes_per_second(500), 4000);
        assert_eq!(stats.eta_ms(500), 2000);
        assert_eq!(stats.bytes_per_second(0), 0);
        assert_eq!(TransferStats::default().eta_ms(100), 0);
    }
}
