//! Direct flash staging backend
//!
//! Splits the flash above the running application in two: the lower half
//! keeps the application, the upper half receives the new image. Incoming
//! bytes are collected into words (the controller only programs whole,
//! aligned words), each page is erased right before its first word is
//! programmed, and on apply the staged image is copied over the
//! application before the device resets.
//!
//! ```text
//! app_start        staging_start                usable_end   flash_size
//! │  application   │  staging (new image)       │ reserved   │
//! ```

use airlift_hal::{FlashGeometry, NvmController, ERASED_BYTE, WORD_SIZE};

use crate::traits::{StorageBackend, StorageError};

/// Where the application and the staging region live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StagingLayout {
    /// Erase granularity
    pub page_size: u32,
    /// First byte of the running application (its vector table)
    pub app_start: u32,
    /// First byte of the staging region, page-aligned
    pub staging_start: u32,
    /// Staging capacity in bytes, a whole number of pages
    pub staging_size: u32,
}

impl StagingLayout {
    /// Reserve the upper half of the flash past the application
    ///
    /// The staging region is rounded to whole pages so its first erase can
    /// never reach into application pages.
    pub fn from_geometry(geometry: &FlashGeometry) -> Self {
        let end = geometry.page_base(geometry.usable_end());
        let available = end.saturating_sub(geometry.app_start);
        let half = available / 2;
        let staging_size = half - (half % geometry.page_size);

        Self {
            page_size: geometry.page_size,
            app_start: geometry.app_start,
            staging_start: end - staging_size,
            staging_size,
        }
    }

    /// First address past the staging region
    pub fn staging_end(&self) -> u32 {
        self.staging_start + self.staging_size
    }

    /// Base address of the page containing `addr`
    fn page_base(&self, addr: u32) -> u32 {
        addr - (addr % self.page_size)
    }
}

/// Word assembly and erase tracking for one transfer
#[derive(Debug, Clone, Copy)]
struct WriteCursor {
    /// Next word to program
    next_addr: u32,
    /// Bytes waiting for a full word, little-endian order
    pending: [u8; 4],
    /// How many of `pending` are real data (0-3 between writes)
    fill: usize,
    /// Everything below this address has been erased in this transfer
    erased_end: u32,
}

impl WriteCursor {
    fn new(start: u32) -> Self {
        Self {
            next_addr: start,
            pending: [ERASED_BYTE; 4],
            fill: 0,
            erased_end: start,
        }
    }

    /// Add a byte; returns the completed word once four are buffered
    fn push(&mut self, byte: u8) -> Option<u32> {
        self.pending[self.fill] = byte;
        self.fill += 1;
        if self.fill < self.pending.len() {
            return None;
        }

        let word = u32::from_le_bytes(self.pending);
        self.pending = [ERASED_BYTE; 4];
        self.fill = 0;
        Some(word)
    }

    /// Pad the partial word with the erased pattern
    fn take_partial(&mut self) -> Option<u32> {
        if self.fill == 0 {
            return None;
        }

        let word = u32::from_le_bytes(self.pending);
        self.pending = [ERASED_BYTE; 4];
        self.fill = 0;
        Some(word)
    }
}

/// Staging backend that drives the flash controller directly
pub struct RawFlashBackend<C: NvmController> {
    controller: C,
    layout: StagingLayout,
    cursor: WriteCursor,
    bytes_written: usize,
    /// Bytes to copy on apply: a page-rounded estimate after `begin`,
    /// the exact word-padded length after `end`
    image_len: u32,
    active: bool,
}

impl<C: NvmController> RawFlashBackend<C> {
    /// Create a backend, deriving the staging region from the controller
    pub fn new(controller: C) -> Self {
        let layout = StagingLayout::from_geometry(&controller.geometry());

        info!(
            "{} staging: app={=u32:#x} staging={=u32:#x}+{=u32} page={=u32}",
            controller.platform_name(),
            layout.app_start,
            layout.staging_start,
            layout.staging_size,
            layout.page_size
        );

        Self {
            controller,
            layout,
            cursor: WriteCursor::new(layout.staging_start),
            bytes_written: 0,
            image_len: 0,
            active: false,
        }
    }

    /// The computed flash layout
    pub fn layout(&self) -> &StagingLayout {
        &self.layout
    }

    /// Length that apply will copy
    pub fn image_len(&self) -> u32 {
        self.image_len
    }

    /// Get the underlying controller for inspection
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Program the next word, erasing its page first if this transfer has
    /// not touched that page yet
    fn program_next(&mut self, word: u32) {
        let addr = self.cursor.next_addr;

        if addr >= self.cursor.erased_end {
            let page = self.layout.page_base(addr);
            trace!("erase page {=u32:#x}", page);
            self.controller.erase_page(page);
            self.cursor.erased_end = page + self.layout.page_size;
        }

        self.controller.program_word(addr, word);
        self.cursor.next_addr += WORD_SIZE;
    }
}

impl<C: NvmController> StorageBackend for RawFlashBackend<C> {
    fn begin(&mut self, size: usize) -> Result<(), StorageError> {
        if size > self.layout.staging_size as usize {
            warn!(
                "image of {=usize} bytes exceeds staging ({=u32})",
                size,
                self.layout.staging_size
            );
            return Err(StorageError::Size);
        }

        self.cursor = WriteCursor::new(self.layout.staging_start);
        self.bytes_written = 0;
        // Refined in end() once the padded length is known
        self.image_len = (size as u32).div_ceil(self.layout.page_size) * self.layout.page_size;
        self.active = true;

        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> usize {
        if !self.active {
            return 0;
        }

        // Never program past the staging region, whatever the sender does
        let room = self.layout.staging_size as usize - self.bytes_written;
        let accepted = data.len().min(room);

        for &byte in &data[..accepted] {
            if let Some(word) = self.cursor.push(byte) {
                self.program_next(word);
            }
        }

        self.bytes_written += accepted;
        accepted
    }

    fn end(&mut self) -> Result<(), StorageError> {
        if !self.active {
            return Err(StorageError::Finalize);
        }

        if let Some(word) = self.cursor.take_partial() {
            self.program_next(word);
        }

        self.image_len = self.cursor.next_addr - self.layout.staging_start;
        self.active = false;

        debug!(
            "staged {=usize} bytes, {=u32} after padding",
            self.bytes_written,
            self.image_len
        );
        Ok(())
    }

    fn abort(&mut self) {
        // Staging contents are left as they are; the next begin re-erases
        self.active = false;
        self.bytes_written = 0;
        self.image_len = 0;
        self.cursor = WriteCursor::new(self.layout.staging_start);
    }

    fn apply(&mut self) -> ! {
        info!(
            "copying {=u32} bytes {=u32:#x} -> {=u32:#x} and resetting",
            self.image_len,
            self.layout.staging_start,
            self.layout.app_start
        );
        self.controller.copy_and_reset(
            self.layout.app_start,
            self.layout.staging_start,
            self.image_len,
        )
    }

    fn max_size(&self) -> usize {
        self.layout.staging_size as usize
    }

    fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn platform_name(&self) -> &'static str {
        self.controller.platform_name()
    }
}
