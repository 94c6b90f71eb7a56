//! Raw non-volatile memory abstractions
//!
//! Word-programmable, page-erasable NOR flash as found on most Cortex-M
//! parts. A programmed word may only clear bits; the only way back to the
//! erased pattern is a page erase.

/// Value of an erased flash byte
pub const ERASED_BYTE: u8 = 0xFF;

/// Value of an erased flash word
pub const ERASED_WORD: u32 = 0xFFFF_FFFF;

/// Programming granularity in bytes
pub const WORD_SIZE: u32 = 4;

/// Flash layout as reported by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashGeometry {
    /// Erase granularity in bytes
    pub page_size: u32,
    /// Total addressable program flash in bytes
    pub flash_size: u32,
    /// Address of the running application's vector table
    pub app_start: u32,
    /// Bytes at the top of flash that belong to someone else (bootloader,
    /// settings pages). Never erased or programmed.
    pub reserved_tail: u32,
}

impl FlashGeometry {
    /// First address past the region this firmware may manage
    pub fn usable_end(&self) -> u32 {
        self.flash_size.saturating_sub(self.reserved_tail)
    }

    /// Base address of the page containing `addr`
    pub fn page_base(&self, addr: u32) -> u32 {
        addr - (addr % self.page_size)
    }
}

/// Low-level flash controller
///
/// These are the only operations through which hardware specifics may
/// leak into the update engine. Every operation is synchronous and polls
/// the controller until it is no longer busy; there is no timeout.
pub trait NvmController {
    /// Platform identifier for logs
    fn platform_name(&self) -> &'static str;

    /// Report page size, flash size and where the running image lives
    fn geometry(&self) -> FlashGeometry;

    /// Block until the controller reports ready
    fn wait_ready(&mut self);

    /// Erase the page starting at `addr`
    ///
    /// `addr` must be page-aligned. Returns once the erase has completed.
    fn erase_page(&mut self, addr: u32);

    /// Program one word at `addr`
    ///
    /// `addr` must be word-aligned and the target word must be erased.
    /// Returns once the write has completed.
    fn program_word(&mut self, addr: u32, word: u32);

    /// Read back one word
    fn read_word(&self, addr: u32) -> u32;

    /// Replace `len` bytes at `dest` with the bytes at `src`, then reset
    ///
    /// Erases every page in `dest..dest + len`, copies word by word and
    /// issues a system reset. Implementations must run this with
    /// interrupts disabled and from memory outside `dest..dest + len`,
    /// since the code and vector table there are being overwritten.
    fn copy_and_reset(&mut self, dest: u32, src: u32, len: u32) -> !;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nrf52840() -> FlashGeometry {
        FlashGeometry {
            page_size: 4096,
            flash_size: 1024 * 1024,
            app_start: 0x2_6000,
            reserved_tail: 0x5_2000,
        }
    }

    #[test]
    fn test_usable_end_excludes_reserved_tail() {
        assert_eq!(nrf52840().usable_end(), 0xA_E000);
    }

    #[test]
    fn test_usable_end_saturates() {
        let geometry = FlashGeometry {
            reserved_tail: u32::MAX,
            ..nrf52840()
        };
        assert_eq!(geometry.usable_end(), 0);
    }

    #[test]
    fn test_page_base() {
        let geometry = nrf52840();
        assert_eq!(geometry.page_base(0x2_6000), 0x2_6000);
        assert_eq!(geometry.page_base(0x2_6FFC), 0x2_6000);
        assert_eq!(geometry.page_base(0x2_7000), 0x2_7000);
    }
}
