//! Internal flash through the NVMC
//!
//! Page erase and word programming go through the embassy-nrf PAC while the
//! application is still running. The final copy of the staged image over the
//! application cannot: it erases the very pages the CPU executes from, so it
//! runs from RAM with interrupts off and touches the registers directly.

use core::ptr;

use airlift_hal::{FlashGeometry, NvmController, WORD_SIZE};
use embassy_nrf::pac;
use embassy_nrf::pac::nvmc::vals::Wen;
use embassy_nrf::peripherals::NVMC;
use embassy_nrf::Peri;

/// Flash above the staging region left alone for the bootloader, its
/// settings page and the MBR parameters
pub const BOOTLOADER_RESERVED: u32 = 0xC000;

// Register map used by the RAM-resident copy
const NVMC_BASE: u32 = 0x4001_E000;
const NVMC_READY: *const u32 = (NVMC_BASE + 0x400) as *const u32;
const NVMC_CONFIG: *mut u32 = (NVMC_BASE + 0x504) as *mut u32;
const NVMC_ERASEPAGE: *mut u32 = (NVMC_BASE + 0x508) as *mut u32;

const CONFIG_REN: u32 = 0;
const CONFIG_WEN: u32 = 1;
const CONFIG_EEN: u32 = 2;

const SCB_AIRCR: *mut u32 = 0xE000_ED0C as *mut u32;
const AIRCR_VECTKEY: u32 = 0x05FA_0000;
const AIRCR_SYSRESETREQ: u32 = 1 << 2;

extern "C" {
    // Start of the application image, from the cortex-m-rt linker script
    static __vector_table: u32;
}

/// Owner of the non-volatile memory controller
pub struct Nvmc<'d> {
    _peri: Peri<'d, NVMC>,
    geometry: FlashGeometry,
}

impl<'d> Nvmc<'d> {
    /// Take the NVMC and read the flash layout from FICR
    ///
    /// `reserved_tail` bytes at the top of flash are never used for staging.
    pub fn new(peri: Peri<'d, NVMC>, reserved_tail: u32) -> Self {
        let page_size = pac::FICR.codepagesize().read();
        let flash_size = page_size * pac::FICR.codesize().read();
        // SAFETY: only the address of the linker symbol is taken
        let app_start = unsafe { ptr::addr_of!(__vector_table) } as u32;

        Self {
            _peri: peri,
            geometry: FlashGeometry {
                page_size,
                flash_size,
                app_start,
                reserved_tail,
            },
        }
    }

    fn set_mode(&mut self, wen: Wen) {
        pac::NVMC.config().write(|w| w.set_wen(wen));
        self.wait_ready();
    }
}

impl NvmController for Nvmc<'_> {
    fn platform_name(&self) -> &'static str {
        "nRF52"
    }

    fn geometry(&self) -> FlashGeometry {
        self.geometry
    }

    fn wait_ready(&mut self) {
        while !pac::NVMC.ready().read().ready() {}
    }

    fn erase_page(&mut self, addr: u32) {
        self.set_mode(Wen::EEN);
        pac::NVMC.erasepage().write_value(addr);
        self.wait_ready();
        self.set_mode(Wen::REN);
    }

    fn program_word(&mut self, addr: u32, word: u32) {
        self.set_mode(Wen::WEN);
        // SAFETY: callers only program word-aligned addresses inside the
        // staging region, which the application never executes from
        unsafe { ptr::write_volatile(addr as *mut u32, word) };
        self.wait_ready();
        self.set_mode(Wen::REN);
    }

    fn read_word(&self, addr: u32) -> u32 {
        // SAFETY: internal flash is memory mapped and always readable
        unsafe { ptr::read_volatile(addr as *const u32) }
    }

    fn copy_and_reset(&mut self, dest: u32, src: u32, len: u32) -> ! {
        cortex_m::interrupt::disable();
        // SAFETY: interrupts are off and nothing runs from flash past this
        // point; the routine ends in a system reset
        unsafe { copy_flash_and_reset(dest, src, len, self.geometry.page_size) }
    }
}

/// Erase the pages under `dest`, copy `len` bytes from `src`, then reset
///
/// # Safety
///
/// Must run with interrupts disabled. Both ranges must be word-aligned and
/// `dest` page-aligned.
#[link_section = ".data"]
#[inline(never)]
unsafe fn copy_flash_and_reset(dest: u32, src: u32, len: u32, page_size: u32) -> ! {
    nvmc_wait();
    ptr::write_volatile(NVMC_CONFIG, CONFIG_EEN);
    nvmc_wait();
    let mut page = dest;
    while page < dest + len {
        ptr::write_volatile(NVMC_ERASEPAGE, page);
        nvmc_wait();
        page += page_size;
    }

    ptr::write_volatile(NVMC_CONFIG, CONFIG_WEN);
    nvmc_wait();
    let mut offset = 0;
    while offset < len {
        let word = ptr::read_volatile((src + offset) as *const u32);
        ptr::write_volatile((dest + offset) as *mut u32, word);
        nvmc_wait();
        offset += WORD_SIZE;
    }

    ptr::write_volatile(NVMC_CONFIG, CONFIG_REN);
    nvmc_wait();

    ptr::write_volatile(SCB_AIRCR, AIRCR_VECTKEY | AIRCR_SYSRESETREQ);
    loop {
        core::hint::spin_loop();
    }
}

#[inline(always)]
unsafe fn nvmc_wait() {
    while ptr::read_volatile(NVMC_READY) & 1 == 0 {}
}
