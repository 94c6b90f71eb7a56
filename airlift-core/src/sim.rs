//! Simulated NOR flash for host tests
//!
//! Behaves like a word-programmable, page-erasable part: programming can
//! only clear bits, so writing a word that is not erased is recorded as a
//! violation instead of silently succeeding.

use airlift_hal::{FlashGeometry, NvmController, ERASED_BYTE, ERASED_WORD, WORD_SIZE};

/// Operations issued to the controller, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    Erase(u32),
    Program(u32, u32),
}

/// Panic payload of the simulated system reset
pub const RESET_MESSAGE: &str = "simulated system reset";

pub struct SimFlash {
    pub mem: Vec<u8>,
    pub ops: Vec<FlashOp>,
    /// Addresses programmed without a preceding erase
    pub violations: Vec<u32>,
    pub ready_polls: usize,
    geometry: FlashGeometry,
}

impl SimFlash {
    /// 16 KiB part with 256-byte pages, application at 0x1000 and a 4 KiB
    /// bootloader at the top. Staging ends up at 0x2000..0x3000.
    pub fn small() -> Self {
        Self::new(FlashGeometry {
            page_size: 256,
            flash_size: 16 * 1024,
            app_start: 0x1000,
            reserved_tail: 0x1000,
        })
    }

    pub fn new(geometry: FlashGeometry) -> Self {
        // Start dirty so a missing erase shows up as a violation
        Self {
            mem: vec![0x00; geometry.flash_size as usize],
            ops: Vec::new(),
            violations: Vec::new(),
            ready_polls: 0,
            geometry,
        }
    }

    pub fn slice(&self, addr: u32, len: usize) -> &[u8] {
        &self.mem[addr as usize..addr as usize + len]
    }

    pub fn erases(&self) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                FlashOp::Erase(addr) => Some(*addr),
                _ => None,
            })
            .collect()
    }
}

impl NvmController for SimFlash {
    fn platform_name(&self) -> &'static str {
        "sim"
    }

    fn geometry(&self) -> FlashGeometry {
        self.geometry
    }

    fn wait_ready(&mut self) {
        self.ready_polls += 1;
    }

    fn erase_page(&mut self, addr: u32) {
        assert_eq!(addr % self.geometry.page_size, 0, "unaligned erase");
        let start = addr as usize;
        let end = start + self.geometry.page_size as usize;
        self.mem[start..end].fill(ERASED_BYTE);
        self.ops.push(FlashOp::Erase(addr));
        self.wait_ready();
    }

    fn program_word(&mut self, addr: u32, word: u32) {
        assert_eq!(addr % WORD_SIZE, 0, "unaligned program");
        if self.read_word(addr) != ERASED_WORD {
            self.violations.push(addr);
        }
        let start = addr as usize;
        for (cell, byte) in self.mem[start..start + 4]
            .iter_mut()
            .zip(word.to_le_bytes())
        {
            *cell &= byte;
        }
        self.ops.push(FlashOp::Program(addr, word));
        self.wait_ready();
    }

    fn read_word(&self, addr: u32) -> u32 {
        let start = addr as usize;
        u32::from_le_bytes([
            self.mem[start],
            self.mem[start + 1],
            self.mem[start + 2],
            self.mem[start + 3],
        ])
    }

    fn copy_and_reset(&mut self, dest: u32, src: u32, len: u32) -> ! {
        let page = self.geometry.page_size;
        let mut addr = dest;
        while addr < dest + len {
            self.erase_page(addr);
            addr += page;
        }
        let mut offset = 0;
        while offset < len {
            let word = self.read_word(src + offset);
            self.program_word(dest + offset, word);
            offset += WORD_SIZE;
        }
        panic!("{}", RESET_MESSAGE);
    }
}
