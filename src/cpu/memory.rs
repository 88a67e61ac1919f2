//! Elektor SC/MP memory map.
//!
//! The trainer board decodes a 4 KiB address space:
//! - 0x000-0x5FF: monitor ROM (Elbug)
//! - 0x700-0x707: display latches (write only)
//! - 0x708-0x70F: keyboard latch (read only)
//! - 0x800-0xFFF: RAM, readable only from 0xC00 upwards
//!
//! Everything else floats and reads back as 0xFF.

use std::ops::RangeInclusive;
use thiserror::Error;

/// Size of the backing array in bytes.
pub const MEMORY_SIZE: usize = 0x1000;

/// Number of display latches on the hex I/O board.
pub const DISPLAY_DIGITS: usize = 8;

/// Value read from addresses nothing responds to.
pub const OPEN_BUS: u8 = 0xFF;

/// What answers at a given address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// The backing array (ROM or RAM).
    Ram,
    /// One of the eight display latches.
    Display,
    /// The keyboard latch.
    Keyboard,
}

/// Read decode, checked in order.
const READ_MAP: [(RangeInclusive<i32>, Device); 3] = [
    (0x000..=0x5FF, Device::Ram),
    (0x708..=0x70F, Device::Keyboard),
    (0xC00..=0xFFF, Device::Ram),
];

/// Write decode, checked in order.
const WRITE_MAP: [(RangeInclusive<i32>, Device); 2] = [
    (0x800..=0xFFF, Device::Ram),
    (0x700..=0x707, Device::Display),
];

fn lookup(map: &[(RangeInclusive<i32>, Device)], address: i32) -> Option<Device> {
    map.iter()
        .find(|(range, _)| range.contains(&address))
        .map(|&(_, device)| device)
}

/// Bring a wild address back into the 16-bit space.
///
/// Wraps with `% 0xFFFF`, which is what the board software has always
/// been run against.
fn normalize(address: i32, access: &str) -> i32 {
    if !(0..=0xFFFF).contains(&address) {
        tracing::warn!(address, access, "memory access out of range");
        address % 0xFFFF
    } else {
        address
    }
}

/// The memory and I/O seen by the processor.
#[derive(Clone)]
pub struct Memory {
    cells: Box<[u8; MEMORY_SIZE]>,
    display: [u8; DISPLAY_DIGITS],
    key_latch: u8,
}

impl Memory {
    /// Create a memory with all bytes and latches zeroed.
    pub fn new() -> Self {
        Self {
            cells: Box::new([0; MEMORY_SIZE]),
            display: [0; DISPLAY_DIGITS],
            key_latch: 0,
        }
    }

    /// Read a byte through the memory map.
    pub fn read(&self, address: i32) -> u8 {
        let address = normalize(address, "read");
        match lookup(&READ_MAP, address) {
            Some(Device::Ram) => self.cells[address as usize],
            Some(Device::Keyboard) => self.key_latch,
            Some(Device::Display) | None => OPEN_BUS,
        }
    }

    /// Write a byte through the memory map. Writes to ROM or
    /// unmapped addresses are dropped.
    pub fn write(&mut self, address: i32, value: u8) {
        let address = normalize(address, "write");
        match lookup(&WRITE_MAP, address) {
            Some(Device::Ram) => self.cells[address as usize] = value,
            Some(Device::Display) => self.display[(address & 0x0F) as usize] = value,
            Some(Device::Keyboard) | None => {}
        }
    }

    /// Fetch an instruction byte.
    ///
    /// Instruction fetch reads the array directly, bypassing the decode
    /// used for data, so only the low 12 address bits matter.
    #[inline]
    pub fn fetch(&self, address: u16) -> u8 {
        self.cells[usize::from(address) & (MEMORY_SIZE - 1)]
    }

    /// Copy an image into the backing array, ignoring the write map.
    pub fn load(&mut self, start: usize, image: &[u8]) -> Result<(), MemoryError> {
        let end = start.checked_add(image.len()).filter(|&end| end <= MEMORY_SIZE);
        match end {
            Some(end) => {
                self.cells[start..end].copy_from_slice(image);
                Ok(())
            }
            None => Err(MemoryError::ImageTooLarge { start, length: image.len() }),
        }
    }

    /// Current contents of the display latches.
    pub fn display(&self) -> &[u8; DISPLAY_DIGITS] {
        &self.display
    }

    /// Current keyboard latch.
    pub fn key_latch(&self) -> u8 {
        self.key_latch
    }

    /// Set the keyboard latch (host side).
    pub fn set_key_latch(&mut self, code: u8) {
        self.key_latch = code;
    }

    /// Raw view of the backing array.
    pub fn bytes(&self) -> &[u8] {
        &self.cells[..]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&b| b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_bytes", &non_zero)
            .field("display", &self.display)
            .field("key_latch", &self.key_latch)
            .finish()
    }
}

/// Errors that can occur when loading memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Image would run past the end of the address space.
    #[error("image of {length} bytes at {start:#05x} does not fit in 4 KiB")]
    ImageTooLarge { start: usize, length: usize },
}
