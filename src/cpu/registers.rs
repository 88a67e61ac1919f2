//! SC/MP CPU registers.
//!
//! The SC/MP has:
//! - AC: 8-bit accumulator
//! - E: 8-bit extension register (also the serial shift register)
//! - P0-P3: 16-bit pointer registers, P0 being the program counter
//! - SR: 8-bit status register (three user flags, interrupt enable,
//!   two sense inputs, overflow and carry/link)

use serde::Serialize;
use std::fmt;

/// One of the four pointer registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ptr {
    /// P0, the program counter
    Pc,
    /// P1
    P1,
    /// P2
    P2,
    /// P3
    P3,
}

impl Ptr {
    /// Select a pointer register from the low two bits of an opcode.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Ptr::Pc,
            1 => Ptr::P1,
            2 => Ptr::P2,
            _ => Ptr::P3,
        }
    }

    /// Assembler name of the register.
    pub fn name(self) -> &'static str {
        match self {
            Ptr::Pc => "pc",
            Ptr::P1 => "p1",
            Ptr::P2 => "p2",
            Ptr::P3 => "p3",
        }
    }
}

/// The status register, one field per bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusFlags {
    /// User flag 0
    pub f0: bool,
    /// User flag 1, toggled by software to produce sound
    pub f1: bool,
    /// User flag 2
    pub f2: bool,
    /// Interrupt enable
    pub ie: bool,
    /// Sense bit A (hardware input, read-only to instructions)
    pub sa: bool,
    /// Sense bit B (hardware input, read-only to instructions)
    pub sb: bool,
    /// Overflow
    pub ov: bool,
    /// Carry/link
    pub cy: bool,
}

impl StatusFlags {
    /// Pack the flags into a status byte (bit 0 = F0 ... bit 7 = CY).
    pub fn to_byte(&self) -> u8 {
        [self.f0, self.f1, self.f2, self.ie, self.sa, self.sb, self.ov, self.cy]
            .iter()
            .enumerate()
            .fold(0u8, |acc, (bit, &set)| if set { acc | (1 << bit) } else { acc })
    }

    /// Load the writable flags from a status byte.
    ///
    /// SA and SB are inputs and keep their current values.
    pub fn load_byte(&mut self, value: u8) {
        self.f0 = value & 0x01 != 0;
        self.f1 = value & 0x02 != 0;
        self.f2 = value & 0x04 != 0;
        self.ie = value & 0x08 != 0;
        self.ov = value & 0x40 != 0;
        self.cy = value & 0x80 != 0;
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marks = [
            (self.f0, '0'), (self.f1, '1'), (self.f2, '2'), (self.ie, 'I'),
            (self.sa, 'A'), (self.sb, 'B'), (self.ov, 'O'), (self.cy, 'C'),
        ];
        for (set, mark) in marks {
            write!(f, "{}", if set { mark } else { '.' })?;
        }
        Ok(())
    }
}

/// The SC/MP register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Registers {
    /// AC: accumulator
    pub ac: u8,

    /// E: extension register
    pub e: u8,

    /// P0: program counter (points at the last fetched byte)
    pub pc: u16,

    /// P1: pointer register, conventionally the data pointer
    pub p1: u16,

    /// P2: pointer register
    pub p2: u16,

    /// P3: pointer register, conventionally the subroutine link
    pub p3: u16,

    /// Status register
    pub status: StatusFlags,

    /// Serial input line, shifted into E by SIO
    pub serial_in: bool,

    /// Serial output line, shifted out of E by SIO
    pub serial_out: bool,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers, flags and serial lines to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Read a pointer register.
    pub fn ptr(&self, p: Ptr) -> u16 {
        match p {
            Ptr::Pc => self.pc,
            Ptr::P1 => self.p1,
            Ptr::P2 => self.p2,
            Ptr::P3 => self.p3,
        }
    }

    /// Write a pointer register.
    pub fn set_ptr(&mut self, p: Ptr, value: u16) {
        match p {
            Ptr::Pc => self.pc = value,
            Ptr::P1 => self.p1 = value,
            Ptr::P2 => self.p2 = value,
            Ptr::P3 => self.p3 = value,
        }
    }
}
