//! CPU emulation for the SC/MP.
//!
//! This module implements the SC/MP (INS8060) as wired on the Elektor board:
//! - 4 KiB address space with display and keyboard latches
//! - AC, E, four 16-bit pointers (P0 = PC) and the status register
//! - Page-wrapped addressing, binary and decimal add, microcycle timing

pub mod arith;
pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use registers::{Ptr, Registers, StatusFlags};
pub use decode::{AddrMode, AluOp, Condition, Cost, Op};
pub use execute::{Cpu, CpuError, CpuState};
