//! # SC/MP Emulator
//!
//! An emulator of the National Semiconductor SC/MP microprocessor as built
//! into the Elektor (Elektuur) SC/MP trainer with its hex I/O board.
//!
//! The core is [`Cpu`]: call [`Cpu::step`] to retire one instruction and get
//! back the microcycles it took. [`Machine`] wraps it in the board's frame
//! loop, keypad and display, and records the F1 pulses used for sound.

pub mod cpu;
pub mod audio;
pub mod config;
pub mod display;
pub mod keypad;
pub mod machine;
pub mod rom;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuError, CpuState, Memory, Op, Registers, StatusFlags};
pub use config::{MachineConfig, RomImage};
pub use machine::Machine;
pub use rom::{load_image, RomError};

#[cfg(feature = "tui")]
pub use tui::run_panel;
