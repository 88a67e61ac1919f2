//! Terminal front panel for the Elektor SC/MP.
//!
//! Provides the board's controls in a terminal:
//! - Eight-digit seven-segment display and halt lamp
//! - Hex keypad and command keys
//! - Halt/continue and reset
//! - Register and status readout

mod app;
mod ui;

pub use app::{PanelApp, run_panel};
