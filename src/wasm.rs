//! WebAssembly bindings for the SC/MP emulator.
//!
//! This module provides JavaScript-friendly wrappers around [`Machine`].
//! The page supplies ROM bytes, drives one frame per animation tick and
//! draws the display latches itself.

use wasm_bindgen::prelude::*;
use crate::keypad::Key;
use crate::{Machine, MachineConfig};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly board wrapper.
#[wasm_bindgen]
pub struct WasmScmp {
    machine: Machine,
}

#[wasm_bindgen]
impl WasmScmp {
    /// Create a board with the default clock and frame rate and no ROMs.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmScmp, JsError> {
        let config = MachineConfig { roms: Vec::new(), ..MachineConfig::default() };
        let machine = Machine::new(config)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Self { machine })
    }

    /// Copy a ROM image into memory.
    #[wasm_bindgen]
    pub fn load_image(&mut self, image: &[u8], start: usize) -> Result<(), JsError> {
        self.machine.cpu.mem.load(start, image)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Run one display frame. Returns the number of instructions executed.
    #[wasm_bindgen]
    pub fn run_frame(&mut self) -> u32 {
        self.machine.run_frame() as u32
    }

    /// The eight display latches, latch 0 first.
    #[wasm_bindgen]
    pub fn display(&self) -> Vec<u8> {
        self.machine.display().to_vec()
    }

    /// Hold a hex key (0-15).
    #[wasm_bindgen]
    pub fn press_hex(&mut self, digit: u8) {
        self.machine.press_key(Key::Hex(digit));
    }

    /// Hold a command key (1-8 for C0-C7).
    #[wasm_bindgen]
    pub fn press_command(&mut self, n: u8) {
        if let Some(key) = Key::from_function(n) {
            self.machine.press_key(key);
        }
    }

    /// Release the held key.
    #[wasm_bindgen]
    pub fn release_key(&mut self) {
        self.machine.release_key();
    }

    /// Halt/continue.
    #[wasm_bindgen]
    pub fn toggle_halt(&mut self) {
        self.machine.toggle_halt();
    }

    /// Reset the CPU.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    /// Check if the halt lamp is lit.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.machine.is_halted()
    }

    /// Microcycles executed.
    #[wasm_bindgen]
    pub fn cycles(&self) -> f64 {
        self.machine.cpu.cycles as f64
    }

    /// Take the F1 pulse widths recorded since the last call.
    #[wasm_bindgen]
    pub fn take_pulses(&mut self) -> Vec<i32> {
        self.machine.take_pulses().into_iter().map(|w| w as i32).collect()
    }

    /// Get registers as JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.machine.cpu.regs)
            .map_err(|e| JsError::new(&e.to_string()))
    }
}
