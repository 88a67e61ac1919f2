//! The Elektor board around the CPU.
//!
//! The board runs the CPU in slices of one display frame. Each frame adds a
//! frame's worth of microcycles to the budget, and instructions are executed
//! until the budget is used up or the CPU halts. Unused or overrun cycles
//! carry over into the next frame.

use crate::audio::PulseRecorder;
use crate::config::{ConfigError, MachineConfig};
use crate::cpu::memory::DISPLAY_DIGITS;
use crate::cpu::Cpu;
use crate::keypad::{Key, NO_KEY};
use crate::rom::{self, RomError};

/// An emulated Elektor SC/MP board.
#[derive(Debug, Clone)]
pub struct Machine {
    /// The processor and its memory.
    pub cpu: Cpu,
    config: MachineConfig,
    /// Running microcycle budget; negative while the frame has work left.
    budget: i64,
    pulses: PulseRecorder,
    frames: u64,
}

impl Machine {
    /// Create a board with empty memory.
    pub fn new(config: MachineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut cpu = Cpu::new();
        cpu.reset();
        Ok(Self {
            cpu,
            config,
            budget: 0,
            pulses: PulseRecorder::new(),
            frames: 0,
        })
    }

    /// Create a board and load every ROM image listed in the profile.
    pub fn with_roms(config: MachineConfig) -> Result<Self, MachineError> {
        let mut machine = Self::new(config)?;
        let roms = machine.config.roms.clone();
        for image in &roms {
            rom::load_image(&mut machine.cpu.mem, &image.path, image.start, image.length)?;
        }
        Ok(machine)
    }

    /// The profile this board was built from.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Microcycles in one frame.
    pub fn cycles_per_frame(&self) -> i64 {
        i64::from(self.config.cycles_per_frame())
    }

    /// Run the CPU for one frame.
    ///
    /// Returns the number of instructions executed.
    pub fn run_frame(&mut self) -> u64 {
        let frame = self.cycles_per_frame();
        let mut executed = 0;

        self.budget -= frame;
        while self.budget < 0 {
            let Ok(cycles) = self.cpu.step() else {
                break;
            };
            executed += 1;
            self.budget += i64::from(cycles);

            let f1 = self.cpu.regs.status.f1;
            if let Some(width) = self.pulses.observe(f1, self.budget, frame) {
                tracing::trace!(width, "F1 toggled");
            }
        }

        self.frames += 1;
        executed
    }

    /// Run `count` frames, stopping early if the CPU halts.
    pub fn run_frames(&mut self, count: u64) -> u64 {
        let mut executed = 0;
        for _ in 0..count {
            if self.cpu.is_halted() {
                break;
            }
            executed += self.run_frame();
        }
        executed
    }

    /// Hold a key down.
    pub fn press_key(&mut self, key: Key) {
        self.cpu.mem.set_key_latch(key.code());
    }

    /// Release whatever key is held.
    pub fn release_key(&mut self) {
        self.cpu.mem.set_key_latch(NO_KEY);
    }

    /// The halt/continue key.
    pub fn toggle_halt(&mut self) {
        self.cpu.toggle_halt();
    }

    /// The reset key. Memory, display and keyboard are left alone.
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// Current display latches.
    pub fn display(&self) -> &[u8; DISPLAY_DIGITS] {
        self.cpu.mem.display()
    }

    /// Whether the halt lamp is lit.
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// F1 pulse widths recorded so far.
    pub fn pulses(&self) -> &[i64] {
        self.pulses.widths()
    }

    /// Take the recorded F1 pulse widths.
    pub fn take_pulses(&mut self) -> Vec<i64> {
        self.pulses.take()
    }
}

/// Errors that can occur while building a machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rom(#[from] RomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypad::CommandKey;

    fn bare_machine(program: &[u8]) -> Machine {
        let config = MachineConfig { roms: Vec::new(), ..MachineConfig::default() };
        let mut machine = Machine::new(config).unwrap();
        machine.cpu.mem.load(0x001, program).unwrap();
        machine
    }

    #[test]
    fn test_frame_budget() {
        // JMP -2: a 2-byte, 11-cycle loop on itself.
        let mut machine = bare_machine(&[0x90, 0xFE]);
        let executed = machine.run_frame();
        // 20 000 / 11 rounded up
        assert_eq!(executed, 1819);
        assert_eq!(machine.cpu.cycles, 1819 * 11);
        // The overrun carries into the next frame.
        let executed = machine.run_frame();
        assert_eq!(machine.cpu.cycles, (1819 + executed) * 11);
        assert!(machine.cpu.cycles >= 40_000 && machine.cpu.cycles < 40_011);
    }

    #[test]
    fn test_halt_stops_frame() {
        let mut machine = bare_machine(&[0x08, 0x00]);
        assert_eq!(machine.run_frame(), 2);
        assert!(machine.is_halted());
        assert_eq!(machine.run_frames(5), 0);
        machine.toggle_halt();
        assert!(!machine.is_halted());
    }

    #[test]
    fn test_f1_pulses_recorded() {
        // loop: CSA; XRI 0x02; CAS; JMP loop
        let program = [0x06, 0xE4, 0x02, 0x07, 0x90, 0xFA];
        let mut machine = bare_machine(&program);
        machine.run_frame();
        let pulses = machine.pulses();
        assert!(pulses.len() > 100);
        // Each toggle is CSA(5) + XRI(18) + CAS(6) + JMP(11) apart.
        assert!(pulses[1..].iter().all(|&w| w == 40));
    }

    #[test]
    fn test_keyboard_latch() {
        // LD 8(P1) reads the key latch; ST 0(P2); HLT
        let mut machine = bare_machine(&[0xC1, 0x08, 0xCA, 0x00, 0x00]);
        machine.cpu.regs.p1 = 0x0700;
        machine.cpu.regs.p2 = 0x0C00;
        machine.press_key(Key::Command(CommandKey::Modify));
        machine.run_frame();
        assert_eq!(machine.cpu.mem.read(0xC00), 0xE0);
        machine.release_key();
        assert_eq!(machine.cpu.mem.key_latch(), NO_KEY);
    }

    #[test]
    fn test_reset_restarts_program() {
        let mut machine = bare_machine(&[0xC4, 0x01, 0xCA, 0x07, 0x00]);
        machine.cpu.regs.p2 = 0x0700;
        machine.run_frame();
        assert_eq!(machine.display()[7], 0x01);
        machine.reset();
        assert!(!machine.is_halted());
        assert_eq!(machine.cpu.regs.p2, 0);
        assert_eq!(machine.display()[7], 0x01);
    }

    #[test]
    fn test_rom_without_length_loads_whole_file() {
        let path = std::env::temp_dir().join(format!("scmp-machine-{}-clock.rom", std::process::id()));
        std::fs::write(&path, [0xA5; 0xC0]).unwrap();

        let image = crate::config::RomImage::parse(&format!("{}@f00", path.display())).unwrap();
        assert_eq!(image.length, 0x100);
        let config = MachineConfig { roms: vec![image], ..MachineConfig::default() };
        let machine = Machine::with_roms(config).unwrap();
        std::fs::remove_file(&path).unwrap();

        let bytes = machine.cpu.mem.bytes();
        assert!(bytes[0xF00..0xFC0].iter().all(|&b| b == 0xA5));
        assert!(bytes[0xFC0..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_missing_rom_is_reported() {
        let config = MachineConfig {
            roms: vec![crate::config::RomImage::new("/nonexistent/elbug.001", 0, 0x200)],
            ..MachineConfig::default()
        };
        assert!(matches!(Machine::with_roms(config), Err(MachineError::Rom(RomError::Io { .. }))));
    }
}
