//! Front panel application state and logic.

use crate::keypad::Key;
use crate::Machine;

/// Front panel application state.
pub struct PanelApp {
    /// The board being driven.
    pub machine: Machine,
    /// Frames left before the held key is released.
    pub key_frames: u32,
    /// Last key pressed, for the status line.
    pub last_key: Option<Key>,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
}

impl PanelApp {
    /// Create a front panel around a machine.
    pub fn new(machine: Machine) -> Self {
        Self {
            machine,
            key_frames: 0,
            last_key: None,
            should_quit: false,
            status: "Ready. 0-9/a-f: hex keys, F1-F8: commands, F9: halt, F10: reset, F12/Esc: quit.".into(),
        }
    }

    /// Press a board key and hold it for the configured number of frames.
    ///
    /// Terminals do not report key releases, so the release is simulated.
    pub fn press(&mut self, key: Key) {
        self.machine.press_key(key);
        self.key_frames = self.machine.config().key_hold_frames.max(1);
        self.last_key = Some(key);
        self.status = format!("Key {:#04x}", key.code());
    }

    /// Halt/continue.
    pub fn toggle_halt(&mut self) {
        self.machine.toggle_halt();
        self.status = if self.machine.is_halted() { "Halted.".into() } else { "Running.".into() };
    }

    /// Reset (NRST).
    pub fn reset(&mut self) {
        self.machine.reset();
        self.status = "Reset.".into();
    }

    /// Run one display frame and age the held key.
    pub fn tick(&mut self) {
        if !self.machine.is_halted() {
            self.machine.run_frame();
        }

        if self.key_frames > 0 {
            self.key_frames -= 1;
            if self.key_frames == 0 {
                self.machine.release_key();
            }
        }
    }
}

/// Run the front panel until the user quits.
pub fn run_panel(machine: Machine) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::{Duration, Instant};

    let frame_time = Duration::from_secs(1) / machine.config().frame_rate;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = PanelApp::new(machine);
    let mut next_frame = Instant::now();

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Handle input until the next frame is due
        let wait = next_frame.saturating_duration_since(Instant::now());
        if event::poll(wait)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc | KeyCode::F(12) => app.should_quit = true,
                        KeyCode::F(9) => app.toggle_halt(),
                        KeyCode::F(10) => app.reset(),
                        KeyCode::F(n) => {
                            if let Some(k) = Key::from_function(n) {
                                app.press(k);
                            }
                        }
                        KeyCode::Char(c) => {
                            if let Some(k) = Key::from_char(c) {
                                app.press(k);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if Instant::now() >= next_frame {
            app.tick();
            next_frame += frame_time;
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MachineConfig;

    fn panel() -> PanelApp {
        let config = MachineConfig { roms: Vec::new(), key_hold_frames: 2, ..MachineConfig::default() };
        PanelApp::new(Machine::new(config).unwrap())
    }

    #[test]
    fn test_key_is_released_after_hold() {
        let mut app = panel();
        app.press(Key::Hex(5));
        assert_eq!(app.machine.cpu.mem.key_latch(), 0xF5);
        app.tick();
        assert_eq!(app.machine.cpu.mem.key_latch(), 0xF5);
        app.tick();
        assert_eq!(app.machine.cpu.mem.key_latch(), 0x00);
    }

    #[test]
    fn test_halt_and_reset() {
        let mut app = panel();
        app.toggle_halt();
        assert!(app.machine.is_halted());
        app.tick();
        assert_eq!(app.machine.cpu.cycles, 0);
        app.reset();
        assert!(!app.machine.is_halted());
    }
}
