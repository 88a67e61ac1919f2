//! Machine profile.
//!
//! Describes the board being emulated: how fast it is clocked, how often the
//! display is refreshed, and which ROM images go where. Profiles are stored
//! as JSON.

use crate::cpu::memory::MEMORY_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One ROM image to load at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomImage {
    /// File holding the raw image.
    pub path: PathBuf,
    /// Address of the first byte.
    pub start: usize,
    /// Number of bytes to copy.
    pub length: usize,
}

impl RomImage {
    /// Create a ROM image description.
    pub fn new<P: Into<PathBuf>>(path: P, start: usize, length: usize) -> Self {
        Self { path: path.into(), start, length }
    }

    /// Parse a command line image spec of the form `PATH@ADDR[:LEN]`.
    ///
    /// Addresses and lengths are hexadecimal (an optional `0x` prefix is
    /// accepted). Without a length the image runs to the end of memory.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let invalid = |why: &str| ConfigError::Invalid(format!("ROM spec '{spec}': {why}"));

        let (path, place) = spec.rsplit_once('@').ok_or_else(|| invalid("missing @ADDR"))?;
        let (start, length) = match place.split_once(':') {
            Some((start, length)) => (start, Some(length)),
            None => (place, None),
        };

        let start = parse_hex(start).ok_or_else(|| invalid("bad address"))?;
        if start >= MEMORY_SIZE {
            return Err(invalid("address beyond 0xFFF"));
        }
        let length = match length {
            Some(length) => parse_hex(length).ok_or_else(|| invalid("bad length"))?,
            None => MEMORY_SIZE - start,
        };

        Ok(Self::new(path, start, length))
    }
}

fn parse_hex(text: &str) -> Option<usize> {
    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
    usize::from_str_radix(digits, 16).ok()
}

/// Configuration of the emulated board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Microcycles per second. A 1 MHz crystal gives 500 000.
    pub microcycles_per_second: u32,
    /// Display refresh rate; the CPU runs in slices of one frame.
    pub frame_rate: u32,
    /// Frames a key stays latched when the host cannot see key releases.
    pub key_hold_frames: u32,
    /// Images loaded before the first instruction.
    pub roms: Vec<RomImage>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            microcycles_per_second: 500_000,
            frame_rate: 25,
            key_hold_frames: 3,
            roms: vec![
                RomImage::new("elbug.001", 0x000, 0x200),
                RomImage::new("elbug.002", 0x200, 0x200),
                RomImage::new("elbug.003", 0x400, 0x200),
            ],
        }
    }
}

impl MachineConfig {
    /// Load a profile from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Parse and validate a profile.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the profile as pretty JSON.
    pub fn to_json(&self) -> String {
        // A struct of plain fields and paths always serializes.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Check that the profile describes a machine we can run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(ConfigError::Invalid("frame_rate must be non-zero".into()));
        }
        if self.microcycles_per_second < self.frame_rate {
            return Err(ConfigError::Invalid(
                "microcycles_per_second must be at least one per frame".into(),
            ));
        }
        for rom in &self.roms {
            if rom.start.checked_add(rom.length).map_or(true, |end| end > MEMORY_SIZE) {
                return Err(ConfigError::Invalid(format!(
                    "ROM {} ({:#x} bytes at {:#05x}) does not fit in 4 KiB",
                    rom.path.display(),
                    rom.length,
                    rom.start
                )));
            }
        }
        Ok(())
    }

    /// Microcycle budget of one display frame.
    pub fn cycles_per_frame(&self) -> u32 {
        self.microcycles_per_second / self.frame_rate
    }
}

/// Errors that can occur while loading a profile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
