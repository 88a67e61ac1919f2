//! ROM image loading.
//!
//! Images are raw binary dumps copied byte for byte into the 4 KiB
//! address space before the CPU starts.

use crate::cpu::{Memory, MemoryError};
use std::path::Path;
use thiserror::Error;

/// Copy `length` bytes of the file at `path` into memory at `start`.
///
/// Returns the number of bytes loaded. A file shorter than `length` is
/// loaded as far as it goes; only a file that cannot be read is an error.
pub fn load_image<P: AsRef<Path>>(
    mem: &mut Memory,
    path: P,
    start: usize,
    length: usize,
) -> Result<usize, RomError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| RomError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let image = &data[..data.len().min(length)];
    mem.load(start, image)?;

    tracing::info!(
        path = %path.display(),
        start = format_args!("{start:#05x}"),
        bytes = image.len(),
        "loaded ROM image"
    );

    if image.len() < length {
        tracing::warn!(
            path = %path.display(),
            expected = length,
            found = image.len(),
            "ROM image shorter than requested"
        );
    }

    Ok(image.len())
}

/// Errors that can occur while loading a ROM image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RomError {
    #[error("unable to load ROM {path}: {message}")]
    Io { path: String, message: String },

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_rom(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("scmp-rom-{}-{name}", std::process::id()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_load_image() {
        let path = temp_rom("full", &[0xC4, 0x01, 0x00, 0xEE]);
        let mut mem = Memory::new();
        assert_eq!(load_image(&mut mem, &path, 0xF00, 3), Ok(3));
        assert_eq!(&mem.bytes()[0xF00..0xF04], &[0xC4, 0x01, 0x00, 0x00]);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_short_image() {
        let path = temp_rom("short", &[0x11, 0x22]);
        let mut mem = Memory::new();
        assert_eq!(load_image(&mut mem, &path, 0x200, 0x200), Ok(2));
        assert_eq!(&mem.bytes()[0x200..0x202], &[0x11, 0x22]);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let mut mem = Memory::new();
        let result = load_image(&mut mem, "/nonexistent/elbug.001", 0, 0x200);
        assert!(matches!(result, Err(RomError::Io { .. })));
    }

    #[test]
    fn test_image_past_end() {
        let path = temp_rom("big", &[0; 0x20]);
        let mut mem = Memory::new();
        let result = load_image(&mut mem, &path, 0xFF0, 0x20);
        assert!(matches!(result, Err(RomError::Memory(_))));
        std::fs::remove_file(path).unwrap();
    }
}
