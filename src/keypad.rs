//! Hex keypad of the Elektor I/O board.
//!
//! The keyboard encoder puts one byte on the key latch while a key is held
//! and 0x00 when nothing is pressed. Hex keys read as 0xF0-0xFF; the eight
//! command keys read as 0x80, 0x90, ... 0xF0.

/// Latch value with no key down.
pub const NO_KEY: u8 = 0x00;

/// A key on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Hex digit 0-F
    Hex(u8),
    /// Command key
    Command(CommandKey),
}

/// The eight Elbug command keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKey {
    Up,
    Down,
    CpuRegister,
    BlockTransfer,
    Cassette,
    Subtraction,
    Modify,
    Run,
}

impl CommandKey {
    /// All command keys, C0 to C7.
    pub const ALL: [CommandKey; 8] = [
        CommandKey::Up,
        CommandKey::Down,
        CommandKey::CpuRegister,
        CommandKey::BlockTransfer,
        CommandKey::Cassette,
        CommandKey::Subtraction,
        CommandKey::Modify,
        CommandKey::Run,
    ];

    /// Key label as printed on the board.
    pub fn label(self) -> &'static str {
        match self {
            CommandKey::Up => "UP",
            CommandKey::Down => "DOWN",
            CommandKey::CpuRegister => "CPU REG",
            CommandKey::BlockTransfer => "BLK TFR",
            CommandKey::Cassette => "CASS",
            CommandKey::Subtraction => "SUBTR",
            CommandKey::Modify => "MODIFY",
            CommandKey::Run => "RUN",
        }
    }
}

impl Key {
    /// Byte placed on the key latch while this key is down.
    pub fn code(self) -> u8 {
        match self {
            Key::Hex(digit) => 0xF0 | (digit & 0x0F),
            Key::Command(cmd) => 0x80 + 0x10 * cmd as u8,
        }
    }

    /// Map a typed character to a hex key.
    pub fn from_char(c: char) -> Option<Key> {
        c.to_digit(16).map(|d| Key::Hex(d as u8))
    }

    /// Map a function key number (F1-F8) to a command key.
    pub fn from_function(n: u8) -> Option<Key> {
        CommandKey::ALL
            .get(usize::from(n).checked_sub(1)?)
            .map(|&cmd| Key::Command(cmd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_codes() {
        assert_eq!(Key::Hex(0).code(), 0xF0);
        assert_eq!(Key::Hex(0xA).code(), 0xFA);
        assert_eq!(Key::from_char('7'), Some(Key::Hex(7)));
        assert_eq!(Key::from_char('e').map(Key::code), Some(0xFE));
        assert_eq!(Key::from_char('g'), None);
    }

    #[test]
    fn test_command_codes() {
        assert_eq!(Key::Command(CommandKey::Up).code(), 0x80);
        assert_eq!(Key::Command(CommandKey::Down).code(), 0x90);
        assert_eq!(Key::Command(CommandKey::Run).code(), 0xF0);
        assert_eq!(Key::from_function(3), Some(Key::Command(CommandKey::CpuRegister)));
        assert_eq!(Key::from_function(0), None);
        assert_eq!(Key::from_function(9), None);
    }
}
