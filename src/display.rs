//! Seven-segment display decoding.
//!
//! Each display latch drives one digit: bits 0-6 are segments a-g and bit 7
//! the decimal point. Latch 7 is the leftmost digit.

use crate::cpu::memory::DISPLAY_DIGITS;

/// Segment bits.
pub const SEG_A: u8 = 0x01;
pub const SEG_B: u8 = 0x02;
pub const SEG_C: u8 = 0x04;
pub const SEG_D: u8 = 0x08;
pub const SEG_E: u8 = 0x10;
pub const SEG_F: u8 = 0x20;
pub const SEG_G: u8 = 0x40;
pub const SEG_DP: u8 = 0x80;

/// Rows of a rendered digit.
pub const GLYPH_ROWS: usize = 3;

fn lit(segments: u8, bit: u8, on: char) -> char {
    if segments & bit != 0 { on } else { ' ' }
}

/// Render one latch byte as three text rows.
///
/// ```text
///  _
/// |_|
/// |_|.
/// ```
pub fn glyph(segments: u8) -> [String; GLYPH_ROWS] {
    [
        format!(" {}  ", lit(segments, SEG_A, '_')),
        format!(
            "{}{}{} ",
            lit(segments, SEG_F, '|'),
            lit(segments, SEG_G, '_'),
            lit(segments, SEG_B, '|')
        ),
        format!(
            "{}{}{}{}",
            lit(segments, SEG_E, '|'),
            lit(segments, SEG_D, '_'),
            lit(segments, SEG_C, '|'),
            lit(segments, SEG_DP, '.')
        ),
    ]
}

/// Render all eight latches, leftmost digit first.
pub fn render(latches: &[u8; DISPLAY_DIGITS]) -> [String; GLYPH_ROWS] {
    let mut rows: [String; GLYPH_ROWS] = Default::default();
    for &segments in latches.iter().rev() {
        for (row, part) in rows.iter_mut().zip(glyph(segments)) {
            row.push_str(&part);
        }
    }
    rows
}

/// Best-effort reading of a digit as a hex character.
pub fn to_char(segments: u8) -> char {
    match segments & !SEG_DP {
        0x00 => ' ',
        0x3F => '0',
        0x06 => '1',
        0x5B => '2',
        0x4F => '3',
        0x66 => '4',
        0x6D => '5',
        0x7D => '6',
        0x07 => '7',
        0x7F => '8',
        0x6F => '9',
        0x77 => 'A',
        0x7C => 'b',
        0x39 => 'C',
        0x5E => 'd',
        0x79 => 'E',
        0x71 => 'F',
        0x40 => '-',
        _ => '?',
    }
}

/// The display as a line of text, leftmost digit first.
pub fn to_text(latches: &[u8; DISPLAY_DIGITS]) -> String {
    latches.iter().rev().map(|&segments| to_char(segments)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_eight_with_point() {
        assert_eq!(glyph(0xFF), [" _  ".to_string(), "|_| ".to_string(), "|_|.".to_string()]);
        assert_eq!(glyph(0x00), ["    ".to_string(), "    ".to_string(), "    ".to_string()]);
        assert_eq!(glyph(0x06), ["    ".to_string(), "  | ".to_string(), "  | ".to_string()]);
    }

    #[test]
    fn test_render_order() {
        let mut latches = [0u8; DISPLAY_DIGITS];
        latches[7] = 0x06;
        let rows = render(&latches);
        assert!(rows.iter().all(|row| row.len() == 4 * DISPLAY_DIGITS));
        assert_eq!(&rows[1][..4], "  | ");
    }

    #[test]
    fn test_to_text() {
        let latches = [0x3F, 0x06, 0x5B, 0x4F, 0x00, 0x77, 0x7C | SEG_DP, 0x71];
        assert_eq!(to_text(&latches), "FbA 3210");
    }
}
