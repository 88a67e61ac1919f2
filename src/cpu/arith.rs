//! Arithmetic helpers shared by the instruction engine.
//!
//! SC/MP address arithmetic never carries out of the low 12 bits, and the
//! binary adder works on signed bytes with the carry/link folded in.

/// Interpret a byte as a signed value.
///
/// Bits 0-6 carry the magnitude, bit 7 the sign: a set bit 7 gives minus
/// one minus the weights of the clear low bits, so `0x80` is -128 and
/// `0xFF` is -1. This is plain two's-complement.
#[inline]
pub fn sign_extend(byte: u8) -> i32 {
    i32::from(byte as i8)
}

/// Decode the displacement byte of a two-byte instruction.
///
/// A displacement of -128 means "use E instead". E is substituted as an
/// unsigned byte, so it always moves forward.
#[inline]
pub fn displacement(byte: u8, e: u8) -> i32 {
    match sign_extend(byte) {
        -128 => i32::from(e),
        disp => disp,
    }
}

/// Add a displacement to an address without leaving its 4 KiB page.
#[inline]
pub fn page_add(address: u16, disp: i32) -> u16 {
    let low = (i32::from(address) + disp) & 0x0FFF;
    (address & 0xF000) | low as u16
}

/// Result of a binary addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sum {
    /// The low eight bits of the result.
    pub value: u8,
    /// Carry/link out.
    pub carry: bool,
    /// Overflow.
    pub overflow: bool,
}

/// Signed add of two bytes and the carry/link.
///
/// Both operands are widened as signed bytes. Carry is set when the raw sum
/// exceeds 255 and overflow when bits 7 and up of the sum read 1 or 2.
pub fn binary_add(a: u8, b: u8, carry_in: bool) -> Sum {
    let sum = sign_extend(a) + sign_extend(b) + i32::from(carry_in);
    Sum {
        value: (sum & 0xFF) as u8,
        carry: sum > 0xFF,
        overflow: matches!(sum >> 7, 1 | 2),
    }
}

/// Packed BCD add of two bytes and the carry/link.
///
/// Returns the result byte and the decimal carry out. Nibbles above 9 are
/// not corrected.
pub fn decimal_add(a: u8, b: u8, carry_in: bool) -> (u8, bool) {
    let mut low = (a & 0x0F) + (b & 0x0F) + u8::from(carry_in);
    let mut high = (a >> 4) + (b >> 4);

    if low > 9 {
        low -= 10;
        high += 1;
    }

    let carry = high > 9;
    if carry {
        high -= 10;
    }

    (((high & 0x0F) << 4) | (low & 0x0F), carry)
}
