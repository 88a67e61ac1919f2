//! Instruction decoder for the SC/MP.
//!
//! Every opcode byte maps to one entry of a 256-entry table. Opcodes with
//! bit 7 set carry a displacement byte; from 0xC0 upwards the low three bits
//! select the addressing mode and bits 3-6 the operation.

use crate::cpu::registers::Ptr;
use std::fmt;

/// Addressing mode of a memory reference instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// EA = ptr + disp
    Indexed(Ptr),
    /// EA = address of the displacement byte
    Immediate,
    /// EA = ptr (disp >= 0) or ptr + disp (disp < 0), then ptr += disp
    AutoIndexed(Ptr),
}

impl AddrMode {
    /// Decode the low three opcode bits.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0x04 => AddrMode::Immediate,
            b if b < 0x04 => AddrMode::Indexed(Ptr::from_bits(b)),
            b => AddrMode::AutoIndexed(Ptr::from_bits(b)),
        }
    }
}

/// Operation of a memory reference instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    /// LD: AC := (EA)
    Load,
    /// ST: (EA) := AC
    Store,
    /// AND: AC := AC & (EA)
    And,
    /// OR: AC := AC | (EA)
    Or,
    /// XOR: AC := AC ^ (EA)
    Xor,
    /// DAD: AC := AC + (EA) + CY, decimal
    DecimalAdd,
    /// ADD: AC := AC + (EA) + CY
    Add,
    /// CAD: AC := AC + !(EA) + CY
    ComplementAdd,
}

impl AluOp {
    /// Decode bits 3-6 of a memory reference opcode.
    pub const fn from_bits(opcode: u8) -> Self {
        match opcode & 0xF8 {
            0xC0 => AluOp::Load,
            0xC8 => AluOp::Store,
            0xD0 => AluOp::And,
            0xD8 => AluOp::Or,
            0xE0 => AluOp::Xor,
            0xE8 => AluOp::DecimalAdd,
            0xF0 => AluOp::Add,
            _ => AluOp::ComplementAdd,
        }
    }

    /// Microcycles taken.
    pub const fn cycles(self) -> u32 {
        match self {
            AluOp::DecimalAdd => 23,
            AluOp::Add => 19,
            AluOp::ComplementAdd => 20,
            _ => 18,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Load => "LD",
            AluOp::Store => "ST",
            AluOp::And => "AND",
            AluOp::Or => "OR",
            AluOp::Xor => "XOR",
            AluOp::DecimalAdd => "DAD",
            AluOp::Add => "ADD",
            AluOp::ComplementAdd => "CAD",
        }
    }
}

/// Condition tested by a jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// JMP
    Always,
    /// JP: AC bit 7 clear
    Positive,
    /// JZ: AC == 0
    Zero,
    /// JNZ: AC != 0
    NotZero,
}

impl Condition {
    /// Whether the jump is taken for the given accumulator.
    pub fn holds(self, ac: u8) -> bool {
        match self {
            Condition::Always => true,
            Condition::Positive => ac & 0x80 == 0,
            Condition::Zero => ac == 0,
            Condition::NotZero => ac != 0,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            Condition::Always => "JMP",
            Condition::Positive => "JP",
            Condition::Zero => "JZ",
            Condition::NotZero => "JNZ",
        }
    }
}

/// How many microcycles an instruction takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cost {
    /// Always the same.
    Fixed(u32),
    /// Depends on whether a jump is taken.
    Branch { taken: u32, not_taken: u32 },
    /// DLY: 13 + 2*AC + 514*disp.
    Delay,
}

/// Decoded SC/MP instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // ==================== Single byte ====================

    /// HLT: halt
    Halt,
    /// XAE: exchange AC and E
    Xae,
    /// CCL: clear carry/link
    Ccl,
    /// SCL: set carry/link
    Scl,
    /// DINT: disable interrupt
    Dint,
    /// IEN: enable interrupt
    Ien,
    /// CSA: copy status to AC
    Csa,
    /// CAS: copy AC to status
    Cas,
    /// NOP
    Nop,
    /// SIO: serial in/out through E
    Sio,
    /// SR: shift right
    Sr,
    /// SRL: shift right with link
    Srl,
    /// RR: rotate right
    Rr,
    /// RRL: rotate right with link
    Rrl,
    /// XPAL: exchange pointer low byte with AC
    Xpal(Ptr),
    /// XPAH: exchange pointer high byte with AC
    Xpah(Ptr),
    /// XPPC: exchange pointer with PC
    Xppc(Ptr),
    /// LDE: AC := E
    Lde,
    /// ANE: AC := AC & E
    Ane,
    /// ORE: AC := AC | E
    Ore,
    /// XRE: AC := AC ^ E
    Xre,
    /// DAE: decimal add E
    Dae,
    /// ADE: add E
    Ade,
    /// CAE: complement and add E
    Cae,

    // ==================== Double byte ====================

    /// DLY: software delay
    Dly,
    /// JMP/JP/JZ/JNZ relative to a pointer
    Jump(Condition, Ptr),
    /// ILD: increment memory and load
    Ild(Ptr),
    /// DLD: decrement memory and load
    Dld(Ptr),
    /// Memory reference and immediate instructions
    Memory(AluOp, AddrMode),

    /// Anything else; takes 7 microcycles and does nothing.
    Undefined,
}

impl Op {
    /// Decode a single opcode byte.
    pub const fn decode(opcode: u8) -> Op {
        if opcode >= 0xC0 {
            return Op::Memory(AluOp::from_bits(opcode), AddrMode::from_bits(opcode));
        }

        let ptr = Ptr::from_bits(opcode);
        match opcode {
            0x00 => Op::Halt,
            0x01 => Op::Xae,
            0x02 => Op::Ccl,
            0x03 => Op::Scl,
            0x04 => Op::Dint,
            0x05 => Op::Ien,
            0x06 => Op::Csa,
            0x07 => Op::Cas,
            0x08 => Op::Nop,
            0x19 => Op::Sio,
            0x1C => Op::Sr,
            0x1D => Op::Srl,
            0x1E => Op::Rr,
            0x1F => Op::Rrl,
            0x30..=0x33 => Op::Xpal(ptr),
            0x34..=0x37 => Op::Xpah(ptr),
            0x3C..=0x3F => Op::Xppc(ptr),
            0x40 => Op::Lde,
            0x50 => Op::Ane,
            0x58 => Op::Ore,
            0x60 => Op::Xre,
            0x68 => Op::Dae,
            0x70 => Op::Ade,
            0x78 => Op::Cae,
            0x8F => Op::Dly,
            0x90..=0x93 => Op::Jump(Condition::Always, ptr),
            0x94..=0x97 => Op::Jump(Condition::Positive, ptr),
            0x98..=0x9B => Op::Jump(Condition::Zero, ptr),
            0x9C..=0x9F => Op::Jump(Condition::NotZero, ptr),
            0xA8..=0xAB => Op::Ild(ptr),
            0xB8..=0xBB => Op::Dld(ptr),
            _ => Op::Undefined,
        }
    }

    /// Whether a displacement byte follows the opcode.
    pub const fn has_displacement(opcode: u8) -> bool {
        opcode & 0x80 != 0
    }

    /// Timing rule for this instruction.
    pub const fn cost(self) -> Cost {
        match self {
            Op::Halt => Cost::Fixed(8),
            Op::Xae => Cost::Fixed(7),
            Op::Ccl | Op::Scl | Op::Csa | Op::Nop => Cost::Fixed(5),
            Op::Dint | Op::Ien | Op::Cas => Cost::Fixed(6),
            Op::Sio | Op::Sr | Op::Srl | Op::Rr | Op::Rrl => Cost::Fixed(5),
            Op::Xpal(_) | Op::Xpah(_) => Cost::Fixed(8),
            Op::Xppc(_) => Cost::Fixed(7),
            Op::Lde | Op::Ane | Op::Ore | Op::Xre => Cost::Fixed(6),
            Op::Dae => Cost::Fixed(11),
            Op::Ade => Cost::Fixed(7),
            Op::Cae => Cost::Fixed(8),
            Op::Dly => Cost::Delay,
            Op::Jump(Condition::Always, _) => Cost::Fixed(11),
            Op::Jump(..) => Cost::Branch { taken: 11, not_taken: 9 },
            Op::Ild(_) | Op::Dld(_) => Cost::Fixed(22),
            Op::Memory(op, _) => Cost::Fixed(op.cycles()),
            Op::Undefined => Cost::Fixed(7),
        }
    }
}

const fn build_table() -> [Op; 256] {
    let mut table = [Op::Undefined; 256];
    let mut opcode = 0;
    while opcode < 256 {
        table[opcode] = Op::decode(opcode as u8);
        opcode += 1;
    }
    table
}

/// Opcode byte to instruction.
pub static OPCODES: [Op; 256] = build_table();

/// Look up an opcode in the table.
#[inline]
pub fn decode(opcode: u8) -> Op {
    OPCODES[usize::from(opcode)]
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Op::Halt => write!(f, "HLT"),
            Op::Xae => write!(f, "XAE"),
            Op::Ccl => write!(f, "CCL"),
            Op::Scl => write!(f, "SCL"),
            Op::Dint => write!(f, "DINT"),
            Op::Ien => write!(f, "IEN"),
            Op::Csa => write!(f, "CSA"),
            Op::Cas => write!(f, "CAS"),
            Op::Nop => write!(f, "NOP"),
            Op::Sio => write!(f, "SIO"),
            Op::Sr => write!(f, "SR"),
            Op::Srl => write!(f, "SRL"),
            Op::Rr => write!(f, "RR"),
            Op::Rrl => write!(f, "RRL"),
            Op::Xpal(p) => write!(f, "XPAL {}", p.name()),
            Op::Xpah(p) => write!(f, "XPAH {}", p.name()),
            Op::Xppc(p) => write!(f, "XPPC {}", p.name()),
            Op::Lde => write!(f, "LDE"),
            Op::Ane => write!(f, "ANE"),
            Op::Ore => write!(f, "ORE"),
            Op::Xre => write!(f, "XRE"),
            Op::Dae => write!(f, "DAE"),
            Op::Ade => write!(f, "ADE"),
            Op::Cae => write!(f, "CAE"),
            Op::Dly => write!(f, "DLY"),
            Op::Jump(cond, p) => write!(f, "{} {}", cond.mnemonic(), p.name()),
            Op::Ild(p) => write!(f, "ILD {}", p.name()),
            Op::Dld(p) => write!(f, "DLD {}", p.name()),
            Op::Memory(op, AddrMode::Indexed(p)) => write!(f, "{} {}", op.mnemonic(), p.name()),
            Op::Memory(op, AddrMode::Immediate) => write!(f, "{}I", op.mnemonic()),
            Op::Memory(op, AddrMode::AutoIndexed(p)) => write!(f, "{} @{}", op.mnemonic(), p.name()),
            Op::Undefined => write!(f, "???"),
        }
    }
}
