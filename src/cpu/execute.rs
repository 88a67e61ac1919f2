//! CPU execution engine for the SC/MP.
//!
//! Implements the fetch-decode-execute cycle. Each call to [`Cpu::step`]
//! retires exactly one instruction and reports how many microcycles it took.

use crate::cpu::arith::{self, page_add};
use crate::cpu::decode::{self, AddrMode, AluOp, Cost, Op};
use crate::cpu::{Memory, Registers};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (HLT, or the front panel halt switch).
    Halted,
}

/// The SC/MP CPU together with the memory it is wired to.
#[derive(Clone)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Memory and board I/O.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Microcycles executed since creation.
    pub cycles: u64,
    /// Last executed instruction.
    last_op: Option<Op>,
}

impl Cpu {
    /// Create a new CPU with zeroed registers and memory.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            last_op: None,
        }
    }

    /// Reset the CPU (NRST). Registers, flags, halt and serial lines are
    /// cleared; memory and latches are left alone.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.state = CpuState::Running;
        self.last_op = None;
        tracing::debug!("cpu reset");
    }

    /// Flip between halted and running, like the board's halt/continue key.
    pub fn toggle_halt(&mut self) {
        self.state = match self.state {
            CpuState::Running => CpuState::Halted,
            CpuState::Halted => CpuState::Running,
        };
        tracing::debug!(state = ?self.state, "halt toggled");
    }

    /// Execute a single instruction.
    ///
    /// Returns the number of microcycles the instruction took.
    pub fn step(&mut self) -> Result<u32, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::Halted);
        }

        // Fetch: PC points at the last byte fetched, so advance first.
        self.regs.pc = page_add(self.regs.pc, 1);
        let opcode = self.mem.fetch(self.regs.pc);

        let mut disp_byte = 0;
        let mut disp = 0;
        if Op::has_displacement(opcode) {
            self.regs.pc = page_add(self.regs.pc, 1);
            disp_byte = self.mem.fetch(self.regs.pc);
            disp = arith::displacement(disp_byte, self.regs.e);
        }

        // Decode
        let op = decode::decode(opcode);

        // Execute
        let (cycles, ea) = self.execute(op, disp, disp_byte);

        tracing::trace!(
            pc = self.regs.pc,
            opcode,
            op = %op,
            ea = ?ea,
            ac = self.regs.ac,
            cycles,
            "step"
        );

        self.cycles += u64::from(cycles);
        self.last_op = Some(op);

        Ok(cycles)
    }

    /// Run until the CPU halts or at least `budget` microcycles have passed.
    ///
    /// Returns the number of microcycles executed.
    pub fn run_limited(&mut self, budget: u64) -> u64 {
        let start = self.cycles;
        while self.state == CpuState::Running && self.cycles - start < budget {
            // Cannot fail: we only step while running.
            if self.step().is_err() {
                break;
            }
        }
        self.cycles - start
    }

    /// Execute a decoded instruction. Returns the cycles taken and the
    /// effective address, if one was computed.
    fn execute(&mut self, op: Op, disp: i32, disp_byte: u8) -> (u32, Option<u16>) {
        let regs = &mut self.regs;
        let mut ea = None;
        let mut taken = true;

        match op {
            // ==================== Single byte ====================

            Op::Halt => {
                self.state = CpuState::Halted;
                tracing::debug!(pc = regs.pc, "halted");
            }
            Op::Xae => std::mem::swap(&mut regs.ac, &mut regs.e),
            Op::Ccl => regs.status.cy = false,
            Op::Scl => regs.status.cy = true,
            Op::Dint => regs.status.ie = false,
            Op::Ien => regs.status.ie = true,
            Op::Csa => regs.ac = regs.status.to_byte(),
            Op::Cas => regs.status.load_byte(regs.ac),
            Op::Nop | Op::Undefined => {}
            Op::Sio => {
                regs.serial_out = regs.e & 0x01 != 0;
                regs.e = (regs.e >> 1) | if regs.serial_in { 0x80 } else { 0 };
            }
            Op::Sr => regs.ac >>= 1,
            Op::Srl => regs.ac = (regs.ac >> 1) | if regs.status.cy { 0x80 } else { 0 },
            Op::Rr => regs.ac = regs.ac.rotate_right(1),
            Op::Rrl => {
                let link = regs.status.cy;
                regs.status.cy = regs.ac & 0x01 != 0;
                regs.ac = (regs.ac >> 1) | if link { 0x80 } else { 0 };
            }
            Op::Xpal(p) => {
                let ptr = regs.ptr(p);
                regs.set_ptr(p, (ptr & 0xFF00) | u16::from(regs.ac));
                regs.ac = (ptr & 0x00FF) as u8;
            }
            Op::Xpah(p) => {
                let ptr = regs.ptr(p);
                regs.set_ptr(p, (u16::from(regs.ac) << 8) | (ptr & 0x00FF));
                regs.ac = (ptr >> 8) as u8;
            }
            Op::Xppc(p) => {
                let ptr = regs.ptr(p);
                regs.set_ptr(p, regs.pc);
                regs.pc = ptr;
            }

            // ==================== Extension register ====================

            Op::Lde => regs.ac = regs.e,
            Op::Ane => regs.ac &= regs.e,
            Op::Ore => regs.ac |= regs.e,
            Op::Xre => regs.ac ^= regs.e,
            Op::Dae => {
                let e = regs.e;
                self.decimal_add(e);
            }
            Op::Ade => {
                let e = regs.e;
                self.binary_add(e);
            }
            Op::Cae => {
                let e = regs.e;
                self.binary_add(!e);
            }

            // ==================== Double byte ====================

            Op::Dly => {}
            Op::Jump(cond, p) => {
                let target = page_add(regs.ptr(p), disp);
                ea = Some(target);
                taken = cond.holds(regs.ac);
                if taken {
                    regs.pc = target;
                }
            }
            Op::Ild(p) => {
                let target = page_add(regs.ptr(p), disp);
                ea = Some(target);
                let value = self.mem.read(i32::from(target)).wrapping_add(1);
                self.mem.write(i32::from(target), value);
                self.regs.ac = value;
            }
            Op::Dld(p) => {
                let target = page_add(regs.ptr(p), disp);
                ea = Some(target);
                let value = self.mem.read(i32::from(target)).wrapping_sub(1);
                self.mem.write(i32::from(target), value);
                self.regs.ac = value;
            }
            Op::Memory(alu, mode) => {
                let target = self.effective_address(mode, disp);
                ea = Some(target);
                self.memory_reference(alu, target);
            }
        }

        let cycles = match op.cost() {
            Cost::Fixed(n) => n,
            Cost::Branch { taken: t, not_taken: n } => if taken { t } else { n },
            Cost::Delay => delay_cycles(self.regs.ac, disp_byte),
        };

        (cycles, ea)
    }

    /// Compute the effective address of a memory reference instruction,
    /// updating the pointer for auto-indexed modes.
    fn effective_address(&mut self, mode: AddrMode, disp: i32) -> u16 {
        match mode {
            AddrMode::Indexed(p) => page_add(self.regs.ptr(p), disp),
            AddrMode::Immediate => self.regs.pc,
            AddrMode::AutoIndexed(p) => {
                let ptr = self.regs.ptr(p);
                let updated = page_add(ptr, disp);
                self.regs.set_ptr(p, updated);
                // Pre-decrement, post-increment
                if disp < 0 { updated } else { ptr }
            }
        }
    }

    fn memory_reference(&mut self, alu: AluOp, ea: u16) {
        let address = i32::from(ea);
        match alu {
            AluOp::Store => self.mem.write(address, self.regs.ac),
            AluOp::Load => self.regs.ac = self.mem.read(address),
            AluOp::And => self.regs.ac &= self.mem.read(address),
            AluOp::Or => self.regs.ac |= self.mem.read(address),
            AluOp::Xor => self.regs.ac ^= self.mem.read(address),
            AluOp::DecimalAdd => self.decimal_add(self.mem.read(address)),
            AluOp::Add => self.binary_add(self.mem.read(address)),
            AluOp::ComplementAdd => self.binary_add(!self.mem.read(address)),
        }
    }

    fn binary_add(&mut self, operand: u8) {
        let sum = arith::binary_add(self.regs.ac, operand, self.regs.status.cy);
        self.regs.ac = sum.value;
        self.regs.status.cy = sum.carry;
        self.regs.status.ov = sum.overflow;
    }

    fn decimal_add(&mut self, operand: u8) {
        let (value, carry) = arith::decimal_add(self.regs.ac, operand, self.regs.status.cy);
        self.regs.ac = value;
        self.regs.status.cy = carry;
    }

    /// Get the last executed instruction.
    pub fn last_op(&self) -> Option<Op> {
        self.last_op
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

/// Microcycles taken by DLY for a given AC and displacement byte.
pub fn delay_cycles(ac: u8, disp_byte: u8) -> u32 {
    13 + 2 * u32::from(ac) + 2 * u32::from(disp_byte) + 512 * u32::from(disp_byte)
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU is halted")]
    Halted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::registers::Ptr;

    /// CPU with `program` placed so that the first opcode is fetched
    /// from 0x001 (PC starts at 0 and is advanced before fetch).
    fn cpu_with(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.mem.load(0x001, program).unwrap();
        cpu
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = cpu_with(&[0x08, 0x00]);
        assert_eq!(cpu.step(), Ok(5));
        assert_eq!(cpu.step(), Ok(8));
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.pc, 0x002);
        assert_eq!(cpu.step(), Err(CpuError::Halted));
        assert_eq!(cpu.regs.pc, 0x002);
        assert_eq!(cpu.cycles, 13);
    }

    #[test]
    fn test_load_immediate_and_store() {
        // LDI 0x5A; ST 0x0C00 via P1; HLT
        let mut cpu = cpu_with(&[0xC4, 0x5A, 0xC9, 0x00, 0x00]);
        cpu.regs.p1 = 0x0C00;
        assert_eq!(cpu.step(), Ok(18));
        assert_eq!(cpu.regs.ac, 0x5A);
        assert_eq!(cpu.step(), Ok(18));
        assert_eq!(cpu.mem.read(0xC00), 0x5A);
    }

    #[test]
    fn test_store_to_display() {
        // LDI 0x3F; ST 3(P2)
        let mut cpu = cpu_with(&[0xC4, 0x3F, 0xCA, 0x03]);
        cpu.regs.p2 = 0x0700;
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.mem.display()[3], 0x3F);
    }

    #[test]
    fn test_pc_relative_load() {
        // LD 2(PC) reads the byte two past the displacement.
        let mut cpu = cpu_with(&[0xC0, 0x02, 0x00, 0x99]);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0x99);
    }

    #[test]
    fn test_add_sets_overflow() {
        // LDI 0x7F; ADI 0x01
        let mut cpu = cpu_with(&[0xC4, 0x7F, 0xF4, 0x01]);
        cpu.step().unwrap();
        assert_eq!(cpu.step(), Ok(19));
        assert_eq!(cpu.regs.ac, 0x80);
        assert!(cpu.regs.status.ov);
        assert!(!cpu.regs.status.cy);
    }

    #[test]
    fn test_complement_add() {
        // SCL; LDI 0x10; CAI 0x03 -> 0x10 - 0x03
        let mut cpu = cpu_with(&[0x03, 0xC4, 0x10, 0xFC, 0x03]);
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.step(), Ok(20));
        assert_eq!(cpu.regs.ac, 0x0D);
    }

    #[test]
    fn test_decimal_add_instruction() {
        // LDI 0x99; DAI 0x01
        let mut cpu = cpu_with(&[0xC4, 0x99, 0xEC, 0x01]);
        cpu.step().unwrap();
        assert_eq!(cpu.step(), Ok(23));
        assert_eq!(cpu.regs.ac, 0x00);
        assert!(cpu.regs.status.cy);
    }

    #[test]
    fn test_jz_taken_and_not_taken() {
        let mut cpu = cpu_with(&[0x98, 0x05]);
        assert_eq!(cpu.step(), Ok(11));
        assert_eq!(cpu.regs.pc, 0x002 + 5);

        let mut cpu = cpu_with(&[0x98, 0x05]);
        cpu.regs.ac = 0x01;
        assert_eq!(cpu.step(), Ok(9));
        assert_eq!(cpu.regs.pc, 0x002);
    }

    #[test]
    fn test_jp_tests_sign_bit() {
        let mut cpu = cpu_with(&[0x94, 0x10]);
        cpu.regs.ac = 0x80;
        assert_eq!(cpu.step(), Ok(9));

        let mut cpu = cpu_with(&[0x94, 0x10]);
        cpu.regs.ac = 0x7F;
        assert_eq!(cpu.step(), Ok(11));
        assert_eq!(cpu.regs.pc, 0x012);
    }

    #[test]
    fn test_jump_via_pointer() {
        let mut cpu = cpu_with(&[0x93, 0xFF]);
        cpu.regs.p3 = 0x0200;
        assert_eq!(cpu.step(), Ok(11));
        assert_eq!(cpu.regs.pc, 0x01FF);
    }

    #[test]
    fn test_auto_indexed_pre_decrement() {
        // LD @-1(P1)
        let mut cpu = cpu_with(&[0xC5, 0xFF]);
        cpu.mem.load(0x0FF, &[0x11, 0x22]).unwrap();
        cpu.regs.p1 = 0x100;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0x11);
        assert_eq!(cpu.regs.p1, 0x0FF);
    }

    #[test]
    fn test_auto_indexed_post_increment() {
        // LD @1(P1)
        let mut cpu = cpu_with(&[0xC5, 0x01]);
        cpu.mem.load(0x0FF, &[0x11, 0x22]).unwrap();
        cpu.regs.p1 = 0x100;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0x22);
        assert_eq!(cpu.regs.p1, 0x101);
    }

    #[test]
    fn test_displacement_minus_128_uses_e() {
        // LD -128(P2) with E = 4
        let mut cpu = cpu_with(&[0xC2, 0x80]);
        cpu.mem.load(0x104, &[0xAB]).unwrap();
        cpu.regs.p2 = 0x100;
        cpu.regs.e = 0x04;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0xAB);
    }

    #[test]
    fn test_ild_dld() {
        let mut cpu = cpu_with(&[0xA9, 0x00, 0xB9, 0x00, 0xB9, 0x00]);
        cpu.regs.p1 = 0x0C20;
        cpu.mem.write(0xC20, 0xFF);
        assert_eq!(cpu.step(), Ok(22));
        assert_eq!(cpu.regs.ac, 0x00);
        assert_eq!(cpu.mem.read(0xC20), 0x00);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0xFF);
        cpu.step().unwrap();
        assert_eq!(cpu.mem.read(0xC20), 0xFE);
    }

    #[test]
    fn test_pointer_exchanges() {
        // XPAL P1; XPAH P1; XPPC P3
        let mut cpu = cpu_with(&[0x31, 0x35, 0x3F]);
        cpu.regs.ac = 0x34;
        cpu.regs.p1 = 0x0A55;
        cpu.regs.p3 = 0x0200;
        assert_eq!(cpu.step(), Ok(8));
        assert_eq!((cpu.regs.ac, cpu.regs.p1), (0x55, 0x0A34));
        cpu.step().unwrap();
        assert_eq!((cpu.regs.ac, cpu.regs.p1), (0x0A, 0x5534));
        assert_eq!(cpu.step(), Ok(7));
        assert_eq!(cpu.regs.pc, 0x0200);
        assert_eq!(cpu.regs.p3, 0x0003);
    }

    #[test]
    fn test_shifts_and_rotates() {
        let mut cpu = cpu_with(&[0x1C, 0x1D, 0x1E, 0x1F]);
        cpu.regs.ac = 0x81;
        cpu.regs.status.cy = true;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0x40);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0xA0);
        cpu.regs.ac = 0x01;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0x80);
        cpu.regs.ac = 0x01;
        cpu.regs.status.cy = false;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0x00);
        assert!(cpu.regs.status.cy);
    }

    #[test]
    fn test_serial_io() {
        let mut cpu = cpu_with(&[0x19]);
        cpu.regs.e = 0x03;
        cpu.regs.serial_in = true;
        cpu.step().unwrap();
        assert!(cpu.regs.serial_out);
        assert_eq!(cpu.regs.e, 0x81);
    }

    #[test]
    fn test_status_copy() {
        // SCL; CSA; LDI 0x02; CAS
        let mut cpu = cpu_with(&[0x03, 0x06, 0xC4, 0x02, 0x07]);
        cpu.regs.status.sb = true;
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0xA0);
        cpu.step().unwrap();
        assert_eq!(cpu.step(), Ok(6));
        assert!(cpu.regs.status.f1);
        assert!(!cpu.regs.status.cy);
        assert!(cpu.regs.status.sb);
    }

    #[test]
    fn test_extension_ops() {
        // XAE; LDE; ANE; ORE; XRE; ADE; CAE; DAE
        let mut cpu = cpu_with(&[0x01, 0x40, 0x50, 0x58, 0x60, 0x70, 0x78, 0x68]);
        cpu.regs.ac = 0x0F;
        cpu.regs.e = 0x3C;
        assert_eq!(cpu.step(), Ok(7));
        assert_eq!((cpu.regs.ac, cpu.regs.e), (0x3C, 0x0F));
        assert_eq!(cpu.step(), Ok(6));
        assert_eq!(cpu.regs.ac, 0x0F);
        cpu.regs.ac = 0xFF;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0x0F);
        cpu.regs.ac = 0xF0;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0xFF);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.ac, 0xF0);
        cpu.regs.ac = 0x01;
        assert_eq!(cpu.step(), Ok(7));
        assert_eq!(cpu.regs.ac, 0x10);
        cpu.regs.status.cy = true;
        assert_eq!(cpu.step(), Ok(8));
        assert_eq!(cpu.regs.ac, 0x01);
        cpu.regs.ac = 0x05;
        cpu.regs.e = 0x05;
        cpu.regs.status.cy = false;
        assert_eq!(cpu.step(), Ok(11));
        assert_eq!(cpu.regs.ac, 0x10);
    }

    #[test]
    fn test_delay_timing() {
        let mut cpu = cpu_with(&[0x8F, 0x02]);
        cpu.regs.ac = 0x10;
        assert_eq!(cpu.step(), Ok(13 + 2 * 0x10 + 2 * 2 + 512 * 2));
        assert_eq!(cpu.regs.ac, 0x10);
        assert_eq!(cpu.regs.pc, 0x002);
    }

    #[test]
    fn test_undefined_opcode_is_seven_cycle_nop() {
        let mut cpu = cpu_with(&[0x20, 0x80, 0x55]);
        let before = cpu.regs.clone();
        assert_eq!(cpu.step(), Ok(7));
        assert_eq!(cpu.regs.pc, 0x001);
        assert_eq!(cpu.regs.ac, before.ac);
        // Bit 7 set: the displacement byte is consumed too.
        assert_eq!(cpu.step(), Ok(7));
        assert_eq!(cpu.regs.pc, 0x003);
    }

    #[test]
    fn test_pc_wraps_within_page() {
        let mut cpu = Cpu::new();
        cpu.mem.load(0x000, &[0x08]).unwrap();
        cpu.regs.pc = 0x0FFF;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0000);
        assert_eq!(cpu.last_op(), Some(Op::Nop));
    }

    #[test]
    fn test_reset_keeps_memory() {
        let mut cpu = cpu_with(&[0xC4, 0x12, 0x00]);
        cpu.mem.write(0x700, 0x06);
        cpu.run_limited(1000);
        assert!(cpu.is_halted());
        cpu.reset();
        assert!(cpu.is_running());
        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(cpu.mem.fetch(0x001), 0xC4);
        assert_eq!(cpu.mem.display()[0], 0x06);
    }

    #[test]
    fn test_toggle_halt() {
        let mut cpu = cpu_with(&[0x08]);
        cpu.toggle_halt();
        assert_eq!(cpu.step(), Err(CpuError::Halted));
        cpu.toggle_halt();
        assert_eq!(cpu.step(), Ok(5));
        assert_eq!(cpu.regs.ptr(Ptr::Pc), 0x001);
    }
}
