mod alu;
mod bit;
mod branch;
mod group;
mod load_store;
mod modrm;
mod shift;
mod stack;
mod string;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::core::{Bus, mips::MipsReporter, signals::CpuSignals};

pub(crate) use bit::BitOp;
pub(crate) use shift::ShiftCount;

/// EFLAGS bits.
pub mod flags {
    pub const CF: u32 = 0x0001;
    pub const PF: u32 = 0x0004;
    pub const AF: u32 = 0x0010;
    pub const ZF: u32 = 0x0040;
    pub const SF: u32 = 0x0080;
    pub const TF: u32 = 0x0100;
    pub const IF: u32 = 0x0200;
    pub const DF: u32 = 0x0400;
    pub const OF: u32 = 0x0800;
    /// Bit 1 always reads set.
    pub const FIXED: u32 = 0x0002;
}

// General register indices (also the ModR/M reg encoding).
pub const EAX: usize = 0;
pub const ECX: usize = 1;
pub const EDX: usize = 2;
pub const EBX: usize = 3;
pub const ESP: usize = 4;
pub const EBP: usize = 5;
pub const ESI: usize = 6;
pub const EDI: usize = 7;

// Segment register indices.
pub const ES: usize = 0;
pub const CS: usize = 1;
pub const SS: usize = 2;
pub const DS: usize = 3;
pub const FS: usize = 4;
pub const GS: usize = 5;

/// Flat address-space mask: 32 MiB.
pub const ADDR_MASK: u32 = 0x01FF_FFFF;

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum RepPrefix {
    None,
    /// F3: REP / REPE.
    Rep,
    /// F2: REPNE.
    Repne,
}

const EXECUTE_BATCH: u32 = 4096;

/// 8086 core with the 386's 32-bit extensions, running flat: every segment
/// base is zero and addresses wrap at [`ADDR_MASK`]. Operand and address
/// size default to 32 bits; the `0x66`/`0x67` prefixes select the 16-bit
/// forms.
pub struct X86 {
    /// EAX, ECX, EDX, EBX, ESP, EBP, ESI, EDI.
    pub regs: [u32; 8],
    pub eip: u32,
    pub eflags: u32,
    /// ES, CS, SS, DS, FS, GS. Kept for PUSH/POP/MOV and interrupt frames;
    /// they never contribute to address computation.
    pub segs: [u16; 6],

    /// Total clock cycles consumed since reset.
    pub cycles: u64,

    signals: Arc<CpuSignals>,
    mips: Option<MipsReporter>,

    // Per-instruction prefix state.
    pub(crate) seg_override: Option<usize>,
    pub(crate) operand16: bool,
    pub(crate) address16: bool,
    pub(crate) rep: RepPrefix,

    // Lazy ModR/M decode cache: the byte, the SIB byte, and the resolved
    // effective address are each fetched at most once per instruction.
    pub(crate) modrm: u8,
    pub(crate) modrm_loaded: bool,
    pub(crate) sib: u8,
    pub(crate) sib_loaded: bool,
    pub(crate) ea: u32,
    pub(crate) ea_loaded: bool,
}

impl Default for X86 {
    fn default() -> Self {
        Self::new()
    }
}

impl X86 {
    pub fn new() -> Self {
        Self {
            regs: [0; 8],
            eip: 0,
            eflags: flags::FIXED,
            segs: [0; 6],
            cycles: 0,
            signals: Arc::new(CpuSignals::new()),
            mips: None,
            seg_override: None,
            operand16: false,
            address16: false,
            rep: RepPrefix::None,
            modrm: 0,
            modrm_loaded: false,
            sib: 0,
            sib_loaded: false,
            ea: 0,
            ea_loaded: false,
        }
    }

    pub fn signals(&self) -> Arc<CpuSignals> {
        Arc::clone(&self.signals)
    }

    pub fn set_irq_line(&self, level: bool) {
        self.signals.irq_pending.store(level, Ordering::Release);
    }

    pub fn running(&self) -> bool {
        self.signals.is_running()
    }

    pub fn halted(&self) -> bool {
        self.signals.halted.load(Ordering::Acquire)
    }

    /// Report retired-instruction throughput from `execute()` once a
    /// second through the log facade.
    pub fn enable_mips_reporter(&mut self) {
        self.mips = Some(MipsReporter::new("x86"));
    }

    /// Architectural reset: registers cleared, execution restarts at 0.
    pub fn reset(&mut self) {
        self.regs = [0; 8];
        self.eip = 0;
        self.eflags = flags::FIXED;
        self.segs = [0; 6];
        self.cycles = 0;
        self.signals.halted.store(false, Ordering::Release);
        self.signals.irq_pending.store(false, Ordering::Release);
        self.signals.running.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn get_flag(&self, flag: u32) -> bool {
        self.eflags & flag != 0
    }

    #[inline]
    pub(crate) fn set_flag(&mut self, flag: u32, set: bool) {
        if set {
            self.eflags |= flag;
        } else {
            self.eflags &= !flag;
        }
    }

    // ---- Register access ----

    /// 8-bit register by encoding (0-3 = AL..BL, 4-7 = AH..BH).
    pub fn get_reg8(&self, index: usize) -> u8 {
        if index < 4 {
            self.regs[index] as u8
        } else {
            (self.regs[index - 4] >> 8) as u8
        }
    }

    pub fn set_reg8(&mut self, index: usize, value: u8) {
        if index < 4 {
            self.regs[index] = (self.regs[index] & !0xFF) | value as u32;
        } else {
            self.regs[index - 4] = (self.regs[index - 4] & !0xFF00) | (value as u32) << 8;
        }
    }

    pub fn get_reg16(&self, index: usize) -> u16 {
        self.regs[index] as u16
    }

    pub fn set_reg16(&mut self, index: usize, value: u16) {
        self.regs[index] = (self.regs[index] & !0xFFFF) | value as u32;
    }

    pub fn get_reg32(&self, index: usize) -> u32 {
        self.regs[index]
    }

    pub fn set_reg32(&mut self, index: usize, value: u32) {
        self.regs[index] = value;
    }

    /// Operand-size-selected register read (16 or 32 bits, zero-extended).
    #[inline]
    pub(crate) fn get_reg(&self, index: usize) -> u32 {
        if self.operand16 {
            self.get_reg16(index) as u32
        } else {
            self.regs[index]
        }
    }

    #[inline]
    pub(crate) fn set_reg(&mut self, index: usize, value: u32) {
        if self.operand16 {
            self.set_reg16(index, value as u16);
        } else {
            self.regs[index] = value;
        }
    }

    // ---- Memory access (flat, masked) ----

    #[inline]
    pub(crate) fn mem_read8<B: Bus<Address = u32> + ?Sized>(&self, bus: &mut B, addr: u32) -> u8 {
        bus.read(addr & ADDR_MASK)
    }

    #[inline]
    pub(crate) fn mem_write8<B: Bus<Address = u32> + ?Sized>(&self, bus: &mut B, addr: u32, v: u8) {
        bus.write(addr & ADDR_MASK, v);
    }

    #[inline]
    pub(crate) fn mem_read16<B: Bus<Address = u32> + ?Sized>(&self, bus: &mut B, addr: u32) -> u16 {
        let lo = self.mem_read8(bus, addr) as u16;
        let hi = self.mem_read8(bus, addr.wrapping_add(1)) as u16;
        hi << 8 | lo
    }

    #[inline]
    pub(crate) fn mem_write16<B: Bus<Address = u32> + ?Sized>(
        &self,
        bus: &mut B,
        addr: u32,
        v: u16,
    ) {
        self.mem_write8(bus, addr, v as u8);
        self.mem_write8(bus, addr.wrapping_add(1), (v >> 8) as u8);
    }

    #[inline]
    pub(crate) fn mem_read32<B: Bus<Address = u32> + ?Sized>(&self, bus: &mut B, addr: u32) -> u32 {
        let lo = self.mem_read16(bus, addr) as u32;
        let hi = self.mem_read16(bus, addr.wrapping_add(2)) as u32;
        hi << 16 | lo
    }

    #[inline]
    pub(crate) fn mem_write32<B: Bus<Address = u32> + ?Sized>(
        &self,
        bus: &mut B,
        addr: u32,
        v: u32,
    ) {
        self.mem_write16(bus, addr, v as u16);
        self.mem_write16(bus, addr.wrapping_add(2), (v >> 16) as u16);
    }

    /// Operand-size-selected memory read (zero-extended).
    #[inline]
    pub(crate) fn mem_read<B: Bus<Address = u32> + ?Sized>(&self, bus: &mut B, addr: u32) -> u32 {
        if self.operand16 {
            self.mem_read16(bus, addr) as u32
        } else {
            self.mem_read32(bus, addr)
        }
    }

    #[inline]
    pub(crate) fn mem_write<B: Bus<Address = u32> + ?Sized>(&self, bus: &mut B, addr: u32, v: u32) {
        if self.operand16 {
            self.mem_write16(bus, addr, v as u16);
        } else {
            self.mem_write32(bus, addr, v);
        }
    }

    // ---- Instruction stream ----

    #[inline]
    pub(crate) fn fetch8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let value = self.mem_read8(bus, self.eip);
        self.eip = self.eip.wrapping_add(1) & ADDR_MASK;
        value
    }

    #[inline]
    pub(crate) fn fetch16<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch8(bus) as u16;
        let hi = self.fetch8(bus) as u16;
        hi << 8 | lo
    }

    #[inline]
    pub(crate) fn fetch32<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let lo = self.fetch16(bus) as u32;
        let hi = self.fetch16(bus) as u32;
        hi << 16 | lo
    }

    /// Operand-size-selected immediate.
    #[inline]
    pub(crate) fn fetch_imm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        if self.operand16 {
            self.fetch16(bus) as u32
        } else {
            self.fetch32(bus)
        }
    }

    /// Operand size in bits (16 or 32).
    #[inline]
    pub(crate) fn op_bits(&self) -> u32 {
        if self.operand16 { 16 } else { 32 }
    }

    /// Sign bit mask for the current operand size.
    #[inline]
    pub(crate) fn sign_mask(&self) -> u32 {
        if self.operand16 { 0x8000 } else { 0x8000_0000 }
    }

    #[inline]
    pub(crate) fn operand_mask(&self) -> u32 {
        if self.operand16 { 0xFFFF } else { 0xFFFF_FFFF }
    }

    /// Execute one instruction and return the cycles consumed.
    pub fn step<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        if self.halted() {
            if self.signals.irq_pending.load(Ordering::Acquire) && self.get_flag(flags::IF) {
                self.signals.halted.store(false, Ordering::Release);
            } else {
                self.cycles += 1;
                return 1;
            }
        }
        // Per-instruction decode state resets first so an interrupt frame
        // never inherits the previous instruction's prefixes.
        self.seg_override = None;
        self.operand16 = false;
        self.address16 = false;
        self.rep = RepPrefix::None;
        self.modrm_loaded = false;
        self.sib_loaded = false;
        self.ea_loaded = false;

        if self.signals.irq_pending.load(Ordering::Acquire) && self.get_flag(flags::IF) {
            let vector = self.signals.irq_vector.load(Ordering::Acquire);
            let cycles = self.interrupt(bus, vector);
            self.cycles += cycles as u64;
            return cycles;
        }

        // Prefix stack: loop until a non-prefix byte comes up.

        let opcode = loop {
            match self.fetch8(bus) {
                0x26 => self.seg_override = Some(ES),
                0x2E => self.seg_override = Some(CS),
                0x36 => self.seg_override = Some(SS),
                0x3E => self.seg_override = Some(DS),
                0x64 => self.seg_override = Some(FS),
                0x65 => self.seg_override = Some(GS),
                0x66 => self.operand16 = true,
                0x67 => self.address16 = true,
                0xF0 => {} // LOCK: single-CPU bus, ignored
                0xF2 => self.rep = RepPrefix::Repne,
                0xF3 => self.rep = RepPrefix::Rep,
                other => break other,
            }
        };

        let cycles = if opcode == 0x0F {
            let extended = self.fetch8(bus);
            self.dispatch_0f(bus, extended)
        } else {
            self.dispatch(bus, opcode)
        };
        self.cycles += cycles as u64;
        cycles
    }

    /// Run until the run flag clears.
    pub fn execute<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) {
        self.signals.executing.store(true, Ordering::Release);
        while self.signals.is_running() {
            let mut retired = 0;
            for _ in 0..EXECUTE_BATCH {
                self.signals.service_pause();
                if !self.signals.is_running() {
                    break;
                }
                self.step(bus);
                retired += 1;
            }
            if let Some(reporter) = &mut self.mips {
                reporter.record(retired);
            }
        }
        self.signals.executing.store(false, Ordering::Release);
    }

    /// Software/hardware interrupt entry: real-mode style frame (flags, CS,
    /// return IP) and a vector-table fetch from the bottom of memory.
    pub(crate) fn interrupt<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, vector: u8) -> u32 {
        let eflags = self.eflags;
        self.push(bus, eflags);
        self.push(bus, self.segs[CS] as u32);
        self.push(bus, self.eip);
        self.set_flag(flags::IF, false);
        self.set_flag(flags::TF, false);
        let table = vector as u32 * 4;
        let offset = self.mem_read16(bus, table) as u32;
        let seg = self.mem_read16(bus, table + 2);
        self.segs[CS] = seg;
        self.eip = offset;
        26
    }

    /// Base one-byte opcode dispatch.
    fn dispatch<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, opcode: u8) -> u32 {
        match opcode {
            // --- ALU rm/r and accumulator forms ---
            0x00 => self.alu_rm_r8(bus, Self::alu_add8),
            0x01 => self.alu_rm_r(bus, Self::alu_add),
            0x02 => self.alu_r_rm8(bus, Self::alu_add8),
            0x03 => self.alu_r_rm(bus, Self::alu_add),
            0x04 => self.alu_acc_imm8(bus, Self::alu_add8),
            0x05 => self.alu_acc_imm(bus, Self::alu_add),
            0x08 => self.alu_rm_r8(bus, Self::alu_or8),
            0x09 => self.alu_rm_r(bus, Self::alu_or),
            0x0A => self.alu_r_rm8(bus, Self::alu_or8),
            0x0B => self.alu_r_rm(bus, Self::alu_or),
            0x0C => self.alu_acc_imm8(bus, Self::alu_or8),
            0x0D => self.alu_acc_imm(bus, Self::alu_or),
            0x10 => self.alu_rm_r8(bus, Self::alu_adc8),
            0x11 => self.alu_rm_r(bus, Self::alu_adc),
            0x12 => self.alu_r_rm8(bus, Self::alu_adc8),
            0x13 => self.alu_r_rm(bus, Self::alu_adc),
            0x14 => self.alu_acc_imm8(bus, Self::alu_adc8),
            0x15 => self.alu_acc_imm(bus, Self::alu_adc),
            0x18 => self.alu_rm_r8(bus, Self::alu_sbb8),
            0x19 => self.alu_rm_r(bus, Self::alu_sbb),
            0x1A => self.alu_r_rm8(bus, Self::alu_sbb8),
            0x1B => self.alu_r_rm(bus, Self::alu_sbb),
            0x1C => self.alu_acc_imm8(bus, Self::alu_sbb8),
            0x1D => self.alu_acc_imm(bus, Self::alu_sbb),
            0x20 => self.alu_rm_r8(bus, Self::alu_and8),
            0x21 => self.alu_rm_r(bus, Self::alu_and),
            0x22 => self.alu_r_rm8(bus, Self::alu_and8),
            0x23 => self.alu_r_rm(bus, Self::alu_and),
            0x24 => self.alu_acc_imm8(bus, Self::alu_and8),
            0x25 => self.alu_acc_imm(bus, Self::alu_and),
            0x28 => self.alu_rm_r8(bus, Self::alu_sub8),
            0x29 => self.alu_rm_r(bus, Self::alu_sub),
            0x2A => self.alu_r_rm8(bus, Self::alu_sub8),
            0x2B => self.alu_r_rm(bus, Self::alu_sub),
            0x2C => self.alu_acc_imm8(bus, Self::alu_sub8),
            0x2D => self.alu_acc_imm(bus, Self::alu_sub),
            0x30 => self.alu_rm_r8(bus, Self::alu_xor8),
            0x31 => self.alu_rm_r(bus, Self::alu_xor),
            0x32 => self.alu_r_rm8(bus, Self::alu_xor8),
            0x33 => self.alu_r_rm(bus, Self::alu_xor),
            0x34 => self.alu_acc_imm8(bus, Self::alu_xor8),
            0x35 => self.alu_acc_imm(bus, Self::alu_xor),
            0x38 => self.cmp_rm_r8(bus),
            0x39 => self.cmp_rm_r(bus),
            0x3A => self.cmp_r_rm8(bus),
            0x3B => self.cmp_r_rm(bus),
            0x3C => self.cmp_acc_imm8(bus),
            0x3D => self.cmp_acc_imm(bus),

            // --- Segment register pushes/pops ---
            0x06 => self.push_seg(bus, ES),
            0x07 => self.pop_seg(bus, ES),
            0x0E => self.push_seg(bus, CS),
            0x16 => self.push_seg(bus, SS),
            0x17 => self.pop_seg(bus, SS),
            0x1E => self.push_seg(bus, DS),
            0x1F => self.pop_seg(bus, DS),

            // --- BCD / ASCII adjust ---
            0x27 => self.op_daa(),
            0x2F => self.op_das(),
            0x37 => self.op_aaa(),
            0x3F => self.op_aas(),

            // --- INC/DEC r ---
            0x40..=0x47 => self.op_inc_reg(opcode as usize & 7),
            0x48..=0x4F => self.op_dec_reg(opcode as usize & 7),

            // --- PUSH/POP r ---
            0x50..=0x57 => {
                let value = self.get_reg(opcode as usize & 7);
                self.push(bus, value);
                2
            }
            0x58..=0x5F => {
                let value = self.pop(bus);
                self.set_reg(opcode as usize & 7, value);
                3
            }
            0x60 => self.op_pusha(bus),
            0x61 => self.op_popa(bus),

            // --- PUSH imm / 386 three-operand IMUL ---
            0x68 => {
                let value = self.fetch_imm(bus);
                self.push(bus, value);
                2
            }
            0x69 => self.op_imul_imm(bus, false),
            0x6A => {
                let value = self.fetch8(bus) as i8 as i32 as u32;
                self.push(bus, value);
                2
            }
            0x6B => self.op_imul_imm(bus, true),

            // --- String port I/O ---
            0x6C => self.op_ins8(bus),
            0x6D => self.op_ins(bus),
            0x6E => self.op_outs8(bus),
            0x6F => self.op_outs(bus),

            // --- Jcc rel8 ---
            0x70..=0x7F => {
                let taken = self.condition(opcode & 0x0F);
                self.op_jcc_rel8(bus, taken)
            }

            // --- Group 1: ALU rm,imm ---
            0x80 | 0x82 => self.group1_rm8(bus),
            0x81 => self.group1_rm(bus, false),
            0x83 => self.group1_rm(bus, true),

            // --- TEST / XCHG ---
            0x84 => self.op_test_rm_r8(bus),
            0x85 => self.op_test_rm_r(bus),
            0x86 => self.op_xchg_rm_r8(bus),
            0x87 => self.op_xchg_rm_r(bus),

            // --- MOV ---
            0x88 => self.op_mov_rm_r8(bus),
            0x89 => self.op_mov_rm_r(bus),
            0x8A => self.op_mov_r_rm8(bus),
            0x8B => self.op_mov_r_rm(bus),
            0x8C => self.op_mov_rm_seg(bus),
            0x8D => self.op_lea(bus),
            0x8E => self.op_mov_seg_rm(bus),
            0x8F => self.op_pop_rm(bus),

            // --- XCHG eAX / NOP ---
            0x90 => 1,
            0x91..=0x97 => {
                let reg = opcode as usize & 7;
                let tmp = self.get_reg(EAX);
                let other = self.get_reg(reg);
                self.set_reg(EAX, other);
                self.set_reg(reg, tmp);
                2
            }

            // --- Sign extensions within the accumulator ---
            0x98 => self.op_cbw(),
            0x99 => self.op_cwd(),

            0x9A => self.op_call_far(bus),
            0x9B => 1, // WAIT: no coprocessor, nothing to wait for
            0x9C => {
                let value = self.eflags;
                self.push(bus, value);
                2
            }
            0x9D => {
                let value = self.pop(bus);
                self.eflags = (value & !flags::FIXED) | flags::FIXED;
                3
            }
            0x9E => self.op_sahf(),
            0x9F => self.op_lahf(),

            // --- MOV accumulator <-> memory offset ---
            0xA0 => {
                let addr = self.fetch_moffs(bus);
                let value = self.mem_read8(bus, addr);
                self.set_reg8(EAX, value);
                3
            }
            0xA1 => {
                let addr = self.fetch_moffs(bus);
                let value = self.mem_read(bus, addr);
                self.set_reg(EAX, value);
                3
            }
            0xA2 => {
                let addr = self.fetch_moffs(bus);
                let value = self.get_reg8(EAX);
                self.mem_write8(bus, addr, value);
                3
            }
            0xA3 => {
                let addr = self.fetch_moffs(bus);
                let value = self.get_reg(EAX);
                self.mem_write(bus, addr, value);
                3
            }

            // --- String operations ---
            0xA4 => self.op_movs8(bus),
            0xA5 => self.op_movs(bus),
            0xA6 => self.op_cmps8(bus),
            0xA7 => self.op_cmps(bus),
            0xAA => self.op_stos8(bus),
            0xAB => self.op_stos(bus),
            0xAC => self.op_lods8(bus),
            0xAD => self.op_lods(bus),
            0xAE => self.op_scas8(bus),
            0xAF => self.op_scas(bus),

            // --- TEST accumulator, imm ---
            0xA8 => {
                let imm = self.fetch8(bus);
                let result = self.get_reg8(EAX) & imm;
                self.set_flags_logic8(result);
                2
            }
            0xA9 => {
                let imm = self.fetch_imm(bus);
                let result = self.get_reg(EAX) & imm;
                self.set_flags_logic(result);
                2
            }

            // --- MOV r,imm ---
            0xB0..=0xB7 => {
                let value = self.fetch8(bus);
                self.set_reg8(opcode as usize & 7, value);
                2
            }
            0xB8..=0xBF => {
                let value = self.fetch_imm(bus);
                self.set_reg(opcode as usize & 7, value);
                2
            }

            // --- Group 2: shifts/rotates ---
            0xC0 => self.group2_rm8(bus, ShiftCount::Imm),
            0xC1 => self.group2_rm(bus, ShiftCount::Imm),
            0xD0 => self.group2_rm8(bus, ShiftCount::One),
            0xD1 => self.group2_rm(bus, ShiftCount::One),
            0xD2 => self.group2_rm8(bus, ShiftCount::Cl),
            0xD3 => self.group2_rm(bus, ShiftCount::Cl),

            // --- Returns ---
            0xC2 => self.op_ret_imm(bus),
            0xC3 => self.op_ret(bus),
            0xCA => self.op_retf_imm(bus),
            0xCB => self.op_retf(bus),

            0xC4 => self.op_load_far_ptr(bus, ES),
            0xC5 => self.op_load_far_ptr(bus, DS),

            // --- MOV rm,imm ---
            0xC6 => self.op_mov_rm_imm8(bus),
            0xC7 => self.op_mov_rm_imm(bus),

            0xC8 => self.op_enter(bus),
            0xC9 => self.op_leave(bus),

            // --- Software interrupts ---
            0xCC => self.interrupt(bus, 3),
            0xCD => {
                let vector = self.fetch8(bus);
                self.interrupt(bus, vector)
            }
            0xCE => {
                if self.get_flag(flags::OF) {
                    self.interrupt(bus, 4)
                } else {
                    3
                }
            }
            0xCF => self.op_iret(bus),

            // --- AAM/AAD with explicit base byte ---
            0xD4 => self.op_aam(bus),
            0xD5 => self.op_aad(bus),
            0xD7 => self.op_xlat(bus),

            // x87 escapes: no coprocessor in this machine model, so these
            // are refused like any other undefined opcode.
            0xD8..=0xDF => self.op_undefined(opcode as u32),

            // --- Loops ---
            0xE0 => self.op_loop(bus, Some(false)),
            0xE1 => self.op_loop(bus, Some(true)),
            0xE2 => self.op_loop(bus, None),
            0xE3 => self.op_jcxz(bus),

            // --- Port I/O ---
            0xE4 => {
                let port = self.fetch8(bus) as u16;
                let value = bus.io_read(port);
                self.set_reg8(EAX, value);
                5
            }
            0xE5 => self.op_in_wide(bus, None),
            0xE6 => {
                let port = self.fetch8(bus) as u16;
                bus.io_write(port, self.get_reg8(EAX));
                5
            }
            0xE7 => self.op_out_wide(bus, None),
            0xEC => {
                let port = self.get_reg16(EDX);
                let value = bus.io_read(port);
                self.set_reg8(EAX, value);
                5
            }
            0xED => {
                let port = self.get_reg16(EDX);
                self.op_in_wide_port(bus, port)
            }
            0xEE => {
                let port = self.get_reg16(EDX);
                bus.io_write(port, self.get_reg8(EAX));
                5
            }
            0xEF => {
                let port = self.get_reg16(EDX);
                self.op_out_wide_port(bus, port)
            }

            // --- Calls and jumps ---
            0xE8 => self.op_call_rel(bus),
            0xE9 => self.op_jmp_rel(bus),
            0xEA => self.op_jmp_far(bus),
            0xEB => self.op_jmp_rel8(bus),

            // --- Flag manipulation ---
            0xF4 => self.op_hlt(),
            0xF5 => {
                let carry = self.get_flag(flags::CF);
                self.set_flag(flags::CF, !carry);
                2
            }
            0xF8 => {
                self.set_flag(flags::CF, false);
                2
            }
            0xF9 => {
                self.set_flag(flags::CF, true);
                2
            }
            0xFA => {
                self.set_flag(flags::IF, false);
                2
            }
            0xFB => {
                self.set_flag(flags::IF, true);
                2
            }
            0xFC => {
                self.set_flag(flags::DF, false);
                2
            }
            0xFD => {
                self.set_flag(flags::DF, true);
                2
            }

            // --- Groups 3, 4, 5 ---
            0xF6 => self.group3_rm8(bus),
            0xF7 => self.group3_rm(bus),
            0xFE => self.group4_rm8(bus),
            0xFF => self.group5_rm(bus),

            _ => self.op_undefined(opcode as u32),
        }
    }

    /// Two-byte (0x0F) opcode dispatch: the 386 extended set.
    fn dispatch_0f<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, opcode: u8) -> u32 {
        match opcode {
            // Jcc rel16/32
            0x80..=0x8F => {
                let taken = self.condition(opcode & 0x0F);
                self.op_jcc_rel(bus, taken)
            }
            // SETcc rm8
            0x90..=0x9F => {
                let taken = self.condition(opcode & 0x0F);
                self.op_setcc(bus, taken)
            }

            0xA0 => self.push_seg(bus, FS),
            0xA1 => self.pop_seg(bus, FS),
            0xA8 => self.push_seg(bus, GS),
            0xA9 => self.pop_seg(bus, GS),

            // Bit tests with a register index
            0xA3 => self.op_bt_rm_r(bus, BitOp::Test),
            0xAB => self.op_bt_rm_r(bus, BitOp::Set),
            0xB3 => self.op_bt_rm_r(bus, BitOp::Reset),
            0xBB => self.op_bt_rm_r(bus, BitOp::Complement),
            // Group 8: bit tests with an immediate index
            0xBA => self.group8_rm(bus),

            // Double-precision shifts
            0xA4 => self.op_shld(bus, ShiftCount::Imm),
            0xA5 => self.op_shld(bus, ShiftCount::Cl),
            0xAC => self.op_shrd(bus, ShiftCount::Imm),
            0xAD => self.op_shrd(bus, ShiftCount::Cl),

            0xAF => self.op_imul_r_rm(bus),

            0xB6 => self.op_movzx8(bus),
            0xB7 => self.op_movzx16(bus),
            0xBE => self.op_movsx8(bus),
            0xBF => self.op_movsx16(bus),

            0xBC => self.op_bsf(bus),
            0xBD => self.op_bsr(bus),

            _ => self.op_undefined(0x0F00 | opcode as u32),
        }
    }

    /// Undefined opcode policy: refuse to execute and halt.
    fn op_undefined(&mut self, opcode: u32) -> u32 {
        log::warn!(
            "undefined x86 opcode 0x{opcode:02X} at 0x{:08X}; halting",
            self.eip.wrapping_sub(1)
        );
        self.signals.halted.store(true, Ordering::Release);
        2
    }

    /// HLT: wait for an interrupt.
    fn op_hlt(&mut self) -> u32 {
        self.signals.halted.store(true, Ordering::Release);
        2
    }
}
