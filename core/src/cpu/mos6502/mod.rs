mod alu;
mod branch;
mod illegal;
mod load_store;
mod shift;
mod stack;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender};

use crate::core::{Bus, mips::MipsReporter, signals::CpuSignals};

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum StatusFlag {
    C = 0x01, // Carry
    Z = 0x02, // Zero
    I = 0x04, // Interrupt Disable
    D = 0x08, // Decimal
    B = 0x10, // Break
    U = 0x20, // Unused (always 1)
    V = 0x40, // Overflow
    N = 0x80, // Negative
}

/// Pre-built N/Z flag pairs for every 8-bit result; hot paths do one table
/// load instead of two tests.
pub(crate) const NZ_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut v = 0usize;
    while v < 256 {
        let mut flags = 0u8;
        if v == 0 {
            flags |= StatusFlag::Z as u8;
        }
        if v & 0x80 != 0 {
            flags |= StatusFlag::N as u8;
        }
        table[v] = flags;
        v += 1;
    }
    table
};

/// Number of instructions per inner `execute()` batch between flag polls.
const EXECUTE_BATCH: u32 = 4096;

/// MOS 6502 with the documented instruction set, the common illegal
/// opcodes, and decimal mode.
pub struct Mos6502 {
    // Registers
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub pc: u16,
    pub sp: u8,
    pub p: u8,

    /// Total clock cycles consumed since reset.
    pub cycles: u64,

    signals: Arc<CpuSignals>,
    nmi_previous: AtomicBool,
    reset_pending: AtomicBool,

    // Debug breakpoints: PC is sent to a 1-slot channel and execution parks
    // until the observer releases it.
    breakpoints: HashSet<u16>,
    breakpoint_tx: Option<SyncSender<u16>>,
    resume_rx: Option<Receiver<()>>,

    mips: Option<MipsReporter>,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            sp: 0xFD,
            p: StatusFlag::I as u8 | StatusFlag::U as u8,
            cycles: 0,
            signals: Arc::new(CpuSignals::new()),
            nmi_previous: AtomicBool::new(false),
            reset_pending: AtomicBool::new(false),
            breakpoints: HashSet::new(),
            breakpoint_tx: None,
            resume_rx: None,
            mips: None,
        }
    }

    /// Shared flag block for executors and observers.
    pub fn signals(&self) -> Arc<CpuSignals> {
        Arc::clone(&self.signals)
    }

    pub fn set_irq_line(&self, level: bool) {
        self.signals.irq_pending.store(level, Ordering::Release);
    }

    pub fn set_nmi_line(&self, level: bool) {
        self.signals.nmi_line.store(level, Ordering::Release);
    }

    pub fn set_rdy_line(&self, level: bool) {
        self.signals.rdy_line.store(level, Ordering::Release);
    }

    pub fn running(&self) -> bool {
        self.signals.is_running()
    }

    /// Request an architectural reset; applied at the next instruction
    /// boundary (the reset vector lives behind the bus, which only the
    /// executor holds).
    pub fn request_reset(&self) {
        self.reset_pending.store(true, Ordering::Release);
    }

    /// Report retired-instruction throughput from `execute()` once a
    /// second through the log facade.
    pub fn enable_mips_reporter(&mut self) {
        self.mips = Some(MipsReporter::new("mos6502"));
    }

    pub fn add_breakpoint(&mut self, addr: u16) {
        self.breakpoints.insert(addr);
    }

    pub fn remove_breakpoint(&mut self, addr: u16) {
        self.breakpoints.remove(&addr);
    }

    /// Attach the debug channel pair: PC values go out on `tx` (capacity 1),
    /// execution resumes on a message from `rx`.
    pub fn set_debug_channels(&mut self, tx: SyncSender<u16>, rx: Receiver<()>) {
        self.breakpoint_tx = Some(tx);
        self.resume_rx = Some(rx);
    }

    #[inline]
    pub(crate) fn set_flag(&mut self, flag: StatusFlag, set: bool) {
        if set {
            self.p |= flag as u8;
        } else {
            self.p &= !(flag as u8);
        }
    }

    #[inline]
    pub(crate) fn flag(&self, flag: StatusFlag) -> bool {
        self.p & flag as u8 != 0
    }

    /// Set N and Z from an 8-bit result via the pre-built table.
    #[inline]
    pub(crate) fn set_nz(&mut self, value: u8) {
        self.p = (self.p & !(StatusFlag::N as u8 | StatusFlag::Z as u8)) | NZ_TABLE[value as usize];
    }

    /// Architectural reset: clear registers, reload PC from the reset vector
    /// at `0xFFFC`, re-enable the run flag.
    pub fn reset<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.p = StatusFlag::I as u8 | StatusFlag::U as u8;
        self.cycles = 0;
        self.pc = self.read16(bus, 0xFFFC);
        self.signals.irq_pending.store(false, Ordering::Release);
        self.signals.nmi_line.store(false, Ordering::Release);
        self.signals.nmi_pending.store(false, Ordering::Release);
        self.nmi_previous.store(false, Ordering::Release);
        self.reset_pending.store(false, Ordering::Release);
        self.signals.running.store(true, Ordering::Release);
    }

    /// Execute one instruction (or service one interrupt / one RDY stall)
    /// and return the cycles consumed.
    pub fn step<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        if !self.signals.rdy_line.load(Ordering::Acquire) {
            self.cycles += 1;
            return 1;
        }
        if self.reset_pending.load(Ordering::Acquire) {
            self.reset(bus);
            return 0;
        }
        if let Some(kind) = self.poll_interrupts() {
            let cycles = self.service_interrupt(bus, kind);
            self.cycles += cycles as u64;
            return cycles;
        }
        if !self.breakpoints.is_empty() && self.breakpoints.contains(&self.pc) {
            self.park_at_breakpoint();
        }
        let opcode = self.fetch8(bus);
        let cycles = self.dispatch(bus, opcode);
        self.cycles += cycles as u64;
        cycles
    }

    /// Run until the run flag clears. Flags are polled once per instruction
    /// boundary; the pause handshake is serviced between batches and on
    /// every boundary via [`CpuSignals::service_pause`].
    pub fn execute<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) {
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

    fn park_at_breakpoint(&mut self) {
        if let (Some(tx), Some(rx)) = (&self.breakpoint_tx, &self.resume_rx) {
            if tx.send(self.pc).is_ok() {
                let _ = rx.recv();
            }
        }
    }

    fn poll_interrupts(&mut self) -> Option<Interrupt> {
        let line = self.signals.nmi_line.load(Ordering::Acquire);
        let previous = self.nmi_previous.swap(line, Ordering::AcqRel);
        if line && !previous {
            self.signals.nmi_pending.store(true, Ordering::Release);
        }
        if self.signals.nmi_pending.swap(false, Ordering::AcqRel) {
            return Some(Interrupt::Nmi);
        }
        if self.signals.irq_pending.load(Ordering::Acquire) && !self.flag(StatusFlag::I) {
            return Some(Interrupt::Irq);
        }
        None
    }

    /// Hardware interrupt response: push PC and P (B clear), set I, load the
    /// vector. 7 cycles.
    fn service_interrupt<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        kind: Interrupt,
    ) -> u32 {
        self.push8(bus, (self.pc >> 8) as u8);
        self.push8(bus, self.pc as u8);
        let pushed = (self.p | StatusFlag::U as u8) & !(StatusFlag::B as u8);
        self.push8(bus, pushed);
        self.set_flag(StatusFlag::I, true);
        let vector = match kind {
            Interrupt::Nmi => 0xFFFA,
            Interrupt::Irq => 0xFFFE,
        };
        self.pc = self.read16(bus, vector);
        7
    }

    /// Decode and execute one opcode; returns its cycle cost including any
    /// page-cross and branch penalties.
    fn dispatch<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, opcode: u8) -> u32 {
        match opcode {
            // --- LDA ---
            0xA9 => self.alu_imm(bus, |c, v| {
                c.a = v;
                c.set_nz(v);
            }),
            0xA5 => self.alu_zp(bus, |c, v| {
                c.a = v;
                c.set_nz(v);
            }),
            0xB5 => self.alu_zp_x(bus, |c, v| {
                c.a = v;
                c.set_nz(v);
            }),
            0xAD => self.alu_abs(bus, |c, v| {
                c.a = v;
                c.set_nz(v);
            }),
            0xBD => self.alu_abs_x(bus, |c, v| {
                c.a = v;
                c.set_nz(v);
            }),
            0xB9 => self.alu_abs_y(bus, |c, v| {
                c.a = v;
                c.set_nz(v);
            }),
            0xA1 => self.alu_ind_x(bus, |c, v| {
                c.a = v;
                c.set_nz(v);
            }),
            0xB1 => self.alu_ind_y(bus, |c, v| {
                c.a = v;
                c.set_nz(v);
            }),

            // --- LDX ---
            0xA2 => self.alu_imm(bus, |c, v| {
                c.x = v;
                c.set_nz(v);
            }),
            0xA6 => self.alu_zp(bus, |c, v| {
                c.x = v;
                c.set_nz(v);
            }),
            0xB6 => self.alu_zp_y(bus, |c, v| {
                c.x = v;
                c.set_nz(v);
            }),
            0xAE => self.alu_abs(bus, |c, v| {
                c.x = v;
                c.set_nz(v);
            }),
            0xBE => self.alu_abs_y(bus, |c, v| {
                c.x = v;
                c.set_nz(v);
            }),

            // --- LDY ---
            0xA0 => self.alu_imm(bus, |c, v| {
                c.y = v;
                c.set_nz(v);
            }),
            0xA4 => self.alu_zp(bus, |c, v| {
                c.y = v;
                c.set_nz(v);
            }),
            0xB4 => self.alu_zp_x(bus, |c, v| {
                c.y = v;
                c.set_nz(v);
            }),
            0xAC => self.alu_abs(bus, |c, v| {
                c.y = v;
                c.set_nz(v);
            }),
            0xBC => self.alu_abs_x(bus, |c, v| {
                c.y = v;
                c.set_nz(v);
            }),

            // --- STA / STX / STY ---
            0x85 => self.store_zp(bus, self.a),
            0x95 => self.store_zp_x(bus, self.a),
            0x8D => self.store_abs(bus, self.a),
            0x9D => self.store_abs_x(bus, self.a),
            0x99 => self.store_abs_y(bus, self.a),
            0x81 => self.store_ind_x(bus, self.a),
            0x91 => self.store_ind_y(bus, self.a),
            0x86 => self.store_zp(bus, self.x),
            0x96 => self.store_zp_y(bus, self.x),
            0x8E => self.store_abs(bus, self.x),
            0x84 => self.store_zp(bus, self.y),
            0x94 => self.store_zp_x(bus, self.y),
            0x8C => self.store_abs(bus, self.y),

            // --- ADC ---
            0x69 => self.alu_imm(bus, Self::perform_adc),
            0x65 => self.alu_zp(bus, Self::perform_adc),
            0x75 => self.alu_zp_x(bus, Self::perform_adc),
            0x6D => self.alu_abs(bus, Self::perform_adc),
            0x7D => self.alu_abs_x(bus, Self::perform_adc),
            0x79 => self.alu_abs_y(bus, Self::perform_adc),
            0x61 => self.alu_ind_x(bus, Self::perform_adc),
            0x71 => self.alu_ind_y(bus, Self::perform_adc),

            // --- SBC (0xEB is the illegal mirror) ---
            0xE9 | 0xEB => self.alu_imm(bus, Self::perform_sbc),
            0xE5 => self.alu_zp(bus, Self::perform_sbc),
            0xF5 => self.alu_zp_x(bus, Self::perform_sbc),
            0xED => self.alu_abs(bus, Self::perform_sbc),
            0xFD => self.alu_abs_x(bus, Self::perform_sbc),
            0xF9 => self.alu_abs_y(bus, Self::perform_sbc),
            0xE1 => self.alu_ind_x(bus, Self::perform_sbc),
            0xF1 => self.alu_ind_y(bus, Self::perform_sbc),

            // --- CMP / CPX / CPY ---
            0xC9 => self.alu_imm(bus, |c, v| c.perform_compare(c.a, v)),
            0xC5 => self.alu_zp(bus, |c, v| c.perform_compare(c.a, v)),
            0xD5 => self.alu_zp_x(bus, |c, v| c.perform_compare(c.a, v)),
            0xCD => self.alu_abs(bus, |c, v| c.perform_compare(c.a, v)),
            0xDD => self.alu_abs_x(bus, |c, v| c.perform_compare(c.a, v)),
            0xD9 => self.alu_abs_y(bus, |c, v| c.perform_compare(c.a, v)),
            0xC1 => self.alu_ind_x(bus, |c, v| c.perform_compare(c.a, v)),
            0xD1 => self.alu_ind_y(bus, |c, v| c.perform_compare(c.a, v)),
            0xE0 => self.alu_imm(bus, |c, v| c.perform_compare(c.x, v)),
            0xE4 => self.alu_zp(bus, |c, v| c.perform_compare(c.x, v)),
            0xEC => self.alu_abs(bus, |c, v| c.perform_compare(c.x, v)),
            0xC0 => self.alu_imm(bus, |c, v| c.perform_compare(c.y, v)),
            0xC4 => self.alu_zp(bus, |c, v| c.perform_compare(c.y, v)),
            0xCC => self.alu_abs(bus, |c, v| c.perform_compare(c.y, v)),

            // --- AND / ORA / EOR ---
            0x29 => self.alu_imm(bus, Self::perform_and),
            0x25 => self.alu_zp(bus, Self::perform_and),
            0x35 => self.alu_zp_x(bus, Self::perform_and),
            0x2D => self.alu_abs(bus, Self::perform_and),
            0x3D => self.alu_abs_x(bus, Self::perform_and),
            0x39 => self.alu_abs_y(bus, Self::perform_and),
            0x21 => self.alu_ind_x(bus, Self::perform_and),
            0x31 => self.alu_ind_y(bus, Self::perform_and),
            0x09 => self.alu_imm(bus, Self::perform_ora),
            0x05 => self.alu_zp(bus, Self::perform_ora),
            0x15 => self.alu_zp_x(bus, Self::perform_ora),
            0x0D => self.alu_abs(bus, Self::perform_ora),
            0x1D => self.alu_abs_x(bus, Self::perform_ora),
            0x19 => self.alu_abs_y(bus, Self::perform_ora),
            0x01 => self.alu_ind_x(bus, Self::perform_ora),
            0x11 => self.alu_ind_y(bus, Self::perform_ora),
            0x49 => self.alu_imm(bus, Self::perform_eor),
            0x45 => self.alu_zp(bus, Self::perform_eor),
            0x55 => self.alu_zp_x(bus, Self::perform_eor),
            0x4D => self.alu_abs(bus, Self::perform_eor),
            0x5D => self.alu_abs_x(bus, Self::perform_eor),
            0x59 => self.alu_abs_y(bus, Self::perform_eor),
            0x41 => self.alu_ind_x(bus, Self::perform_eor),
            0x51 => self.alu_ind_y(bus, Self::perform_eor),

            // --- BIT ---
            0x24 => self.alu_zp(bus, Self::perform_bit),
            0x2C => self.alu_abs(bus, Self::perform_bit),

            // --- Shifts / rotates ---
            0x0A => self.accumulator_op(Self::perform_asl),
            0x06 => self.rmw_zp(bus, Self::perform_asl),
            0x16 => self.rmw_zp_x(bus, Self::perform_asl),
            0x0E => self.rmw_abs(bus, Self::perform_asl),
            0x1E => self.rmw_abs_x(bus, Self::perform_asl),
            0x4A => self.accumulator_op(Self::perform_lsr),
            0x46 => self.rmw_zp(bus, Self::perform_lsr),
            0x56 => self.rmw_zp_x(bus, Self::perform_lsr),
            0x4E => self.rmw_abs(bus, Self::perform_lsr),
            0x5E => self.rmw_abs_x(bus, Self::perform_lsr),
            0x2A => self.accumulator_op(Self::perform_rol),
            0x26 => self.rmw_zp(bus, Self::perform_rol),
            0x36 => self.rmw_zp_x(bus, Self::perform_rol),
            0x2E => self.rmw_abs(bus, Self::perform_rol),
            0x3E => self.rmw_abs_x(bus, Self::perform_rol),
            0x6A => self.accumulator_op(Self::perform_ror),
            0x66 => self.rmw_zp(bus, Self::perform_ror),
            0x76 => self.rmw_zp_x(bus, Self::perform_ror),
            0x6E => self.rmw_abs(bus, Self::perform_ror),
            0x7E => self.rmw_abs_x(bus, Self::perform_ror),

            // --- INC / DEC on memory ---
            0xE6 => self.rmw_zp(bus, Self::perform_inc),
            0xF6 => self.rmw_zp_x(bus, Self::perform_inc),
            0xEE => self.rmw_abs(bus, Self::perform_inc),
            0xFE => self.rmw_abs_x(bus, Self::perform_inc),
            0xC6 => self.rmw_zp(bus, Self::perform_dec),
            0xD6 => self.rmw_zp_x(bus, Self::perform_dec),
            0xCE => self.rmw_abs(bus, Self::perform_dec),
            0xDE => self.rmw_abs_x(bus, Self::perform_dec),

            // --- Flag instructions ---
            0x18 => self.implied(|c| c.set_flag(StatusFlag::C, false)),
            0x38 => self.implied(|c| c.set_flag(StatusFlag::C, true)),
            0x58 => self.implied(|c| c.set_flag(StatusFlag::I, false)),
            0x78 => self.implied(|c| c.set_flag(StatusFlag::I, true)),
            0xB8 => self.implied(|c| c.set_flag(StatusFlag::V, false)),
            0xD8 => self.implied(|c| c.set_flag(StatusFlag::D, false)),
            0xF8 => self.implied(|c| c.set_flag(StatusFlag::D, true)),

            // --- Transfers ---
            0xAA => self.implied(|c| {
                c.x = c.a;
                c.set_nz(c.x);
            }),
            0xA8 => self.implied(|c| {
                c.y = c.a;
                c.set_nz(c.y);
            }),
            0x8A => self.implied(|c| {
                c.a = c.x;
                c.set_nz(c.a);
            }),
            0x98 => self.implied(|c| {
                c.a = c.y;
                c.set_nz(c.a);
            }),
            0xBA => self.implied(|c| {
                c.x = c.sp;
                c.set_nz(c.x);
            }),
            // TXS does not set flags.
            0x9A => self.implied(|c| c.sp = c.x),

            // --- Register inc/dec ---
            0xE8 => self.implied(|c| {
                c.x = c.x.wrapping_add(1);
                c.set_nz(c.x);
            }),
            0xC8 => self.implied(|c| {
                c.y = c.y.wrapping_add(1);
                c.set_nz(c.y);
            }),
            0xCA => self.implied(|c| {
                c.x = c.x.wrapping_sub(1);
                c.set_nz(c.x);
            }),
            0x88 => self.implied(|c| {
                c.y = c.y.wrapping_sub(1);
                c.set_nz(c.y);
            }),

            // --- NOP ---
            0xEA => self.implied(|_| {}),

            // --- Branches ---
            0x10 => self.branch(bus, !self.flag(StatusFlag::N)),
            0x30 => self.branch(bus, self.flag(StatusFlag::N)),
            0x50 => self.branch(bus, !self.flag(StatusFlag::V)),
            0x70 => self.branch(bus, self.flag(StatusFlag::V)),
            0x90 => self.branch(bus, !self.flag(StatusFlag::C)),
            0xB0 => self.branch(bus, self.flag(StatusFlag::C)),
            0xD0 => self.branch(bus, !self.flag(StatusFlag::Z)),
            0xF0 => self.branch(bus, self.flag(StatusFlag::Z)),

            // --- Jumps / subroutines / interrupts ---
            0x4C => self.op_jmp_abs(bus),
            0x6C => self.op_jmp_ind(bus),
            0x20 => self.op_jsr(bus),
            0x60 => self.op_rts(bus),
            0x40 => self.op_rti(bus),
            0x00 => self.op_brk(bus),

            // --- Stack ---
            0x48 => self.op_pha(bus),
            0x68 => self.op_pla(bus),
            0x08 => self.op_php(bus),
            0x28 => self.op_plp(bus),

            // --- Illegal opcodes ---
            0x07 => self.rmw_zp(bus, Self::perform_slo),
            0x17 => self.rmw_zp_x(bus, Self::perform_slo),
            0x0F => self.rmw_abs(bus, Self::perform_slo),
            0x1F => self.rmw_abs_x(bus, Self::perform_slo),
            0x1B => self.rmw_abs_y(bus, Self::perform_slo),
            0x03 => self.rmw_ind_x(bus, Self::perform_slo),
            0x13 => self.rmw_ind_y(bus, Self::perform_slo),
            0x27 => self.rmw_zp(bus, Self::perform_rla),
            0x37 => self.rmw_zp_x(bus, Self::perform_rla),
            0x2F => self.rmw_abs(bus, Self::perform_rla),
            0x3F => self.rmw_abs_x(bus, Self::perform_rla),
            0x3B => self.rmw_abs_y(bus, Self::perform_rla),
            0x23 => self.rmw_ind_x(bus, Self::perform_rla),
            0x33 => self.rmw_ind_y(bus, Self::perform_rla),
            0x47 => self.rmw_zp(bus, Self::perform_sre),
            0x57 => self.rmw_zp_x(bus, Self::perform_sre),
            0x4F => self.rmw_abs(bus, Self::perform_sre),
            0x5F => self.rmw_abs_x(bus, Self::perform_sre),
            0x5B => self.rmw_abs_y(bus, Self::perform_sre),
            0x43 => self.rmw_ind_x(bus, Self::perform_sre),
            0x53 => self.rmw_ind_y(bus, Self::perform_sre),
            0x67 => self.rmw_zp(bus, Self::perform_rra),
            0x77 => self.rmw_zp_x(bus, Self::perform_rra),
            0x6F => self.rmw_abs(bus, Self::perform_rra),
            0x7F => self.rmw_abs_x(bus, Self::perform_rra),
            0x7B => self.rmw_abs_y(bus, Self::perform_rra),
            0x63 => self.rmw_ind_x(bus, Self::perform_rra),
            0x73 => self.rmw_ind_y(bus, Self::perform_rra),
            0xC7 => self.rmw_zp(bus, Self::perform_dcp),
            0xD7 => self.rmw_zp_x(bus, Self::perform_dcp),
            0xCF => self.rmw_abs(bus, Self::perform_dcp),
            0xDF => self.rmw_abs_x(bus, Self::perform_dcp),
            0xDB => self.rmw_abs_y(bus, Self::perform_dcp),
            0xC3 => self.rmw_ind_x(bus, Self::perform_dcp),
            0xD3 => self.rmw_ind_y(bus, Self::perform_dcp),
            0xE7 => self.rmw_zp(bus, Self::perform_isc),
            0xF7 => self.rmw_zp_x(bus, Self::perform_isc),
            0xEF => self.rmw_abs(bus, Self::perform_isc),
            0xFF => self.rmw_abs_x(bus, Self::perform_isc),
            0xFB => self.rmw_abs_y(bus, Self::perform_isc),
            0xE3 => self.rmw_ind_x(bus, Self::perform_isc),
            0xF3 => self.rmw_ind_y(bus, Self::perform_isc),

            // LAX: load A and X together.
            0xA7 => self.alu_zp(bus, Self::perform_lax),
            0xB7 => self.alu_zp_y(bus, Self::perform_lax),
            0xAF => self.alu_abs(bus, Self::perform_lax),
            0xBF => self.alu_abs_y(bus, Self::perform_lax),
            0xA3 => self.alu_ind_x(bus, Self::perform_lax),
            0xB3 => self.alu_ind_y(bus, Self::perform_lax),
            0xAB => self.alu_imm(bus, Self::perform_lax),

            // SAX: store A & X (no flags).
            0x87 => self.store_zp(bus, self.a & self.x),
            0x97 => self.store_zp_y(bus, self.a & self.x),
            0x8F => self.store_abs(bus, self.a & self.x),
            0x83 => self.store_ind_x(bus, self.a & self.x),

            // Immediate-mode combinations.
            0x0B | 0x2B => self.alu_imm(bus, Self::perform_anc),
            0x4B => self.alu_imm(bus, Self::perform_alr),
            0x6B => self.alu_imm(bus, Self::perform_arr),
            0xCB => self.alu_imm(bus, Self::perform_axs),

            // Unstable high-byte-AND stores.
            0x9F => self.op_sha_abs_y(bus),
            0x93 => self.op_sha_ind_y(bus),
            0x9E => self.op_shx(bus),
            0x9C => self.op_shy(bus),
            0x9B => self.op_tas(bus),
            0xBB => self.alu_abs_y(bus, Self::perform_las),

            // Multi-byte NOPs.
            0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => self.implied(|_| {}),
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => self.alu_imm(bus, |_, _| {}),
            0x04 | 0x44 | 0x64 => self.alu_zp(bus, |_, _| {}),
            0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => self.alu_zp_x(bus, |_, _| {}),
            0x0C => self.alu_abs(bus, |_, _| {}),
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => self.alu_abs_x(bus, |_, _| {}),

            // KIL/JAM group wedges the processor.
            0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => {
                self.op_kil(opcode)
            }

            // Anything left (the unstable ANE/XAA family) is refused.
            _ => self.op_undefined(opcode),
        }
    }

    /// 2-cycle implied instruction.
    #[inline]
    fn implied(&mut self, operation: impl FnOnce(&mut Self)) -> u32 {
        operation(self);
        2
    }

    #[inline]
    pub(crate) fn fetch8<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    #[inline]
    pub(crate) fn fetch16<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch8(bus) as u16;
        let hi = self.fetch8(bus) as u16;
        hi << 8 | lo
    }

    #[inline]
    pub(crate) fn read16<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        hi << 8 | lo
    }

    /// Undefined opcode: stop the CPU and leave a diagnostic.
    fn op_undefined(&mut self, opcode: u8) -> u32 {
        log::warn!(
            "undefined 6502 opcode 0x{opcode:02X} at 0x{:04X}; stopping",
            self.pc.wrapping_sub(1)
        );
        self.signals.stop();
        2
    }

    /// KIL/JAM: the processor wedges until reset.
    fn op_kil(&mut self, opcode: u8) -> u32 {
        log::warn!(
            "6502 KIL opcode 0x{opcode:02X} at 0x{:04X}; stopping",
            self.pc.wrapping_sub(1)
        );
        self.signals.stop();
        2
    }
}

#[derive(Copy, Clone, Debug)]
enum Interrupt {
    Nmi,
    Irq,
}
