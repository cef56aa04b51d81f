mod alu;
mod bit;
mod block;
mod branch;
mod load_store;
mod stack;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::{Bus, mips::MipsReporter, signals::CpuSignals};

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Undocumented (copy of result bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Undocumented (copy of result bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

/// Pre-computed even-parity bits (bit set = even parity), XOR-folded once at
/// table build instead of per instruction.
pub(crate) const PARITY: [bool; 256] = {
    let mut table = [false; 256];
    let mut v = 0usize;
    while v < 256 {
        let mut bits = v as u8;
        bits ^= bits >> 4;
        bits ^= bits >> 2;
        bits ^= bits >> 1;
        table[v] = bits & 1 == 0;
        v += 1;
    }
    table
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndexMode {
    Hl,
    Ix,
    Iy,
}

const EXECUTE_BATCH: u32 = 4096;

/// Zilog Z80 with the CB/DD/FD/ED/DDCB/FDCB prefix groups, IM 0/1/2, block
/// transfers and block I/O, and the usual undocumented flag behavior.
pub struct Z80 {
    // Registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow registers
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & special registers
    pub ix: u16,
    pub iy: u16,
    pub i: u8,
    pub r: u8,
    pub sp: u16,
    pub pc: u16,

    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    /// Hidden WZ register.
    pub memptr: u16,

    /// Total clock cycles (T-states) consumed since reset.
    pub cycles: u64,

    /// Countdown of fetches until EI takes effect (IFF1/IFF2 go true two
    /// fetches after EI).
    pub(crate) ei_delay: u8,
    pub(crate) index_mode: IndexMode,

    signals: Arc<CpuSignals>,
    nmi_previous: AtomicBool,
    reset_pending: AtomicBool,
    mips: Option<MipsReporter>,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    pub fn new() -> Self {
        Self {
            a: 0xFF,
            f: 0xFF,
            b: 0xFF,
            c: 0xFF,
            d: 0xFF,
            e: 0xFF,
            h: 0xFF,
            l: 0xFF,
            a_prime: 0xFF,
            f_prime: 0xFF,
            b_prime: 0xFF,
            c_prime: 0xFF,
            d_prime: 0xFF,
            e_prime: 0xFF,
            h_prime: 0xFF,
            l_prime: 0xFF,
            ix: 0xFFFF,
            iy: 0xFFFF,
            i: 0,
            r: 0,
            sp: 0xFFFF,
            pc: 0,
            iff1: false,
            iff2: false,
            im: 0,
            memptr: 0,
            cycles: 0,
            ei_delay: 0,
            index_mode: IndexMode::Hl,
            signals: Arc::new(CpuSignals::new()),
            nmi_previous: AtomicBool::new(false),
            reset_pending: AtomicBool::new(false),
            mips: None,
        }
    }

    pub fn signals(&self) -> Arc<CpuSignals> {
        Arc::clone(&self.signals)
    }

    pub fn set_irq_line(&self, level: bool) {
        self.signals.irq_pending.store(level, Ordering::Release);
    }

    pub fn set_nmi_line(&self, level: bool) {
        self.signals.nmi_line.store(level, Ordering::Release);
    }

    /// Latch the byte the interrupting device would place on the data bus
    /// (consumed by IM 0 and IM 2).
    pub fn set_irq_vector(&self, vector: u8) {
        self.signals.irq_vector.store(vector, Ordering::Release);
    }

    pub fn running(&self) -> bool {
        self.signals.is_running()
    }

    pub fn halted(&self) -> bool {
        self.signals.halted.load(Ordering::Acquire)
    }

    pub fn request_reset(&self) {
        self.reset_pending.store(true, Ordering::Release);
    }

    /// Report retired-instruction throughput from `execute()` once a
    /// second through the log facade.
    pub fn enable_mips_reporter(&mut self) {
        self.mips = Some(MipsReporter::new("z80"));
    }

    /// Architectural reset: PC, I, R, interrupt state cleared; other
    /// registers keep their power-on pattern.
    pub fn reset(&mut self) {
        self.pc = 0;
        self.sp = 0xFFFF;
        self.i = 0;
        self.r = 0;
        self.im = 0;
        self.iff1 = false;
        self.iff2 = false;
        self.ei_delay = 0;
        self.memptr = 0;
        self.cycles = 0;
        self.index_mode = IndexMode::Hl;
        self.signals.halted.store(false, Ordering::Release);
        self.signals.irq_pending.store(false, Ordering::Release);
        self.signals.nmi_line.store(false, Ordering::Release);
        self.signals.nmi_pending.store(false, Ordering::Release);
        self.nmi_previous.store(false, Ordering::Release);
        self.reset_pending.store(false, Ordering::Release);
        self.signals.running.store(true, Ordering::Release);
    }

    // ---- 16-bit register pair access ----

    pub fn get_bc(&self) -> u16 {
        (self.b as u16) << 8 | self.c as u16
    }

    pub fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    pub fn get_de(&self) -> u16 {
        (self.d as u16) << 8 | self.e as u16
    }

    pub fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    pub fn get_hl(&self) -> u16 {
        (self.h as u16) << 8 | self.l as u16
    }

    pub fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    pub fn get_af(&self) -> u16 {
        (self.a as u16) << 8 | self.f as u16
    }

    pub fn set_af(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        self.f = val as u8;
    }

    /// HL, IX, or IY depending on the active prefix.
    pub(crate) fn get_index_reg(&self) -> u16 {
        match self.index_mode {
            IndexMode::Hl => self.get_hl(),
            IndexMode::Ix => self.ix,
            IndexMode::Iy => self.iy,
        }
    }

    pub(crate) fn set_index_reg(&mut self, val: u16) {
        match self.index_mode {
            IndexMode::Hl => self.set_hl(val),
            IndexMode::Ix => self.ix = val,
            IndexMode::Iy => self.iy = val,
        }
    }

    /// 8-bit register by decode index 0..7 (6 = memory, handled by callers).
    pub fn get_reg8(&self, index: u8) -> u8 {
        match index {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            7 => self.a,
            _ => unreachable!("get_reg8 called with index {index}"),
        }
    }

    pub fn set_reg8(&mut self, index: u8, val: u8) {
        match index {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            7 => self.a = val,
            _ => unreachable!("set_reg8 called with index {index}"),
        }
    }

    /// Like [`get_reg8`](Self::get_reg8) but indices 4/5 name IXH/IXL (or
    /// IYH/IYL) under a DD/FD prefix.
    pub fn get_reg8_ix(&self, index: u8) -> u8 {
        match (index, self.index_mode) {
            (4, IndexMode::Ix) => (self.ix >> 8) as u8,
            (5, IndexMode::Ix) => self.ix as u8,
            (4, IndexMode::Iy) => (self.iy >> 8) as u8,
            (5, IndexMode::Iy) => self.iy as u8,
            _ => self.get_reg8(index),
        }
    }

    pub fn set_reg8_ix(&mut self, index: u8, val: u8) {
        match (index, self.index_mode) {
            (4, IndexMode::Ix) => self.ix = (self.ix & 0x00FF) | (val as u16) << 8,
            (5, IndexMode::Ix) => self.ix = (self.ix & 0xFF00) | val as u16,
            (4, IndexMode::Iy) => self.iy = (self.iy & 0x00FF) | (val as u16) << 8,
            (5, IndexMode::Iy) => self.iy = (self.iy & 0xFF00) | val as u16,
            _ => self.set_reg8(index, val),
        }
    }

    /// 16-bit pair by decode index (0=BC, 1=DE, 2=HL/IX/IY, 3=SP).
    pub(crate) fn get_rp(&self, index: u8) -> u16 {
        match index {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => self.get_index_reg(),
            3 => self.sp,
            _ => unreachable!("get_rp called with index {index}"),
        }
    }

    pub(crate) fn set_rp(&mut self, index: u8, val: u16) {
        match index {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => self.set_index_reg(val),
            3 => self.sp = val,
            _ => unreachable!("set_rp called with index {index}"),
        }
    }

    /// 16-bit pair for PUSH/POP (0=BC, 1=DE, 2=HL/IX/IY, 3=AF).
    pub(crate) fn get_rp_af(&self, index: u8) -> u16 {
        match index {
            3 => self.get_af(),
            _ => self.get_rp(index),
        }
    }

    pub(crate) fn set_rp_af(&mut self, index: u8, val: u16) {
        match index {
            3 => self.set_af(val),
            _ => self.set_rp(index, val),
        }
    }

    #[inline]
    pub(crate) fn set_flag(&mut self, flag: Flag, set: bool) {
        if set {
            self.f |= flag as u8;
        } else {
            self.f &= !(flag as u8);
        }
    }

    #[inline]
    pub(crate) fn flag(&self, flag: Flag) -> bool {
        self.f & flag as u8 != 0
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

    #[inline]
    pub(crate) fn write16<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, addr: u16, val: u16) {
        bus.write(addr, val as u8);
        bus.write(addr.wrapping_add(1), (val >> 8) as u8);
    }

    /// Increment the refresh register's low 7 bits (one M1 cycle).
    #[inline]
    fn refresh(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }

    /// Effective address of the `(HL)` slot: plain HL, or IX/IY plus a
    /// displacement fetched from the instruction stream. Returns the extra
    /// T-states of the indexed form.
    #[inline]
    pub(crate) fn index_addr<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> (u16, u32) {
        match self.index_mode {
            IndexMode::Hl => (self.get_hl(), 0),
            IndexMode::Ix => {
                let d = self.fetch8(bus) as i8;
                self.memptr = self.ix.wrapping_add(d as u16);
                (self.memptr, 8)
            }
            IndexMode::Iy => {
                let d = self.fetch8(bus) as i8;
                self.memptr = self.iy.wrapping_add(d as u16);
                (self.memptr, 8)
            }
        }
    }

    /// Execute one instruction (or service one interrupt) and return the
    /// T-states consumed.
    pub fn step<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        if self.reset_pending.load(Ordering::Acquire) {
            self.reset();
            return 0;
        }
        if let Some(cycles) = self.poll_interrupts(bus) {
            self.cycles += cycles as u64;
            return cycles;
        }
        if self.halted() {
            // Burn one M1 cycle re-executing HALT.
            self.refresh();
            self.cycles += 4;
            return 4;
        }
        let opcode = self.fetch8(bus);
        self.refresh();
        let cycles = self.dispatch(bus, opcode);
        self.index_mode = IndexMode::Hl;
        if self.ei_delay > 0 {
            self.ei_delay -= 1;
            if self.ei_delay == 0 {
                self.iff1 = true;
                self.iff2 = true;
            }
        }
        self.cycles += cycles as u64;
        cycles
    }

    /// Run until the run flag clears, servicing the pause handshake at every
    /// instruction boundary.
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

    /// NMI edge detection plus IRQ arbitration. Returns the T-states of the
    /// interrupt response when one is accepted.
    fn poll_interrupts<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> Option<u32> {
        let line = self.signals.nmi_line.load(Ordering::Acquire);
        let previous = self.nmi_previous.swap(line, Ordering::AcqRel);
        if line && !previous {
            self.signals.nmi_pending.store(true, Ordering::Release);
        }

        if self.signals.nmi_pending.swap(false, Ordering::AcqRel) {
            self.leave_halt();
            self.iff2 = self.iff1;
            self.iff1 = false;
            self.push16(bus, self.pc);
            self.pc = 0x0066;
            return Some(11);
        }

        if self.ei_delay > 0 {
            return None;
        }
        if self.iff1 && self.signals.irq_pending.load(Ordering::Acquire) {
            self.leave_halt();
            self.iff1 = false;
            self.iff2 = false;
            let vector = self.signals.irq_vector.load(Ordering::Acquire);
            return Some(match self.im {
                // IM 0: execute the byte on the data bus; RST N jumps to its
                // vector, anything else is treated as the IM 1 response.
                0 => {
                    self.push16(bus, self.pc);
                    self.pc = if vector & 0xC7 == 0xC7 {
                        (vector & 0x38) as u16
                    } else {
                        0x0038
                    };
                    13
                }
                2 => {
                    self.push16(bus, self.pc);
                    let table = (self.i as u16) << 8 | (vector & 0xFE) as u16;
                    self.pc = self.read16(bus, table);
                    19
                }
                _ => {
                    self.push16(bus, self.pc);
                    self.pc = 0x0038;
                    13
                }
            });
        }
        None
    }

    #[inline]
    fn leave_halt(&mut self) {
        if self.halted() {
            self.signals.halted.store(false, Ordering::Release);
            // Resume past the HALT opcode.
            self.pc = self.pc.wrapping_add(1);
        }
    }

    /// HALT: mark the halt state and park PC on the opcode so the idle loop
    /// keeps burning M1 cycles until an interrupt releases it.
    fn op_halt(&mut self) -> u32 {
        self.pc = self.pc.wrapping_sub(1);
        self.signals.halted.store(true, Ordering::Release);
        4
    }

    /// Decode and execute one base-table opcode. Runs again with the index
    /// mode switched for DD/FD prefixes, which is also what makes an
    /// unrecognized prefix+opcode pair fall back to the plain instruction
    /// the way the hardware does.
    fn dispatch<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, opcode: u8) -> u32 {
        match opcode {
            0x00 => 4, // NOP
            0x76 => self.op_halt(),

            // LD r,r' / LD r,(HL) / LD (HL),r
            0x40..=0x7F => self.op_ld_r_r(bus, opcode),
            // ADD/ADC/SUB/SBC/AND/XOR/OR/CP A,r
            0x80..=0xBF => self.op_alu_r(bus, opcode),

            // Prefixes
            0xCB => self.dispatch_cb(bus),
            0xED => self.dispatch_ed(bus),
            0xDD => self.dispatch_index(bus, IndexMode::Ix),
            0xFD => self.dispatch_index(bus, IndexMode::Iy),

            // 16-bit loads and arithmetic
            0x01 | 0x11 | 0x21 | 0x31 => self.op_ld_rp_nn(bus, opcode >> 4 & 3),
            0x09 | 0x19 | 0x29 | 0x39 => self.op_add16(opcode >> 4 & 3),
            0x03 | 0x13 | 0x23 | 0x33 => self.op_inc_rp(opcode >> 4 & 3),
            0x0B | 0x1B | 0x2B | 0x3B => self.op_dec_rp(opcode >> 4 & 3),
            0x22 => self.op_ld_mem_hl(bus),
            0x2A => self.op_ld_hl_mem(bus),
            0xF9 => {
                self.sp = self.get_index_reg();
                6
            }

            // Accumulator loads/stores
            0x02 => {
                bus.write(self.get_bc(), self.a);
                7
            }
            0x12 => {
                bus.write(self.get_de(), self.a);
                7
            }
            0x0A => {
                self.a = bus.read(self.get_bc());
                7
            }
            0x1A => {
                self.a = bus.read(self.get_de());
                7
            }
            0x32 => self.op_ld_mem_a(bus),
            0x3A => self.op_ld_a_mem(bus),

            // 8-bit INC/DEC
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => self.op_inc_r(opcode >> 3 & 7),
            0x34 => self.op_inc_mem(bus),
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => self.op_dec_r(opcode >> 3 & 7),
            0x35 => self.op_dec_mem(bus),

            // LD r,n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => self.op_ld_r_n(bus, opcode >> 3 & 7),
            0x36 => self.op_ld_mem_n(bus),

            // Accumulator rotates and flag ops
            0x07 => self.op_rlca(),
            0x0F => self.op_rrca(),
            0x17 => self.op_rla(),
            0x1F => self.op_rra(),
            0x27 => self.op_daa(),
            0x2F => self.op_cpl(),
            0x37 => self.op_scf(),
            0x3F => self.op_ccf(),

            // Relative jumps
            0x10 => self.op_djnz(bus),
            0x18 => self.op_jr(bus, true),
            0x20 => self.op_jr(bus, !self.flag(Flag::Z)),
            0x28 => self.op_jr(bus, self.flag(Flag::Z)),
            0x30 => self.op_jr(bus, !self.flag(Flag::C)),
            0x38 => self.op_jr(bus, self.flag(Flag::C)),

            // Shadow registers
            0x08 => self.op_ex_af(),
            0xD9 => self.op_exx(),

            // Absolute jumps / calls / returns
            0xC3 => self.op_jp(bus, true),
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let taken = self.condition(opcode >> 3 & 7);
                self.op_jp(bus, taken)
            }
            0xE9 => {
                self.pc = self.get_index_reg();
                4
            }
            0xCD => self.op_call(bus, true),
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let taken = self.condition(opcode >> 3 & 7);
                self.op_call(bus, taken)
            }
            0xC9 => self.op_ret(bus),
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                let taken = self.condition(opcode >> 3 & 7);
                self.op_ret_cc(bus, taken)
            }
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.op_rst(bus, (opcode & 0x38) as u16)
            }

            // Stack
            0xC1 | 0xD1 | 0xE1 | 0xF1 => self.op_pop_rp(bus, opcode >> 4 & 3),
            0xC5 | 0xD5 | 0xE5 | 0xF5 => self.op_push_rp(bus, opcode >> 4 & 3),
            0xE3 => self.op_ex_sp(bus),
            0xEB => self.op_ex_de_hl(),

            // ALU with immediate
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let operand = self.fetch8(bus);
                self.alu_op(opcode >> 3 & 7, operand);
                7
            }

            // Port I/O
            0xD3 => self.op_out_n_a(bus),
            0xDB => self.op_in_a_n(bus),

            // Interrupt enables
            0xF3 => {
                self.iff1 = false;
                self.iff2 = false;
                4
            }
            0xFB => {
                self.ei_delay = 2;
                4
            }
        }
    }

    /// DD/FD prefix: switch the index mode and re-dispatch. DDCB/FDCB fetch
    /// the displacement *before* the secondary opcode; that order is
    /// architectural and several consumers depend on it.
    fn dispatch_index<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, mode: IndexMode) -> u32 {
        self.index_mode = mode;
        let next = self.fetch8(bus);
        if next == 0xCB {
            // Displacement first, then the secondary opcode; neither fetch
            // refreshes R.
            self.refresh();
            let displacement = self.fetch8(bus) as i8;
            let sub = self.fetch8(bus);
            return self.dispatch_index_cb(bus, displacement, sub);
        }
        self.refresh();
        let cycles = 4 + match next {
            // A further prefix byte: the last one wins.
            0xDD => {
                self.index_mode = IndexMode::Hl;
                self.dispatch_index(bus, IndexMode::Ix)
            }
            0xFD => {
                self.index_mode = IndexMode::Hl;
                self.dispatch_index(bus, IndexMode::Iy)
            }
            _ => self.dispatch(bus, next),
        };
        cycles
    }

    /// ED-prefixed group. Unassigned entries are two-byte NOPs; a stray
    /// DD/FD in front of ED is dropped, as on hardware.
    fn dispatch_ed<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.index_mode = IndexMode::Hl;
        let opcode = self.fetch8(bus);
        self.refresh();
        match opcode {
            // Block transfer / compare / I/O
            0xA0 => self.op_ldi_ldd(bus, 1, false),
            0xA8 => self.op_ldi_ldd(bus, -1, false),
            0xB0 => self.op_ldi_ldd(bus, 1, true),
            0xB8 => self.op_ldi_ldd(bus, -1, true),
            0xA1 => self.op_cpi_cpd(bus, 1, false),
            0xA9 => self.op_cpi_cpd(bus, -1, false),
            0xB1 => self.op_cpi_cpd(bus, 1, true),
            0xB9 => self.op_cpi_cpd(bus, -1, true),
            0xA2 => self.op_ini_ind(bus, 1, false),
            0xAA => self.op_ini_ind(bus, -1, false),
            0xB2 => self.op_ini_ind(bus, 1, true),
            0xBA => self.op_ini_ind(bus, -1, true),
            0xA3 => self.op_outi_outd(bus, 1, false),
            0xAB => self.op_outi_outd(bus, -1, false),
            0xB3 => self.op_outi_outd(bus, 1, true),
            0xBB => self.op_outi_outd(bus, -1, true),

            // 16-bit loads
            0x43 | 0x53 | 0x63 | 0x73 => self.op_ld_mem_rp(bus, opcode >> 4 & 3),
            0x4B | 0x5B | 0x6B | 0x7B => self.op_ld_rp_mem(bus, opcode >> 4 & 3),

            // 16-bit arithmetic
            0x4A | 0x5A | 0x6A | 0x7A => self.op_adc16(opcode >> 4 & 3),
            0x42 | 0x52 | 0x62 | 0x72 => self.op_sbc16(opcode >> 4 & 3),

            // NEG occupies every x4 column slot.
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => self.op_neg(),

            // RETN/RETI: restore IFF1 from IFF2 and return.
            0x45 | 0x4D | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => self.op_retn(bus),

            // Interrupt modes
            0x46 | 0x4E | 0x66 | 0x6E => {
                self.im = 0;
                8
            }
            0x56 | 0x76 => {
                self.im = 1;
                8
            }
            0x5E | 0x7E => {
                self.im = 2;
                8
            }

            // I and R transfers
            0x47 => {
                self.i = self.a;
                9
            }
            0x4F => {
                self.r = self.a;
                9
            }
            0x57 => self.op_ld_a_ir(self.i),
            0x5F => self.op_ld_a_ir(self.r),

            // Nibble rotates through A and (HL)
            0x67 => self.op_rrd(bus),
            0x6F => self.op_rld(bus),

            // IN r,(C) / OUT (C),r
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                self.op_in_r_c(bus, opcode >> 3 & 7)
            }
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                self.op_out_c_r(bus, opcode >> 3 & 7)
            }

            // Everything else in the ED space is a no-op tick.
            _ => 8,
        }
    }
}
