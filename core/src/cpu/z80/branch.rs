use super::{Flag, Z80};
use crate::core::Bus;

impl Z80 {
    /// Condition decode (0=NZ 1=Z 2=NC 3=C 4=PO 5=PE 6=P 7=M).
    pub(crate) fn condition(&self, index: u8) -> bool {
        match index {
            0 => !self.flag(Flag::Z),
            1 => self.flag(Flag::Z),
            2 => !self.flag(Flag::C),
            3 => self.flag(Flag::C),
            4 => !self.flag(Flag::PV),
            5 => self.flag(Flag::PV),
            6 => !self.flag(Flag::S),
            _ => self.flag(Flag::S),
        }
    }

    /// JP (cc,)nn: 10 cycles whether taken or not.
    pub(crate) fn op_jp<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, taken: bool) -> u32 {
        let target = self.fetch16(bus);
        self.memptr = target;
        if taken {
            self.pc = target;
        }
        10
    }

    /// JR (cc,)d: 12 cycles taken, 7 not.
    pub(crate) fn op_jr<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, taken: bool) -> u32 {
        let offset = self.fetch8(bus) as i8;
        if taken {
            self.pc = self.pc.wrapping_add(offset as u16);
            self.memptr = self.pc;
            12
        } else {
            7
        }
    }

    /// DJNZ d: decrement B, jump while non-zero. 13 taken, 8 not.
    pub(crate) fn op_djnz<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let offset = self.fetch8(bus) as i8;
        self.b = self.b.wrapping_sub(1);
        if self.b != 0 {
            self.pc = self.pc.wrapping_add(offset as u16);
            self.memptr = self.pc;
            13
        } else {
            8
        }
    }

    /// CALL (cc,)nn: 17 taken, 10 not.
    pub(crate) fn op_call<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, taken: bool) -> u32 {
        let target = self.fetch16(bus);
        self.memptr = target;
        if taken {
            self.push16(bus, self.pc);
            self.pc = target;
            17
        } else {
            10
        }
    }

    /// RET: 10 cycles.
    pub(crate) fn op_ret<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.pc = self.pop16(bus);
        self.memptr = self.pc;
        10
    }

    /// RET cc: 11 taken, 5 not.
    pub(crate) fn op_ret_cc<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, taken: bool) -> u32 {
        if taken {
            self.pc = self.pop16(bus);
            self.memptr = self.pc;
            11
        } else {
            5
        }
    }

    /// RST: 11 cycles.
    pub(crate) fn op_rst<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, vector: u16) -> u32 {
        self.push16(bus, self.pc);
        self.pc = vector;
        self.memptr = vector;
        11
    }

    /// ED: RETN/RETI; IFF1 restored from IFF2. 14 cycles.
    pub(crate) fn op_retn<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.iff1 = self.iff2;
        self.pc = self.pop16(bus);
        self.memptr = self.pc;
        14
    }
}
