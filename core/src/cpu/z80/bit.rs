use super::{Flag, IndexMode, Z80};
use crate::core::Bus;

const XY: u8 = Flag::X as u8 | Flag::Y as u8;

impl Z80 {
    /// CB prefix: rotates/shifts, BIT, RES, SET on registers and (HL).
    pub(crate) fn dispatch_cb<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let opcode = self.fetch8(bus);
        self.refresh();
        let group = opcode >> 6;
        let bit = opcode >> 3 & 7;
        let reg = opcode & 7;

        if reg == 6 {
            let addr = self.get_hl();
            let value = bus.read(addr);
            match group {
                0 => {
                    let result = self.perform_rot(bit, value);
                    bus.write(addr, result);
                    15
                }
                1 => {
                    self.perform_bit(bit, value);
                    12
                }
                2 => {
                    bus.write(addr, value & !(1 << bit));
                    15
                }
                _ => {
                    bus.write(addr, value | 1 << bit);
                    15
                }
            }
        } else {
            let value = self.get_reg8(reg);
            match group {
                0 => {
                    let result = self.perform_rot(bit, value);
                    self.set_reg8(reg, result);
                }
                1 => self.perform_bit(bit, value),
                2 => self.set_reg8(reg, value & !(1 << bit)),
                _ => self.set_reg8(reg, value | 1 << bit),
            }
            8
        }
    }

    /// DDCB/FDCB: the operand is always memory at IX/IY plus the
    /// displacement fetched ahead of the opcode, and non-BIT results are
    /// also copied into the register named by the low octal digit (slot 6
    /// excepted); the undocumented copy.
    pub(crate) fn dispatch_index_cb<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        displacement: i8,
        opcode: u8,
    ) -> u32 {
        let base = match self.index_mode {
            IndexMode::Ix => self.ix,
            IndexMode::Iy => self.iy,
            IndexMode::Hl => self.get_hl(),
        };
        let addr = base.wrapping_add(displacement as u16);
        self.memptr = addr;
        let group = opcode >> 6;
        let bit = opcode >> 3 & 7;
        let reg = opcode & 7;
        let value = bus.read(addr);

        match group {
            1 => {
                self.perform_bit(bit, value);
                return 20;
            }
            0 => {
                let result = self.perform_rot(bit, value);
                bus.write(addr, result);
                if reg != 6 {
                    self.set_reg8(reg, result);
                }
            }
            2 => {
                let result = value & !(1 << bit);
                bus.write(addr, result);
                if reg != 6 {
                    self.set_reg8(reg, result);
                }
            }
            _ => {
                let result = value | 1 << bit;
                bus.write(addr, result);
                if reg != 6 {
                    self.set_reg8(reg, result);
                }
            }
        }
        23
    }

    /// Rotate/shift selector (0=RLC 1=RRC 2=RL 3=RR 4=SLA 5=SRA 6=SLL
    /// 7=SRL; SLL is the undocumented shift that feeds a 1 into bit 0).
    pub(crate) fn perform_rot(&mut self, kind: u8, value: u8) -> u8 {
        let carry_in = self.flag(Flag::C) as u8;
        let (result, carry) = match kind {
            0 => (value << 1 | value >> 7, value & 0x80 != 0),
            1 => (value >> 1 | value << 7, value & 0x01 != 0),
            2 => (value << 1 | carry_in, value & 0x80 != 0),
            3 => (value >> 1 | carry_in << 7, value & 0x01 != 0),
            4 => (value << 1, value & 0x80 != 0),
            5 => ((value as i8 >> 1) as u8, value & 0x01 != 0),
            6 => (value << 1 | 0x01, value & 0x80 != 0),
            _ => (value >> 1, value & 0x01 != 0),
        };
        self.set_flag(Flag::C, carry);
        self.set_flag(Flag::H, false);
        self.set_flag(Flag::N, false);
        self.set_parity(result);
        self.set_sz_xy(result);
        result
    }

    /// BIT b,v: Z and PV track the complement of the tested bit, S is set
    /// only for a set bit 7, H is set, X/Y copy from the tested operand.
    pub(crate) fn perform_bit(&mut self, bit: u8, value: u8) {
        let tested = value & 1 << bit;
        self.set_flag(Flag::Z, tested == 0);
        self.set_flag(Flag::PV, tested == 0);
        self.set_flag(Flag::S, bit == 7 && tested != 0);
        self.set_flag(Flag::H, true);
        self.set_flag(Flag::N, false);
        self.f = (self.f & !XY) | (value & XY);
    }
}
