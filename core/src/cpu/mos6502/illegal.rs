//! Illegal-opcode behavior for the NMOS combination instructions.
//!
//! The RMW combinations run as ordinary read-modify-write helpers (two
//! writes); the unstable stores compute `register & (base_high + 1)` and,
//! when the index crosses a page, corrupt the target's high byte with the
//! stored value, matching the behavior pinned by the usual 6502 test
//! suites.

use super::{Mos6502, StatusFlag};
use crate::core::Bus;

impl Mos6502 {
    /// SLO: ASL memory, then ORA the result into A.
    pub(crate) fn perform_slo(&mut self, value: u8) -> u8 {
        let shifted = self.perform_asl(value);
        self.perform_ora(shifted);
        shifted
    }

    /// RLA: ROL memory, then AND the result into A.
    pub(crate) fn perform_rla(&mut self, value: u8) -> u8 {
        let rotated = self.perform_rol(value);
        self.perform_and(rotated);
        rotated
    }

    /// SRE: LSR memory, then EOR the result into A.
    pub(crate) fn perform_sre(&mut self, value: u8) -> u8 {
        let shifted = self.perform_lsr(value);
        self.perform_eor(shifted);
        shifted
    }

    /// RRA: ROR memory, then ADC the result.
    pub(crate) fn perform_rra(&mut self, value: u8) -> u8 {
        let rotated = self.perform_ror(value);
        self.perform_adc(rotated);
        rotated
    }

    /// DCP: DEC memory, then CMP against A.
    pub(crate) fn perform_dcp(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.perform_compare(self.a, result);
        result
    }

    /// ISC: INC memory, then SBC.
    pub(crate) fn perform_isc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.perform_sbc(result);
        result
    }

    /// LAX: load A and X together.
    pub(crate) fn perform_lax(&mut self, value: u8) {
        self.a = value;
        self.x = value;
        self.set_nz(value);
    }

    /// ANC: AND immediate, then copy N into C.
    pub(crate) fn perform_anc(&mut self, value: u8) {
        self.perform_and(value);
        self.set_flag(StatusFlag::C, self.a & 0x80 != 0);
    }

    /// ALR: AND immediate, then LSR the accumulator.
    pub(crate) fn perform_alr(&mut self, value: u8) {
        self.a &= value;
        self.a = self.perform_lsr(self.a);
    }

    /// ARR: AND immediate, ROR the accumulator; C comes from bit 6 and V
    /// from bit 6 XOR bit 5 of the result.
    pub(crate) fn perform_arr(&mut self, value: u8) {
        let and = self.a & value;
        let result = and >> 1 | (self.flag(StatusFlag::C) as u8) << 7;
        self.a = result;
        self.set_nz(result);
        self.set_flag(StatusFlag::C, result & 0x40 != 0);
        self.set_flag(StatusFlag::V, (result >> 6 ^ result >> 5) & 1 != 0);
    }

    /// AXS (SBX): X = (A & X) - immediate, borrow ignored, sets N/Z/C.
    pub(crate) fn perform_axs(&mut self, value: u8) {
        let base = self.a & self.x;
        self.set_flag(StatusFlag::C, base >= value);
        self.x = base.wrapping_sub(value);
        self.set_nz(self.x);
    }

    /// LAS: A = X = SP = memory & SP.
    pub(crate) fn perform_las(&mut self, value: u8) {
        let result = value & self.sp;
        self.a = result;
        self.x = result;
        self.sp = result;
        self.set_nz(result);
    }

    /// Shared body of the unstable high-byte-AND stores. `value` is ANDed
    /// with `base_high + 1`; on a page cross the effective high byte is
    /// replaced by the stored value.
    fn unstable_store<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        base: u16,
        index: u8,
        value: u8,
    ) {
        let target = base.wrapping_add(index as u16);
        let crossed = (base ^ target) & 0xFF00 != 0;
        let data = value & ((base >> 8) as u8).wrapping_add(1);
        let addr = if crossed {
            (data as u16) << 8 | (target & 0x00FF)
        } else {
            target
        };
        bus.write(addr, data);
    }

    /// SHA abs,Y: 5 cycles.
    pub(crate) fn op_sha_abs_y<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let base = self.fetch16(bus);
        self.unstable_store(bus, base, self.y, self.a & self.x);
        5
    }

    /// SHA (zp),Y: 6 cycles.
    pub(crate) fn op_sha_ind_y<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let ptr = self.fetch8(bus);
        let lo = bus.read(ptr as u16) as u16;
        let hi = bus.read(ptr.wrapping_add(1) as u16) as u16;
        let base = hi << 8 | lo;
        self.unstable_store(bus, base, self.y, self.a & self.x);
        6
    }

    /// SHX abs,Y: 5 cycles.
    pub(crate) fn op_shx<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let base = self.fetch16(bus);
        self.unstable_store(bus, base, self.y, self.x);
        5
    }

    /// SHY abs,X: 5 cycles.
    pub(crate) fn op_shy<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let base = self.fetch16(bus);
        self.unstable_store(bus, base, self.x, self.y);
        5
    }

    /// TAS abs,Y: 5 cycles. SP = A & X, then the unstable store.
    pub(crate) fn op_tas<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let base = self.fetch16(bus);
        self.sp = self.a & self.x;
        self.unstable_store(bus, base, self.y, self.a & self.x);
        5
    }
}
