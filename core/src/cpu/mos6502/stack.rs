use super::{Mos6502, StatusFlag};
use crate::core::Bus;

impl Mos6502 {
    #[inline]
    pub(crate) fn push8<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, data: u8) {
        bus.write(0x0100 | self.sp as u16, data);
        self.sp = self.sp.wrapping_sub(1);
    }

    #[inline]
    pub(crate) fn pull8<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | self.sp as u16)
    }

    /// PHA: 3 cycles.
    pub(crate) fn op_pha<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.push8(bus, self.a);
        3
    }

    /// PLA: 4 cycles. Sets N, Z.
    pub(crate) fn op_pla<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.a = self.pull8(bus);
        self.set_nz(self.a);
        4
    }

    /// PHP: 3 cycles. B and U are set in the pushed copy.
    pub(crate) fn op_php<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let pushed = self.p | StatusFlag::B as u8 | StatusFlag::U as u8;
        self.push8(bus, pushed);
        3
    }

    /// PLP: 4 cycles. B is cleared, U forced set in the live register.
    pub(crate) fn op_plp<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.p = (self.pull8(bus) | StatusFlag::U as u8) & !(StatusFlag::B as u8);
        4
    }
}
