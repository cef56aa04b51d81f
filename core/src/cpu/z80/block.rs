use super::{Flag, Z80};
use crate::core::Bus;

const XY: u8 = Flag::X as u8 | Flag::Y as u8;

impl Z80 {
    /// LDI/LDD and their repeating forms. Repeats re-execute themselves by
    /// backing PC over the ED pair while BC is non-zero: 21 T-states per
    /// repeated iteration, 16 for the last.
    pub(crate) fn op_ldi_ldd<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        direction: i16,
        repeat: bool,
    ) -> u32 {
        let value = bus.read(self.get_hl());
        bus.write(self.get_de(), value);
        self.set_hl(self.get_hl().wrapping_add(direction as u16));
        self.set_de(self.get_de().wrapping_add(direction as u16));
        let bc = self.get_bc().wrapping_sub(1);
        self.set_bc(bc);

        self.set_flag(Flag::H, false);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::PV, bc != 0);
        // Undocumented: X/Y come from value + A.
        let n = value.wrapping_add(self.a);
        self.f = (self.f & !XY) | (n & Flag::X as u8) | (n << 4 & Flag::Y as u8);

        if repeat && bc != 0 {
            self.pc = self.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }

    /// CPI/CPD and repeats. The repeating forms stop on BC == 0 or a match.
    pub(crate) fn op_cpi_cpd<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        direction: i16,
        repeat: bool,
    ) -> u32 {
        let value = bus.read(self.get_hl());
        self.set_hl(self.get_hl().wrapping_add(direction as u16));
        let bc = self.get_bc().wrapping_sub(1);
        self.set_bc(bc);

        let result = self.a.wrapping_sub(value);
        let half = (self.a & 0x0F) < (value & 0x0F);
        self.set_flag(Flag::S, result & 0x80 != 0);
        self.set_flag(Flag::Z, result == 0);
        self.set_flag(Flag::H, half);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::PV, bc != 0);
        let n = result.wrapping_sub(half as u8);
        self.f = (self.f & !XY) | (n & Flag::X as u8) | (n << 4 & Flag::Y as u8);

        if repeat && bc != 0 && result != 0 {
            self.pc = self.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }

    /// INI/IND and repeats. B is the loop counter and supplies the port's
    /// high byte before decrementing; Z tracks the decremented B, N is set,
    /// the remaining flags are preserved.
    pub(crate) fn op_ini_ind<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        direction: i16,
        repeat: bool,
    ) -> u32 {
        let port = self.get_bc();
        let value = bus.io_read(port);
        bus.write(self.get_hl(), value);
        self.set_hl(self.get_hl().wrapping_add(direction as u16));
        self.b = self.b.wrapping_sub(1);

        self.set_flag(Flag::Z, self.b == 0);
        self.set_flag(Flag::N, true);

        if repeat && self.b != 0 {
            self.pc = self.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }

    /// OUTI/OUTD and repeats. B decrements before supplying the port's high
    /// byte; flag model as for INI.
    pub(crate) fn op_outi_outd<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        direction: i16,
        repeat: bool,
    ) -> u32 {
        let value = bus.read(self.get_hl());
        self.b = self.b.wrapping_sub(1);
        let port = (self.b as u16) << 8 | self.c as u16;
        bus.io_write(port, value);
        self.set_hl(self.get_hl().wrapping_add(direction as u16));

        self.set_flag(Flag::Z, self.b == 0);
        self.set_flag(Flag::N, true);

        if repeat && self.b != 0 {
            self.pc = self.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }
}
