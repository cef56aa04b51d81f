use super::Mos6502;
use crate::core::Bus;

impl Mos6502 {
    // ---- Store addressing modes ----
    //
    // Stores never take the page-cross shortcut; indexed forms always pay
    // the extra internal cycle.

    /// Store to zero page: 3 cycles.
    #[inline]
    pub(crate) fn store_zp<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, data: u8) -> u32 {
        let addr = self.fetch8(bus) as u16;
        bus.write(addr, data);
        3
    }

    /// Store to zero page,X: 4 cycles.
    #[inline]
    pub(crate) fn store_zp_x<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        data: u8,
    ) -> u32 {
        let addr = self.fetch8(bus).wrapping_add(self.x) as u16;
        bus.write(addr, data);
        4
    }

    /// Store to zero page,Y: 4 cycles.
    #[inline]
    pub(crate) fn store_zp_y<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        data: u8,
    ) -> u32 {
        let addr = self.fetch8(bus).wrapping_add(self.y) as u16;
        bus.write(addr, data);
        4
    }

    /// Store to absolute: 4 cycles.
    #[inline]
    pub(crate) fn store_abs<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, data: u8) -> u32 {
        let addr = self.fetch16(bus);
        bus.write(addr, data);
        4
    }

    /// Store to absolute,X: 5 cycles.
    #[inline]
    pub(crate) fn store_abs_x<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        data: u8,
    ) -> u32 {
        let (addr, _) = self.addr_abs_indexed(bus, self.x);
        bus.write(addr, data);
        5
    }

    /// Store to absolute,Y: 5 cycles.
    #[inline]
    pub(crate) fn store_abs_y<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        data: u8,
    ) -> u32 {
        let (addr, _) = self.addr_abs_indexed(bus, self.y);
        bus.write(addr, data);
        5
    }

    /// Store to (indirect,X): 6 cycles.
    #[inline]
    pub(crate) fn store_ind_x<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        data: u8,
    ) -> u32 {
        let addr = self.addr_ind_x(bus);
        bus.write(addr, data);
        6
    }

    /// Store to (indirect),Y: 6 cycles.
    #[inline]
    pub(crate) fn store_ind_y<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        data: u8,
    ) -> u32 {
        let (addr, _) = self.addr_ind_y(bus);
        bus.write(addr, data);
        6
    }

    // ---- Read-modify-write addressing modes ----
    //
    // RMW performs two writes: the unmodified value first (the hardware's
    // spurious write), then the result.

    #[inline]
    pub(crate) fn rmw_at<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        addr: u16,
        operation: impl FnOnce(&mut Self, u8) -> u8,
    ) {
        let value = bus.read(addr);
        bus.write(addr, value);
        let result = operation(self, value);
        bus.write(addr, result);
    }

    /// RMW zero page: 5 cycles.
    #[inline]
    pub(crate) fn rmw_zp<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        operation: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u32 {
        let addr = self.fetch8(bus) as u16;
        self.rmw_at(bus, addr, operation);
        5
    }

    /// RMW zero page,X: 6 cycles.
    #[inline]
    pub(crate) fn rmw_zp_x<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        operation: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u32 {
        let addr = self.fetch8(bus).wrapping_add(self.x) as u16;
        self.rmw_at(bus, addr, operation);
        6
    }

    /// RMW absolute: 6 cycles.
    #[inline]
    pub(crate) fn rmw_abs<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        operation: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u32 {
        let addr = self.fetch16(bus);
        self.rmw_at(bus, addr, operation);
        6
    }

    /// RMW absolute,X: 7 cycles.
    #[inline]
    pub(crate) fn rmw_abs_x<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        operation: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u32 {
        let (addr, _) = self.addr_abs_indexed(bus, self.x);
        self.rmw_at(bus, addr, operation);
        7
    }

    /// RMW absolute,Y: 7 cycles (illegal opcodes only).
    #[inline]
    pub(crate) fn rmw_abs_y<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        operation: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u32 {
        let (addr, _) = self.addr_abs_indexed(bus, self.y);
        self.rmw_at(bus, addr, operation);
        7
    }

    /// RMW (indirect,X): 8 cycles (illegal opcodes only).
    #[inline]
    pub(crate) fn rmw_ind_x<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        operation: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u32 {
        let addr = self.addr_ind_x(bus);
        self.rmw_at(bus, addr, operation);
        8
    }

    /// RMW (indirect),Y: 8 cycles (illegal opcodes only).
    #[inline]
    pub(crate) fn rmw_ind_y<B: Bus<Address = u16> + ?Sized>(
        &mut self,
        bus: &mut B,
        operation: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u32 {
        let (addr, _) = self.addr_ind_y(bus);
        self.rmw_at(bus, addr, operation);
        8
    }
}
