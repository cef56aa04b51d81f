use super::{EAX, ECX, EDI, EDX, ESI, RepPrefix, X86, flags};
use crate::core::Bus;

impl X86 {
    // ---- Count/index plumbing (address-size selected) ----

    #[inline]
    fn count(&self) -> u32 {
        if self.address16 {
            self.get_reg16(ECX) as u32
        } else {
            self.regs[ECX]
        }
    }

    #[inline]
    fn dec_count(&mut self) {
        if self.address16 {
            let c = self.get_reg16(ECX).wrapping_sub(1);
            self.set_reg16(ECX, c);
        } else {
            self.regs[ECX] = self.regs[ECX].wrapping_sub(1);
        }
    }

    #[inline]
    fn index(&self, reg: usize) -> u32 {
        if self.address16 {
            self.get_reg16(reg) as u32
        } else {
            self.regs[reg]
        }
    }

    /// Advance SI/DI by the element size, direction per DF.
    #[inline]
    fn advance(&mut self, reg: usize, size: u32) {
        let delta = if self.get_flag(flags::DF) {
            size.wrapping_neg()
        } else {
            size
        };
        if self.address16 {
            let v = self.get_reg16(reg).wrapping_add(delta as u16);
            self.set_reg16(reg, v);
        } else {
            self.regs[reg] = self.regs[reg].wrapping_add(delta);
        }
    }

    #[inline]
    fn operand_bytes(&self) -> u32 {
        if self.operand16 { 2 } else { 4 }
    }

    /// Run a plain string element under an optional REP prefix. Returns the
    /// iteration count performed.
    fn rep_loop<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        mut element: impl FnMut(&mut Self, &mut B),
    ) -> u32 {
        if self.rep == RepPrefix::None {
            element(self, bus);
            return 1;
        }
        let mut iterations = 0;
        while self.count() != 0 {
            element(self, bus);
            self.dec_count();
            iterations += 1;
        }
        iterations
    }

    /// Run a comparing string element (SCAS/CMPS): REPE stops on ZF clear,
    /// REPNE on ZF set.
    fn rep_loop_cc<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        mut element: impl FnMut(&mut Self, &mut B),
    ) -> u32 {
        match self.rep {
            RepPrefix::None => {
                element(self, bus);
                1
            }
            RepPrefix::Rep => {
                let mut iterations = 0;
                while self.count() != 0 {
                    element(self, bus);
                    self.dec_count();
                    iterations += 1;
                    if !self.get_flag(flags::ZF) {
                        break;
                    }
                }
                iterations
            }
            RepPrefix::Repne => {
                let mut iterations = 0;
                while self.count() != 0 {
                    element(self, bus);
                    self.dec_count();
                    iterations += 1;
                    if self.get_flag(flags::ZF) {
                        break;
                    }
                }
                iterations
            }
        }
    }

    // ---- MOVS ----

    pub(crate) fn op_movs8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let n = self.rep_loop(bus, |cpu, bus| {
            let value = cpu.mem_read8(bus, cpu.index(ESI));
            cpu.mem_write8(bus, cpu.index(EDI), value);
            cpu.advance(ESI, 1);
            cpu.advance(EDI, 1);
        });
        4 + 3 * n
    }

    pub(crate) fn op_movs<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let size = self.operand_bytes();
        let n = self.rep_loop(bus, |cpu, bus| {
            let value = cpu.mem_read(bus, cpu.index(ESI));
            cpu.mem_write(bus, cpu.index(EDI), value);
            cpu.advance(ESI, size);
            cpu.advance(EDI, size);
        });
        4 + 3 * n
    }

    // ---- STOS ----

    pub(crate) fn op_stos8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let n = self.rep_loop(bus, |cpu, bus| {
            let value = cpu.get_reg8(EAX);
            cpu.mem_write8(bus, cpu.index(EDI), value);
            cpu.advance(EDI, 1);
        });
        3 + 2 * n
    }

    pub(crate) fn op_stos<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let size = self.operand_bytes();
        let n = self.rep_loop(bus, |cpu, bus| {
            let value = cpu.get_reg(EAX);
            cpu.mem_write(bus, cpu.index(EDI), value);
            cpu.advance(EDI, size);
        });
        3 + 2 * n
    }

    // ---- LODS ----

    pub(crate) fn op_lods8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let n = self.rep_loop(bus, |cpu, bus| {
            let value = cpu.mem_read8(bus, cpu.index(ESI));
            cpu.set_reg8(EAX, value);
            cpu.advance(ESI, 1);
        });
        3 + 2 * n
    }

    pub(crate) fn op_lods<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let size = self.operand_bytes();
        let n = self.rep_loop(bus, |cpu, bus| {
            let value = cpu.mem_read(bus, cpu.index(ESI));
            cpu.set_reg(EAX, value);
            cpu.advance(ESI, size);
        });
        3 + 2 * n
    }

    // ---- SCAS ----

    pub(crate) fn op_scas8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let n = self.rep_loop_cc(bus, |cpu, bus| {
            let value = cpu.mem_read8(bus, cpu.index(EDI));
            let al = cpu.get_reg8(EAX);
            cpu.set_flags_sub8(al, value, 0);
            cpu.advance(EDI, 1);
        });
        4 + 3 * n
    }

    pub(crate) fn op_scas<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let size = self.operand_bytes();
        let n = self.rep_loop_cc(bus, |cpu, bus| {
            let value = cpu.mem_read(bus, cpu.index(EDI));
            let acc = cpu.get_reg(EAX);
            cpu.set_flags_sub(acc, value, 0);
            cpu.advance(EDI, size);
        });
        4 + 3 * n
    }

    // ---- CMPS ----

    pub(crate) fn op_cmps8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let n = self.rep_loop_cc(bus, |cpu, bus| {
            let a = cpu.mem_read8(bus, cpu.index(ESI));
            let b = cpu.mem_read8(bus, cpu.index(EDI));
            cpu.set_flags_sub8(a, b, 0);
            cpu.advance(ESI, 1);
            cpu.advance(EDI, 1);
        });
        4 + 4 * n
    }

    pub(crate) fn op_cmps<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let size = self.operand_bytes();
        let n = self.rep_loop_cc(bus, |cpu, bus| {
            let a = cpu.mem_read(bus, cpu.index(ESI));
            let b = cpu.mem_read(bus, cpu.index(EDI));
            cpu.set_flags_sub(a, b, 0);
            cpu.advance(ESI, size);
            cpu.advance(EDI, size);
        });
        4 + 4 * n
    }

    // ---- INS / OUTS ----

    pub(crate) fn op_ins8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let n = self.rep_loop(bus, |cpu, bus| {
            let port = cpu.get_reg16(EDX);
            let value = bus.io_read(port);
            cpu.mem_write8(bus, cpu.index(EDI), value);
            cpu.advance(EDI, 1);
        });
        5 + 3 * n
    }

    pub(crate) fn op_ins<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let size = self.operand_bytes();
        let n = self.rep_loop(bus, |cpu, bus| {
            let port = cpu.get_reg16(EDX);
            let value = cpu.io_read_wide(bus, port);
            cpu.mem_write(bus, cpu.index(EDI), value);
            cpu.advance(EDI, size);
        });
        5 + 3 * n
    }

    pub(crate) fn op_outs8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let n = self.rep_loop(bus, |cpu, bus| {
            let port = cpu.get_reg16(EDX);
            let value = cpu.mem_read8(bus, cpu.index(ESI));
            bus.io_write(port, value);
            cpu.advance(ESI, 1);
        });
        5 + 3 * n
    }

    pub(crate) fn op_outs<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let size = self.operand_bytes();
        let n = self.rep_loop(bus, |cpu, bus| {
            let port = cpu.get_reg16(EDX);
            let value = cpu.mem_read(bus, cpu.index(ESI));
            cpu.io_write_wide(bus, port, value);
            cpu.advance(ESI, size);
        });
        5 + 3 * n
    }

    // ---- Wide port access: consecutive byte ports, little-endian ----

    pub(crate) fn io_read_wide<B: Bus<Address = u32> + ?Sized>(&self, bus: &mut B, port: u16) -> u32 {
        let mut value = 0u32;
        for byte in 0..self.operand_bytes() {
            value |= (bus.io_read(port.wrapping_add(byte as u16)) as u32) << (8 * byte);
        }
        value
    }

    pub(crate) fn io_write_wide<B: Bus<Address = u32> + ?Sized>(
        &self,
        bus: &mut B,
        port: u16,
        value: u32,
    ) {
        for byte in 0..self.operand_bytes() {
            bus.io_write(port.wrapping_add(byte as u16), (value >> (8 * byte)) as u8);
        }
    }

    /// E5/ED: IN eAX, imm8/DX.
    pub(crate) fn op_in_wide<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        port: Option<u16>,
    ) -> u32 {
        let port = match port {
            Some(p) => p,
            None => self.fetch8(bus) as u16,
        };
        self.op_in_wide_port(bus, port)
    }

    pub(crate) fn op_in_wide_port<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, port: u16) -> u32 {
        let value = self.io_read_wide(bus, port);
        self.set_reg(EAX, value);
        5
    }

    /// E7/EF: OUT imm8/DX, eAX.
    pub(crate) fn op_out_wide<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        port: Option<u16>,
    ) -> u32 {
        let port = match port {
            Some(p) => p,
            None => self.fetch8(bus) as u16,
        };
        self.op_out_wide_port(bus, port)
    }

    pub(crate) fn op_out_wide_port<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, port: u16) -> u32 {
        let value = self.get_reg(EAX);
        self.io_write_wide(bus, port, value);
        5
    }
}
