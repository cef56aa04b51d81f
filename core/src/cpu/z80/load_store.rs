use super::Z80;
use crate::core::Bus;

impl Z80 {
    /// LD r,r' block (0x40..=0x7F, minus HALT). When one operand is the
    /// memory slot, the register side uses the plain H/L names even under a
    /// DD/FD prefix; register-to-register forms use IXH/IXL/IYH/IYL.
    pub(crate) fn op_ld_r_r<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, opcode: u8) -> u32 {
        let dst = opcode >> 3 & 7;
        let src = opcode & 7;
        match (dst, src) {
            (6, s) => {
                let (addr, extra) = self.index_addr(bus);
                bus.write(addr, self.get_reg8(s));
                7 + extra
            }
            (d, 6) => {
                let (addr, extra) = self.index_addr(bus);
                let value = bus.read(addr);
                self.set_reg8(d, value);
                7 + extra
            }
            (d, s) => {
                let value = self.get_reg8_ix(s);
                self.set_reg8_ix(d, value);
                4
            }
        }
    }

    /// LD r,n: 7 cycles (IXH/IXL variants under a prefix).
    pub(crate) fn op_ld_r_n<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, reg: u8) -> u32 {
        let value = self.fetch8(bus);
        self.set_reg8_ix(reg, value);
        7
    }

    /// LD (HL),n; 10 cycles; LD (IX+d),n; 19 total (the displacement and
    /// the immediate share the operand fetch window).
    pub(crate) fn op_ld_mem_n<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let (addr, extra) = self.index_addr(bus);
        let value = self.fetch8(bus);
        bus.write(addr, value);
        10 + if extra > 0 { extra - 3 } else { 0 }
    }

    /// LD rp,nn: 10 cycles.
    pub(crate) fn op_ld_rp_nn<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, rp: u8) -> u32 {
        let value = self.fetch16(bus);
        self.set_rp(rp, value);
        10
    }

    /// LD (nn),A: 13 cycles.
    pub(crate) fn op_ld_mem_a<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        bus.write(addr, self.a);
        self.memptr = (self.a as u16) << 8 | addr.wrapping_add(1) & 0xFF;
        13
    }

    /// LD A,(nn): 13 cycles.
    pub(crate) fn op_ld_a_mem<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        self.a = bus.read(addr);
        self.memptr = addr.wrapping_add(1);
        13
    }

    /// LD (nn),HL (or IX/IY): 16 cycles.
    pub(crate) fn op_ld_mem_hl<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        let value = self.get_index_reg();
        self.write16(bus, addr, value);
        self.memptr = addr.wrapping_add(1);
        16
    }

    /// LD HL,(nn) (or IX/IY): 16 cycles.
    pub(crate) fn op_ld_hl_mem<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let addr = self.fetch16(bus);
        let value = self.read16(bus, addr);
        self.set_index_reg(value);
        self.memptr = addr.wrapping_add(1);
        16
    }

    /// ED: LD (nn),rp; 20 cycles.
    pub(crate) fn op_ld_mem_rp<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, rp: u8) -> u32 {
        let addr = self.fetch16(bus);
        let value = self.get_rp(rp);
        self.write16(bus, addr, value);
        self.memptr = addr.wrapping_add(1);
        20
    }

    /// ED: LD rp,(nn); 20 cycles.
    pub(crate) fn op_ld_rp_mem<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B, rp: u8) -> u32 {
        let addr = self.fetch16(bus);
        let value = self.read16(bus, addr);
        self.set_rp(rp, value);
        self.memptr = addr.wrapping_add(1);
        20
    }

    /// EX AF,AF': 4 cycles.
    pub(crate) fn op_ex_af(&mut self) -> u32 {
        std::mem::swap(&mut self.a, &mut self.a_prime);
        std::mem::swap(&mut self.f, &mut self.f_prime);
        4
    }

    /// EXX: swap BC/DE/HL with the shadow set. 4 cycles.
    pub(crate) fn op_exx(&mut self) -> u32 {
        std::mem::swap(&mut self.b, &mut self.b_prime);
        std::mem::swap(&mut self.c, &mut self.c_prime);
        std::mem::swap(&mut self.d, &mut self.d_prime);
        std::mem::swap(&mut self.e, &mut self.e_prime);
        std::mem::swap(&mut self.h, &mut self.h_prime);
        std::mem::swap(&mut self.l, &mut self.l_prime);
        4
    }

    /// EX DE,HL: 4 cycles. Not affected by DD/FD.
    pub(crate) fn op_ex_de_hl(&mut self) -> u32 {
        let de = self.get_de();
        let hl = self.get_hl();
        self.set_de(hl);
        self.set_hl(de);
        4
    }

    /// EX (SP),HL (or IX/IY): 19 cycles.
    pub(crate) fn op_ex_sp<B: Bus<Address = u16> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let from_stack = self.read16(bus, self.sp);
        let reg = self.get_index_reg();
        self.write16(bus, self.sp, reg);
        self.set_index_reg(from_stack);
        self.memptr = from_stack;
        19
    }

    /// LD A,I / LD A,R: S/Z from the value, H/N cleared, PV reflects IFF2.
    pub(crate) fn op_ld_a_ir(&mut self, value: u8) -> u32 {
        use super::Flag;
        self.a = value;
        self.set_flag(Flag::S, value & 0x80 != 0);
        self.set_flag(Flag::Z, value == 0);
        self.set_flag(Flag::H, false);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::PV, self.iff2);
        self.f = (self.f & !(Flag::X as u8 | Flag::Y as u8)) | (value & (Flag::X as u8 | Flag::Y as u8));
        9
    }
}
