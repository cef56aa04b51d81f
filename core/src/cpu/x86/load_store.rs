use super::X86;
use crate::core::Bus;

impl X86 {
    pub(crate) fn op_mov_rm_r8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = self.get_reg8(self.modrm_reg());
        self.write_rm8(bus, value);
        2
    }

    pub(crate) fn op_mov_rm_r<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = self.get_reg(self.modrm_reg());
        self.write_rm(bus, value);
        2
    }

    pub(crate) fn op_mov_r_rm8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = self.read_rm8(bus);
        self.set_reg8(self.modrm_reg(), value);
        2
    }

    pub(crate) fn op_mov_r_rm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = self.read_rm(bus);
        self.set_reg(self.modrm_reg(), value);
        2
    }

    /// 8C: MOV rm16, Sreg.
    pub(crate) fn op_mov_rm_seg<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = self.segs[self.modrm_reg() % 6] as u32;
        if self.modrm_is_reg() {
            self.set_reg(self.modrm_rm(), value);
        } else {
            let addr = self.rm_addr(bus);
            self.mem_write16(bus, addr, value as u16);
        }
        2
    }

    /// 8E: MOV Sreg, rm16.
    pub(crate) fn op_mov_seg_rm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = if self.modrm_is_reg() {
            self.get_reg16(self.modrm_rm())
        } else {
            let addr = self.rm_addr(bus);
            self.mem_read16(bus, addr)
        };
        self.segs[self.modrm_reg() % 6] = value;
        2
    }

    /// 8D: LEA; the effective address itself, no memory access.
    pub(crate) fn op_lea<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let addr = self.rm_addr(bus);
        self.set_reg(self.modrm_reg(), addr);
        2
    }

    pub(crate) fn op_mov_rm_imm8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        // Resolve the address before the immediate; displacement bytes come
        // first in the stream.
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let value = self.fetch8(bus);
        self.write_rm8(bus, value);
        2
    }

    pub(crate) fn op_mov_rm_imm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let value = self.fetch_imm(bus);
        self.write_rm(bus, value);
        2
    }

    pub(crate) fn op_test_rm_r8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let a = self.read_rm8(bus);
        let b = self.get_reg8(self.modrm_reg());
        self.set_flags_logic8(a & b);
        3
    }

    pub(crate) fn op_test_rm_r<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let a = self.read_rm(bus);
        let b = self.get_reg(self.modrm_reg());
        self.set_flags_logic(a & b);
        3
    }

    pub(crate) fn op_xchg_rm_r8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let reg = self.modrm_reg();
        let mem = self.read_rm8(bus);
        let r = self.get_reg8(reg);
        self.write_rm8(bus, r);
        self.set_reg8(reg, mem);
        4
    }

    pub(crate) fn op_xchg_rm_r<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let reg = self.modrm_reg();
        let mem = self.read_rm(bus);
        let r = self.get_reg(reg);
        self.write_rm(bus, r);
        self.set_reg(reg, mem);
        4
    }

    /// C4/C5: LES/LDS; load the offset into the register and the selector
    /// into the segment register.
    pub(crate) fn op_load_far_ptr<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        seg: usize,
    ) -> u32 {
        self.fetch_modrm(bus);
        let addr = self.rm_addr(bus);
        let offset = self.mem_read(bus, addr);
        let step = if self.operand16 { 2 } else { 4 };
        let selector = self.mem_read16(bus, addr.wrapping_add(step));
        self.set_reg(self.modrm_reg(), offset);
        self.segs[seg] = selector;
        7
    }

    /// 0F B6: MOVZX r, rm8.
    pub(crate) fn op_movzx8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = self.read_rm8(bus) as u32;
        self.set_reg(self.modrm_reg(), value);
        3
    }

    /// 0F B7: MOVZX r32, rm16.
    pub(crate) fn op_movzx16<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = if self.modrm_is_reg() {
            self.get_reg16(self.modrm_rm()) as u32
        } else {
            let addr = self.rm_addr(bus);
            self.mem_read16(bus, addr) as u32
        };
        self.set_reg(self.modrm_reg(), value);
        3
    }

    /// 0F BE: MOVSX r, rm8.
    pub(crate) fn op_movsx8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = self.read_rm8(bus) as i8 as i32 as u32;
        self.set_reg(self.modrm_reg(), value & self.operand_mask());
        3
    }

    /// 0F BF: MOVSX r32, rm16.
    pub(crate) fn op_movsx16<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = if self.modrm_is_reg() {
            self.get_reg16(self.modrm_rm())
        } else {
            let addr = self.rm_addr(bus);
            self.mem_read16(bus, addr)
        };
        self.set_reg(self.modrm_reg(), value as i16 as i32 as u32);
        3
    }
}
