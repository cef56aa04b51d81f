use super::{EAX, EBX, X86, flags};
use crate::core::Bus;

/// Even-parity lookup for the low result byte.
pub(crate) const PARITY8: [bool; 256] = {
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

impl X86 {
    // ---- Flag setters ----

    #[inline]
    pub(crate) fn set_szp8(&mut self, result: u8) {
        self.set_flag(flags::SF, result & 0x80 != 0);
        self.set_flag(flags::ZF, result == 0);
        self.set_flag(flags::PF, PARITY8[result as usize]);
    }

    #[inline]
    pub(crate) fn set_szp(&mut self, result: u32) {
        self.set_flag(flags::SF, result & self.sign_mask() != 0);
        self.set_flag(flags::ZF, result == 0);
        self.set_flag(flags::PF, PARITY8[result as usize & 0xFF]);
    }

    /// Addition flags (CF/AF/OF plus SF/ZF/PF); returns the result.
    pub(crate) fn set_flags_add8(&mut self, a: u8, b: u8, carry: u8) -> u8 {
        let wide = a as u16 + b as u16 + carry as u16;
        let result = wide as u8;
        self.set_flag(flags::CF, wide > 0xFF);
        self.set_flag(flags::AF, (a & 0x0F) + (b & 0x0F) + carry > 0x0F);
        self.set_flag(flags::OF, (!(a ^ b) & (a ^ result)) & 0x80 != 0);
        self.set_szp8(result);
        result
    }

    /// Subtraction flags; returns the result.
    pub(crate) fn set_flags_sub8(&mut self, a: u8, b: u8, borrow: u8) -> u8 {
        let wide = a as i16 - b as i16 - borrow as i16;
        let result = wide as u8;
        self.set_flag(flags::CF, wide < 0);
        self.set_flag(flags::AF, (a & 0x0F) as i16 - (b & 0x0F) as i16 - (borrow as i16) < 0);
        self.set_flag(flags::OF, ((a ^ b) & (a ^ result)) & 0x80 != 0);
        self.set_szp8(result);
        result
    }

    /// Operand-size addition flags.
    pub(crate) fn set_flags_add(&mut self, a: u32, b: u32, carry: u32) -> u32 {
        let mask = self.operand_mask() as u64;
        let wide = a as u64 + b as u64 + carry as u64;
        let result = (wide & mask) as u32;
        self.set_flag(flags::CF, wide > mask);
        self.set_flag(flags::AF, (a & 0x0F) + (b & 0x0F) + carry > 0x0F);
        let sign = self.sign_mask();
        self.set_flag(flags::OF, (!(a ^ b) & (a ^ result)) & sign != 0);
        self.set_szp(result);
        result
    }

    /// Operand-size subtraction flags.
    pub(crate) fn set_flags_sub(&mut self, a: u32, b: u32, borrow: u32) -> u32 {
        let mask = self.operand_mask() as u64;
        let wide = a as i64 - b as i64 - borrow as i64;
        let result = (wide as u64 & mask) as u32;
        self.set_flag(flags::CF, wide < 0);
        self.set_flag(flags::AF, (a & 0x0F) as i64 - (b & 0x0F) as i64 - (borrow as i64) < 0);
        let sign = self.sign_mask();
        self.set_flag(flags::OF, ((a ^ b) & (a ^ result)) & sign != 0);
        self.set_szp(result);
        result
    }

    /// Logic-group flags: CF and OF cleared.
    #[inline]
    pub(crate) fn set_flags_logic8(&mut self, result: u8) {
        self.set_flag(flags::CF, false);
        self.set_flag(flags::OF, false);
        self.set_flag(flags::AF, false);
        self.set_szp8(result);
    }

    #[inline]
    pub(crate) fn set_flags_logic(&mut self, result: u32) {
        self.set_flag(flags::CF, false);
        self.set_flag(flags::OF, false);
        self.set_flag(flags::AF, false);
        self.set_szp(result);
    }

    // ---- ALU primitives (selected by Group 1 and the rm/r forms) ----

    pub(crate) fn alu_add8(&mut self, a: u8, b: u8) -> u8 {
        self.set_flags_add8(a, b, 0)
    }

    pub(crate) fn alu_adc8(&mut self, a: u8, b: u8) -> u8 {
        let carry = self.get_flag(flags::CF) as u8;
        self.set_flags_add8(a, b, carry)
    }

    pub(crate) fn alu_sub8(&mut self, a: u8, b: u8) -> u8 {
        self.set_flags_sub8(a, b, 0)
    }

    pub(crate) fn alu_sbb8(&mut self, a: u8, b: u8) -> u8 {
        let borrow = self.get_flag(flags::CF) as u8;
        self.set_flags_sub8(a, b, borrow)
    }

    pub(crate) fn alu_and8(&mut self, a: u8, b: u8) -> u8 {
        let result = a & b;
        self.set_flags_logic8(result);
        result
    }

    pub(crate) fn alu_or8(&mut self, a: u8, b: u8) -> u8 {
        let result = a | b;
        self.set_flags_logic8(result);
        result
    }

    pub(crate) fn alu_xor8(&mut self, a: u8, b: u8) -> u8 {
        let result = a ^ b;
        self.set_flags_logic8(result);
        result
    }

    pub(crate) fn alu_add(&mut self, a: u32, b: u32) -> u32 {
        self.set_flags_add(a, b, 0)
    }

    pub(crate) fn alu_adc(&mut self, a: u32, b: u32) -> u32 {
        let carry = self.get_flag(flags::CF) as u32;
        self.set_flags_add(a, b, carry)
    }

    pub(crate) fn alu_sub(&mut self, a: u32, b: u32) -> u32 {
        self.set_flags_sub(a, b, 0)
    }

    pub(crate) fn alu_sbb(&mut self, a: u32, b: u32) -> u32 {
        let borrow = self.get_flag(flags::CF) as u32;
        self.set_flags_sub(a, b, borrow)
    }

    pub(crate) fn alu_and(&mut self, a: u32, b: u32) -> u32 {
        let result = a & b;
        self.set_flags_logic(result);
        result
    }

    pub(crate) fn alu_or(&mut self, a: u32, b: u32) -> u32 {
        let result = a | b;
        self.set_flags_logic(result);
        result
    }

    pub(crate) fn alu_xor(&mut self, a: u32, b: u32) -> u32 {
        let result = a ^ b;
        self.set_flags_logic(result);
        result
    }

    // ---- Encoded operand-form helpers ----

    /// op rm8, r8; 3 cycles (1 extra for memory).
    pub(crate) fn alu_rm_r8<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        op: fn(&mut Self, u8, u8) -> u8,
    ) -> u32 {
        self.fetch_modrm(bus);
        let a = self.read_rm8(bus);
        let b = self.get_reg8(self.modrm_reg());
        let result = op(self, a, b);
        self.write_rm8(bus, result);
        3
    }

    /// op rm, r.
    pub(crate) fn alu_rm_r<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        op: fn(&mut Self, u32, u32) -> u32,
    ) -> u32 {
        self.fetch_modrm(bus);
        let a = self.read_rm(bus);
        let b = self.get_reg(self.modrm_reg());
        let result = op(self, a, b);
        self.write_rm(bus, result);
        3
    }

    /// op r8, rm8.
    pub(crate) fn alu_r_rm8<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        op: fn(&mut Self, u8, u8) -> u8,
    ) -> u32 {
        self.fetch_modrm(bus);
        let b = self.read_rm8(bus);
        let reg = self.modrm_reg();
        let a = self.get_reg8(reg);
        let result = op(self, a, b);
        self.set_reg8(reg, result);
        3
    }

    /// op r, rm.
    pub(crate) fn alu_r_rm<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        op: fn(&mut Self, u32, u32) -> u32,
    ) -> u32 {
        self.fetch_modrm(bus);
        let b = self.read_rm(bus);
        let reg = self.modrm_reg();
        let a = self.get_reg(reg);
        let result = op(self, a, b);
        self.set_reg(reg, result);
        3
    }

    /// op AL, imm8.
    pub(crate) fn alu_acc_imm8<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        op: fn(&mut Self, u8, u8) -> u8,
    ) -> u32 {
        let imm = self.fetch8(bus);
        let a = self.get_reg8(EAX);
        let result = op(self, a, imm);
        self.set_reg8(EAX, result);
        2
    }

    /// op eAX, imm.
    pub(crate) fn alu_acc_imm<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        op: fn(&mut Self, u32, u32) -> u32,
    ) -> u32 {
        let imm = self.fetch_imm(bus);
        let a = self.get_reg(EAX);
        let result = op(self, a, imm);
        self.set_reg(EAX, result);
        2
    }

    // ---- CMP forms (subtract, discard the result) ----

    pub(crate) fn cmp_rm_r8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let a = self.read_rm8(bus);
        let b = self.get_reg8(self.modrm_reg());
        self.set_flags_sub8(a, b, 0);
        3
    }

    pub(crate) fn cmp_rm_r<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let a = self.read_rm(bus);
        let b = self.get_reg(self.modrm_reg());
        self.set_flags_sub(a, b, 0);
        3
    }

    pub(crate) fn cmp_r_rm8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let b = self.read_rm8(bus);
        let a = self.get_reg8(self.modrm_reg());
        self.set_flags_sub8(a, b, 0);
        3
    }

    pub(crate) fn cmp_r_rm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let b = self.read_rm(bus);
        let a = self.get_reg(self.modrm_reg());
        self.set_flags_sub(a, b, 0);
        3
    }

    pub(crate) fn cmp_acc_imm8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let imm = self.fetch8(bus);
        let a = self.get_reg8(EAX);
        self.set_flags_sub8(a, imm, 0);
        2
    }

    pub(crate) fn cmp_acc_imm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let imm = self.fetch_imm(bus);
        let a = self.get_reg(EAX);
        self.set_flags_sub(a, imm, 0);
        2
    }

    // ---- INC/DEC (carry preserved) ----

    pub(crate) fn op_inc_reg(&mut self, reg: usize) -> u32 {
        let carry = self.get_flag(flags::CF);
        let value = self.get_reg(reg);
        let result = self.set_flags_add(value, 1, 0);
        self.set_flag(flags::CF, carry);
        self.set_reg(reg, result);
        2
    }

    pub(crate) fn op_dec_reg(&mut self, reg: usize) -> u32 {
        let carry = self.get_flag(flags::CF);
        let value = self.get_reg(reg);
        let result = self.set_flags_sub(value, 1, 0);
        self.set_flag(flags::CF, carry);
        self.set_reg(reg, result);
        2
    }

    // ---- Decimal and ASCII adjust ----

    /// DAA: packed-BCD adjust after addition.
    pub(crate) fn op_daa(&mut self) -> u32 {
        let mut al = self.get_reg8(EAX);
        let old_al = al;
        let mut carry = self.get_flag(flags::CF);
        if al & 0x0F > 9 || self.get_flag(flags::AF) {
            al = al.wrapping_add(6);
            self.set_flag(flags::AF, true);
        } else {
            self.set_flag(flags::AF, false);
        }
        if old_al > 0x99 || carry {
            al = al.wrapping_add(0x60);
            carry = true;
        }
        self.set_flag(flags::CF, carry);
        self.set_reg8(EAX, al);
        self.set_szp8(al);
        4
    }

    /// DAS: packed-BCD adjust after subtraction.
    pub(crate) fn op_das(&mut self) -> u32 {
        let mut al = self.get_reg8(EAX);
        let old_al = al;
        let mut carry = self.get_flag(flags::CF);
        if al & 0x0F > 9 || self.get_flag(flags::AF) {
            al = al.wrapping_sub(6);
            self.set_flag(flags::AF, true);
        } else {
            self.set_flag(flags::AF, false);
        }
        if old_al > 0x99 || carry {
            al = al.wrapping_sub(0x60);
            carry = true;
        }
        self.set_flag(flags::CF, carry);
        self.set_reg8(EAX, al);
        self.set_szp8(al);
        4
    }

    /// AAA: unpacked-BCD adjust after addition (works on AX).
    pub(crate) fn op_aaa(&mut self) -> u32 {
        let mut ax = self.get_reg16(EAX);
        if ax & 0x0F > 9 || self.get_flag(flags::AF) {
            ax = ax.wrapping_add(0x106);
            self.set_flag(flags::AF, true);
            self.set_flag(flags::CF, true);
        } else {
            self.set_flag(flags::AF, false);
            self.set_flag(flags::CF, false);
        }
        self.set_reg16(EAX, ax & 0xFF0F);
        4
    }

    /// AAS: unpacked-BCD adjust after subtraction.
    pub(crate) fn op_aas(&mut self) -> u32 {
        let mut ax = self.get_reg16(EAX);
        if ax & 0x0F > 9 || self.get_flag(flags::AF) {
            ax = ax.wrapping_sub(6);
            ax = ax.wrapping_sub(0x100);
            self.set_flag(flags::AF, true);
            self.set_flag(flags::CF, true);
        } else {
            self.set_flag(flags::AF, false);
            self.set_flag(flags::CF, false);
        }
        self.set_reg16(EAX, ax & 0xFF0F);
        4
    }

    /// AAM: AH = AL / base, AL = AL % base. Takes the base byte from the
    /// instruction stream (0x0A in the documented encoding).
    pub(crate) fn op_aam<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let base = self.fetch8(bus);
        if base == 0 {
            log::warn!("AAM with zero base at 0x{:08X}; halting", self.eip);
            self.signals_halt();
            return 2;
        }
        let al = self.get_reg8(EAX);
        self.set_reg8(EAX + 4, al / base); // AH
        self.set_reg8(EAX, al % base);
        self.set_szp8(al % base);
        17
    }

    /// AAD: AL = AH * base + AL, AH = 0.
    pub(crate) fn op_aad<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let base = self.fetch8(bus);
        let al = self.get_reg8(EAX);
        let ah = self.get_reg8(EAX + 4);
        let result = ah.wrapping_mul(base).wrapping_add(al);
        self.set_reg8(EAX, result);
        self.set_reg8(EAX + 4, 0);
        self.set_szp8(result);
        14
    }

    // ---- Accumulator widenings ----

    /// CBW/CWDE: sign-extend AL into AX, or AX into EAX.
    pub(crate) fn op_cbw(&mut self) -> u32 {
        if self.operand16 {
            let al = self.get_reg8(EAX) as i8;
            self.set_reg16(EAX, al as i16 as u16);
        } else {
            let ax = self.get_reg16(EAX) as i16;
            self.set_reg32(EAX, ax as i32 as u32);
        }
        2
    }

    /// CWD/CDQ: sign-spread the accumulator into DX/EDX.
    pub(crate) fn op_cwd(&mut self) -> u32 {
        if self.operand16 {
            let sign = if self.get_reg16(EAX) & 0x8000 != 0 { 0xFFFF } else { 0 };
            self.set_reg16(super::EDX, sign);
        } else {
            let sign = if self.regs[EAX] & 0x8000_0000 != 0 { 0xFFFF_FFFF } else { 0 };
            self.set_reg32(super::EDX, sign);
        }
        2
    }

    /// SAHF: AH into the low flag byte.
    pub(crate) fn op_sahf(&mut self) -> u32 {
        let ah = self.get_reg8(EAX + 4) as u32;
        let low = flags::SF | flags::ZF | flags::AF | flags::PF | flags::CF;
        self.eflags = (self.eflags & !low) | (ah & low) | flags::FIXED;
        2
    }

    /// LAHF: low flag byte into AH.
    pub(crate) fn op_lahf(&mut self) -> u32 {
        self.set_reg8(EAX + 4, (self.eflags | flags::FIXED) as u8);
        2
    }

    /// XLAT: AL = [EBX + AL].
    pub(crate) fn op_xlat<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let base = if self.address16 {
            self.get_reg16(EBX) as u32
        } else {
            self.regs[EBX]
        };
        let addr = base.wrapping_add(self.get_reg8(EAX) as u32);
        let value = self.mem_read8(bus, addr);
        self.set_reg8(EAX, value);
        4
    }

    // ---- Signed multiplies ----

    /// 386 IMUL r, rm(, imm): the immediate forms (0x69/0x6B).
    pub(crate) fn op_imul_imm<B: Bus<Address = u32> + ?Sized>(
        &mut self,
        bus: &mut B,
        imm8: bool,
    ) -> u32 {
        self.fetch_modrm(bus);
        let operand = self.read_rm(bus);
        let imm = if imm8 {
            self.fetch8(bus) as i8 as i64
        } else if self.operand16 {
            self.fetch16(bus) as i16 as i64
        } else {
            self.fetch32(bus) as i32 as i64
        };
        let result = self.imul_flags(operand, imm);
        self.set_reg(self.modrm_reg(), result);
        10
    }

    /// 0F AF: IMUL r, rm.
    pub(crate) fn op_imul_r_rm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let operand = self.read_rm(bus);
        let reg = self.modrm_reg();
        let a = self.sign_extend_rm(self.get_reg(reg));
        let b = self.sign_extend_rm(operand);
        let result = self.imul_flags_signed(a, b);
        self.set_reg(reg, result);
        10
    }

    #[inline]
    pub(crate) fn sign_extend_rm(&self, value: u32) -> i64 {
        if self.operand16 {
            value as u16 as i16 as i64
        } else {
            value as i32 as i64
        }
    }

    /// Common flag logic for the truncating IMUL forms: CF/OF set when the
    /// product no longer fits the operand size.
    fn imul_flags(&mut self, operand: u32, imm: i64) -> u32 {
        let a = self.sign_extend_rm(operand);
        self.imul_flags_signed(a, imm)
    }

    fn imul_flags_signed(&mut self, a: i64, b: i64) -> u32 {
        let product = a * b;
        let result = product as u64 as u32 & self.operand_mask();
        let truncated = self.sign_extend_rm(result);
        let overflow = truncated != product;
        self.set_flag(flags::CF, overflow);
        self.set_flag(flags::OF, overflow);
        result
    }

    #[inline]
    fn signals_halt(&self) {
        self.signals()
            .halted
            .store(true, std::sync::atomic::Ordering::Release);
    }
}
