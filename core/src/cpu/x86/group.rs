use super::{ADDR_MASK, CS, EAX, EDX, X86, flags};
use crate::core::Bus;

impl X86 {
    /// Group 1 (80/82): ALU rm8, imm8. The /reg field selects the
    /// operation.
    pub(crate) fn group1_rm8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let a = self.read_rm8(bus);
        let imm = self.fetch8(bus);
        let result = match self.modrm_reg() {
            0 => self.alu_add8(a, imm),
            1 => self.alu_or8(a, imm),
            2 => self.alu_adc8(a, imm),
            3 => self.alu_sbb8(a, imm),
            4 => self.alu_and8(a, imm),
            5 => self.alu_sub8(a, imm),
            6 => self.alu_xor8(a, imm),
            _ => {
                self.set_flags_sub8(a, imm, 0);
                return 3; // CMP writes nothing back
            }
        };
        self.write_rm8(bus, result);
        3
    }

    /// Group 1 (81/83): ALU rm, imm (sign-extended imm8 for 83).
    pub(crate) fn group1_rm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, imm8: bool) -> u32 {
        self.fetch_modrm(bus);
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let a = self.read_rm(bus);
        let imm = if imm8 {
            self.fetch8(bus) as i8 as i32 as u32 & self.operand_mask()
        } else {
            self.fetch_imm(bus)
        };
        let result = match self.modrm_reg() {
            0 => self.alu_add(a, imm),
            1 => self.alu_or(a, imm),
            2 => self.alu_adc(a, imm),
            3 => self.alu_sbb(a, imm),
            4 => self.alu_and(a, imm),
            5 => self.alu_sub(a, imm),
            6 => self.alu_xor(a, imm),
            _ => {
                self.set_flags_sub(a, imm, 0);
                return 3;
            }
        };
        self.write_rm(bus, result);
        3
    }

    /// Group 3 (F6): TEST/NOT/NEG/MUL/IMUL/DIV/IDIV on rm8.
    pub(crate) fn group3_rm8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let value = self.read_rm8(bus);
        match self.modrm_reg() {
            0 | 1 => {
                let imm = self.fetch8(bus);
                self.set_flags_logic8(value & imm);
                3
            }
            2 => {
                self.write_rm8(bus, !value);
                3
            }
            3 => {
                let result = self.set_flags_sub8(0, value, 0);
                self.set_flag(flags::CF, value != 0);
                self.write_rm8(bus, result);
                3
            }
            4 => {
                // MUL: AX = AL * rm8
                let product = self.get_reg8(EAX) as u16 * value as u16;
                self.set_reg16(EAX, product);
                let overflow = product > 0xFF;
                self.set_flag(flags::CF, overflow);
                self.set_flag(flags::OF, overflow);
                11
            }
            5 => {
                // IMUL rm8
                let product = self.get_reg8(EAX) as i8 as i16 * value as i8 as i16;
                self.set_reg16(EAX, product as u16);
                let overflow = product != product as i8 as i16;
                self.set_flag(flags::CF, overflow);
                self.set_flag(flags::OF, overflow);
                11
            }
            6 => {
                // DIV rm8: AL = AX / v, AH = AX % v
                if value == 0 {
                    return self.divide_fault();
                }
                let dividend = self.get_reg16(EAX);
                let quotient = dividend / value as u16;
                if quotient > 0xFF {
                    return self.divide_fault();
                }
                self.set_reg8(EAX, quotient as u8);
                self.set_reg8(EAX + 4, (dividend % value as u16) as u8);
                17
            }
            _ => {
                // IDIV rm8
                if value == 0 {
                    return self.divide_fault();
                }
                let dividend = self.get_reg16(EAX) as i16;
                let divisor = value as i8 as i16;
                let quotient = dividend / divisor;
                if quotient > 127 || quotient < -128 {
                    return self.divide_fault();
                }
                self.set_reg8(EAX, quotient as u8);
                self.set_reg8(EAX + 4, (dividend % divisor) as u8);
                22
            }
        }
    }

    /// Group 3 (F7) on the operand-size form; MUL/DIV work the
    /// eDX:eAX pair.
    pub(crate) fn group3_rm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let value = self.read_rm(bus);
        match self.modrm_reg() {
            0 | 1 => {
                let imm = self.fetch_imm(bus);
                self.set_flags_logic(value & imm);
                3
            }
            2 => {
                self.write_rm(bus, !value & self.operand_mask());
                3
            }
            3 => {
                let result = self.set_flags_sub(0, value, 0);
                self.set_flag(flags::CF, value != 0);
                self.write_rm(bus, result);
                3
            }
            4 => {
                // MUL: eDX:eAX = eAX * rm
                if self.operand16 {
                    let product = self.get_reg16(EAX) as u32 * value;
                    self.set_reg16(EAX, product as u16);
                    self.set_reg16(EDX, (product >> 16) as u16);
                    let overflow = product > 0xFFFF;
                    self.set_flag(flags::CF, overflow);
                    self.set_flag(flags::OF, overflow);
                } else {
                    let product = self.regs[EAX] as u64 * value as u64;
                    self.regs[EAX] = product as u32;
                    self.regs[EDX] = (product >> 32) as u32;
                    let overflow = product > 0xFFFF_FFFF;
                    self.set_flag(flags::CF, overflow);
                    self.set_flag(flags::OF, overflow);
                }
                13
            }
            5 => {
                // IMUL
                if self.operand16 {
                    let product = self.get_reg16(EAX) as i16 as i32 * value as u16 as i16 as i32;
                    self.set_reg16(EAX, product as u16);
                    self.set_reg16(EDX, (product >> 16) as u16);
                    let overflow = product != product as i16 as i32;
                    self.set_flag(flags::CF, overflow);
                    self.set_flag(flags::OF, overflow);
                } else {
                    let product = self.regs[EAX] as i32 as i64 * value as i32 as i64;
                    self.regs[EAX] = product as u32;
                    self.regs[EDX] = (product >> 32) as u32;
                    let overflow = product != product as i32 as i64;
                    self.set_flag(flags::CF, overflow);
                    self.set_flag(flags::OF, overflow);
                }
                13
            }
            6 => {
                // DIV
                if value == 0 {
                    return self.divide_fault();
                }
                if self.operand16 {
                    let dividend = (self.get_reg16(EDX) as u32) << 16 | self.get_reg16(EAX) as u32;
                    let quotient = dividend / value;
                    if quotient > 0xFFFF {
                        return self.divide_fault();
                    }
                    self.set_reg16(EAX, quotient as u16);
                    self.set_reg16(EDX, (dividend % value) as u16);
                } else {
                    let dividend = (self.regs[EDX] as u64) << 32 | self.regs[EAX] as u64;
                    let quotient = dividend / value as u64;
                    if quotient > 0xFFFF_FFFF {
                        return self.divide_fault();
                    }
                    self.regs[EAX] = quotient as u32;
                    self.regs[EDX] = (dividend % value as u64) as u32;
                }
                21
            }
            _ => {
                // IDIV
                if value == 0 {
                    return self.divide_fault();
                }
                if self.operand16 {
                    let dividend =
                        ((self.get_reg16(EDX) as u32) << 16 | self.get_reg16(EAX) as u32) as i32;
                    let divisor = value as u16 as i16 as i32;
                    let quotient = dividend / divisor;
                    if quotient > 0x7FFF || quotient < -0x8000 {
                        return self.divide_fault();
                    }
                    self.set_reg16(EAX, quotient as u16);
                    self.set_reg16(EDX, (dividend % divisor) as u16);
                } else {
                    let dividend = ((self.regs[EDX] as u64) << 32 | self.regs[EAX] as u64) as i64;
                    let divisor = value as i32 as i64;
                    let quotient = dividend / divisor;
                    if quotient > 0x7FFF_FFFF || quotient < -0x8000_0000 {
                        return self.divide_fault();
                    }
                    self.regs[EAX] = quotient as u32;
                    self.regs[EDX] = (dividend % divisor) as u32;
                }
                25
            }
        }
    }

    /// Divide fault policy: matches the undefined-opcode policy and halts.
    fn divide_fault(&mut self) -> u32 {
        log::warn!("x86 divide fault at 0x{:08X}; halting", self.eip);
        self.signals()
            .halted
            .store(true, std::sync::atomic::Ordering::Release);
        2
    }

    /// Group 4 (FE): INC/DEC rm8.
    pub(crate) fn group4_rm8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = self.read_rm8(bus);
        let carry = self.get_flag(flags::CF);
        let result = match self.modrm_reg() {
            0 => self.set_flags_add8(value, 1, 0),
            1 => self.set_flags_sub8(value, 1, 0),
            other => {
                log::warn!("undefined FE /{other} at 0x{:08X}; halting", self.eip);
                self.signals()
                    .halted
                    .store(true, std::sync::atomic::Ordering::Release);
                return 2;
            }
        };
        self.set_flag(flags::CF, carry);
        self.write_rm8(bus, result);
        3
    }

    /// Group 5 (FF): INC/DEC/CALL/JMP/PUSH on rm.
    pub(crate) fn group5_rm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        match self.modrm_reg() {
            0 => {
                let value = self.read_rm(bus);
                let carry = self.get_flag(flags::CF);
                let result = self.set_flags_add(value, 1, 0);
                self.set_flag(flags::CF, carry);
                self.write_rm(bus, result);
                3
            }
            1 => {
                let value = self.read_rm(bus);
                let carry = self.get_flag(flags::CF);
                let result = self.set_flags_sub(value, 1, 0);
                self.set_flag(flags::CF, carry);
                self.write_rm(bus, result);
                3
            }
            2 => {
                // CALL rm
                let target = self.read_rm(bus);
                let return_addr = self.eip;
                self.push(bus, return_addr);
                self.eip = target & ADDR_MASK;
                5
            }
            3 => {
                // CALL far [rm]: offset then selector from memory
                let addr = self.rm_addr(bus);
                let offset = self.mem_read(bus, addr);
                let step = if self.operand16 { 2 } else { 4 };
                let selector = self.mem_read16(bus, addr.wrapping_add(step));
                self.push(bus, self.segs[CS] as u32);
                self.push(bus, self.eip);
                self.segs[CS] = selector;
                self.eip = offset & ADDR_MASK;
                9
            }
            4 => {
                // JMP rm
                let target = self.read_rm(bus);
                self.eip = target & ADDR_MASK;
                4
            }
            5 => {
                // JMP far [rm]
                let addr = self.rm_addr(bus);
                let offset = self.mem_read(bus, addr);
                let step = if self.operand16 { 2 } else { 4 };
                let selector = self.mem_read16(bus, addr.wrapping_add(step));
                self.segs[CS] = selector;
                self.eip = offset & ADDR_MASK;
                6
            }
            6 => {
                let value = self.read_rm(bus);
                self.push(bus, value);
                3
            }
            other => {
                log::warn!("undefined FF /{other} at 0x{:08X}; halting", self.eip);
                self.signals()
                    .halted
                    .store(true, std::sync::atomic::Ordering::Release);
                2
            }
        }
    }
}
