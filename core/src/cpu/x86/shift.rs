use super::{ECX, X86, flags};
use crate::core::Bus;

/// Where a Group 2 shift takes its count from.
#[derive(Copy, Clone, Debug)]
pub(crate) enum ShiftCount {
    One,
    Cl,
    Imm,
}

impl X86 {
    fn shift_count<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, kind: ShiftCount) -> u32 {
        let raw = match kind {
            ShiftCount::One => 1,
            ShiftCount::Cl => self.get_reg8(ECX) as u32,
            ShiftCount::Imm => self.fetch8(bus) as u32,
        };
        raw & 0x1F
    }

    /// Group 2 on rm8 (C0/D0/D2): /0 ROL /1 ROR /2 RCL /3 RCR /4 SHL /5 SHR
    /// /6 SHL /7 SAR.
    pub(crate) fn group2_rm8<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, kind: ShiftCount) -> u32 {
        self.fetch_modrm(bus);
        // Address (and displacement) resolve before an immediate count.
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let count = self.shift_count(bus, kind);
        let value = self.read_rm8(bus);
        let result = self.perform_shift8(self.modrm_reg() as u8, value, count);
        self.write_rm8(bus, result);
        4
    }

    pub(crate) fn group2_rm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, kind: ShiftCount) -> u32 {
        self.fetch_modrm(bus);
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let count = self.shift_count(bus, kind);
        let value = self.read_rm(bus);
        let result = self.perform_shift(self.modrm_reg() as u8, value, count);
        self.write_rm(bus, result);
        4
    }

    pub(crate) fn perform_shift8(&mut self, op: u8, value: u8, count: u32) -> u8 {
        if count == 0 {
            return value;
        }
        match op {
            0 => {
                // ROL
                let n = count % 8;
                let result = value.rotate_left(n);
                self.set_flag(flags::CF, result & 1 != 0);
                if count == 1 {
                    self.set_flag(flags::OF, (result & 1 != 0) != (result & 0x80 != 0));
                }
                result
            }
            1 => {
                // ROR
                let n = count % 8;
                let result = value.rotate_right(n);
                self.set_flag(flags::CF, result & 0x80 != 0);
                if count == 1 {
                    self.set_flag(flags::OF, (result & 0x80 != 0) != (result & 0x40 != 0));
                }
                result
            }
            2 => {
                // RCL: 9-bit rotate through carry.
                let wide = (self.get_flag(flags::CF) as u16) << 8 | value as u16;
                let n = count % 9;
                let rotated = if n == 0 {
                    wide
                } else {
                    (wide << n | wide >> (9 - n)) & 0x1FF
                };
                let result = rotated as u8;
                self.set_flag(flags::CF, rotated & 0x100 != 0);
                if count == 1 {
                    self.set_flag(flags::OF, (rotated & 0x100 != 0) != (result & 0x80 != 0));
                }
                result
            }
            3 => {
                // RCR
                let wide = (self.get_flag(flags::CF) as u16) << 8 | value as u16;
                let n = count % 9;
                let rotated = if n == 0 {
                    wide
                } else {
                    (wide >> n | wide << (9 - n)) & 0x1FF
                };
                let result = rotated as u8;
                self.set_flag(flags::CF, rotated & 0x100 != 0);
                if count == 1 {
                    self.set_flag(flags::OF, (result & 0x80 != 0) != (result & 0x40 != 0));
                }
                result
            }
            5 => {
                // SHR
                let result = if count >= 8 { 0 } else { value >> count };
                self.set_flag(flags::CF, count <= 8 && value >> (count - 1) & 1 != 0);
                if count == 1 {
                    self.set_flag(flags::OF, value & 0x80 != 0);
                }
                self.set_szp8(result);
                self.set_flag(flags::AF, false);
                result
            }
            7 => {
                // SAR
                let result = if count >= 8 {
                    (value as i8 >> 7) as u8
                } else {
                    (value as i8 >> count) as u8
                };
                let carry = if count >= 8 {
                    value & 0x80 != 0
                } else {
                    value >> (count - 1) & 1 != 0
                };
                self.set_flag(flags::CF, carry);
                if count == 1 {
                    self.set_flag(flags::OF, false);
                }
                self.set_szp8(result);
                self.set_flag(flags::AF, false);
                result
            }
            _ => {
                // SHL (/4 and the undocumented /6 alias)
                let result = if count >= 8 { 0 } else { value << count };
                self.set_flag(flags::CF, count <= 8 && value << (count - 1) & 0x80 != 0);
                if count == 1 {
                    self.set_flag(flags::OF, (result & 0x80 != 0) != self.get_flag(flags::CF));
                }
                self.set_szp8(result);
                self.set_flag(flags::AF, false);
                result
            }
        }
    }

    pub(crate) fn perform_shift(&mut self, op: u8, value: u32, count: u32) -> u32 {
        if count == 0 {
            return value;
        }
        let bits = self.op_bits();
        let mask = self.operand_mask();
        let sign = self.sign_mask();
        match op {
            0 => {
                let n = count % bits;
                let result = (value << n | value.checked_shr(bits - n).unwrap_or(0)) & mask;
                self.set_flag(flags::CF, result & 1 != 0);
                if count == 1 {
                    self.set_flag(flags::OF, (result & 1 != 0) != (result & sign != 0));
                }
                result
            }
            1 => {
                let n = count % bits;
                let result = (value.checked_shr(n).unwrap_or(0) | value.checked_shl(bits - n).unwrap_or(0)) & mask;
                self.set_flag(flags::CF, result & sign != 0);
                if count == 1 {
                    self.set_flag(flags::OF, (result & sign != 0) != (result & sign >> 1 != 0));
                }
                result
            }
            2 => {
                // RCL through carry: width+1-bit rotate.
                let wide = (self.get_flag(flags::CF) as u64) << bits | value as u64;
                let width = bits as u64 + 1;
                let n = count as u64 % width;
                let rotated = if n == 0 {
                    wide
                } else {
                    (wide << n | wide >> (width - n)) & ((1u64 << width) - 1)
                };
                let result = (rotated as u32) & mask;
                self.set_flag(flags::CF, rotated >> bits & 1 != 0);
                if count == 1 {
                    self.set_flag(flags::OF, (rotated >> bits & 1 != 0) != (result & sign != 0));
                }
                result
            }
            3 => {
                let wide = (self.get_flag(flags::CF) as u64) << bits | value as u64;
                let width = bits as u64 + 1;
                let n = count as u64 % width;
                let rotated = if n == 0 {
                    wide
                } else {
                    (wide >> n | wide << (width - n)) & ((1u64 << width) - 1)
                };
                let result = (rotated as u32) & mask;
                self.set_flag(flags::CF, rotated >> bits & 1 != 0);
                if count == 1 {
                    self.set_flag(flags::OF, (result & sign != 0) != (result & sign >> 1 != 0));
                }
                result
            }
            5 => {
                let result = value.checked_shr(count).unwrap_or(0) & mask;
                self.set_flag(
                    flags::CF,
                    count <= bits && value.checked_shr(count - 1).unwrap_or(0) & 1 != 0,
                );
                if count == 1 {
                    self.set_flag(flags::OF, value & sign != 0);
                }
                self.set_szp(result);
                self.set_flag(flags::AF, false);
                result
            }
            7 => {
                let extended = if self.operand16 {
                    value as u16 as i16 as i64
                } else {
                    value as i32 as i64
                };
                let result = (extended >> count.min(bits - 1).min(63)) as u32 & mask;
                let carry = extended >> (count - 1).min(63) & 1 != 0;
                self.set_flag(flags::CF, carry);
                if count == 1 {
                    self.set_flag(flags::OF, false);
                }
                self.set_szp(result);
                self.set_flag(flags::AF, false);
                result
            }
            _ => {
                let result = value.checked_shl(count).unwrap_or(0) & mask;
                let carry = count <= bits && value.checked_shl(count - 1).unwrap_or(0) & sign != 0;
                self.set_flag(flags::CF, carry);
                if count == 1 {
                    self.set_flag(flags::OF, (result & sign != 0) != self.get_flag(flags::CF));
                }
                self.set_szp(result);
                self.set_flag(flags::AF, false);
                result
            }
        }
    }

    /// 0F A4/A5: SHLD rm, r, count.
    pub(crate) fn op_shld<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, kind: ShiftCount) -> u32 {
        self.fetch_modrm(bus);
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let count = self.shift_count(bus, kind) % 32;
        if count == 0 {
            return 4;
        }
        let bits = self.op_bits();
        let mask = self.operand_mask();
        let dst = self.read_rm(bus);
        let src = self.get_reg(self.modrm_reg());
        let wide = (dst as u64) << bits | src as u64;
        let result = (wide << count >> bits) as u32 & mask;
        self.set_flag(flags::CF, wide << count >> (2 * bits) & 1 != 0);
        self.set_flag(
            flags::OF,
            count == 1 && (result & self.sign_mask() != 0) != (dst & self.sign_mask() != 0),
        );
        self.set_szp(result);
        self.write_rm(bus, result);
        4
    }

    /// 0F AC/AD: SHRD rm, r, count.
    pub(crate) fn op_shrd<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, kind: ShiftCount) -> u32 {
        self.fetch_modrm(bus);
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let count = self.shift_count(bus, kind) % 32;
        if count == 0 {
            return 4;
        }
        let bits = self.op_bits();
        let mask = self.operand_mask();
        let dst = self.read_rm(bus);
        let src = self.get_reg(self.modrm_reg());
        let wide = (src as u64) << bits | dst as u64;
        let result = (wide >> count) as u32 & mask;
        self.set_flag(flags::CF, wide >> (count - 1) & 1 != 0);
        self.set_flag(
            flags::OF,
            count == 1 && (result & self.sign_mask() != 0) != (dst & self.sign_mask() != 0),
        );
        self.set_szp(result);
        self.write_rm(bus, result);
        4
    }
}
