use super::{X86, flags};
use crate::core::Bus;

/// BT family variants.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum BitOp {
    Test,
    Set,
    Reset,
    Complement,
}

impl X86 {
    fn apply_bit_op(&mut self, op: BitOp, value: u32, bit: u32) -> Option<u32> {
        let mask = 1u32 << bit;
        self.set_flag(flags::CF, value & mask != 0);
        match op {
            BitOp::Test => None,
            BitOp::Set => Some(value | mask),
            BitOp::Reset => Some(value & !mask),
            BitOp::Complement => Some(value ^ mask),
        }
    }

    /// 0F A3/AB/B3/BB: bit test with a register index. On a memory operand
    /// the index is signed and word-granular: it shifts the effective
    /// address by whole operand-size units before the remaining bits select
    /// within the word.
    pub(crate) fn op_bt_rm_r<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B, op: BitOp) -> u32 {
        self.fetch_modrm(bus);
        let index = self.get_reg(self.modrm_reg());
        let bits = self.op_bits();

        if self.modrm_is_reg() {
            let bit = index % bits;
            let value = self.get_reg(self.modrm_rm());
            if let Some(updated) = self.apply_bit_op(op, value, bit) {
                self.set_reg(self.modrm_rm(), updated);
            }
            3
        } else {
            let base = self.rm_addr(bus);
            let signed = if self.operand16 {
                index as u16 as i16 as i32
            } else {
                index as i32
            };
            let unit = bits as i32;
            let word = signed.div_euclid(unit);
            let bit = signed.rem_euclid(unit) as u32;
            let addr = base.wrapping_add((word * (unit / 8)) as u32);
            let value = self.mem_read(bus, addr);
            if let Some(updated) = self.apply_bit_op(op, value, bit) {
                self.mem_write(bus, addr, updated);
            }
            6
        }
    }

    /// Group 8 (0F BA): the immediate-index forms /4 BT /5 BTS /6 BTR
    /// /7 BTC.
    pub(crate) fn group8_rm<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        if !self.modrm_is_reg() {
            self.rm_addr(bus);
        }
        let op = match self.modrm_reg() {
            4 => BitOp::Test,
            5 => BitOp::Set,
            6 => BitOp::Reset,
            7 => BitOp::Complement,
            other => {
                log::warn!("undefined 0F BA /{other} at 0x{:08X}; halting", self.eip);
                self.signals()
                    .halted
                    .store(true, std::sync::atomic::Ordering::Release);
                return 2;
            }
        };
        let bit = self.fetch8(bus) as u32 % self.op_bits();
        let value = self.read_rm(bus);
        if let Some(updated) = self.apply_bit_op(op, value, bit) {
            self.write_rm(bus, updated);
        }
        4
    }

    /// 0F BC: BSF; lowest set bit. ZF set (and the destination left
    /// alone) when the source is zero.
    pub(crate) fn op_bsf<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = self.read_rm(bus);
        if value == 0 {
            self.set_flag(flags::ZF, true);
        } else {
            self.set_flag(flags::ZF, false);
            self.set_reg(self.modrm_reg(), value.trailing_zeros());
        }
        3
    }

    /// 0F BD: BSR; highest set bit.
    pub(crate) fn op_bsr<B: Bus<Address = u32> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        self.fetch_modrm(bus);
        let value = self.read_rm(bus);
        if value == 0 {
            self.set_flag(flags::ZF, true);
        } else {
            self.set_flag(flags::ZF, false);
            self.set_reg(self.modrm_reg(), 31 - value.leading_zeros());
        }
        3
    }
}
