pub mod mos6502;
pub use mos6502::Mos6502;

pub mod z80;
pub use z80::Z80;

pub mod x86;
pub use x86::X86;
