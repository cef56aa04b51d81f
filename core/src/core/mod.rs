pub mod bus;
pub mod bus6502;
pub mod mips;
pub mod signals;

pub use bus::{Bus, MemoryBus};
pub use bus6502::Bus6502Adapter;
pub use mips::MipsReporter;
pub use signals::CpuSignals;
