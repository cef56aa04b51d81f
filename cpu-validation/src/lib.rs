//! Random-program CPU validation harness.
//!
//! A `TracingBus` records every bus access while a CPU single-steps one
//! instruction from a randomized initial state; the result is a serde
//! test-case (initial state, final state, bus cycle list) that can be
//! written out as JSON vectors by the `gen_*` binaries or re-executed in
//! place to check determinism.

use chroma_core::core::Bus;
use chroma_core::cpu::{Mos6502, Z80};
use rand::Rng;
use serde::{Deserialize, Serialize};

// --- TracingBus: flat 64 KiB memory with access recording ---

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum BusOp {
    Read,
    Write,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusCycle {
    pub addr: u16,
    pub data: u8,
    pub op: BusOp,
}

pub struct TracingBus {
    pub memory: Box<[u8; 0x10000]>,
    pub cycles: Vec<BusCycle>,
}

impl Default for TracingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingBus {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            cycles: Vec::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    pub fn clear_cycles(&mut self) {
        self.cycles.clear();
    }
}

impl Bus for TracingBus {
    type Address = u16;

    fn read(&mut self, addr: u16) -> u8 {
        let data = self.memory[addr as usize];
        self.cycles.push(BusCycle {
            addr,
            data,
            op: BusOp::Read,
        });
        data
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
        self.cycles.push(BusCycle {
            addr,
            data,
            op: BusOp::Write,
        });
    }

    fn io_read(&mut self, port: u16) -> u8 {
        self.memory[port as usize]
    }

    fn io_write(&mut self, port: u16, data: u8) {
        self.memory[port as usize] = data;
    }
}

// --- 6502 test vectors ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct M6502State {
    pub pc: u16,
    pub sp: u8,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub ram: Vec<(u16, u8)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct M6502TestCase {
    pub name: String,
    pub initial: M6502State,
    #[serde(rename = "final")]
    pub final_state: M6502State,
    pub cycles_consumed: u32,
    pub bus: Vec<BusCycle>,
}

/// Apply a state snapshot to a fresh CPU and bus.
pub fn m6502_apply(state: &M6502State, cpu: &mut Mos6502, bus: &mut TracingBus) {
    cpu.pc = state.pc;
    cpu.sp = state.sp;
    cpu.a = state.a;
    cpu.x = state.x;
    cpu.y = state.y;
    cpu.p = state.p;
    for &(addr, value) in &state.ram {
        bus.memory[addr as usize] = value;
    }
}

fn m6502_capture(cpu: &Mos6502, bus: &TracingBus, touched: &[u16]) -> M6502State {
    M6502State {
        pc: cpu.pc,
        sp: cpu.sp,
        a: cpu.a,
        x: cpu.x,
        y: cpu.y,
        p: cpu.p,
        ram: touched
            .iter()
            .map(|&addr| (addr, bus.memory[addr as usize]))
            .collect(),
    }
}

/// Generate one randomized single-instruction case for `opcode`.
pub fn m6502_generate(rng: &mut impl Rng, opcode: u8, index: usize) -> M6502TestCase {
    let mut cpu = Mos6502::new();
    let mut bus = TracingBus::new();

    let pc: u16 = rng.gen_range(0x0200..0xFF00);
    let initial = M6502State {
        pc,
        sp: rng.r#gen(),
        a: rng.r#gen(),
        x: rng.r#gen(),
        y: rng.r#gen(),
        // Keep I set so no stray interrupt state leaks in; D random.
        p: rng.r#gen::<u8>() | 0x24,
        ram: {
            let mut ram: Vec<(u16, u8)> = (0..3)
                .map(|i| (pc + i, if i == 0 { opcode } else { rng.r#gen() }))
                .collect();
            // A spread of zero-page and pointer targets.
            for _ in 0..8 {
                ram.push((rng.gen_range(0x0000..0x0200), rng.r#gen()));
            }
            ram
        },
    };
    m6502_apply(&initial, &mut cpu, &mut bus);
    bus.clear_cycles();

    let cycles_consumed = cpu.step(&mut bus);

    let mut touched: Vec<u16> = initial.ram.iter().map(|&(a, _)| a).collect();
    touched.extend(bus.cycles.iter().map(|c| c.addr));
    touched.sort_unstable();
    touched.dedup();

    M6502TestCase {
        name: format!("{opcode:02x} {index}"),
        final_state: m6502_capture(&cpu, &bus, &touched),
        cycles_consumed,
        bus: bus.cycles.clone(),
        initial,
    }
}

/// Re-execute a case from its initial state; returns the re-captured final
/// state and cycle count for comparison.
pub fn m6502_reexecute(case: &M6502TestCase) -> (M6502State, u32) {
    let mut cpu = Mos6502::new();
    let mut bus = TracingBus::new();
    m6502_apply(&case.initial, &mut cpu, &mut bus);
    let cycles = cpu.step(&mut bus);
    let touched: Vec<u16> = case.final_state.ram.iter().map(|&(a, _)| a).collect();
    (m6502_capture(&cpu, &bus, &touched), cycles)
}

// --- Z80 test vectors ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Z80State {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub ix: u16,
    pub iy: u16,
    pub ram: Vec<(u16, u8)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Z80TestCase {
    pub name: String,
    pub initial: Z80State,
    #[serde(rename = "final")]
    pub final_state: Z80State,
    pub cycles_consumed: u32,
    pub bus: Vec<BusCycle>,
}

pub fn z80_apply(state: &Z80State, cpu: &mut Z80, bus: &mut TracingBus) {
    cpu.pc = state.pc;
    cpu.sp = state.sp;
    cpu.a = state.a;
    cpu.f = state.f;
    cpu.b = state.b;
    cpu.c = state.c;
    cpu.d = state.d;
    cpu.e = state.e;
    cpu.h = state.h;
    cpu.l = state.l;
    cpu.ix = state.ix;
    cpu.iy = state.iy;
    for &(addr, value) in &state.ram {
        bus.memory[addr as usize] = value;
    }
}

fn z80_capture(cpu: &Z80, bus: &TracingBus, touched: &[u16]) -> Z80State {
    Z80State {
        pc: cpu.pc,
        sp: cpu.sp,
        a: cpu.a,
        f: cpu.f,
        b: cpu.b,
        c: cpu.c,
        d: cpu.d,
        e: cpu.e,
        h: cpu.h,
        l: cpu.l,
        ix: cpu.ix,
        iy: cpu.iy,
        ram: touched
            .iter()
            .map(|&addr| (addr, bus.memory[addr as usize]))
            .collect(),
    }
}

pub fn z80_generate(rng: &mut impl Rng, opcode: u8, index: usize) -> Z80TestCase {
    let mut cpu = Z80::new();
    let mut bus = TracingBus::new();

    let pc: u16 = rng.gen_range(0x0200..0xF000);
    let initial = Z80State {
        pc,
        sp: rng.gen_range(0x8000..0xF000),
        a: rng.r#gen(),
        f: rng.r#gen(),
        b: rng.r#gen(),
        c: rng.r#gen(),
        d: rng.r#gen(),
        e: rng.r#gen(),
        h: rng.r#gen(),
        l: rng.r#gen(),
        ix: rng.r#gen(),
        iy: rng.r#gen(),
        ram: (0..4)
            .map(|i| (pc + i, if i == 0 { opcode } else { rng.r#gen() }))
            .collect(),
    };
    z80_apply(&initial, &mut cpu, &mut bus);
    bus.clear_cycles();

    let cycles_consumed = cpu.step(&mut bus);

    let mut touched: Vec<u16> = initial.ram.iter().map(|&(a, _)| a).collect();
    touched.extend(bus.cycles.iter().map(|c| c.addr));
    touched.sort_unstable();
    touched.dedup();

    Z80TestCase {
        name: format!("{opcode:02x} {index}"),
        final_state: z80_capture(&cpu, &bus, &touched),
        cycles_consumed,
        bus: bus.cycles.clone(),
        initial,
    }
}

pub fn z80_reexecute(case: &Z80TestCase) -> (Z80State, u32) {
    let mut cpu = Z80::new();
    let mut bus = TracingBus::new();
    z80_apply(&case.initial, &mut cpu, &mut bus);
    let cycles = cpu.step(&mut bus);
    let touched: Vec<u16> = case.final_state.ram.iter().map(|&(a, _)| a).collect();
    (z80_capture(&cpu, &bus, &touched), cycles)
}

// --- x86 test vectors ---

/// 1 MiB flat bus for x86 cases; ports map onto low memory.
pub struct TracingBus32 {
    pub memory: Vec<u8>,
}

impl Default for TracingBus32 {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingBus32 {
    pub fn new() -> Self {
        Self {
            memory: vec![0; 0x100000],
        }
    }
}

impl Bus for TracingBus32 {
    type Address = u32;

    fn read(&mut self, addr: u32) -> u8 {
        self.memory.get(addr as usize).copied().unwrap_or(0)
    }

    fn write(&mut self, addr: u32, data: u8) {
        if let Some(slot) = self.memory.get_mut(addr as usize) {
            *slot = data;
        }
    }

    fn io_read(&mut self, port: u16) -> u8 {
        self.memory[port as usize]
    }

    fn io_write(&mut self, port: u16, data: u8) {
        self.memory[port as usize] = data;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct X86State {
    pub regs: [u32; 8],
    pub eip: u32,
    pub eflags: u32,
    pub ram: Vec<(u32, u8)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct X86TestCase {
    pub name: String,
    pub initial: X86State,
    #[serde(rename = "final")]
    pub final_state: X86State,
    pub cycles_consumed: u32,
}

pub fn x86_apply(state: &X86State, cpu: &mut X86Cpu, bus: &mut TracingBus32) {
    cpu.regs = state.regs;
    cpu.eip = state.eip;
    cpu.eflags = state.eflags;
    for &(addr, value) in &state.ram {
        bus.memory[addr as usize] = value;
    }
}

fn x86_capture(cpu: &X86Cpu, bus: &TracingBus32, touched: &[u32]) -> X86State {
    X86State {
        regs: cpu.regs,
        eip: cpu.eip,
        eflags: cpu.eflags,
        ram: touched
            .iter()
            .map(|&addr| (addr, bus.memory[addr as usize]))
            .collect(),
    }
}

pub use chroma_core::cpu::X86 as X86Cpu;

/// Generate one randomized case for a single-byte x86 opcode. Registers
/// point into the low megabyte so memory operands stay in range.
pub fn x86_generate(rng: &mut impl Rng, opcode: u8, index: usize) -> X86TestCase {
    let mut cpu = X86Cpu::new();
    let mut bus = TracingBus32::new();

    let eip: u32 = rng.gen_range(0x1000..0x8000);
    let mut regs = [0u32; 8];
    for slot in regs.iter_mut() {
        *slot = rng.gen_range(0x1_0000..0xF_0000);
    }
    let initial = X86State {
        regs,
        eip,
        eflags: (rng.r#gen::<u32>() & 0x08D5) | 0x0002,
        ram: (0..8)
            .map(|i| (eip + i, if i == 0 { opcode } else { rng.r#gen() }))
            .collect(),
    };
    x86_apply(&initial, &mut cpu, &mut bus);

    let cycles_consumed = cpu.step(&mut bus);

    let touched: Vec<u32> = initial.ram.iter().map(|&(a, _)| a).collect();
    X86TestCase {
        name: format!("{opcode:02x} {index}"),
        final_state: x86_capture(&cpu, &bus, &touched),
        cycles_consumed,
        initial,
    }
}

pub fn x86_reexecute(case: &X86TestCase) -> (X86State, u32) {
    let mut cpu = X86Cpu::new();
    let mut bus = TracingBus32::new();
    x86_apply(&case.initial, &mut cpu, &mut bus);
    let cycles = cpu.step(&mut bus);
    let touched: Vec<u32> = case.final_state.ram.iter().map(|&(a, _)| a).collect();
    (x86_capture(&cpu, &bus, &touched), cycles)
}
