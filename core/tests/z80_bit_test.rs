use chroma_core::cpu::Z80;
use chroma_core::cpu::z80::Flag;
mod common;
use common::TestBus;

// ============================================================
// CB rotates and shifts
// ============================================================

#[test]
fn rlc_register() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xCB, 0x00]); // RLC B
    cpu.b = 0x81;
    cpu.f = 0;

    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 8);
    assert_eq!(cpu.b, 0x03);
    assert_ne!(cpu.f & Flag::C as u8, 0);
    assert_ne!(cpu.f & Flag::PV as u8, 0, "parity of 0x03 is even");
}

#[test]
fn srl_memory() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xCB, 0x3E]); // SRL (HL)
    cpu.set_hl(0x4000);
    bus.memory[0x4000] = 0x01;

    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 15);
    assert_eq!(bus.memory[0x4000], 0x00);
    assert_ne!(cpu.f & Flag::C as u8, 0);
    assert_ne!(cpu.f & Flag::Z as u8, 0);
}

#[test]
fn sll_is_the_set_bit_zero_variant() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xCB, 0x30]); // SLL B
    cpu.b = 0x40;

    cpu.step(&mut bus);
    assert_eq!(cpu.b, 0x81, "bit 0 comes in set");
}

#[test]
fn sra_keeps_the_sign() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xCB, 0x28]); // SRA B
    cpu.b = 0x82;

    cpu.step(&mut bus);
    assert_eq!(cpu.b, 0xC1);
}

// ============================================================
// BIT / RES / SET
// ============================================================

#[test]
fn bit_flags() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xCB, 0x78, 0xCB, 0x40]); // BIT 7,B; BIT 0,B
    cpu.b = 0x80;
    cpu.f = 0;

    cpu.step(&mut bus);
    assert_eq!(cpu.f & Flag::Z as u8, 0, "bit set: Z clear");
    assert_ne!(cpu.f & Flag::S as u8, 0, "S reflects a set bit 7");
    assert_ne!(cpu.f & Flag::H as u8, 0);

    cpu.step(&mut bus);
    assert_ne!(cpu.f & Flag::Z as u8, 0, "bit clear: Z set");
    assert_ne!(cpu.f & Flag::PV as u8, 0, "PV mirrors Z");
}

#[test]
fn res_and_set() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xCB, 0xBF, 0xCB, 0xC7]); // RES 7,A; SET 0,A
    cpu.a = 0x80;

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x00);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x01);
}

// ============================================================
// DDCB: displacement before opcode, undocumented register copy
// ============================================================

#[test]
fn ddcb_fetches_displacement_then_opcode() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    // DD CB 05 06: RLC (IX+5). Displacement byte sits at PC+2, the
    // secondary opcode at PC+3.
    bus.load(0, &[0xDD, 0xCB, 0x05, 0x06]);
    cpu.ix = 0x3000;
    bus.memory[0x3005] = 0x81;

    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 23);
    assert_eq!(bus.memory[0x3005], 0x03);
    assert_eq!(cpu.pc, 4);

    // The fetch order is pinned: 0 (DD), 1 (CB), 2 (displacement),
    // 3 (opcode), then the operand read.
    assert_eq!(&bus.reads[..5], &[0, 1, 2, 3, 0x3005]);
}

#[test]
fn ddcb_bit_costs_twenty() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xFD, 0xCB, 0xFE, 0x46]); // BIT 0,(IY-2)
    cpu.iy = 0x3002;
    bus.memory[0x3000] = 0x01;
    cpu.f = 0;

    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 20);
    assert_eq!(cpu.f & Flag::Z as u8, 0);
}

#[test]
fn ddcb_result_copies_into_register() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xDD, 0xCB, 0x00, 0xC0]); // SET 0,(IX+0) -> B
    cpu.ix = 0x3000;
    bus.memory[0x3000] = 0x40;
    cpu.b = 0;

    cpu.step(&mut bus);
    assert_eq!(bus.memory[0x3000], 0x41, "memory updated");
    assert_eq!(cpu.b, 0x41, "undocumented copy into B");
}

#[test]
fn ddcb_slot_six_skips_the_copy() {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xDD, 0xCB, 0x00, 0xC6]); // SET 0,(IX+0)
    cpu.ix = 0x3000;
    bus.memory[0x3000] = 0x40;
    let hl_before = cpu.get_hl();

    cpu.step(&mut bus);
    assert_eq!(bus.memory[0x3000], 0x41);
    assert_eq!(cpu.get_hl(), hl_before, "no register side effect");
}
