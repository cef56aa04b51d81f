use chroma_core::cpu::Mos6502;
use chroma_core::cpu::mos6502::StatusFlag;
mod common;
use common::TestBus;

// ============================================================
// Branch cycle rules: 2 not taken, 3 taken, 4 on page cross
// ============================================================

#[test]
fn branch_not_taken_costs_two() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0xD0, 0x10]); // BNE +16 with Z set
    cpu.pc = 0x0100;
    cpu.p |= StatusFlag::Z as u8;

    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 2);
    assert_eq!(cpu.pc, 0x0102);
}

#[test]
fn branch_taken_same_page_costs_three() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0xD0, 0x10]); // BNE +16 with Z clear
    cpu.pc = 0x0100;

    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 3);
    assert_eq!(cpu.pc, 0x0112);
}

#[test]
fn branch_across_page_costs_four() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0x01F0, &[0xD0, 0x20]); // BNE +32 crossing into 0x02xx
    cpu.pc = 0x01F0;

    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.pc, 0x0212);
}

#[test]
fn backward_branch_works() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0x0200, &[0xF0, 0xFE]); // BEQ -2 (self)
    cpu.pc = 0x0200;
    cpu.p |= StatusFlag::Z as u8;

    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0200, "branch back onto itself");
}

// ============================================================
// Jumps
// ============================================================

#[test]
fn jmp_absolute() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x4C, 0x34, 0x12]);

    let cycles = cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(cycles, 3);
}

#[test]
fn jmp_indirect_page_wrap_bug() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x6C, 0xFF, 0x02]); // JMP ($02FF)
    bus.memory[0x02FF] = 0x34;
    bus.memory[0x0300] = 0x56; // the byte a fixed CPU would read
    bus.memory[0x0200] = 0x12; // the byte the NMOS actually reads

    let cycles = cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x1234, "high byte wraps within the pointer page");
    assert_eq!(cycles, 5);
}

#[test]
fn jsr_rts_round_trip() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0x0300, &[0x20, 0x00, 0x40]); // JSR $4000
    bus.load(0x4000, &[0x60]); // RTS
    cpu.pc = 0x0300;
    let sp_before = cpu.sp;

    let jsr = cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x4000);
    assert_eq!(jsr, 6);

    let rts = cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0303, "returns past the JSR operand");
    assert_eq!(rts, 6);
    assert_eq!(cpu.sp, sp_before);
}

#[test]
fn brk_pushes_and_vectors() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0x0300, &[0x00, 0xFF]); // BRK + padding
    bus.memory[0xFFFE] = 0x00;
    bus.memory[0xFFFF] = 0x50;
    cpu.pc = 0x0300;

    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc, 0x5000);
    assert_ne!(cpu.p & StatusFlag::I as u8, 0);
    assert_eq!(cpu.p & StatusFlag::B as u8, 0, "B stays clear in-register");

    // Stack: PCH, PCL (= 0x0302, past the padding byte), then P with B set.
    assert_eq!(bus.memory[0x01FD], 0x03);
    assert_eq!(bus.memory[0x01FC], 0x02);
    assert_ne!(bus.memory[0x01FB] & StatusFlag::B as u8, 0);
}

#[test]
fn rti_restores_flags_and_pc() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0x0300, &[0x40]); // RTI
    cpu.pc = 0x0300;
    cpu.sp = 0xFA;
    bus.memory[0x01FB] = 0x83; // P: N | C (B/U handling normalized)
    bus.memory[0x01FC] = 0x34;
    bus.memory[0x01FD] = 0x12;

    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x1234);
    assert_ne!(cpu.p & StatusFlag::N as u8, 0);
    assert_ne!(cpu.p & StatusFlag::C as u8, 0);
    assert_ne!(cpu.p & StatusFlag::U as u8, 0, "U reads back set");
    assert_eq!(cpu.sp, 0xFD);
}
