use chroma_core::cpu::X86;
use chroma_core::cpu::x86::{EAX, EBX, ECX, EDX, ESP, flags};
mod common;
use common::TestBus32;

#[test]
fn add_reg_reg_sets_flags() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x01, 0xD8]); // ADD EAX, EBX
    cpu.regs[EAX] = 0x7FFF_FFFF;
    cpu.regs[EBX] = 1;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0x8000_0000);
    assert!(cpu.eflags & flags::OF != 0, "signed overflow");
    assert!(cpu.eflags & flags::SF != 0);
    assert!(cpu.eflags & flags::CF == 0);
}

#[test]
fn sub_borrows_into_carry() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x29, 0xD8]); // SUB EAX, EBX
    cpu.regs[EAX] = 0;
    cpu.regs[EBX] = 1;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0xFFFF_FFFF);
    assert!(cpu.eflags & flags::CF != 0);
    assert!(cpu.eflags & flags::SF != 0);
}

#[test]
fn operand_size_prefix_selects_16_bit() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x66, 0x05, 0x01, 0x00]); // ADD AX, 1
    cpu.regs[EAX] = 0x1234_FFFF;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0x1234_0000, "upper half untouched");
    assert!(cpu.eflags & flags::CF != 0);
    assert!(cpu.eflags & flags::ZF != 0);
}

#[test]
fn inc_preserves_carry() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x40]); // INC EAX
    cpu.regs[EAX] = 0xFFFF_FFFF;
    cpu.eflags |= flags::CF;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0);
    assert!(cpu.eflags & flags::ZF != 0);
    assert!(cpu.eflags & flags::CF != 0, "INC never touches CF");
}

#[test]
fn push_pop_round_trip() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x50, 0x5B]); // PUSH EAX; POP EBX
    cpu.regs[EAX] = 0xCAFE_F00D;
    cpu.regs[ESP] = 0x9000;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[ESP], 0x8FFC);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EBX], 0xCAFE_F00D);
    assert_eq!(cpu.regs[ESP], 0x9000, "ESP restored");
}

#[test]
fn mul_widens_into_edx_eax() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF7, 0xE1]); // MUL ECX
    cpu.regs[EAX] = 0x8000_0000;
    cpu.regs[ECX] = 4;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0);
    assert_eq!(cpu.regs[EDX], 2);
    assert!(cpu.eflags & flags::CF != 0, "high half non-zero");
}

#[test]
fn div_splits_quotient_and_remainder() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF7, 0xF1]); // DIV ECX
    cpu.regs[EDX] = 0;
    cpu.regs[EAX] = 100;
    cpu.regs[ECX] = 7;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 14);
    assert_eq!(cpu.regs[EDX], 2);
}

#[test]
fn div_by_zero_halts() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF7, 0xF1]); // DIV ECX
    cpu.regs[ECX] = 0;

    cpu.step(&mut bus);
    assert!(cpu.halted());
}

#[test]
fn imul_three_operand() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x6B, 0xC3, 0xFE]); // IMUL EAX, EBX, -2
    cpu.regs[EBX] = 3;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], (-6i32) as u32);
    assert!(cpu.eflags & flags::OF == 0);
}

#[test]
fn neg_sets_carry_for_nonzero() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF7, 0xD9]); // NEG ECX
    cpu.regs[ECX] = 5;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[ECX], (-5i32) as u32);
    assert!(cpu.eflags & flags::CF != 0);
}

#[test]
fn daa_adjusts_packed_bcd() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x04, 0x27, 0x27]); // ADD AL,$27; DAA
    cpu.set_reg8(EAX, 0x15);

    cpu.step(&mut bus); // AL = 0x3C
    cpu.step(&mut bus); // DAA -> 0x42
    assert_eq!(cpu.get_reg8(EAX), 0x42);
}

#[test]
fn aam_splits_digits() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xD4, 0x0A]); // AAM
    cpu.set_reg8(EAX, 57);

    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg8(EAX), 7);
    assert_eq!(cpu.get_reg8(EAX + 4), 5, "AH holds the tens digit");
}

#[test]
fn cwd_spreads_the_sign() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x99]); // CDQ
    cpu.regs[EAX] = 0x8000_0000;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EDX], 0xFFFF_FFFF);
}

#[test]
fn shifts_set_carry_from_last_bit_out() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xC1, 0xE0, 0x04, 0xC1, 0xE8, 0x01]); // SHL EAX,4; SHR EAX,1
    cpu.regs[EAX] = 0x1000_0001;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0x0000_0010);
    assert!(cpu.eflags & flags::CF != 0, "bit 28 shifted out last");

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0x0000_0008);
    assert!(cpu.eflags & flags::CF == 0);
}

#[test]
fn undefined_opcode_halts() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF1]); // ICEBP: refused

    cpu.step(&mut bus);
    assert!(cpu.halted());
}

#[test]
fn x87_escape_opcodes_halt() {
    // No coprocessor in this machine model: every ESC opcode is refused.
    for opcode in 0xD8..=0xDFu8 {
        let mut cpu = X86::new();
        let mut bus = TestBus32::new();
        bus.load(0, &[opcode, 0xC0]); // FADD-style encoding, never executed

        cpu.step(&mut bus);
        assert!(cpu.halted(), "opcode {opcode:02x} must halt");
    }
}
