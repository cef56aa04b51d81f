use chroma_core::cpu::Mos6502;
use chroma_core::cpu::mos6502::StatusFlag;
mod common;
use common::TestBus;

fn flag(cpu: &Mos6502, f: StatusFlag) -> bool {
    cpu.p & f as u8 != 0
}

// ============================================================
// Binary ADC/SBC
// ============================================================

#[test]
fn adc_binary_carry_and_overflow() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x69, 0x01, 0x69, 0x7F]); // ADC #$01; ADC #$7F
    cpu.a = 0xFF;

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x00);
    assert!(flag(&cpu, StatusFlag::C), "0xFF + 1 carries");
    assert!(flag(&cpu, StatusFlag::Z));
    assert!(!flag(&cpu, StatusFlag::V));

    // 0x00 + 0x7F + carry = 0x80: signed overflow.
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x80);
    assert!(flag(&cpu, StatusFlag::V));
    assert!(flag(&cpu, StatusFlag::N));
}

#[test]
fn sbc_binary_borrow() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xE9, 0x01]); // SBC #$01
    cpu.a = 0x00;
    cpu.p |= StatusFlag::C as u8;

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0xFF);
    assert!(!flag(&cpu, StatusFlag::C), "borrow clears carry");
    assert!(flag(&cpu, StatusFlag::N));
}

// ============================================================
// Decimal mode
// ============================================================

#[test]
fn adc_bcd_simple_carry_between_digits() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x69, 0x01]); // ADC #$01
    cpu.a = 0x09;
    cpu.p |= StatusFlag::D as u8;

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x10, "BCD: $09 + $01 = $10");
    assert!(!flag(&cpu, StatusFlag::C));
}

#[test]
fn adc_bcd_wraps_with_carry() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x69, 0x01]); // ADC #$01
    cpu.a = 0x99;
    cpu.p |= StatusFlag::D as u8;

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x00, "BCD: $99 + $01 = $00 carry");
    assert!(flag(&cpu, StatusFlag::C));
}

#[test]
fn sbc_bcd_borrows_between_digits() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xE9, 0x01]); // SBC #$01
    cpu.a = 0x10;
    cpu.p |= StatusFlag::D as u8 | StatusFlag::C as u8;

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x09, "BCD: $10 - $01 = $09");
    assert!(flag(&cpu, StatusFlag::C));
}

// ============================================================
// Compare and bit test
// ============================================================

#[test]
fn cmp_sets_carry_on_greater_or_equal() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xC9, 0x40, 0xC9, 0x41]); // CMP #$40; CMP #$41
    cpu.a = 0x40;

    cpu.step(&mut bus);
    assert!(flag(&cpu, StatusFlag::C));
    assert!(flag(&cpu, StatusFlag::Z));

    cpu.step(&mut bus);
    assert!(!flag(&cpu, StatusFlag::C));
    assert!(flag(&cpu, StatusFlag::N));
}

#[test]
fn bit_copies_operand_high_bits() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x24, 0x10]); // BIT $10
    bus.memory[0x10] = 0xC0;
    cpu.a = 0x01;

    cpu.step(&mut bus);
    assert!(flag(&cpu, StatusFlag::N));
    assert!(flag(&cpu, StatusFlag::V));
    assert!(flag(&cpu, StatusFlag::Z), "A & operand == 0");
}

// ============================================================
// Immediate-mode illegal combinations
// ============================================================

#[test]
fn anc_copies_n_into_c() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x0B, 0xFF]); // ANC #$FF
    cpu.a = 0x80;

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x80);
    assert!(flag(&cpu, StatusFlag::C));
    assert!(flag(&cpu, StatusFlag::N));
}

#[test]
fn alr_ands_then_shifts() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x4B, 0x0F]); // ALR #$0F
    cpu.a = 0x0B;

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x05);
    assert!(flag(&cpu, StatusFlag::C), "bit 0 of the AND result");
}

#[test]
fn axs_subtracts_from_a_and_x() {
    let mut cpu = Mos6502::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xCB, 0x02]); // AXS #$02
    cpu.a = 0x0F;
    cpu.x = 0x07;

    cpu.step(&mut bus);
    assert_eq!(cpu.x, 0x05, "(A & X) - imm");
    assert!(flag(&cpu, StatusFlag::C));
}
