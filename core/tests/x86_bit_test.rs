use chroma_core::cpu::X86;
use chroma_core::cpu::x86::{EAX, EBX, ECX, flags};
mod common;
use common::TestBus32;

// ============================================================
// BT family
// ============================================================

#[test]
fn bt_register_index_modulo_width() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xA3, 0xD8]); // BT EAX, EBX
    cpu.regs[EAX] = 0x0000_0100;
    cpu.regs[EBX] = 40; // 40 % 32 = 8

    cpu.step(&mut bus);
    assert!(cpu.eflags & flags::CF != 0);
    assert_eq!(cpu.regs[EAX], 0x0000_0100, "BT only tests");
}

#[test]
fn bts_sets_and_reports_old_bit() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xAB, 0xD8]); // BTS EAX, EBX
    cpu.regs[EAX] = 0;
    cpu.regs[EBX] = 5;

    cpu.step(&mut bus);
    assert!(cpu.eflags & flags::CF == 0, "old bit was clear");
    assert_eq!(cpu.regs[EAX], 0x20);
}

#[test]
fn btr_on_memory_shifts_the_offset() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xB3, 0x03]); // BTR [EBX], EAX
    cpu.regs[EBX] = 0x2000;
    cpu.regs[EAX] = 35; // dword 1, bit 3
    bus.load(0x2004, &[0x08, 0, 0, 0]);

    cpu.step(&mut bus);
    assert!(cpu.eflags & flags::CF != 0);
    assert_eq!(bus.memory[0x2004], 0, "bit 3 of the next dword cleared");
}

#[test]
fn btc_with_immediate_index() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xBA, 0xF8, 0x04]); // BTC EAX, 4
    cpu.regs[EAX] = 0x10;

    cpu.step(&mut bus);
    assert!(cpu.eflags & flags::CF != 0);
    assert_eq!(cpu.regs[EAX], 0);
}

// ============================================================
// Bit scans
// ============================================================

#[test]
fn bsf_finds_lowest_bit() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xBC, 0xC3]); // BSF EAX, EBX
    cpu.regs[EBX] = 0x0000_1800;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 11);
    assert!(cpu.eflags & flags::ZF == 0);
}

#[test]
fn bsr_finds_highest_bit() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xBD, 0xC3]); // BSR EAX, EBX
    cpu.regs[EBX] = 0x0000_1800;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 12);
}

#[test]
fn bit_scan_of_zero_sets_zf_and_keeps_dest() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xBC, 0xC3]); // BSF EAX, EBX
    cpu.regs[EAX] = 0x1234;
    cpu.regs[EBX] = 0;

    cpu.step(&mut bus);
    assert!(cpu.eflags & flags::ZF != 0);
    assert_eq!(cpu.regs[EAX], 0x1234, "destination untouched");
}

// ============================================================
// SETcc / Jcc near / double shifts
// ============================================================

#[test]
fn setcc_writes_zero_or_one() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0x94, 0xC1, 0x0F, 0x95, 0xC2]); // SETZ CL; SETNZ DL
    cpu.eflags |= flags::ZF;

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg8(1), 1, "CL: ZF set");
    assert_eq!(cpu.get_reg8(2), 0, "DL: NZ false");
}

#[test]
fn jcc_near_uses_wide_displacement() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0x84, 0x00, 0x10, 0x00, 0x00]); // JZ +0x1000
    cpu.eflags |= flags::ZF;

    cpu.step(&mut bus);
    assert_eq!(cpu.eip, 0x1006);
}

#[test]
fn shld_pulls_bits_from_source() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xA4, 0xD8, 0x08]); // SHLD EAX, EBX, 8
    cpu.regs[EAX] = 0x1234_5678;
    cpu.regs[EBX] = 0xAB00_0000;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0x3456_78AB);
}

#[test]
fn shrd_pulls_bits_from_source() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xAC, 0xD8, 0x08]); // SHRD EAX, EBX, 8
    cpu.regs[EAX] = 0x1234_5678;
    cpu.regs[EBX] = 0x0000_00CD;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0xCD12_3456);
}

#[test]
fn movzx_and_movsx() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xB6, 0xC1, 0x0F, 0xBE, 0xD9]); // MOVZX EAX, CL; MOVSX EBX, CL
    cpu.set_reg8(ECX, 0x80);

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0x0000_0080);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EBX], 0xFFFF_FF80);
}

#[test]
fn imul_r_rm_truncates_with_flags() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x0F, 0xAF, 0xC3]); // IMUL EAX, EBX
    cpu.regs[EAX] = 0x0001_0000;
    cpu.regs[EBX] = 0x0001_0000;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs[EAX], 0, "truncated product");
    assert!(cpu.eflags & flags::OF != 0);
    assert!(cpu.eflags & flags::CF != 0);
}
