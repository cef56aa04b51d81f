use chroma_core::cpu::X86;
use chroma_core::cpu::x86::{EAX, ECX, EDI, EDX, ESI, flags};
mod common;
use common::TestBus32;

#[test]
fn rep_stosb_fills_four_bytes() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF3, 0xAA]); // REP STOSB
    cpu.set_reg8(EAX, 0xFF);
    cpu.regs[EDI] = 0x2000;
    cpu.regs[ECX] = 4;

    cpu.step(&mut bus);
    assert_eq!(&bus.memory[0x2000..0x2004], &[0xFF; 4]);
    assert_eq!(bus.memory[0x2004], 0, "nothing past the count");
    assert_eq!(cpu.regs[ECX], 0);
    assert_eq!(cpu.regs[EDI], 0x2004);
}

#[test]
fn rep_stosb_with_zero_count_writes_nothing() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF3, 0xAA]); // REP STOSB
    cpu.set_reg8(EAX, 0xFF);
    cpu.regs[EDI] = 0x2000;
    cpu.regs[ECX] = 0;

    cpu.step(&mut bus);
    assert_eq!(bus.memory[0x2000], 0);
    assert_eq!(cpu.regs[EDI], 0x2000, "EDI untouched");
    assert_eq!(cpu.eip, 2, "instruction still consumed");
}

#[test]
fn stosd_writes_operand_size() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xAB]); // STOSD
    cpu.regs[EAX] = 0xDEAD_BEEF;
    cpu.regs[EDI] = 0x3000;

    cpu.step(&mut bus);
    assert_eq!(&bus.memory[0x3000..0x3004], &[0xEF, 0xBE, 0xAD, 0xDE]);
    assert_eq!(cpu.regs[EDI], 0x3004);
}

#[test]
fn direction_flag_walks_backward() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xFD, 0xAA]); // STD; STOSB
    cpu.set_reg8(EAX, 0x77);
    cpu.regs[EDI] = 0x2000;

    cpu.step(&mut bus); // STD
    cpu.step(&mut bus); // STOSB
    assert_eq!(bus.memory[0x2000], 0x77);
    assert_eq!(cpu.regs[EDI], 0x1FFF);
}

#[test]
fn rep_movsb_copies_block() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF3, 0xA4]); // REP MOVSB
    bus.load(0x1000, b"chroma");
    cpu.regs[ESI] = 0x1000;
    cpu.regs[EDI] = 0x2000;
    cpu.regs[ECX] = 6;

    cpu.step(&mut bus);
    assert_eq!(&bus.memory[0x2000..0x2006], b"chroma");
    assert_eq!(cpu.regs[ESI], 0x1006);
    assert_eq!(cpu.regs[EDI], 0x2006);
    assert_eq!(cpu.regs[ECX], 0);
}

#[test]
fn repne_scasb_finds_a_byte() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF2, 0xAE]); // REPNE SCASB
    bus.load(0x1000, &[1, 2, 3, 0x42, 5]);
    cpu.set_reg8(EAX, 0x42);
    cpu.regs[EDI] = 0x1000;
    cpu.regs[ECX] = 5;

    cpu.step(&mut bus);
    assert!(cpu.eflags & flags::ZF != 0, "match stops the scan");
    assert_eq!(cpu.regs[EDI], 0x1004, "EDI past the match");
    assert_eq!(cpu.regs[ECX], 1);
}

#[test]
fn repe_cmpsb_stops_on_mismatch() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF3, 0xA6]); // REPE CMPSB
    bus.load(0x1000, b"abcX");
    bus.load(0x2000, b"abcd");
    cpu.regs[ESI] = 0x1000;
    cpu.regs[EDI] = 0x2000;
    cpu.regs[ECX] = 4;

    cpu.step(&mut bus);
    assert!(cpu.eflags & flags::ZF == 0);
    assert_eq!(cpu.regs[ECX], 0, "mismatch on the final element");
    assert_eq!(cpu.regs[ESI], 0x1004);
}

#[test]
fn lodsb_loads_and_advances() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xAC]); // LODSB
    bus.memory[0x1000] = 0x5A;
    cpu.regs[ESI] = 0x1000;

    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg8(EAX), 0x5A);
    assert_eq!(cpu.regs[ESI], 0x1001);
}

#[test]
fn port_io_round_trips() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xE6, 0x42, 0xE4, 0x42]); // OUT $42, AL; IN AL, $42
    cpu.set_reg8(EAX, 0x99);

    cpu.step(&mut bus);
    assert_eq!(bus.ports[0x42], 0x99);
    cpu.set_reg8(EAX, 0);
    cpu.step(&mut bus);
    assert_eq!(cpu.get_reg8(EAX), 0x99);
}

#[test]
fn rep_outsb_streams_to_dx_port() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0xF3, 0x6E]); // REP OUTSB
    bus.load(0x1000, &[1, 2, 3]);
    cpu.regs[ESI] = 0x1000;
    cpu.regs[ECX] = 3;
    cpu.set_reg16(EDX, 0x80);

    cpu.step(&mut bus);
    assert_eq!(bus.ports[0x80], 3, "last byte wins on the same port");
    assert_eq!(cpu.regs[ESI], 0x1003);
    assert_eq!(cpu.regs[ECX], 0);
}

#[test]
fn insb_reads_port_into_memory() {
    let mut cpu = X86::new();
    let mut bus = TestBus32::new();
    bus.load(0, &[0x6C]); // INSB
    bus.ports[0x70] = 0xAB;
    cpu.set_reg16(EDX, 0x70);
    cpu.regs[EDI] = 0x4000;

    cpu.step(&mut bus);
    assert_eq!(bus.memory[0x4000], 0xAB);
    assert_eq!(cpu.regs[EDI], 0x4001);
}
