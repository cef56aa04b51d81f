use chroma_core::core::bus6502::{
    Bus6502Adapter, EXT_BANK0_REG, EXT_BANK1_REG, IO_BASE, VRAM_BANK_REG, VRAM_BANK_SIZE,
    VRAM_START,
};
use chroma_core::core::{Bus, MemoryBus};
use chroma_core::cpu::Mos6502;

fn adapter() -> Bus6502Adapter {
    Bus6502Adapter::new(MemoryBus::new(0x0200_0000))
}

// ============================================================
// Plain RAM and the fast path
// ============================================================

#[test]
fn low_ram_round_trips() {
    let mut bus = adapter();
    bus.bus_mut().seal();
    bus.write(0x0042, 0xAA);
    assert_eq!(bus.read(0x0042), 0xAA);
    assert_eq!(bus.bus().memory()[0x0042], 0xAA);
}

#[test]
fn fast_path_defers_to_io_regions() {
    let mut inner = MemoryBus::new(0x0200_0000);
    inner.register_region(0x0100, 0x01FF, Box::new(|offset| 0x80 | offset as u8), Box::new(|_, _| {}));
    inner.seal();
    let mut bus = Bus6502Adapter::new(inner);

    assert_eq!(bus.read(0x0142), 0xC2, "region claims the stack page");
    assert_eq!(bus.read(0x0042), 0x00, "page zero still reads RAM");
}

// ============================================================
// Vector and I/O window translation
// ============================================================

#[test]
fn vectors_map_one_to_one() {
    let mut bus = adapter();
    bus.bus_mut().write8(0xFFFC, 0x34);
    bus.bus_mut().write8(0xFFFD, 0x12);
    assert_eq!(bus.read(0xFFFC), 0x34);
    assert_eq!(bus.read(0xFFFD), 0x12);
}

#[test]
fn io_window_translates_into_device_aperture() {
    let mut bus = adapter();
    bus.write(0xF123, 0x5C);
    assert_eq!(bus.bus_mut().read8(IO_BASE + 0x123), 0x5C);
    assert_eq!(bus.read(0xF123), 0x5C);
}

#[test]
fn device_pages_forward_to_aperture() {
    let mut inner = MemoryBus::new(0x0200_0000);
    inner.register_region(
        IO_BASE | 0xD200,
        IO_BASE | 0xD2FF,
        Box::new(|offset| 0xD0 ^ offset as u8),
        Box::new(|_, _| {}),
    );
    inner.seal();
    let mut bus = Bus6502Adapter::new(inner);
    assert_eq!(bus.read(0xD204), 0xD0 ^ 4);
}

// ============================================================
// Extended banks
// ============================================================

#[test]
fn extended_bank_window_translates_after_first_write() {
    let mut bus = adapter();
    // Before any bank write, 0x2000 is plain RAM.
    bus.write(0x2000, 0x11);
    assert_eq!(bus.bus_mut().read8(0x2000), 0x11);

    // Select bank 3 for window 0: 3 * 0x2000 = 0x6000.
    bus.write(EXT_BANK0_REG, 3);
    bus.write(EXT_BANK0_REG + 1, 0);
    bus.write(0x2001, 0x22);
    assert_eq!(bus.bus_mut().read8(0x6001), 0x22);
    assert_eq!(bus.read(0x2001), 0x22);
    assert_eq!(bus.ext_bank(0), 3);
}

#[test]
fn extended_banks_are_independent() {
    let mut bus = adapter();
    bus.write(EXT_BANK1_REG, 0x10); // window 1 -> bank 0x10 at 0x20000
    bus.write(0x4000, 0x77);
    assert_eq!(bus.bus_mut().read8(0x10 * 0x2000), 0x77);

    // Window 0 and 2 still translate directly.
    bus.write(0x2000, 0x33);
    assert_eq!(bus.bus_mut().read8(0x2000), 0x33);
    bus.write(0x6000, 0x44);
    assert_eq!(bus.bus_mut().read8(0x6000), 0x44);
}

#[test]
fn bank_registers_read_back() {
    let mut bus = adapter();
    bus.write(EXT_BANK0_REG, 0xCD);
    bus.write(EXT_BANK0_REG + 1, 0xAB);
    assert_eq!(bus.read(EXT_BANK0_REG), 0xCD);
    assert_eq!(bus.read(EXT_BANK0_REG + 1), 0xAB);
    assert_eq!(bus.ext_bank(0), 0xABCD);
}

// ============================================================
// VRAM window
// ============================================================

#[test]
fn vram_window_translates_when_enabled() {
    let mut bus = adapter();
    bus.write(VRAM_BANK_REG, 2);
    bus.write(0x8000, 0xAB);
    assert_eq!(bus.vram_bank(), 2);
    assert_eq!(bus.bus_mut().read8(VRAM_START + 2 * VRAM_BANK_SIZE), 0xAB);
    assert_eq!(bus.read(0x8000), 0xAB);
}

#[test]
fn io_region_overrides_vram_window() {
    let mut inner = MemoryBus::new(0x0200_0000);
    inner.register_region(0x9000, 0x9000, Box::new(|_| 0x66), Box::new(|_, _| {}));
    inner.seal();
    let mut bus = Bus6502Adapter::new(inner);
    bus.write(VRAM_BANK_REG, 0);
    assert_eq!(bus.read(0x9000), 0x66, "device region wins over the window");
    bus.write(0x8000, 0x10);
    assert_eq!(bus.bus_mut().read8(VRAM_START), 0x10);
}

// ============================================================
// End-to-end: CPU program drives the bank registers
// ============================================================

#[test]
fn cpu_store_through_vram_bank() {
    let mut bus = adapter();
    // LDA #$02; STA $F7F0; LDA #$AB; STA $8000; NOP
    let program = [0xA9, 0x02, 0x8D, 0xF0, 0xF7, 0xA9, 0xAB, 0x8D, 0x00, 0x80, 0xEA];
    for (i, byte) in program.iter().enumerate() {
        bus.bus_mut().write8(0x0200 + i as u32, *byte);
    }
    bus.bus_mut().seal();

    let mut cpu = Mos6502::new();
    cpu.pc = 0x0200;
    for _ in 0..4 {
        cpu.step(&mut bus);
    }

    assert_eq!(bus.vram_bank(), 2);
    assert_eq!(bus.bus_mut().read8(VRAM_START + 2 * 0x4000), 0xAB);
}
