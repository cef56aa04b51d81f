use std::cell::RefCell;
use std::rc::Rc;

use chroma_core::core::MemoryBus;

#[test]
fn write_then_read_round_trips() {
    let mut bus = MemoryBus::new(0x10000);
    for addr in [0u32, 1, 0x1234, 0xFFFF] {
        bus.write8(addr, addr as u8 ^ 0x5A);
        assert_eq!(bus.read8(addr), addr as u8 ^ 0x5A);
    }
}

#[test]
fn word_access_is_little_endian() {
    let mut bus = MemoryBus::new(0x10000);
    bus.write16(0x100, 0xBEEF);
    assert_eq!(bus.read8(0x100), 0xEF);
    assert_eq!(bus.read8(0x101), 0xBE);
    assert_eq!(bus.read16(0x100), 0xBEEF);

    bus.write32(0x200, 0x1234_5678);
    assert_eq!(bus.read8(0x200), 0x78);
    assert_eq!(bus.read8(0x203), 0x12);
    assert_eq!(bus.read32(0x200), 0x1234_5678);
}

#[test]
fn region_handlers_see_offsets() {
    let mut bus = MemoryBus::new(0x10000);
    let log = Rc::new(RefCell::new(Vec::new()));
    let write_log = Rc::clone(&log);
    bus.register_region(
        0x1000,
        0x10FF,
        Box::new(|offset| offset as u8),
        Box::new(move |offset, value| write_log.borrow_mut().push((offset, value))),
    );
    bus.seal();

    assert_eq!(bus.read8(0x1000), 0);
    assert_eq!(bus.read8(0x1042), 0x42);
    bus.write8(0x10FF, 0xAB);
    assert_eq!(*log.borrow(), vec![(0xFF, 0xAB)]);
}

#[test]
fn region_read_called_exactly_once_per_access() {
    let mut bus = MemoryBus::new(0x10000);
    let count = Rc::new(RefCell::new(0u32));
    let read_count = Rc::clone(&count);
    bus.register_region(
        0x2000,
        0x2000,
        Box::new(move |_| {
            *read_count.borrow_mut() += 1;
            0x99
        }),
        Box::new(|_, _| {}),
    );
    bus.seal();

    assert_eq!(bus.read8(0x2000), 0x99);
    assert_eq!(*count.borrow(), 1);
    bus.read8(0x2000);
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn overlapping_regions_dispatch_first_match() {
    let mut bus = MemoryBus::new(0x10000);
    bus.register_region(0x3000, 0x30FF, Box::new(|_| 1), Box::new(|_, _| {}));
    bus.register_region(0x3000, 0x3FFF, Box::new(|_| 2), Box::new(|_, _| {}));
    bus.seal();

    assert_eq!(bus.read8(0x3080), 1, "first registered region wins");
    assert_eq!(bus.read8(0x3100), 2, "fallthrough past the narrow region");
}

#[test]
fn unmatched_address_in_io_page_falls_back_to_ram() {
    let mut bus = MemoryBus::new(0x10000);
    bus.register_region(0x4010, 0x401F, Box::new(|_| 0x77), Box::new(|_, _| {}));
    bus.seal();

    // Same page, outside the region.
    bus.write8(0x4000, 0x12);
    assert_eq!(bus.read8(0x4000), 0x12);
    assert_eq!(bus.read8(0x4010), 0x77);
}

#[test]
fn page_bitmap_tracks_registered_regions() {
    let mut bus = MemoryBus::new(0x10000);
    bus.register_region(0x5080, 0x6110, Box::new(|_| 0), Box::new(|_, _| {}));
    bus.seal();

    assert!(bus.is_io_page(0x50));
    assert!(bus.is_io_page(0x58));
    assert!(bus.is_io_page(0x61));
    assert!(!bus.is_io_page(0x4F));
    assert!(!bus.is_io_page(0x62));

    assert!(bus.has_region_at(0x5080));
    assert!(bus.has_region_at(0x6110));
    assert!(!bus.has_region_at(0x507F));
    assert!(!bus.has_region_at(0x6111));
}

#[test]
fn seal_is_idempotent() {
    let mut bus = MemoryBus::new(0x1000);
    bus.seal();
    bus.seal();
    assert!(bus.is_sealed());
}

#[test]
#[should_panic(expected = "register_region after seal")]
fn registering_after_seal_panics() {
    let mut bus = MemoryBus::new(0x1000);
    bus.seal();
    bus.register_region(0, 0xFF, Box::new(|_| 0), Box::new(|_, _| {}));
}

#[test]
fn reset_zeroes_memory_and_runs_hooks() {
    let mut bus = MemoryBus::new(0x1000);
    let hook_ran = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&hook_ran);
    bus.register_reset_hook(Box::new(move || *flag.borrow_mut() = true));
    bus.write8(0x10, 0xFF);
    bus.reset();
    assert_eq!(bus.read8(0x10), 0);
    assert!(*hook_ran.borrow());
}

#[test]
fn size_is_capped() {
    let bus = MemoryBus::new(usize::MAX);
    assert_eq!(bus.len(), chroma_core::core::bus::DEFAULT_MEMORY_SIZE);
}
