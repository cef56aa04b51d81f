use chroma_formats::ay::{AyBlock, AyFile, AyPoints, AySong};
use chroma_players::{AyPlayer, AyPlayerError, AySystem};

const ZX_CLOCK: u64 = 3_546_900;

fn one_song_file(blocks: Vec<AyBlock>, points: AyPoints) -> AyFile {
    AyFile {
        file_version: 3,
        player_version: 3,
        special_player: false,
        author: String::new(),
        misc: String::new(),
        first_song: 0,
        songs: vec![AySong {
            name: "test".into(),
            channel_map: [0; 4],
            length_frames: 0,
            fade_frames: 0,
            hi_reg: 0,
            lo_reg: 0,
            points,
            blocks,
        }],
    }
}

/// The interrupt routine from the playback scenario: select register 7,
/// then write 0x55 to it.
fn psg_write_routine() -> Vec<u8> {
    vec![
        0x01, 0xFD, 0xFF, // LD BC,$FFFD
        0x3E, 0x07, // LD A,$07
        0xED, 0x79, // OUT (C),A
        0x01, 0xFD, 0xBF, // LD BC,$BFFD
        0x3E, 0x55, // LD A,$55
        0xED, 0x79, // OUT (C),A
        0xC9, // RET
    ]
}

#[test]
fn interrupt_routine_yields_two_events_per_frame() {
    let file = one_song_file(
        vec![AyBlock {
            addr: 0x4000,
            data: psg_write_routine(),
        }],
        AyPoints {
            stack: 0xF000,
            init: 0x0000,
            interrupt: 0x4000,
        },
    );
    let mut player = AyPlayer::new(&file, 0, 44_100, ZX_CLOCK, 50).unwrap();
    assert_eq!(player.system(), AySystem::Spectrum);

    let (events, total_samples) = player.render_frames(1);
    assert_eq!(events.len(), 2, "one interrupt, two register writes");
    assert_eq!(events[1].reg, 0x07);
    assert_eq!(events[1].value, 0x55);
    assert!(events[0].sample <= events[1].sample);
    assert_eq!(total_samples, 44_100 / 50);

    // Every frame services exactly one interrupt.
    let (events, total_samples) = player.render_frames(2);
    assert_eq!(events.len(), 4);
    assert_eq!(total_samples, 3 * 44_100 / 50);
}

#[test]
fn event_samples_fall_within_their_frames() {
    let file = one_song_file(
        vec![AyBlock {
            addr: 0x4000,
            data: psg_write_routine(),
        }],
        AyPoints {
            stack: 0xF000,
            init: 0x0000,
            interrupt: 0x4000,
        },
    );
    let mut player = AyPlayer::new(&file, 0, 44_100, ZX_CLOCK, 50).unwrap();
    let samples_per_frame = 44_100 / 50;

    let (events, _) = player.render_frames(3);
    for (i, chunk) in events.chunks(2).enumerate() {
        for event in chunk {
            let lo = (i as u64) * samples_per_frame;
            let hi = (i as u64 + 1) * samples_per_frame;
            assert!(
                event.sample >= lo && event.sample < hi,
                "event at sample {} outside frame {i}",
                event.sample
            );
        }
    }
}

#[test]
fn constructor_rejects_bad_configuration() {
    let file = one_song_file(
        vec![AyBlock {
            addr: 0x4000,
            data: vec![0xC9],
        }],
        AyPoints::default(),
    );

    assert!(matches!(
        AyPlayer::new(&file, 1, 44_100, ZX_CLOCK, 50),
        Err(AyPlayerError::SongIndexOutOfRange { .. })
    ));
    assert!(matches!(
        AyPlayer::new(&file, 0, 0, ZX_CLOCK, 50),
        Err(AyPlayerError::ZeroSampleRate)
    ));
    assert!(matches!(
        AyPlayer::new(&file, 0, 44_100, 0, 50),
        Err(AyPlayerError::ZeroClock)
    ));
    assert!(matches!(
        AyPlayer::new(&file, 0, 44_100, ZX_CLOCK, 0),
        Err(AyPlayerError::ZeroFrameRate)
    ));
}

#[test]
fn oversized_block_is_rejected() {
    let file = one_song_file(
        vec![AyBlock {
            addr: 0xFFF0,
            data: vec![0; 0x100],
        }],
        AyPoints::default(),
    );
    assert!(matches!(
        AyPlayer::new(&file, 0, 44_100, ZX_CLOCK, 50),
        Err(AyPlayerError::BlockOutOfRange { .. })
    ));
}

#[test]
fn system_detection_prefers_explicit_out_sequences() {
    // LD A,$07; OUT ($A0),A marks an MSX player.
    let msx = one_song_file(
        vec![AyBlock {
            addr: 0x8000,
            data: vec![0x3E, 0x07, 0xD3, 0xA0, 0xC9],
        }],
        AyPoints {
            stack: 0,
            init: 0x8000,
            interrupt: 0x8000,
        },
    );
    let player = AyPlayer::new(&msx, 0, 44_100, ZX_CLOCK, 50).unwrap();
    assert_eq!(player.system(), AySystem::Msx);

    // A stray 0xD3 data byte without the preceding load stays Spectrum.
    let stray = one_song_file(
        vec![AyBlock {
            addr: 0x8000,
            data: vec![0x00, 0x00, 0xD3, 0xA0, 0xC9],
        }],
        AyPoints {
            stack: 0,
            init: 0x8000,
            interrupt: 0x8000,
        },
    );
    let player = AyPlayer::new(&stray, 0, 44_100, ZX_CLOCK, 50).unwrap();
    assert_eq!(player.system(), AySystem::Spectrum);
}

#[test]
fn msx_ports_decode() {
    // Init: select register 2 and write 0x33 through the MSX ports, then
    // idle; the interrupt routine repeats the write.
    let routine = vec![
        0x3E, 0x02, // LD A,2
        0xD3, 0xA0, // OUT ($A0),A
        0x3E, 0x33, // LD A,$33
        0xD3, 0xA1, // OUT ($A1),A
        0xC9, // RET
    ];
    let file = one_song_file(
        vec![AyBlock {
            addr: 0x8000,
            data: routine,
        }],
        AyPoints {
            stack: 0xF000,
            init: 0x0000,
            interrupt: 0x8000,
        },
    );
    let mut player = AyPlayer::new(&file, 0, 44_100, ZX_CLOCK, 50).unwrap();
    assert_eq!(player.system(), AySystem::Msx);

    let (events, _) = player.render_frames(1);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].reg, 2);
    assert_eq!(events[1].value, 0x33);
}

#[test]
fn sample_accumulator_is_fraction_free() {
    let file = one_song_file(
        vec![AyBlock {
            addr: 0x4000,
            data: vec![0xC9],
        }],
        AyPoints {
            stack: 0xF000,
            init: 0x0000,
            interrupt: 0x4000,
        },
    );
    // 44100 / 13 leaves a remainder; over 13 frames the accumulator must
    // still total exactly one second of samples.
    let mut player = AyPlayer::new(&file, 0, 44_100, ZX_CLOCK, 13).unwrap();
    let (_, total) = player.render_frames(13);
    assert_eq!(total, 44_100);
}
