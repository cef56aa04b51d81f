use chroma_formats::ahx::{
    AhxEnvelope, AhxFile, AhxInstrument, AhxPlistEntry, AhxPosition, AhxStep,
};
use chroma_players::AhxReplayer;

fn empty_track(len: usize) -> Vec<AhxStep> {
    vec![AhxStep::default(); len]
}

fn basic_instrument() -> AhxInstrument {
    let mut instrument = AhxInstrument {
        volume: 0x40,
        wave_length: 5,
        envelope: AhxEnvelope {
            a_frames: 4,
            a_volume: 0x40,
            d_frames: 4,
            d_volume: 0x20,
            s_frames: 0xFF,
            r_frames: 4,
            r_volume: 0,
        },
        square_lower_limit: 0x20,
        square_upper_limit: 0x5F,
        square_speed: 1,
        filter_upper_limit: 0x1F,
        ..Default::default()
    };
    // One entry: pick the triangle and play the base note.
    instrument.plist.speed = 1;
    instrument.plist.entries.push(AhxPlistEntry {
        waveform: 1,
        note: 1,
        ..Default::default()
    });
    instrument
}

/// A two-position song with an instrument trigger at the top of track 1.
fn basic_song() -> AhxFile {
    let track_length = 4u8;
    let mut track1 = empty_track(track_length as usize);
    track1[0] = AhxStep {
        note: 13, // C-2
        instrument: 1,
        fx: 0,
        fx_param: 0,
    };
    AhxFile {
        revision: 1,
        name: "test".into(),
        speed_multiplier: 1,
        restart: 0,
        track_length,
        subsongs: vec![],
        positions: vec![
            AhxPosition {
                track: [1, 0, 0, 0],
                transpose: [0; 4],
            },
            AhxPosition {
                track: [0, 0, 0, 0],
                transpose: [0; 4],
            },
        ],
        tracks: vec![empty_track(track_length as usize), track1],
        instruments: vec![AhxInstrument::default(), basic_instrument()],
    }
}

#[test]
fn rows_advance_at_tempo() {
    let mut replayer = AhxReplayer::new();
    replayer.init_song(basic_song());
    assert_eq!(replayer.note_nr, 0);

    // Default tempo 6: the first tick processes row 0, the sixth ends it.
    for _ in 0..6 {
        replayer.play_irq();
    }
    assert_eq!(replayer.note_nr, 1);
    assert_eq!(replayer.pos_nr, 0);
}

#[test]
fn positions_advance_past_track_end() {
    let mut replayer = AhxReplayer::new();
    replayer.init_song(basic_song());

    // 4 rows x 6 ticks.
    for _ in 0..24 {
        replayer.play_irq();
    }
    assert_eq!(replayer.pos_nr, 1);
    assert_eq!(replayer.note_nr, 0);
    assert!(!replayer.song_end_reached);
}

#[test]
fn wrap_through_restart_flags_song_end() {
    let mut replayer = AhxReplayer::new();
    replayer.init_song(basic_song());

    for _ in 0..48 {
        replayer.play_irq();
    }
    assert!(replayer.song_end_reached);
    assert_eq!(replayer.pos_nr, 0, "wrapped to the restart position");
}

#[test]
fn note_trigger_attaches_instrument() {
    let mut replayer = AhxReplayer::new();
    replayer.init_song(basic_song());
    replayer.play_irq();

    let voice = &replayer.voices[0];
    assert_eq!(voice.instrument, 1);
    assert_eq!(voice.track_period, 13);
    assert_eq!(voice.note_max_volume, 0x40);
    assert_eq!(voice.waveform, 0, "plist entry selected the triangle");
}

#[test]
fn adsr_attack_raises_envelope() {
    let mut replayer = AhxReplayer::new();
    replayer.init_song(basic_song());

    replayer.play_irq();
    let first = replayer.voices[0].adsr_volume;
    replayer.play_irq();
    let second = replayer.voices[0].adsr_volume;
    assert!(second >= first);

    // After the attack completes the envelope sits at the attack target.
    for _ in 0..6 {
        replayer.play_irq();
    }
    assert!(replayer.voices[0].adsr_volume <= 0x40 << 8);
    assert!(replayer.voices[0].adsr_volume > 0);
}

#[test]
fn audio_period_stays_clamped() {
    let mut replayer = AhxReplayer::new();
    replayer.init_song(basic_song());

    for _ in 0..48 {
        replayer.play_irq();
        for voice in &replayer.voices {
            assert!(voice.audio_period >= 0x71 && voice.audio_period <= 0xD60);
        }
    }
}

#[test]
fn tempo_zero_signals_song_end_without_advancing() {
    let mut song = basic_song();
    song.tracks[1][0].fx = 0xF;
    song.tracks[1][0].fx_param = 0;

    let mut replayer = AhxReplayer::new();
    replayer.init_song(song);
    replayer.play_irq();
    assert!(replayer.song_end_reached);

    let pos = replayer.pos_nr;
    let note = replayer.note_nr;
    for _ in 0..32 {
        replayer.play_irq();
    }
    assert_eq!(replayer.pos_nr, pos, "rows frozen at tempo zero");
    assert_eq!(replayer.note_nr, note);
}

#[test]
fn set_tempo_effect_changes_row_length() {
    let mut song = basic_song();
    song.tracks[1][0].fx = 0xF;
    song.tracks[1][0].fx_param = 3;

    let mut replayer = AhxReplayer::new();
    replayer.init_song(song);
    for _ in 0..3 {
        replayer.play_irq();
    }
    assert_eq!(replayer.note_nr, 1, "three ticks per row at tempo 3");
}

#[test]
fn volume_effect_ranges() {
    let mut song = basic_song();
    song.tracks[1][0].fx = 0xC;
    song.tracks[1][0].fx_param = 0x20;
    song.tracks[1][1] = AhxStep {
        note: 0,
        instrument: 0,
        fx: 0xC,
        fx_param: 0x50 + 0x30, // all-voice master volume 0x30
    };

    let mut replayer = AhxReplayer::new();
    replayer.init_song(song);
    replayer.play_irq();
    assert_eq!(replayer.voices[0].note_max_volume, 0x20);

    for _ in 0..6 {
        replayer.play_irq();
    }
    for voice in &replayer.voices {
        assert_eq!(voice.track_master_volume, 0x30, "master applies to all");
    }
}

#[test]
fn pattern_break_jumps_to_next_position_row() {
    let mut song = basic_song();
    song.tracks[1][1] = AhxStep {
        note: 0,
        instrument: 0,
        fx: 0xD,
        fx_param: 0x02, // BCD row 2
    };

    let mut replayer = AhxReplayer::new();
    replayer.init_song(song);
    for _ in 0..12 {
        replayer.play_irq();
    }
    assert_eq!(replayer.pos_nr, 1);
    assert_eq!(replayer.note_nr, 2, "break lands on the requested row");
}

#[test]
fn position_jump_effect() {
    let mut song = basic_song();
    song.tracks[1][0].fx = 0xB;
    song.tracks[1][0].fx_param = 0x01;

    let mut replayer = AhxReplayer::new();
    replayer.init_song(song);
    for _ in 0..6 {
        replayer.play_irq();
    }
    assert_eq!(replayer.pos_nr, 1, "jumped straight to position 1");
}

#[test]
fn note_cut_mutes_the_voice() {
    let mut song = basic_song();
    song.tracks[1][0].fx = 0xE;
    song.tracks[1][0].fx_param = 0xC2; // cut after 2 ticks

    let mut replayer = AhxReplayer::new();
    replayer.init_song(song);
    for _ in 0..4 {
        replayer.play_irq();
    }
    assert_eq!(replayer.voices[0].note_max_volume, 0, "cut forced silence");
}

#[test]
fn playing_time_counts_ticks() {
    let mut replayer = AhxReplayer::new();
    replayer.init_song(basic_song());
    for _ in 0..10 {
        replayer.play_irq();
    }
    assert_eq!(replayer.playing_time, 10);
}

#[test]
fn voice_buffers_carry_interpolation_mirror() {
    let mut replayer = AhxReplayer::new();
    replayer.init_song(basic_song());
    replayer.play_irq();
    let voice = &replayer.voices[0];
    assert_eq!(voice.voice_buffer[0x280], voice.voice_buffer[0]);
}

#[test]
fn subsong_index_out_of_range_is_rejected() {
    let mut replayer = AhxReplayer::new();
    replayer.init_song(basic_song());
    assert!(!replayer.init_subsong(5));
    assert!(replayer.init_subsong(0));
}
