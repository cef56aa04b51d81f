//! Four-voice AHX tracker replayer.
//!
//! The replayer runs a tick ("frame") loop: at each row boundary it
//! evaluates row effects per voice, every tick it steps ADSR, vibrato,
//! portamento, square/filter modulation and the instrument's performance
//! list, and finally publishes each voice's period, volume, and waveform
//! buffer for the mixer.

use std::rc::Rc;

use chroma_formats::ahx::{AhxFile, AhxInstrument};

use crate::waves::{WAVE_OFFSETS, Waves};

/// Amiga period per note, 1-based (index 0 unused).
pub(crate) const PERIOD_TABLE: [i32; 61] = [
    0x0000, 0x0D60, 0x0CA0, 0x0BE8, 0x0B40, 0x0A98, 0x0A00, 0x0970, 0x08E8, 0x0868, 0x07F0,
    0x0780, 0x0714, 0x06B0, 0x0650, 0x05F4, 0x05A0, 0x054C, 0x0500, 0x04B8, 0x0474, 0x0434,
    0x03F8, 0x03C0, 0x038A, 0x0358, 0x0328, 0x02FA, 0x02D0, 0x02A6, 0x0280, 0x025C, 0x023A,
    0x021A, 0x01FC, 0x01E0, 0x01C5, 0x01AC, 0x0194, 0x017D, 0x0168, 0x0153, 0x0140, 0x012E,
    0x011D, 0x010D, 0x00FE, 0x00F0, 0x00E2, 0x00D6, 0x00CA, 0x00BE, 0x00B4, 0x00AA, 0x00A0,
    0x0097, 0x008F, 0x0087, 0x007F, 0x0078, 0x0071,
];

pub(crate) const VIBRATO_TABLE: [i32; 64] = [
    0, 24, 49, 74, 97, 120, 141, 161, 180, 197, 212, 224, 235, 244, 250, 253, 255, 253, 250,
    244, 235, 224, 212, 197, 180, 161, 141, 120, 97, 74, 49, 24, 0, -24, -49, -74, -97, -120,
    -141, -161, -180, -197, -212, -224, -235, -244, -250, -253, -255, -253, -250, -244, -235,
    -224, -212, -197, -180, -161, -141, -120, -97, -74, -49, -24,
];

/// Final output period bounds.
const PERIOD_MIN: i32 = 0x0071;
const PERIOD_MAX: i32 = 0x0D60;

/// Computed per-instrument ADSR deltas (8:8 fixed point per tick).
#[derive(Debug, Clone, Copy, Default)]
pub struct AdsrState {
    pub a_frames: i32,
    pub a_volume: i32,
    pub d_frames: i32,
    pub d_volume: i32,
    pub s_frames: i32,
    pub r_frames: i32,
    pub r_volume: i32,
}

/// One tracker voice.
pub struct AhxVoice {
    pub track_on: bool,
    pub track_master_volume: i32,

    pub track: u8,
    pub transpose: i32,
    pub next_track: u8,
    pub next_transpose: i32,

    pub adsr: AdsrState,
    /// 8:8 fixed-point envelope level.
    pub adsr_volume: i32,

    /// Index into the song's instrument table; 0 = none.
    pub instrument: usize,

    pub instr_period: i32,
    pub track_period: i32,
    pub vibrato_period: i32,
    pub fixed_note: bool,
    pub plant_period: bool,

    pub vibrato_current: i32,
    pub vibrato_delay: i32,
    pub vibrato_depth: i32,
    pub vibrato_speed: i32,

    pub period_slide_speed: i32,
    pub period_slide_period: i32,
    pub period_slide_limit: i32,
    pub period_slide_on: bool,
    pub period_slide_with_limit: bool,

    pub period_perf_slide_speed: i32,
    pub period_perf_slide_period: i32,
    pub period_perf_slide_on: bool,

    pub volume_slide_up: i32,
    pub volume_slide_down: i32,
    pub note_max_volume: i32,
    pub perf_sub_volume: i32,

    pub perf_current: usize,
    pub perf_speed: i32,
    pub perf_wait: i32,

    pub square_on: bool,
    pub square_init: bool,
    pub square_wait: i32,
    pub square_lower_limit: i32,
    pub square_upper_limit: i32,
    pub square_pos: i32,
    pub square_sign: i32,
    pub square_sliding_in: bool,
    pub square_reverse: bool,
    pub ignore_square: bool,
    pub plant_square: bool,
    pub square_temp_buffer: [i8; 0x80],

    pub filter_on: bool,
    pub filter_init: bool,
    pub filter_wait: i32,
    pub filter_lower_limit: i32,
    pub filter_upper_limit: i32,
    pub filter_pos: i32,
    pub filter_sign: i32,
    pub filter_speed: i32,
    pub filter_sliding_in: bool,
    /// Non-zero: a deferred filter position consumed by PList command 0.
    pub ignore_filter: i32,

    pub note_delay_on: bool,
    pub note_delay_wait: i32,
    pub note_cut_on: bool,
    pub note_cut_wait: i32,
    pub hard_cut: i32,
    pub hard_cut_release: bool,
    pub hard_cut_release_frames: i32,

    pub wave_length: i32,
    /// 0 triangle, 1 sawtooth, 2 square, 3 white noise.
    pub waveform: i32,
    pub new_waveform: bool,
    pub noise_offset: usize,

    /// One full mixer cycle plus a mirrored byte for interpolation.
    pub voice_buffer: [i8; 0x281],
    pub audio_period: i32,
    pub audio_volume: i32,
    pub voice_period: i32,
    pub voice_volume: i32,
}

impl Default for AhxVoice {
    fn default() -> Self {
        Self {
            track_on: true,
            track_master_volume: 0x40,
            track: 0,
            transpose: 0,
            next_track: 0,
            next_transpose: 0,
            adsr: AdsrState::default(),
            adsr_volume: 0,
            instrument: 0,
            instr_period: 1,
            track_period: 1,
            vibrato_period: 0,
            fixed_note: false,
            plant_period: true,
            vibrato_current: 0,
            vibrato_delay: 0,
            vibrato_depth: 0,
            vibrato_speed: 0,
            period_slide_speed: 0,
            period_slide_period: 0,
            period_slide_limit: 0,
            period_slide_on: false,
            period_slide_with_limit: false,
            period_perf_slide_speed: 0,
            period_perf_slide_period: 0,
            period_perf_slide_on: false,
            volume_slide_up: 0,
            volume_slide_down: 0,
            note_max_volume: 0x40,
            perf_sub_volume: 0x40,
            perf_current: 0,
            perf_speed: 0,
            perf_wait: 0,
            square_on: false,
            square_init: false,
            square_wait: 0,
            square_lower_limit: 0,
            square_upper_limit: 0,
            square_pos: 0,
            square_sign: 1,
            square_sliding_in: false,
            square_reverse: false,
            ignore_square: false,
            plant_square: false,
            square_temp_buffer: [0; 0x80],
            filter_on: false,
            filter_init: false,
            filter_wait: 0,
            filter_lower_limit: 0,
            filter_upper_limit: 0,
            filter_pos: 0x20,
            filter_sign: 1,
            filter_speed: 0,
            filter_sliding_in: false,
            ignore_filter: 0,
            note_delay_on: false,
            note_delay_wait: 0,
            note_cut_on: false,
            note_cut_wait: 0,
            hard_cut: 0,
            hard_cut_release: false,
            hard_cut_release_frames: 0,
            wave_length: 0,
            waveform: 0,
            new_waveform: true,
            noise_offset: 0,
            voice_buffer: [0; 0x281],
            audio_period: PERIOD_MIN,
            audio_volume: 0,
            voice_period: PERIOD_MIN,
            voice_volume: 0,
        }
    }
}

impl AhxVoice {
    fn init(&mut self) {
        *self = Self::default();
    }

    /// Per-instrument ADSR deltas, scaled to 8:8 per-tick steps.
    fn calc_adsr(&mut self, instrument: &AhxInstrument) {
        let env = &instrument.envelope;
        self.adsr.a_frames = env.a_frames as i32;
        self.adsr.a_volume = (env.a_volume as i32) * 256 / self.adsr.a_frames.max(1);
        self.adsr.d_frames = env.d_frames as i32;
        self.adsr.d_volume =
            ((env.d_volume as i32) - (env.a_volume as i32)) * 256 / self.adsr.d_frames.max(1);
        self.adsr.s_frames = env.s_frames as i32;
        self.adsr.r_frames = env.r_frames as i32;
        self.adsr.r_volume =
            ((env.r_volume as i32) - (env.d_volume as i32)) * 256 / self.adsr.r_frames.max(1);
        self.adsr_volume = 0;
    }

    /// Attach an instrument on a row trigger: envelope, vibrato, hard-cut,
    /// square and filter ranges, and the performance-list cursor all
    /// re-initialize.
    fn attach_instrument(&mut self, index: usize, instrument: &AhxInstrument) {
        self.instrument = index;
        self.calc_adsr(instrument);
        self.wave_length = (instrument.wave_length as i32).min(5);
        self.note_max_volume = instrument.volume as i32;

        self.vibrato_current = 0;
        self.vibrato_delay = instrument.vibrato_delay as i32;
        self.vibrato_depth = instrument.vibrato_depth as i32;
        self.vibrato_speed = instrument.vibrato_speed as i32;
        self.vibrato_period = 0;

        self.hard_cut_release = instrument.hard_cut_release;
        self.hard_cut = instrument.hard_cut_release_frames as i32;

        self.ignore_square = false;
        self.square_sliding_in = false;
        self.square_wait = 0;
        self.square_on = false;
        let shift = 5 - self.wave_length;
        let mut lower = (instrument.square_lower_limit as i32) >> shift;
        let mut upper = (instrument.square_upper_limit as i32) >> shift;
        if upper < lower {
            std::mem::swap(&mut lower, &mut upper);
        }
        self.square_lower_limit = lower;
        self.square_upper_limit = upper;

        self.ignore_filter = 0;
        self.filter_wait = 0;
        self.filter_on = false;
        self.filter_sliding_in = false;
        self.filter_speed = instrument.filter_speed as i32;
        let mut flower = instrument.filter_lower_limit as i32;
        let mut fupper = instrument.filter_upper_limit as i32;
        if fupper < flower {
            std::mem::swap(&mut flower, &mut fupper);
        }
        self.filter_lower_limit = flower;
        self.filter_upper_limit = fupper;
        self.filter_pos = 0x20;

        self.perf_wait = 0;
        self.perf_current = 0;
        self.perf_speed = instrument.plist.speed as i32;
        self.perf_sub_volume = 0x40;

        self.period_slide_speed = 0;
        self.period_slide_period = 0;
        self.period_slide_limit = 0;
        self.period_slide_on = false;
        self.period_slide_with_limit = false;
        self.period_perf_slide_speed = 0;
        self.period_perf_slide_period = 0;
        self.period_perf_slide_on = false;

        self.fixed_note = false;
    }
}

/// The tracker engine: global position/tempo state plus the four voices.
pub struct AhxReplayer {
    song: Rc<AhxFile>,
    waves: Rc<Waves>,
    pub voices: [AhxVoice; 4],

    pub pos_nr: usize,
    pub note_nr: usize,
    pos_jump: usize,
    pos_jump_note: usize,
    pattern_break: bool,
    get_new_position: bool,
    pub song_end_reached: bool,
    pub tempo: i32,
    step_wait_frames: i32,
    pub playing_time: u64,
    pub main_volume: i32,
    wn_random: u32,
    current_subsong: usize,
}

impl Default for AhxReplayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AhxReplayer {
    pub fn new() -> Self {
        Self {
            song: Rc::new(AhxFile::default()),
            waves: Rc::new(Waves::new()),
            voices: Default::default(),
            pos_nr: 0,
            note_nr: 0,
            pos_jump: 0,
            pos_jump_note: 0,
            pattern_break: false,
            get_new_position: true,
            song_end_reached: false,
            tempo: 6,
            step_wait_frames: 0,
            playing_time: 0,
            main_volume: 0x40,
            wn_random: 0x41595321,
            current_subsong: 0,
        }
    }

    pub fn song(&self) -> &AhxFile {
        &self.song
    }

    pub fn current_subsong(&self) -> usize {
        self.current_subsong
    }

    /// Ticks per second the embedder should call [`play_irq`](Self::play_irq) at.
    pub fn tick_rate(&self) -> u32 {
        50 * self.song.speed_multiplier.max(1) as u32
    }

    /// Load a song and start its main sequence.
    pub fn init_song(&mut self, song: AhxFile) {
        log::debug!(
            "ahx: loading \"{}\" ({} positions, {} instruments)",
            song.name,
            song.position_count(),
            song.instrument_count()
        );
        self.song = Rc::new(song);
        self.init_subsong(0);
    }

    /// Start subsong `nr` (0 = the main sequence). Returns false when the
    /// index is out of range.
    pub fn init_subsong(&mut self, nr: usize) -> bool {
        if nr > self.song.subsongs.len() {
            return false;
        }
        self.current_subsong = nr;
        self.pos_nr = if nr > 0 {
            self.song.subsongs[nr - 1] as usize
        } else {
            0
        };
        self.pos_jump = 0;
        self.note_nr = 0;
        self.pos_jump_note = 0;
        self.pattern_break = false;
        self.main_volume = 0x40;
        self.playing_time = 0;
        self.song_end_reached = false;
        self.tempo = 6;
        self.step_wait_frames = 0;
        self.get_new_position = true;
        for voice in &mut self.voices {
            voice.init();
        }
        true
    }

    /// One replayer tick: row-boundary work, per-tick modulation, row
    /// advance, and audio hand-off, in that order.
    pub fn play_irq(&mut self) {
        let song = Rc::clone(&self.song);
        if song.positions.is_empty() {
            return;
        }

        if self.step_wait_frames <= 0 {
            if self.get_new_position {
                let next_pos = if self.pos_nr + 1 == song.positions.len() {
                    0
                } else {
                    self.pos_nr + 1
                };
                let position = song.positions[self.pos_nr];
                let next = song.positions[next_pos];
                for v in 0..4 {
                    self.voices[v].track = position.track[v];
                    self.voices[v].transpose = position.transpose[v] as i32;
                    self.voices[v].next_track = next.track[v];
                    self.voices[v].next_transpose = next.transpose[v] as i32;
                }
                self.get_new_position = false;
            }
            for v in 0..4 {
                self.process_step(v);
            }
            self.step_wait_frames = song.speed_multiplier as i32 * self.tempo;
        }

        for v in 0..4 {
            self.process_frame(v);
        }
        self.playing_time += 1;

        if self.tempo > 0 {
            self.step_wait_frames -= 1;
            if self.step_wait_frames <= 0 {
                if !self.pattern_break {
                    self.note_nr += 1;
                    if self.note_nr >= song.track_length as usize {
                        self.pos_jump = self.pos_nr + 1;
                        self.pos_jump_note = 0;
                        self.pattern_break = true;
                    }
                }
                if self.pattern_break {
                    self.pattern_break = false;
                    self.note_nr = self.pos_jump_note;
                    self.pos_jump_note = 0;
                    self.pos_nr = self.pos_jump;
                    self.pos_jump = 0;
                    if self.pos_nr >= song.positions.len() {
                        self.song_end_reached = true;
                        self.pos_nr = (song.restart as usize).min(song.positions.len() - 1);
                    }
                    self.get_new_position = true;
                }
            }
        }

        for v in 0..4 {
            self.set_audio(v);
        }
    }

    /// Row-level effect evaluation for one voice.
    fn process_step(&mut self, v: usize) {
        let song = Rc::clone(&self.song);
        if !self.voices[v].track_on {
            return;
        }
        self.voices[v].volume_slide_up = 0;
        self.voices[v].volume_slide_down = 0;

        let track = self.voices[v].track as usize;
        let Some(row) = song
            .tracks
            .get(track)
            .and_then(|rows| rows.get(self.note_nr))
            .copied()
        else {
            return;
        };
        let mut note = row.note as i32;
        let instrument = row.instrument as usize;
        let fx = row.fx;
        let fx_param = row.fx_param as i32;

        // Pre-note effects.
        match fx {
            0x0 => {
                // Position-jump hundreds digit.
                let digit = fx_param & 0x0F;
                if (1..=9).contains(&digit) {
                    self.pos_jump = digit as usize;
                }
            }
            0x5 | 0xA => {
                self.voices[v].volume_slide_down = fx_param & 0x0F;
                self.voices[v].volume_slide_up = fx_param >> 4;
            }
            0xB => {
                self.pos_jump =
                    self.pos_jump * 100 + ((fx_param & 0x0F) + (fx_param >> 4) * 10) as usize;
                self.pattern_break = true;
            }
            0xD => {
                self.pos_jump = self.pos_nr + 1;
                let mut target = ((fx_param >> 4) * 10 + (fx_param & 0x0F)) as usize;
                if target >= song.track_length as usize {
                    target = 0;
                }
                self.pos_jump_note = target;
                self.pattern_break = true;
            }
            0xE => match fx_param >> 4 {
                0xC => {
                    // Note cut after N ticks.
                    let ticks = fx_param & 0x0F;
                    if ticks < self.tempo {
                        let voice = &mut self.voices[v];
                        voice.note_cut_wait = ticks;
                        if voice.note_cut_wait != 0 {
                            voice.note_cut_on = true;
                            voice.hard_cut_release = false;
                        }
                    }
                }
                0xD => {
                    // Note delay: a pending delay clears; otherwise defer
                    // the whole row to the delayed tick.
                    if self.voices[v].note_delay_on {
                        self.voices[v].note_delay_on = false;
                    } else {
                        let wait = fx_param & 0x0F;
                        if wait < self.tempo {
                            self.voices[v].note_delay_wait = wait;
                            if self.voices[v].note_delay_wait != 0 {
                                self.voices[v].note_delay_on = true;
                                return;
                            }
                        }
                    }
                }
                _ => {}
            },
            0xF => {
                self.tempo = fx_param;
                if fx_param == 0 {
                    // Tempo zero is the end-of-song signal; rows stop
                    // advancing but ticks keep running.
                    self.song_end_reached = true;
                }
            }
            _ => {}
        }

        // Instrument trigger.
        if instrument != 0 && instrument < song.instruments.len() {
            self.voices[v].attach_instrument(instrument, &song.instruments[instrument]);
        }

        // Post-setup effects.
        match fx {
            0x9 => {
                let voice = &mut self.voices[v];
                voice.square_pos = fx_param >> (5 - voice.wave_length);
                voice.plant_square = true;
                voice.ignore_square = true;
            }
            0x3 | 0x5 => {
                if note != 0 {
                    // Tone portamento toward the new note; the note itself
                    // does not retrigger.
                    let voice = &mut self.voices[v];
                    let new = (note + voice.transpose).clamp(1, 60) as usize;
                    let old = (voice.track_period + voice.transpose).clamp(1, 60) as usize;
                    let diff = PERIOD_TABLE[old] - PERIOD_TABLE[new];
                    voice.period_slide_limit = -diff;
                    voice.period_slide_on = true;
                    voice.period_slide_with_limit = true;
                    note = 0;
                }
            }
            _ => {}
        }

        if note != 0 {
            self.voices[v].track_period = note;
            self.voices[v].plant_period = true;
        }

        // Post-note effects.
        match fx {
            0x1 => {
                let voice = &mut self.voices[v];
                voice.period_slide_speed = -fx_param;
                voice.period_slide_on = true;
                voice.period_slide_with_limit = false;
            }
            0x2 => {
                let voice = &mut self.voices[v];
                voice.period_slide_speed = fx_param;
                voice.period_slide_on = true;
                voice.period_slide_with_limit = false;
            }
            0xC => self.volume_command(v, fx_param),
            0xE => match fx_param >> 4 {
                0x1 => {
                    let voice = &mut self.voices[v];
                    voice.period_slide_period -= fx_param & 0x0F;
                    voice.plant_period = true;
                }
                0x2 => {
                    let voice = &mut self.voices[v];
                    voice.period_slide_period += fx_param & 0x0F;
                    voice.plant_period = true;
                }
                0x4 => {
                    self.voices[v].vibrato_depth = fx_param & 0x0F;
                }
                0xA => {
                    let voice = &mut self.voices[v];
                    voice.note_max_volume = (voice.note_max_volume + (fx_param & 0x0F)).min(0x40);
                }
                0xB => {
                    let voice = &mut self.voices[v];
                    voice.note_max_volume = (voice.note_max_volume - (fx_param & 0x0F)).max(0);
                }
                _ => {}
            },
            _ => {}
        }
    }

    /// The shared volume-command layout: direct voice volume, all-voice
    /// master, or this voice's master, by parameter range.
    fn volume_command(&mut self, v: usize, param: i32) {
        let mut value = param;
        if value <= 0x40 {
            self.voices[v].note_max_volume = value;
            return;
        }
        value -= 0x50;
        if (0..=0x40).contains(&value) {
            for voice in &mut self.voices {
                voice.track_master_volume = value;
            }
            return;
        }
        value -= 0xA0 - 0x50;
        if (0..=0x40).contains(&value) {
            self.voices[v].track_master_volume = value;
        }
    }

    /// Per-tick modulation for one voice.
    fn process_frame(&mut self, v: usize) {
        let song = Rc::clone(&self.song);
        let waves = Rc::clone(&self.waves);
        let tempo = self.tempo;

        // 1. Note delay: the deferred row replays on expiry.
        if self.voices[v].note_delay_on {
            if self.voices[v].note_delay_wait <= 0 {
                self.voices[v].note_delay_on = false;
                self.process_step(v);
            } else {
                self.voices[v].note_delay_wait -= 1;
            }
        }

        // 2. Hard cut: when the next row triggers an instrument, schedule a
        // cut near the end of this row.
        if self.voices[v].hard_cut != 0 {
            let next_instrument = if self.note_nr + 1 < song.track_length as usize {
                song.tracks
                    .get(self.voices[v].track as usize)
                    .and_then(|rows| rows.get(self.note_nr + 1))
                    .map(|row| row.instrument)
                    .unwrap_or(0)
            } else {
                song.tracks
                    .get(self.voices[v].next_track as usize)
                    .and_then(|rows| rows.first())
                    .map(|row| row.instrument)
                    .unwrap_or(0)
            };
            if next_instrument != 0 {
                let delay = (tempo - self.voices[v].hard_cut).max(0);
                let voice = &mut self.voices[v];
                if !voice.note_cut_on {
                    voice.note_cut_on = true;
                    voice.note_cut_wait = delay;
                    voice.hard_cut_release_frames = -(delay - tempo);
                } else {
                    voice.hard_cut = 0;
                }
            }
        }

        // 3. Note cut: fast release or a hard mute.
        if self.voices[v].note_cut_on {
            if self.voices[v].note_cut_wait <= 0 {
                self.voices[v].note_cut_on = false;
                if self.voices[v].hard_cut_release {
                    let release_target = song
                        .instruments
                        .get(self.voices[v].instrument)
                        .map(|ins| (ins.envelope.r_volume as i32) << 8)
                        .unwrap_or(0);
                    let voice = &mut self.voices[v];
                    let frames = voice.hard_cut_release_frames.max(1);
                    voice.adsr.r_volume = -(voice.adsr_volume - release_target) / frames;
                    voice.adsr.r_frames = frames;
                    voice.adsr.a_frames = 0;
                    voice.adsr.d_frames = 0;
                    voice.adsr.s_frames = 0;
                } else {
                    self.voices[v].note_max_volume = 0;
                }
            } else {
                self.voices[v].note_cut_wait -= 1;
            }
        }

        // 4. ADSR stepping.
        if self.voices[v].instrument != 0 {
            let env = song.instruments[self.voices[v].instrument].envelope;
            let voice = &mut self.voices[v];
            if voice.adsr.a_frames > 0 {
                voice.adsr_volume += voice.adsr.a_volume;
                voice.adsr.a_frames -= 1;
                if voice.adsr.a_frames <= 0 {
                    voice.adsr_volume = (env.a_volume as i32) << 8;
                }
            } else if voice.adsr.d_frames > 0 {
                voice.adsr_volume += voice.adsr.d_volume;
                voice.adsr.d_frames -= 1;
                if voice.adsr.d_frames <= 0 {
                    voice.adsr_volume = (env.d_volume as i32) << 8;
                }
            } else if voice.adsr.s_frames > 0 {
                voice.adsr.s_frames -= 1;
            } else if voice.adsr.r_frames > 0 {
                voice.adsr_volume += voice.adsr.r_volume;
                voice.adsr.r_frames -= 1;
                if voice.adsr.r_frames <= 0 {
                    voice.adsr_volume = (env.r_volume as i32) << 8;
                }
            }
        }

        // 5. Volume slide.
        {
            let voice = &mut self.voices[v];
            voice.note_max_volume =
                (voice.note_max_volume + voice.volume_slide_up - voice.volume_slide_down)
                    .clamp(0, 0x40);
        }

        // 6. Portamento.
        {
            let voice = &mut self.voices[v];
            if voice.period_slide_on {
                if voice.period_slide_with_limit {
                    let distance = voice.period_slide_period - voice.period_slide_limit;
                    let mut step = voice.period_slide_speed;
                    if distance > 0 {
                        step = -step;
                    }
                    if distance != 0 {
                        // Advance while the sign holds; snap on overshoot.
                        if ((distance + step) ^ distance) >= 0 {
                            voice.period_slide_period += step;
                        } else {
                            voice.period_slide_period = voice.period_slide_limit;
                        }
                        voice.plant_period = true;
                    }
                } else {
                    voice.period_slide_period += voice.period_slide_speed;
                    voice.plant_period = true;
                }
            }
        }

        // 7. Vibrato.
        {
            let voice = &mut self.voices[v];
            if voice.vibrato_depth > 0 {
                if voice.vibrato_delay <= 0 {
                    voice.vibrato_period = (VIBRATO_TABLE[voice.vibrato_current as usize]
                        * voice.vibrato_depth)
                        >> 7;
                    voice.vibrato_current = (voice.vibrato_current + voice.vibrato_speed) & 0x3F;
                } else {
                    voice.vibrato_delay -= 1;
                }
            }
        }

        // 8. Performance list.
        if self.voices[v].instrument != 0 {
            let instrument = &song.instruments[self.voices[v].instrument];
            if self.voices[v].perf_current < instrument.plist.entries.len() {
                self.voices[v].perf_wait -= 1;
                if self.voices[v].perf_wait <= 0 {
                    let entry = instrument.plist.entries[self.voices[v].perf_current];
                    self.voices[v].perf_current += 1;
                    self.voices[v].perf_wait = self.voices[v].perf_speed;

                    if entry.waveform != 0 {
                        let voice = &mut self.voices[v];
                        voice.waveform = entry.waveform as i32 - 1;
                        voice.new_waveform = true;
                        voice.period_perf_slide_speed = 0;
                        voice.period_perf_slide_period = 0;
                    }
                    self.voices[v].period_perf_slide_on = false;
                    for slot in 0..2 {
                        self.plist_command(v, entry.fx[slot], entry.fx_param[slot] as i32);
                    }
                    if entry.note != 0 {
                        let voice = &mut self.voices[v];
                        voice.instr_period = entry.note as i32;
                        voice.plant_period = true;
                        voice.fixed_note = entry.fixed;
                    }
                }
            } else if self.voices[v].perf_wait > 0 {
                self.voices[v].perf_wait -= 1;
            } else {
                self.voices[v].period_perf_slide_speed = 0;
            }
        }

        // 9. Performance portamento.
        {
            let voice = &mut self.voices[v];
            if voice.period_perf_slide_on {
                voice.period_perf_slide_period -= voice.period_perf_slide_speed;
                if voice.period_perf_slide_period != 0 {
                    voice.plant_period = true;
                }
            }
        }

        // 10. Square modulation (square waveform only).
        if self.voices[v].waveform == 2 && self.voices[v].square_on {
            self.voices[v].square_wait -= 1;
            if self.voices[v].square_wait <= 0 {
                let square_speed = song
                    .instruments
                    .get(self.voices[v].instrument)
                    .map(|ins| ins.square_speed as i32)
                    .unwrap_or(1);
                let voice = &mut self.voices[v];
                let lower = voice.square_lower_limit;
                let upper = voice.square_upper_limit;
                let mut pos = voice.square_pos;
                if voice.square_init {
                    voice.square_init = false;
                    if pos <= lower {
                        voice.square_sliding_in = true;
                        voice.square_sign = 1;
                    } else if pos >= upper {
                        voice.square_sliding_in = true;
                        voice.square_sign = -1;
                    }
                } else if pos == lower || pos == upper {
                    if voice.square_sliding_in {
                        voice.square_sliding_in = false;
                    } else {
                        voice.square_sign = -voice.square_sign;
                    }
                }
                pos += voice.square_sign;
                voice.square_pos = pos;
                voice.plant_square = true;
                voice.square_wait = square_speed.max(1);
            }
        }

        // 11. Filter modulation.
        if self.voices[v].filter_on {
            self.voices[v].filter_wait -= 1;
            if self.voices[v].filter_wait <= 0 {
                let voice = &mut self.voices[v];
                let steps = if voice.filter_speed < 3 {
                    5 - voice.filter_speed
                } else {
                    1
                };
                for _ in 0..steps {
                    let lower = voice.filter_lower_limit;
                    let upper = voice.filter_upper_limit;
                    let mut pos = voice.filter_pos;
                    if voice.filter_init {
                        voice.filter_init = false;
                        if pos <= lower {
                            voice.filter_sliding_in = true;
                            voice.filter_sign = 1;
                        } else if pos >= upper {
                            voice.filter_sliding_in = true;
                            voice.filter_sign = -1;
                        }
                    } else if pos == lower || pos == upper {
                        if voice.filter_sliding_in {
                            voice.filter_sliding_in = false;
                        } else {
                            voice.filter_sign = -voice.filter_sign;
                        }
                    }
                    pos += voice.filter_sign;
                    voice.filter_pos = pos.clamp(1, 0x3F);
                }
                voice.new_waveform = true;
                voice.filter_wait = (voice.filter_speed - 3).max(1);
            }
        }

        // 12. Square synthesis into the temp buffer.
        if self.voices[v].waveform == 2 && (self.voices[v].plant_square || self.voices[v].new_waveform)
        {
            let voice = &mut self.voices[v];
            let mut duty = voice.square_pos << (5 - voice.wave_length);
            voice.square_reverse = false;
            if duty > 0x20 {
                duty = 0x40 - duty;
                voice.square_reverse = true;
            }
            if duty > 0 {
                duty -= 1;
            }
            let set = waves.square_set(voice.filter_pos);
            let src = &set[(duty.clamp(0, 0x1F) as usize) << 7..][..0x80];
            let len = 0x80usize >> voice.wave_length;
            let stride = 1usize << voice.wave_length;
            for i in 0..len {
                let sample = src[i * stride];
                voice.square_temp_buffer[i] = if voice.square_reverse { !sample } else { sample };
            }
            voice.plant_square = false;
            voice.new_waveform = true;
        }

        // 13. White noise: a fresh pseudo-random window every tick.
        if self.voices[v].waveform == 3 {
            self.wn_random = self.wn_random.wrapping_add(2_239_384);
            self.wn_random = self
                .wn_random
                .rotate_right(8)
                .wrapping_add(782_323)
                ^ 75;
            self.wn_random = self.wn_random.wrapping_sub(6735);
            let span = crate::waves::NOISE_LEN - 0x280;
            self.voices[v].noise_offset = (self.wn_random as usize % span) & !1;
            self.voices[v].new_waveform = true;
        }

        // 14. Final period.
        {
            let voice = &mut self.voices[v];
            let mut period = voice.instr_period;
            if !voice.fixed_note {
                period += voice.transpose + voice.track_period - 1;
            }
            period = period.clamp(0, 60);
            let mut audio = PERIOD_TABLE[period as usize];
            if !voice.fixed_note {
                audio += voice.period_slide_period;
            }
            audio += voice.period_perf_slide_period + voice.vibrato_period;
            voice.audio_period = audio.clamp(PERIOD_MIN, PERIOD_MAX);
        }

        // 15. Volume cascade.
        {
            let main_volume = self.main_volume;
            let voice = &mut self.voices[v];
            voice.audio_volume = ((((((((voice.adsr_volume >> 8) * voice.note_max_volume) >> 6)
                * voice.perf_sub_volume)
                >> 6)
                * voice.track_master_volume)
                >> 6)
                * main_volume)
                >> 6;
        }
    }

    /// One performance-list command.
    fn plist_command(&mut self, v: usize, fx: u8, param: i32) {
        let revision = self.song.revision;
        match fx {
            0 => {
                // Set filter (revision 1 only).
                if revision > 0 && param != 0 {
                    let voice = &mut self.voices[v];
                    if voice.ignore_filter != 0 {
                        voice.filter_pos = voice.ignore_filter;
                        voice.ignore_filter = 0;
                    } else {
                        voice.filter_pos = param.clamp(1, 0x3F);
                    }
                    voice.new_waveform = true;
                }
            }
            1 => {
                let voice = &mut self.voices[v];
                voice.period_perf_slide_speed = param;
                voice.period_perf_slide_on = true;
            }
            2 => {
                let voice = &mut self.voices[v];
                voice.period_perf_slide_speed = -param;
                voice.period_perf_slide_on = true;
            }
            3 => {
                // Init square offset, unless a row effect already placed it.
                let voice = &mut self.voices[v];
                if !voice.ignore_square {
                    voice.square_pos = param >> (5 - voice.wave_length);
                } else {
                    voice.ignore_square = false;
                }
            }
            4 => {
                // Start/stop square (and, revision 1, filter) modulation.
                let voice = &mut self.voices[v];
                if revision == 0 || param == 0 {
                    voice.square_on = !voice.square_on;
                    voice.square_init = voice.square_on;
                    voice.square_sign = 1;
                } else {
                    if param & 0x0F != 0 {
                        voice.square_on = !voice.square_on;
                        voice.square_init = voice.square_on;
                        voice.square_sign = if param & 0x0F == 0x0F { -1 } else { 1 };
                    }
                    if param & 0xF0 != 0 {
                        voice.filter_on = !voice.filter_on;
                        voice.filter_init = voice.filter_on;
                        voice.filter_sign = if param & 0xF0 == 0xF0 { -1 } else { 1 };
                    }
                }
            }
            5 => {
                // Jump to a performance-list step.
                let limit = self.song.instruments[self.voices[v].instrument]
                    .plist
                    .entries
                    .len();
                self.voices[v].perf_current = (param.max(0) as usize).min(limit);
            }
            6 => self.volume_command(v, param),
            7 => {
                let voice = &mut self.voices[v];
                voice.perf_speed = param;
                voice.perf_wait = param;
            }
            _ => {}
        }
    }

    /// Publish the voice's period/volume and (when flagged) rebuild its
    /// waveform buffer for the mixer.
    fn set_audio(&mut self, v: usize) {
        let waves = Rc::clone(&self.waves);
        let voice = &mut self.voices[v];

        voice.voice_volume = voice.audio_volume;
        if voice.plant_period {
            voice.plant_period = false;
            voice.voice_period = voice.audio_period;
        }

        if voice.new_waveform {
            voice.new_waveform = false;
            match voice.waveform {
                3 => {
                    let src = &waves.white_noise[voice.noise_offset..voice.noise_offset + 0x280];
                    voice.voice_buffer[..0x280].copy_from_slice(src);
                }
                2 => {
                    let len = (0x80usize >> voice.wave_length).max(1);
                    for i in 0..0x280 {
                        voice.voice_buffer[i] = voice.square_temp_buffer[i % len];
                    }
                }
                w => {
                    let table: &[i8] = if w == 1 {
                        &waves.sawtooths
                    } else {
                        &waves.triangles
                    };
                    let offset = WAVE_OFFSETS[voice.wave_length.clamp(0, 5) as usize];
                    let len = 4usize << voice.wave_length;
                    let src = &table[offset..offset + len];
                    for i in 0..0x280 {
                        voice.voice_buffer[i] = src[i % len];
                    }
                }
            }
            // Mirror the first byte so linear interpolation can read one
            // past the end.
            voice.voice_buffer[0x280] = voice.voice_buffer[0];
        }
    }
}
