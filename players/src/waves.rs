//! Pre-built waveform tables for the tracker replayer: triangles and
//! sawtooths at six lengths, a square bank expanded across the filter
//! positions, and a white-noise pool.

/// Byte offset of each triangle/sawtooth length within its table
/// (cumulative 4, 8, 16, 32, 64, 128).
pub const WAVE_OFFSETS: [usize; 6] = [0, 4, 12, 28, 60, 124];

/// Total bytes of one triangle or sawtooth table.
pub const WAVE_TABLE_LEN: usize = 0xFC;

/// Duty cycles per square set.
pub const SQUARE_DUTIES: usize = 0x20;

/// Bytes per square wave.
pub const SQUARE_LEN: usize = 0x80;

/// Bytes per filter set of squares.
pub const SQUARE_SET_LEN: usize = SQUARE_DUTIES * SQUARE_LEN;

/// Filter positions 0x01..=0x3F; position 0x20 is the clean set.
pub const FILTER_SETS: usize = 0x3F;

/// White-noise pool length (0x280 * 3).
pub const NOISE_LEN: usize = 0x280 * 3;

pub struct Waves {
    pub triangles: [i8; WAVE_TABLE_LEN],
    pub sawtooths: [i8; WAVE_TABLE_LEN],
    /// `FILTER_SETS` sets of `SQUARE_DUTIES` squares. Set index is
    /// `filter_pos - 1`; sets below the center are low-passed, above are
    /// high-passed, with strength growing toward the ends.
    pub squares: Vec<i8>,
    pub white_noise: Vec<i8>,
}

impl Default for Waves {
    fn default() -> Self {
        Self::new()
    }
}

impl Waves {
    pub fn new() -> Self {
        let mut triangles = [0i8; WAVE_TABLE_LEN];
        let mut sawtooths = [0i8; WAVE_TABLE_LEN];
        for (wl, &offset) in WAVE_OFFSETS.iter().enumerate() {
            let len = 4 << wl;
            generate_triangle(&mut triangles[offset..offset + len]);
            generate_sawtooth(&mut sawtooths[offset..offset + len]);
        }

        let clean = generate_squares();
        let mut squares = vec![0i8; FILTER_SETS * SQUARE_SET_LEN];
        for set in 0..FILTER_SETS {
            let filter_pos = set + 1;
            let out = &mut squares[set * SQUARE_SET_LEN..(set + 1) * SQUARE_SET_LEN];
            if filter_pos == 0x20 {
                out.copy_from_slice(&clean);
            } else if filter_pos < 0x20 {
                filter_set(&clean, out, 0x20 - filter_pos, FilterKind::LowPass);
            } else {
                filter_set(&clean, out, filter_pos - 0x20, FilterKind::HighPass);
            }
        }

        Self {
            triangles,
            sawtooths,
            squares,
            white_noise: generate_white_noise(),
        }
    }

    /// The square bank for a filter position (clamped to the generated
    /// range).
    pub fn square_set(&self, filter_pos: i32) -> &[i8] {
        let set = (filter_pos.clamp(1, FILTER_SETS as i32) - 1) as usize;
        &self.squares[set * SQUARE_SET_LEN..(set + 1) * SQUARE_SET_LEN]
    }
}

/// Triangle over `out.len()` samples: quarter up, half down, quarter back.
fn generate_triangle(out: &mut [i8]) {
    let len = out.len() as i32;
    let quarter = len / 4;
    for (i, slot) in out.iter_mut().enumerate() {
        let i = i as i32;
        let value = if i < quarter {
            i * 127 / quarter
        } else if i < 3 * quarter {
            127 - (i - quarter) * 255 / (2 * quarter)
        } else {
            -128 + (i - 3 * quarter) * 127 / quarter
        };
        *slot = value.clamp(-128, 127) as i8;
    }
}

/// Rising ramp from -128 to 127.
fn generate_sawtooth(out: &mut [i8]) {
    let len = out.len() as i32;
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = (-128 + (i as i32) * 255 / (len - 1)).clamp(-128, 127) as i8;
    }
}

/// The clean square bank: duty index `i` holds a pulse whose low run is
/// `2 * (i + 1)` bytes of the 0x80-byte cycle.
fn generate_squares() -> Vec<i8> {
    let mut out = vec![0i8; SQUARE_SET_LEN];
    for duty in 0..SQUARE_DUTIES {
        let low_run = 2 * (duty + 1);
        let wave = &mut out[duty * SQUARE_LEN..(duty + 1) * SQUARE_LEN];
        for (i, slot) in wave.iter_mut().enumerate() {
            *slot = if i < low_run { -0x80 } else { 0x7F };
        }
    }
    out
}

#[derive(Copy, Clone)]
enum FilterKind {
    LowPass,
    HighPass,
}

/// One-pole filter applied per square, iterated `strength` times. The wave
/// is processed circularly (one warm-up lap) so the loop point stays
/// seamless.
fn filter_set(clean: &[i8], out: &mut [i8], strength: usize, kind: FilterKind) {
    // Fixed-point coefficient in 1/256ths; stronger sets smooth harder.
    let alpha = (256 / (strength as i32 + 1)).max(4);
    for duty in 0..SQUARE_DUTIES {
        let src = &clean[duty * SQUARE_LEN..(duty + 1) * SQUARE_LEN];
        let dst = &mut out[duty * SQUARE_LEN..(duty + 1) * SQUARE_LEN];

        let mut state = src[SQUARE_LEN - 1] as i32;
        for lap in 0..2 {
            for (i, &sample) in src.iter().enumerate() {
                state += (sample as i32 - state) * alpha / 256;
                if lap == 1 {
                    let value = match kind {
                        FilterKind::LowPass => state,
                        FilterKind::HighPass => sample as i32 - state,
                    };
                    dst[i] = value.clamp(-128, 127) as i8;
                }
            }
        }
    }
}

/// Deterministic white-noise pool from a 32-bit xorshift.
fn generate_white_noise() -> Vec<i8> {
    let mut out = Vec::with_capacity(NOISE_LEN);
    let mut state: u32 = 0x4159_5321;
    for _ in 0..NOISE_LEN {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        out.push(state as i8);
    }
    out
}
