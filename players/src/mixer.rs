//! Sample renderer for the tracker replayer's four voice buffers.
//!
//! Each voice loops its 0x280-byte waveform buffer at the Amiga rate
//! `PAULA_CLOCK / period`; a per-voice phase accumulator resamples that to
//! the host rate with linear interpolation (the buffer's mirrored extra
//! byte keeps the last segment branch-free).

use crate::ahx::AhxReplayer;

/// PAL Paula clock in Hz.
pub const PAULA_CLOCK: f64 = 3_579_545.25;

pub struct AhxMixer {
    sample_rate: u32,
    phase: [f64; 4],
}

impl AhxMixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            phase: [0.0; 4],
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples produced per replayer tick.
    pub fn samples_per_tick(&self, replayer: &AhxReplayer) -> usize {
        (self.sample_rate / replayer.tick_rate().max(1)) as usize
    }

    /// Render one tick's worth of mono samples into `out`.
    pub fn render_tick(&mut self, replayer: &AhxReplayer, out: &mut Vec<i16>) {
        let count = self.samples_per_tick(replayer);
        out.reserve(count);
        let mut steps = [0.0f64; 4];
        for (v, step) in steps.iter_mut().enumerate() {
            let period = replayer.voices[v].voice_period.max(1) as f64;
            *step = PAULA_CLOCK / period / self.sample_rate as f64;
        }
        for _ in 0..count {
            let mut mixed = 0i32;
            for v in 0..4 {
                let voice = &replayer.voices[v];
                let position = self.phase[v];
                let index = position as usize & 0x27F;
                let fraction = position - position.floor();
                let a = voice.voice_buffer[index] as f64;
                let b = voice.voice_buffer[index + 1] as f64;
                let sample = a + (b - a) * fraction;
                mixed += (sample * voice.voice_volume as f64) as i32;
                self.phase[v] = (self.phase[v] + steps[v]) % 0x280 as f64;
            }
            out.push(mixed.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ahx::AhxReplayer;

    #[test]
    fn constant_buffer_renders_scaled_constant() {
        let mut replayer = AhxReplayer::new();
        for v in 0..4 {
            replayer.voices[v].voice_buffer = [0; 0x281];
            replayer.voices[v].voice_volume = 0;
        }
        replayer.voices[0].voice_buffer = [100; 0x281];
        replayer.voices[0].voice_volume = 0x40;
        replayer.voices[0].voice_period = 0x100;

        let mut mixer = AhxMixer::new(44_100);
        let mut out = Vec::new();
        mixer.render_tick(&replayer, &mut out);
        assert_eq!(out.len(), 44_100 / 50);
        assert!(out.iter().all(|&s| s == 100 * 0x40));
    }
}
