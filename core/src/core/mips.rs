use std::time::Instant;

/// Windowed instructions-per-second meter for executor loops.
///
/// Executors feed it retired-instruction counts; once a second it reports
/// the rate through the log facade and starts a new window.
pub struct MipsReporter {
    window_start: Instant,
    instructions: u64,
    label: &'static str,
}

impl MipsReporter {
    pub fn new(label: &'static str) -> Self {
        Self {
            window_start: Instant::now(),
            instructions: 0,
            label,
        }
    }

    /// Credit `count` retired instructions; logs and resets when the
    /// current window is at least a second old.
    pub fn record(&mut self, count: u64) {
        self.instructions += count;
        let elapsed = self.window_start.elapsed();
        if elapsed.as_secs() >= 1 {
            log::info!("{}: {:.2} MIPS", self.label, self.mips());
            self.window_start = Instant::now();
            self.instructions = 0;
        }
    }

    /// Instantaneous rate over the current window, in millions of
    /// instructions per second.
    pub fn mips(&self) -> f64 {
        let seconds = self.window_start.elapsed().as_secs_f64();
        if seconds <= 0.0 {
            return 0.0;
        }
        self.instructions as f64 / seconds / 1_000_000.0
    }
}
