use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Lock-free flag block shared between a CPU's executor and external
/// observers.
///
/// Each CPU instance owns an `Arc<CpuSignals>` and hands out clones. The
/// executor's hot loop only ever performs plain atomic loads on these; all
/// mutation from the observer side goes through the reset handshake so that
/// architectural state is only sampled at instruction boundaries.
pub struct CpuSignals {
    /// Cleared to stop the executor at the next instruction boundary (or by
    /// a halting opcode: KIL on 6502, the undefined-opcode policy on x86).
    pub running: AtomicBool,
    /// Set while the CPU sits in a halt state (Z80 HALT, x86 HLT).
    pub halted: AtomicBool,
    /// Set for the duration of `execute()`. Observers check this before
    /// waiting on the handshake; a dead executor never acknowledges.
    pub executing: AtomicBool,
    /// Level-triggered maskable interrupt request line.
    pub irq_pending: AtomicBool,
    /// Non-maskable interrupt line level. Edge detection is done by the CPU
    /// with an atomic swap against its stored previous level.
    pub nmi_line: AtomicBool,
    /// Latched NMI edge awaiting service.
    pub nmi_pending: AtomicBool,
    /// 6502 RDY line: while low the CPU stalls without advancing PC.
    pub rdy_line: AtomicBool,
    /// Observer requests the executor to pause at an instruction boundary.
    pub resetting: AtomicBool,
    /// Executor acknowledges the pause; architectural state is stable until
    /// `resetting` clears.
    pub reset_ack: AtomicBool,
    /// Z80 IM 0 / IM 2 interrupt data-bus latch.
    pub irq_vector: AtomicU8,
}

impl Default for CpuSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSignals {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            halted: AtomicBool::new(false),
            executing: AtomicBool::new(false),
            irq_pending: AtomicBool::new(false),
            nmi_line: AtomicBool::new(false),
            nmi_pending: AtomicBool::new(false),
            rdy_line: AtomicBool::new(true),
            resetting: AtomicBool::new(false),
            reset_ack: AtomicBool::new(false),
            irq_vector: AtomicU8::new(0),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Executor side of the pause handshake, called once per instruction
    /// boundary. Publishes the acknowledge and spins (yielding) until the
    /// observer releases the pause.
    #[inline]
    pub fn service_pause(&self) {
        if !self.resetting.load(Ordering::Acquire) {
            return;
        }
        self.reset_ack.store(true, Ordering::Release);
        while self.resetting.load(Ordering::Acquire) {
            std::thread::yield_now();
        }
        self.reset_ack.store(false, Ordering::Release);
    }

    /// Observer side: request a pause and wait for the executor to
    /// acknowledge. Returns false (without waiting forever) when no executor
    /// is live, in which case state may be inspected directly.
    pub fn begin_observation(&self) -> bool {
        self.resetting.store(true, Ordering::Release);
        while !self.reset_ack.load(Ordering::Acquire) {
            if !self.executing.load(Ordering::Acquire) {
                self.resetting.store(false, Ordering::Release);
                return false;
            }
            std::thread::yield_now();
        }
        true
    }

    /// Observer side: release a pause previously entered with
    /// [`begin_observation`](Self::begin_observation).
    pub fn end_observation(&self) {
        self.resetting.store(false, Ordering::Release);
    }
}
