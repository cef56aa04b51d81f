//! AY/ZXAYEMUL playback driver.
//!
//! A Z80 core executes the song's embedded bytecode against a synthetic
//! 64 KiB machine whose only peripheral is the PSG port decoder. A
//! hand-assembled boot stub calls the song's init routine, then loops over
//! EI/HALT with the interrupt routine wired in; the per-frame driver
//! asserts one interrupt per frame and captures every decoded PSG register
//! write as a sample-stamped event.

use std::fmt;

use chroma_core::core::Bus;
use chroma_core::cpu::Z80;
use chroma_formats::ay::{AyFile, AySong};

/// One captured PSG register write, stamped with the output sample index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsgEvent {
    pub sample: u64,
    pub reg: u8,
    pub value: u8,
}

/// Host system variants with distinct PSG port maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AySystem {
    Spectrum,
    Cpc,
    Msx,
}

#[derive(Debug)]
pub enum AyPlayerError {
    SongIndexOutOfRange { index: usize, count: usize },
    ZeroSampleRate,
    ZeroClock,
    ZeroFrameRate,
    /// A song block runs past the 64 KiB Z80 address space.
    BlockOutOfRange { addr: u16, len: usize },
}

impl fmt::Display for AyPlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SongIndexOutOfRange { index, count } => {
                write!(f, "song index {index} out of range ({count} available)")
            }
            Self::ZeroSampleRate => write!(f, "sample rate must be positive"),
            Self::ZeroClock => write!(f, "Z80 clock must be positive"),
            Self::ZeroFrameRate => write!(f, "frame rate must be positive"),
            Self::BlockOutOfRange { addr, len } => write!(
                f,
                "song block at 0x{addr:04X} ({len} bytes) exceeds the 64 KiB address space"
            ),
        }
    }
}

impl std::error::Error for AyPlayerError {}

struct RawWrite {
    cycle: u64,
    reg: u8,
    value: u8,
}

/// The synthetic machine: flat RAM plus the PSG port decoder. Every
/// decoded write (register select included) is recorded with the current
/// cycle stamp and the post-write selected register.
struct AyBus {
    ram: Box<[u8; 0x10000]>,
    system: AySystem,
    selected_reg: u8,
    regs: [u8; 16],
    /// CPC PPI data latch.
    cpc_latch: u8,
    now_cycle: u64,
    events: Vec<RawWrite>,
}

impl AyBus {
    fn new(system: AySystem) -> Self {
        Self {
            ram: Box::new([0; 0x10000]),
            system,
            selected_reg: 0,
            regs: [0; 16],
            cpc_latch: 0,
            now_cycle: 0,
            events: Vec::new(),
        }
    }

    fn record(&mut self, value: u8) {
        self.events.push(RawWrite {
            cycle: self.now_cycle,
            reg: self.selected_reg,
            value,
        });
    }

    fn psg_select(&mut self, value: u8) {
        self.selected_reg = value & 0x0F;
        self.record(value);
    }

    fn psg_write(&mut self, value: u8) {
        self.regs[self.selected_reg as usize] = value;
        self.record(value);
    }
}

impl Bus for AyBus {
    type Address = u16;

    fn read(&mut self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.ram[addr as usize] = data;
    }

    fn io_read(&mut self, port: u16) -> u8 {
        match self.system {
            AySystem::Spectrum if port & 0x00FF == 0x00FD && port & 0xC000 == 0xC000 => {
                self.regs[self.selected_reg as usize]
            }
            AySystem::Msx if port & 0x00FF == 0x00A2 => self.regs[self.selected_reg as usize],
            _ => 0xFF,
        }
    }

    fn io_write(&mut self, port: u16, data: u8) {
        match self.system {
            AySystem::Spectrum => {
                // Select on C?FD, data on the same pattern with bit 14 low.
                if port & 0x00FF == 0x00FD {
                    match port & 0xC000 {
                        0xC000 => self.psg_select(data),
                        0x8000 => self.psg_write(data),
                        _ => {}
                    }
                }
            }
            AySystem::Cpc => {
                // 8255 dance: the data byte latches through port F4, port
                // F6 strobes it as a select (0xC0) or a write (0x80).
                match port >> 8 {
                    0xF4 => self.cpc_latch = data,
                    0xF6 => match data & 0xC0 {
                        0xC0 => {
                            let latch = self.cpc_latch;
                            self.psg_select(latch);
                        }
                        0x80 => {
                            let latch = self.cpc_latch;
                            self.psg_write(latch);
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
            AySystem::Msx => match port & 0x00FF {
                0xA0 => self.psg_select(data),
                0xA1 => self.psg_write(data),
                _ => {}
            },
        }
    }
}

/// Classify the host system by scanning the bytecode for `LD A,n` followed
/// by `OUT (n),A` and matching the port constant. Data bytes regularly
/// contain stray 0xD3s, hence the required load in front.
fn detect_system(song: &AySong) -> AySystem {
    for block in &song.blocks {
        for window in block.data.windows(4) {
            if window[0] == 0x3E && window[2] == 0xD3 {
                match window[3] {
                    0xA0 | 0xA1 => return AySystem::Msx,
                    0xF4 | 0xF6 => return AySystem::Cpc,
                    0xFD => return AySystem::Spectrum,
                    _ => {}
                }
            }
        }
    }
    AySystem::Spectrum
}

pub struct AyPlayer {
    cpu: Z80,
    bus: AyBus,
    sample_rate: u32,
    z80_clock: u64,
    frame_rate: u32,
    /// PC of the stub's HALT, where the machine idles between frames.
    idle_pc: u16,
    sample_acc: u64,
    total_samples: u64,
}

impl AyPlayer {
    /// Assemble the machine for one song of the archive. The init routine
    /// runs to its first idle HALT here, so the first rendered frame starts
    /// at the interrupt loop; init-time PSG writes are not events.
    pub fn new(
        file: &AyFile,
        song_index: usize,
        sample_rate: u32,
        z80_clock_hz: u64,
        frame_rate: u32,
    ) -> Result<Self, AyPlayerError> {
        if sample_rate == 0 {
            return Err(AyPlayerError::ZeroSampleRate);
        }
        if z80_clock_hz == 0 {
            return Err(AyPlayerError::ZeroClock);
        }
        if frame_rate == 0 {
            return Err(AyPlayerError::ZeroFrameRate);
        }
        let song = file
            .songs
            .get(song_index)
            .ok_or(AyPlayerError::SongIndexOutOfRange {
                index: song_index,
                count: file.songs.len(),
            })?;

        let mut bus = AyBus::new(detect_system(song));
        log::debug!(
            "ay: song {song_index} \"{}\" on {:?}",
            song.name,
            bus.system
        );

        // RAM image per player version: v3 images expect RETs across the
        // bottom page and 0xFF fill below 0x4000.
        if file.player_version >= 3 {
            bus.ram[0x0000..0x0100].fill(0xC9);
            bus.ram[0x0100..0x4000].fill(0xFF);
        } else {
            bus.ram[0x0000..0x0100].fill(0xC9);
        }

        for block in &song.blocks {
            let start = block.addr as usize;
            if start + block.data.len() > 0x10000 {
                return Err(AyPlayerError::BlockOutOfRange {
                    addr: block.addr,
                    len: block.data.len(),
                });
            }
            bus.ram[start..start + block.data.len()].copy_from_slice(&block.data);
        }

        let init = if song.points.init != 0 {
            song.points.init
        } else {
            song.blocks.first().map(|b| b.addr).unwrap_or(0)
        };
        let interrupt = song.points.interrupt;

        // Boot stub at 0: DI; CALL init; then the idle loop.
        let mut stub = vec![0xF3, 0xCD, init as u8, (init >> 8) as u8];
        let loop_start = stub.len();
        if interrupt == 0 {
            stub.extend_from_slice(&[0xED, 0x5E]); // IM 2
        } else {
            stub.extend_from_slice(&[0xED, 0x56]); // IM 1
        }
        stub.push(0xFB); // EI
        let idle_pc = stub.len() as u16;
        stub.push(0x76); // HALT
        if interrupt != 0 {
            stub.extend_from_slice(&[0xCD, interrupt as u8, (interrupt >> 8) as u8]);
        }
        // JR back to the IM/EI/HALT point.
        let displacement = loop_start as i32 - (stub.len() as i32 + 2);
        stub.push(0x18);
        stub.push(displacement as u8);
        bus.ram[..stub.len()].copy_from_slice(&stub);

        let mut cpu = Z80::new();
        cpu.reset();
        cpu.a = song.hi_reg;
        cpu.b = song.hi_reg;
        cpu.d = song.hi_reg;
        cpu.h = song.hi_reg;
        cpu.f = song.lo_reg;
        cpu.c = song.lo_reg;
        cpu.e = song.lo_reg;
        cpu.l = song.lo_reg;
        cpu.a_prime = song.hi_reg;
        cpu.b_prime = song.hi_reg;
        cpu.d_prime = song.hi_reg;
        cpu.h_prime = song.hi_reg;
        cpu.f_prime = song.lo_reg;
        cpu.c_prime = song.lo_reg;
        cpu.e_prime = song.lo_reg;
        cpu.l_prime = song.lo_reg;
        cpu.sp = if song.points.stack != 0 {
            song.points.stack
        } else {
            0xFFFF
        };
        cpu.i = 3;
        cpu.im = 0;
        cpu.iff1 = false;
        cpu.iff2 = false;
        cpu.pc = 0;
        cpu.set_irq_vector(0x00);

        let mut player = Self {
            cpu,
            bus,
            sample_rate,
            z80_clock: z80_clock_hz,
            frame_rate,
            idle_pc,
            sample_acc: 0,
            total_samples: 0,
        };
        player.run_init();
        Ok(player)
    }

    pub fn system(&self) -> AySystem {
        self.bus.system
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Drive the boot stub through DI/CALL init until the machine first
    /// idles, then discard whatever the init routine wrote.
    fn run_init(&mut self) {
        // Two seconds of CPU time is far beyond any real init routine.
        let budget = self.z80_clock * 2;
        while self.cpu.cycles < budget && !(self.cpu.halted() && self.cpu.pc == self.idle_pc) {
            self.bus.now_cycle = self.cpu.cycles;
            self.cpu.step(&mut self.bus);
        }
        self.bus.events.clear();
    }

    /// Run `count` frames; returns the captured PSG events in sample order
    /// and the total sample count so far.
    pub fn render_frames(&mut self, count: u32) -> (Vec<PsgEvent>, u64) {
        let mut events = Vec::new();
        for _ in 0..count {
            self.run_frame(&mut events);
        }
        (events, self.total_samples)
    }

    fn run_frame(&mut self, events: &mut Vec<PsgEvent>) {
        let budget = self.z80_clock / self.frame_rate as u64;
        let frame_start = self.cpu.cycles;
        let mut irq_asserted = false;
        let mut serviced = false;

        while self.cpu.cycles - frame_start < budget {
            if self.cpu.halted() && !irq_asserted {
                self.cpu.set_irq_line(true);
                irq_asserted = true;
            }
            let iff1_before = self.cpu.iff1;
            self.bus.now_cycle = self.cpu.cycles;
            self.cpu.step(&mut self.bus);
            if irq_asserted && iff1_before && !self.cpu.iff1 {
                self.cpu.set_irq_line(false);
                serviced = true;
            }
            if serviced && self.cpu.halted() && self.cpu.pc == self.idle_pc {
                break;
            }
        }
        // Over-budget interrupt routines stop getting driven; drop the line
        // and move on.
        self.cpu.set_irq_line(false);

        for write in self.bus.events.drain(..) {
            let delta = write.cycle.saturating_sub(frame_start);
            let sample = self.total_samples + delta * self.sample_rate as u64 / self.z80_clock;
            events.push(PsgEvent {
                sample,
                reg: write.reg,
                value: write.value,
            });
        }

        // Fraction-free sample advance.
        self.sample_acc += self.sample_rate as u64;
        let step = self.sample_acc / self.frame_rate as u64;
        self.total_samples += step;
        self.sample_acc -= step * self.frame_rate as u64;
    }
}
