//! Playback drivers built on the emulation core: the AHX tracker replayer
//! with its waveform tables and mixer, and the AY/ZXAYEMUL Z80 driver with
//! PSG event capture.

pub mod ahx;
pub mod ay;
pub mod mixer;
pub mod waves;

pub use ahx::AhxReplayer;
pub use ay::{AyPlayer, AyPlayerError, AySystem, PsgEvent};
pub use mixer::AhxMixer;
pub use waves::Waves;
