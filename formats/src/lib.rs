//! Container parsers for the music formats the players consume:
//! ZXAYEMUL (`.ay`) archives of Z80-driven PSG music, and AHX (`THX`)
//! tracker songs.

pub mod ahx;
pub mod ay;

pub use ahx::{AhxFile, AhxFormatError, AhxInstrument, AhxPosition, AhxStep};
pub use ay::{AyBlock, AyFile, AyFormatError, AyPoints, AySong};
