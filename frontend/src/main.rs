//! `chroma`; play and inspect AHX and AY music through the emulation
//! core: render AHX songs to WAV, dump AY PSG event streams, print
//! container metadata.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use chroma_formats::ahx::AhxFile;
use chroma_formats::ay::AyFile;
use chroma_players::{AhxMixer, AhxReplayer, AyPlayer};

/// Default Z80 clock: the 128K Spectrum.
const ZX_CLOCK_HZ: u64 = 3_546_900;

#[derive(Parser)]
#[command(name = "chroma", about = "Retro music playback via CPU emulation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render an AHX song to a 16-bit mono WAV file.
    Render {
        song: PathBuf,
        output: PathBuf,
        /// Subsong index (0 = main sequence).
        #[arg(long, default_value_t = 0)]
        subsong: usize,
        /// Output sample rate.
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
        /// Hard cap on the rendered length in seconds.
        #[arg(long, default_value_t = 600)]
        seconds: u32,
    },

    /// Run an AY file under Z80 emulation and print its PSG event stream.
    Events {
        file: PathBuf,
        /// Song index within the archive.
        #[arg(long, default_value_t = 0)]
        song: usize,
        /// Number of 1/frame-rate frames to run.
        #[arg(long, default_value_t = 250)]
        frames: u32,
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
        #[arg(long, default_value_t = 50)]
        frame_rate: u32,
    },

    /// Print container metadata.
    Info { file: PathBuf },
}

fn main() {
    env_logger::init();
    if let Err(error) = run() {
        eprintln!("chroma: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    match Cli::parse().command {
        Command::Render {
            song,
            output,
            subsong,
            sample_rate,
            seconds,
        } => render(&song, &output, subsong, sample_rate, seconds),
        Command::Events {
            file,
            song,
            frames,
            sample_rate,
            frame_rate,
        } => events(&file, song, frames, sample_rate, frame_rate),
        Command::Info { file } => info(&file),
    }
}

fn render(
    song_path: &PathBuf,
    output: &PathBuf,
    subsong: usize,
    sample_rate: u32,
    seconds: u32,
) -> Result<(), Box<dyn Error>> {
    let song = AhxFile::parse(&std::fs::read(song_path)?)?;
    let name = song.name.clone();

    let mut replayer = AhxReplayer::new();
    replayer.init_song(song);
    if !replayer.init_subsong(subsong) {
        return Err(format!("subsong {subsong} out of range").into());
    }

    let mut mixer = AhxMixer::new(sample_rate);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output, spec)?;

    let max_ticks = seconds as u64 * replayer.tick_rate() as u64;
    let mut buffer = Vec::new();
    let mut ticks = 0u64;
    while !replayer.song_end_reached && ticks < max_ticks {
        replayer.play_irq();
        buffer.clear();
        mixer.render_tick(&replayer, &mut buffer);
        for &sample in &buffer {
            writer.write_sample(sample)?;
        }
        ticks += 1;
    }
    writer.finalize()?;

    log::info!("rendered \"{name}\" in {ticks} ticks");
    println!(
        "{}: {} ticks -> {}",
        name,
        ticks,
        output.display()
    );
    Ok(())
}

fn events(
    file_path: &PathBuf,
    song: usize,
    frames: u32,
    sample_rate: u32,
    frame_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let file = AyFile::parse(&std::fs::read(file_path)?)?;
    let mut player = AyPlayer::new(&file, song, sample_rate, ZX_CLOCK_HZ, frame_rate)?;

    let (events, total_samples) = player.render_frames(frames);
    println!("# system: {:?}", player.system());
    println!("# sample reg value");
    for event in &events {
        println!("{} {:#04X} {:#04X}", event.sample, event.reg, event.value);
    }
    println!("# {} events over {total_samples} samples", events.len());
    Ok(())
}

fn info(file_path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let data = std::fs::read(file_path)?;
    if data.starts_with(b"ZXAYEMUL") {
        let file = AyFile::parse(&data)?;
        println!("ZXAYEMUL v{} (player v{})", file.file_version, file.player_version);
        println!("author: {}", file.author);
        println!("misc:   {}", file.misc);
        for (i, song) in file.songs.iter().enumerate() {
            println!(
                "song {i}: \"{}\" init={:#06X} interrupt={:#06X} blocks={}",
                song.name,
                song.points.init,
                song.points.interrupt,
                song.blocks.len()
            );
        }
    } else if data.starts_with(b"THX") {
        let song = AhxFile::parse(&data)?;
        println!("AHX revision {}", song.revision);
        println!("name: {}", song.name);
        println!(
            "{} positions, {} tracks, {} instruments, {} subsongs",
            song.position_count(),
            song.tracks.len(),
            song.instrument_count(),
            song.subsongs.len()
        );
        for (i, instrument) in song.instruments.iter().enumerate().skip(1) {
            println!("instrument {i}: \"{}\"", instrument.name);
        }
    } else {
        return Err("unrecognized container (expected ZXAYEMUL or THX)".into());
    }
    Ok(())
}
