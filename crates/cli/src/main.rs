use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use lookahead_video_core::playback::video_playback::VideoPlayback;
use lookahead_video_core::reader::video_reader::VideoReader;
use lookahead_video_core::shared::video_metadata::VideoMetadata;
use lookahead_video_core::video::domain::image_writer::ImageWriter;
use lookahead_video_core::video::infrastructure::ffmpeg_codec::FfmpegCodec;
use lookahead_video_core::video::infrastructure::image_file_writer::ImageFileWriter;
use lookahead_video_core::video::infrastructure::rgba_converter::RgbaConverter;

/// Reads video frames through a background look-ahead decoder.
#[derive(Parser)]
#[command(name = "lookahead-video")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Frame to start reading from.
    #[arg(long, default_value = "0")]
    start_frame: usize,

    /// Frames to read from the start and after each seek (default: to the end).
    #[arg(long)]
    max_frames: Option<usize>,

    /// Jump to this frame after the previous run of reads (repeatable).
    #[arg(long)]
    seek_to: Vec<usize>,

    /// Save every frame read as PNG into this directory.
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Simulate playback for this many seconds instead of reading.
    #[arg(long)]
    play_sec: Option<f64>,

    /// Tick rate of the simulated playback loop.
    #[arg(long, default_value = "60.0")]
    tick_fps: f64,

    /// Loop playback at the end of the video.
    #[arg(long = "loop")]
    looping: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut reader = VideoReader::new(FfmpegCodec::new, Arc::new(RgbaConverter::new()));
    print_metadata(reader.open(&cli.input)?);

    match cli.play_sec {
        Some(play_sec) => run_playback(reader, play_sec, cli.tick_fps, cli.looping),
        None => run_sequential(&mut reader, &cli),
    }
}

fn print_metadata(metadata: &VideoMetadata) {
    println!("File:        {}", metadata.source_path.display());
    println!("Size:        {}x{}", metadata.width, metadata.height);
    println!("FPS:         {:.3}", metadata.fps);
    if metadata.frame_count > 0 {
        println!("Frames:      {}", metadata.frame_count);
        println!("Length:      {:.3} s", metadata.length_sec());
    } else {
        println!("Frames:      unknown");
    }
}

fn run_sequential(reader: &mut VideoReader, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let dump: Option<(Box<dyn ImageWriter>, &Path)> = cli
        .dump_dir
        .as_deref()
        .map(|dir| (Box::new(ImageFileWriter::new()) as Box<dyn ImageWriter>, dir));
    let started = Instant::now();
    let mut total = 0;

    let starts = std::iter::once(cli.start_frame).chain(cli.seek_to.iter().copied());
    for start in starts {
        reader.set_current_frame_index(start);
        let dump = dump.as_ref().map(|(writer, dir)| (&**writer, *dir));
        let read = read_run(reader, cli.max_frames, dump)?;
        log::info!("Read {read} frames from frame {start}");
        total += read;
    }
    eprintln!();

    let elapsed = started.elapsed().as_secs_f64();
    let throughput = if elapsed > 0.0 {
        total as f64 / elapsed
    } else {
        0.0
    };
    println!("Read {total} frames in {elapsed:.3} s ({throughput:.1} fps)");
    if let Some(reason) = reader.end_reason() {
        println!("Stopped at frame {}: {reason:?}", reader.current_frame_index());
    }
    if let Some(dir) = &cli.dump_dir {
        log::info!("Frames written to {}", dir.display());
    }
    Ok(())
}

/// Reads up to `limit` frames from the cursor, saving each into the dump
/// directory when given. Returns how many were read.
fn read_run(
    reader: &mut VideoReader,
    limit: Option<usize>,
    dump: Option<(&dyn ImageWriter, &Path)>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut read = 0;
    while limit.map_or(true, |limit| read < limit) {
        let Some(frame) = reader.read_frame() else {
            break;
        };
        read += 1;
        eprint!("\rFrame {}/{}", frame.index() + 1, reader.frame_count());

        if let Some((writer, dir)) = dump {
            let path = dir.join(format!("frame_{:06}.png", frame.index()));
            writer.write(&path, &frame, None)?;
        }
    }
    Ok(read)
}

fn run_playback(
    reader: VideoReader,
    play_sec: f64,
    tick_fps: f64,
    looping: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut playback = VideoPlayback::new(reader, looping)?;
    let tick = 1.0 / tick_fps;
    let ticks = (play_sec * tick_fps).ceil() as usize;

    let started = Instant::now();
    let mut shown = usize::from(playback.current_frame().is_some());
    let mut last = playback.current_frame_index();
    for _ in 0..ticks {
        playback.advance(tick);
        let current = playback.current_frame_index();
        if current != last {
            shown += 1;
            last = current;
        }
    }

    println!(
        "Played {play_sec:.3} s in {ticks} ticks ({:.3} s wall): {shown} frames shown, clock at {:.3} s, frame {}",
        started.elapsed().as_secs_f64(),
        playback.pos_sec(),
        last.map_or_else(|| "-".to_string(), |index| index.to_string())
    );
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    if !(cli.tick_fps.is_finite() && cli.tick_fps > 0.0) {
        return Err(format!("--tick-fps must be positive, got {}", cli.tick_fps).into());
    }
    if let Some(play_sec) = cli.play_sec {
        if !(play_sec.is_finite() && play_sec > 0.0) {
            return Err(format!("--play-sec must be positive, got {play_sec}").into());
        }
        if !cli.seek_to.is_empty() || cli.dump_dir.is_some() {
            return Err("--play-sec cannot be combined with --seek-to or --dump-dir".into());
        }
    }
    if let Some(dir) = &cli.dump_dir {
        if dir.is_file() {
            return Err(format!("Dump directory is a file: {}", dir.display()).into());
        }
    }
    Ok(())
}
