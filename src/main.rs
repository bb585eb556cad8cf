use std::path::PathBuf;
use std::process::ExitCode;
use std::{panic, process};

use clap::{Arg, Command};
use log::info;

use crate::config::{PlayerConfig, app_name, version};
use crate::display::VideoWindow;
use crate::error::PlayerError;
use crate::media::{BgrConverter, MediaSource, PtsPolicy, StreamDecoder};
use crate::playback::PlaybackSession;

pub mod config;
pub mod display;
pub mod error;
pub mod media;
pub mod playback;

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    // map a panic raised inside the native libraries onto the failure exit
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        process::exit(2);
    }));

    let matches = Command::new(app_name())
        .version(version())
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("Media file to play.")
                .num_args(0..=1),
        )
        .arg(
            Arg::new("pts-policy")
                .long("pts-policy")
                .value_name("POLICY")
                .help("Timestamp driving pacing (best-effort, reordered, decode-order).")
                .value_parser(clap::value_parser!(PtsPolicy))
                .default_value("best-effort"),
        )
        .get_matches();

    let Some(input) = matches.get_one::<String>("input") else {
        eprintln!("Usage: {} <infile>", app_name());
        return ExitCode::from(1);
    };

    let config = PlayerConfig {
        input: PathBuf::from(input),
        pts_policy: matches
            .get_one::<PtsPolicy>("pts-policy")
            .copied()
            .unwrap_or_default(),
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}

fn run(config: PlayerConfig) -> Result<(), PlayerError> {
    let source = MediaSource::open(&config.input)?;
    let info = source.info().clone();

    info!("infile: {}", config.input.display());
    info!("vcodec: {}", info.codec);
    info!("size:   {}x{}", info.width, info.height);
    if let Some(fps) = info.nominal_fps {
        info!("fps:    {fps:.2} [fps]");
    }
    info!("tbase:  {}", info.time_base);
    if let Some(secs) = info.duration_secs {
        info!("length: {secs:.3} [sec]");
    }
    if let Some(frames) = info.frames {
        info!("frames: {frames}");
    }

    let decoder = StreamDecoder::from_source(&source)?;
    let converter = BgrConverter::from_source(&source)?;
    let presenter = VideoWindow::open("press ESC to exit")?;

    let session = PlaybackSession::new(
        source,
        decoder,
        converter,
        presenter,
        info.time_base,
        config.pts_policy,
    );

    let report = session.run()?;
    info!("{} frames decoded", report.frames_presented);

    Ok(())
}
