use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};

use jewelrytrack::{load_recording, Config, TrackingReport, TrackingSession};

#[derive(Parser)]
#[command(
    name = "jewelrytrack",
    about = "Count jewelry moving through a conveyor belt camera",
    version
)]
struct Args {
    /// Path to configuration file (built-in belt profiles when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recorded detections to replay (JSON array of frames)
    #[arg(short, long)]
    detections: Option<PathBuf>,

    /// Video file to run blob detection on
    #[cfg(feature = "vision")]
    #[arg(long, conflicts_with = "detections")]
    video: Option<PathBuf>,

    /// Show the annotated frames while processing the video
    #[cfg(feature = "vision")]
    #[arg(long, requires = "video")]
    visualize: bool,

    /// Write the final report as JSON
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn replay(session: &mut TrackingSession, path: &Path) -> anyhow::Result<()> {
    let frames = load_recording(path)
        .with_context(|| format!("failed to load detections from {:?}", path))?;
    info!("replaying {} frames from {:?}", frames.len(), path);
    for frame in &frames {
        session.process_frame(frame);
    }
    Ok(())
}

#[cfg(feature = "vision")]
fn run_video(session: &mut TrackingSession, path: &Path, visualize: bool) -> anyhow::Result<()> {
    use jewelrytrack::vision::{JewelryDetector, VideoSource};
    use jewelrytrack::visualization;
    use opencv::highgui;

    const WINDOW: &str = "jewelrytrack";

    let mut source = VideoSource::open(path, 640, 480)?;
    let mut detector = JewelryDetector::new()?;
    if visualize {
        highgui::named_window(WINDOW, highgui::WINDOW_NORMAL)?;
    }

    while let Some(mut frame) = source.next_frame()? {
        let detections = detector.detect_frame(&frame, source.frame_no())?;
        session.process_frame(&detections);

        if visualize {
            visualization::draw_session(&mut frame, session)?;
            highgui::imshow(WINDOW, &frame)?;
            // q or Esc stops early
            let key = highgui::wait_key(1)?;
            if key == 'q' as i32 || key == 27 {
                info!("stopped by user at frame {}", source.frame_no());
                break;
            }
        }

        if session.frame_count() % 100 == 0 {
            info!("processed {} frames", session.frame_count());
        }
    }

    if visualize {
        highgui::destroy_all_windows()?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {:?}", path))?,
        None => Config::default(),
    };
    let mut session = TrackingSession::new(&config)?;

    #[cfg(feature = "vision")]
    if let Some(video) = &args.video {
        run_video(&mut session, video, args.visualize)?;
        return finish(&mut session, &args);
    }

    match &args.detections {
        Some(path) => replay(&mut session, path)?,
        None => bail!("nothing to track: pass --detections <file>"),
    }
    finish(&mut session, &args)
}

fn finish(session: &mut TrackingSession, args: &Args) -> anyhow::Result<()> {
    let report: TrackingReport = session.report();
    println!("{}", report);

    if let Some(path) = &args.report {
        report
            .save(path)
            .with_context(|| format!("failed to write report to {:?}", path))?;
        info!("report saved to {:?}", path);
    }
    Ok(())
}
