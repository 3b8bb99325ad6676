use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::GrayImage;
use lanewatch::PipelineConfig;
use lanewatch_lane::{draw_boundaries, LaneAnalyzer};
use log::info;
use ndarray::Array2;

#[derive(Parser)]
#[command(name = "lanewatch", version, about = "Road camera vehicle and lane analysis")]
struct Cli {
    /// JSON configuration; defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the lane model from a lane-probability image and print it.
    Lanes {
        /// Grayscale image, intensity / 255 = lane probability.
        #[arg(long)]
        prob: PathBuf,
        /// 0/255 drivable-area mask of the same size.
        #[arg(long)]
        drivable: Option<PathBuf>,
        /// Frame to draw the overlay on; also fixes the frame size.
        #[arg(long)]
        frame: Option<PathBuf>,
        /// Write the overlay here.
        #[arg(long)]
        overlay: Option<PathBuf>,
        /// Snap boundaries to painted lines.
        #[arg(long)]
        snap: bool,
    },
    /// Print the effective configuration as JSON.
    Config {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the full pipeline over a directory of frames.
    Run {
        #[arg(long)]
        frames: PathBuf,
        /// ONNX model; overrides the configured path.
        #[arg(long)]
        model: Option<PathBuf>,
        /// JSON-lines output; stdout when omitted.
        #[arg(long)]
        records: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::load(p),
        None => Ok(PipelineConfig::default()),
    }
}

fn load_gray(path: &Path) -> Result<GrayImage> {
    Ok(image::open(path).with_context(|| format!("Failed to open image: {:?}", path))?.to_luma8())
}

fn lanes(
    cfg: &PipelineConfig,
    prob: &Path,
    drivable: Option<&Path>,
    frame: Option<&Path>,
    overlay: Option<&Path>,
    snap: bool,
) -> Result<()> {
    let prob_img = load_gray(prob)?;
    let prob_map = Array2::from_shape_fn((prob_img.height() as usize, prob_img.width() as usize), |(y, x)| {
        prob_img.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
    });

    let mut canvas = match frame {
        Some(p) => image::open(p).with_context(|| format!("Failed to open frame: {:?}", p))?.to_rgb8(),
        None => image::DynamicImage::ImageLuma8(prob_img.clone()).to_rgb8(),
    };
    let (w, h) = canvas.dimensions();
    let drive = drivable.map(load_gray).transpose()?;

    let mut lane_cfg = cfg.lanes.clone();
    lane_cfg.snap_to_candidates |= snap;
    let model = LaneAnalyzer::new(lane_cfg).analyze(prob_map.view(), w, h, drive.as_ref())?;

    let summary = serde_json::json!({
        "roi": model.roi,
        "total_lanes": model.total_lanes,
        "ego_lane": model.ego_lane,
        "vanishing_point": [model.vanishing_point.0, model.vanishing_point.1],
        "boundaries": model.boundaries.iter().map(|l| [l.m, l.b]).collect::<Vec<_>>(),
        "polylines": model.boundary_polylines(),
        "candidates": model.candidates.len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(out) = overlay {
        draw_boundaries(&mut canvas, &model, snap);
        canvas.save(out).with_context(|| format!("Failed to write overlay: {:?}", out))?;
        info!("overlay written to {:?}", out);
    }
    Ok(())
}

#[cfg(feature = "tract")]
fn run(cfg: PipelineConfig, frames: &Path, model: Option<PathBuf>, records: Option<PathBuf>) -> Result<()> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use lanewatch::tract_backend::TractInference;
    use lanewatch::{DirectorySource, FramePipeline, JsonLinesSink, ViolationSink};

    let model_path = model
        .or_else(|| cfg.model.path.clone())
        .context("No model given: pass --model or set model.path in the config")?;
    let engine = TractInference::load(&model_path, cfg.decoder.input_size)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let mut source = DirectorySource::open(frames, cfg.fps)?;
    let mut sink: Box<dyn ViolationSink> = match records {
        Some(p) => Box::new(JsonLinesSink::create(&p)?),
        None => Box::new(JsonLinesSink::new(std::io::stdout().lock())),
    };

    let mut pipeline = FramePipeline::new(engine, &cfg);
    let summary = pipeline.run(&mut source, sink.as_mut(), &stop)?;
    if summary.stopped_early {
        info!("stopped by user after {} frames", summary.frames);
    }
    Ok(())
}

#[cfg(not(feature = "tract"))]
fn run(_cfg: PipelineConfig, _frames: &Path, _model: Option<PathBuf>, _records: Option<PathBuf>) -> Result<()> {
    anyhow::bail!("lanewatch was built without the `tract` feature; rebuild with --features tract to run models")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Lanes { prob, drivable, frame, overlay, snap } => {
            lanes(&cfg, &prob, drivable.as_deref(), frame.as_deref(), overlay.as_deref(), snap)
        }
        Command::Config { out } => {
            match out {
                Some(p) => cfg.save(&p)?,
                None => println!("{}", serde_json::to_string_pretty(&cfg)?),
            }
            Ok(())
        }
        Command::Run { frames, model, records } => run(cfg, &frames, model, records),
    }
}
