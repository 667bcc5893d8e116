//! Headless demo: a row of image views loaded through the async pipeline.
//!
//! Builds a stage from the standard configuration (optionally a JSON file
//! via `--config`), attaches one 100x100 image view per source URI, runs
//! the render loop for a fixed number of frames, and reports where every
//! request ended up. With no URIs on the command line it renders two
//! generated `data:` images, so the demo works without network or disk.

use std::env;
use std::fs;
use std::io::Cursor;
use std::process::exit;

use anyhow::{Context, Error};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use env_logger::{Builder, Env};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use log::{error, info};
use tokio::runtime::Runtime;

use image_pipeline::ImageRequestState;
use scene::geometry::{anchor_point, parent_origin};
use scene::{NodeKind, Vector3};
use stage_handler::{HeadlessSurface, Stage, StageConfig, frame_stats_json};

struct Options {
    config: StageConfig,
    frames: u64,
    sources: Vec<String>,
}

fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(error) = run() {
        error!("lumo failed: {error:?}");
        exit(1);
    }
}

fn run() -> Result<(), Error> {
    let options = parse_options()?;
    let runtime = Runtime::new()?;
    runtime.block_on(drive(options))
}

/// `lumo [--config <path>] [--frames <count>] [uri ...]`
fn parse_options() -> Result<Options, Error> {
    let mut config_path: Option<String> = None;
    let mut frames: u64 = 120;
    let mut sources: Vec<String> = Vec::new();

    let mut args = env::args();
    let _program = args.next();
    let mut pending_config = false;
    let mut pending_frames = false;
    for arg in args {
        if pending_config {
            config_path = Some(arg);
            pending_config = false;
            continue;
        }
        if pending_frames {
            frames = arg.parse().context("parsing --frames")?;
            pending_frames = false;
            continue;
        }
        if let Some(rest) = arg.strip_prefix("--config=") {
            config_path = Some(rest.to_owned());
            continue;
        }
        if let Some(rest) = arg.strip_prefix("--frames=") {
            frames = rest.parse().context("parsing --frames")?;
            continue;
        }
        if arg == "--config" {
            pending_config = true;
            continue;
        }
        if arg == "--frames" {
            pending_frames = true;
            continue;
        }
        sources.push(arg);
    }

    let config = match config_path {
        Some(path) => {
            let text = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            StageConfig::from_json(&text)?.with_env_overrides()
        }
        None => StageConfig::from_env(),
    };
    if sources.is_empty() {
        sources = demo_sources()?;
    }
    Ok(Options {
        config,
        frames,
        sources,
    })
}

async fn drive(options: Options) -> Result<(), Error> {
    let surface = HeadlessSurface::from_config(&options.config);
    let recorder = surface.recorder();
    let mut stage = Stage::new(options.config, Box::new(surface));

    let mut views = Vec::new();
    for (index, source) in options.sources.iter().enumerate() {
        let scene = stage.scene_mut();
        let view = scene.create_node(NodeKind::ImageView);
        scene.set_parent_origin(view, parent_origin::TOP_LEFT)?;
        scene.set_anchor_point(view, anchor_point::TOP_LEFT)?;
        scene.set_size(view, Vector3::new(100.0, 100.0, 0.0))?;
        scene.set_position(view, Vector3::new(100.0 * index as f32, 0.0, 0.0))?;
        scene.set_image_source(view, source.as_str())?;
        stage.add(view)?;
        views.push(view);
    }

    stage.run_frames(options.frames).await?;

    for (index, view) in views.iter().enumerate() {
        match stage.node_image_state(*view) {
            Some(ImageRequestState::Ready(handle)) => {
                info!("view {index}: ready ({}x{})", handle.width(), handle.height());
            }
            Some(state) => info!("view {index}: {state:?}"),
            None => info!("view {index}: no image bound"),
        }
    }
    let stats = stage.tick()?;
    info!("presented {} frame(s): {}", recorder.frame_count(), frame_stats_json(&stats));
    Ok(())
}

/// Two solid-color PNGs as `data:` URIs.
fn demo_sources() -> Result<Vec<String>, Error> {
    [[230, 90, 60, 255], [60, 120, 230, 255]]
        .into_iter()
        .map(|rgba| data_uri_png(RgbaImage::from_pixel(64, 64, Rgba(rgba))))
        .collect()
}

fn data_uri_png(pixels: RgbaImage) -> Result<String, Error> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(pixels).write_to(&mut cursor, ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        BASE64.encode(cursor.into_inner())
    ))
}
