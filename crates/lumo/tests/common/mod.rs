#![allow(
    dead_code,
    reason = "helpers are shared across test binaries that each use a subset"
)]

use core::future::pending;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tokio::runtime::Runtime;
use tokio::time::sleep;
use url::Url;

use image_pipeline::{
    FetchFuture, Fetcher, ImagePipeline, PipelineConfig, PipelineError, ResolvedSource,
};
use scene::geometry::{anchor_point, parent_origin};
use scene::{NodeHandle, NodeKind, Vector3};
use stage_handler::{FrameRecorder, HeadlessSurface, Stage, StageConfig};

pub fn init_test_logs() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();
}

/// Encode a solid-color PNG of the given dimensions.
pub fn png_bytes(width: u32, height: u32) -> Result<Bytes> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255])))
        .write_to(&mut cursor, ImageFormat::Png)?;
    Ok(Bytes::from(cursor.into_inner()))
}

/// Write a solid-color PNG into `dir` and return its path.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> Result<PathBuf> {
    let path = dir.join(name);
    RgbaImage::from_pixel(width, height, Rgba([40, 200, 90, 255]))
        .save(&path)
        .map_err(|err| anyhow!("writing {}: {err}", path.display()))?;
    Ok(path)
}

/// Wrap encoded image bytes in a `data:` URI; decodes without any fetch.
pub fn data_uri(bytes: &Bytes) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}

/// Convert a local path to a `file://` URI string.
pub fn to_file_url(path: &Path) -> Result<String> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    Url::from_file_path(&canonical)
        .map(|url| url.to_string())
        .map_err(|()| anyhow!("invalid file path for URL: {}", canonical.display()))
}

/// Fetcher serving a fixed payload, counting how often it is asked.
pub struct CountingFetcher {
    hits: AtomicUsize,
    payload: Bytes,
    delay: Option<Duration>,
}

impl CountingFetcher {
    pub fn serving(payload: Bytes) -> Self {
        Self {
            hits: AtomicUsize::new(0),
            payload,
            delay: None,
        }
    }

    /// Like [`serving`](Self::serving), but each fetch sits on the
    /// payload for `delay` first.
    pub fn delayed(payload: Bytes, delay: Duration) -> Self {
        Self {
            hits: AtomicUsize::new(0),
            payload,
            delay: Some(delay),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Fetcher for CountingFetcher {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn fetch<'a>(&'a self, _source: &'a ResolvedSource, _max_bytes: usize) -> FetchFuture<'a> {
        Box::pin(async move {
            self.hits.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                sleep(delay).await;
            }
            Ok(self.payload.clone())
        })
    }
}

/// Fetcher that never completes; requests end by timeout or cancel.
pub struct HangingFetcher;

impl Fetcher for HangingFetcher {
    fn name(&self) -> &'static str {
        "hanging"
    }

    fn fetch<'a>(&'a self, _source: &'a ResolvedSource, _max_bytes: usize) -> FetchFuture<'a> {
        Box::pin(pending())
    }
}

/// Fetcher that fails every request at the network stage.
pub struct FailingFetcher;

impl Fetcher for FailingFetcher {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn fetch<'a>(&'a self, _source: &'a ResolvedSource, _max_bytes: usize) -> FetchFuture<'a> {
        Box::pin(async { Err(PipelineError::Network(String::from("connection refused"))) })
    }
}

/// Stage configuration tuned for tests: tight frame budget, explicit
/// fetch deadline.
pub fn test_config(fetch_timeout: Duration) -> StageConfig {
    StageConfig {
        frame_budget_ms: 1,
        fetch_timeout_ms: fetch_timeout.as_millis() as u64,
        ..StageConfig::default()
    }
}

/// A headless stage over the default network fetcher.
pub fn headless_stage(width: u32, height: u32) -> (Stage, FrameRecorder) {
    let surface = HeadlessSurface::new(width, height);
    let recorder = surface.recorder();
    let stage = Stage::new(test_config(Duration::from_secs(5)), Box::new(surface));
    (stage, recorder)
}

/// A headless stage whose pipeline fetches through `fetcher`.
pub fn stage_with_fetcher(
    width: u32,
    height: u32,
    fetch_timeout: Duration,
    fetcher: Arc<dyn Fetcher>,
) -> (Stage, FrameRecorder) {
    let surface = HeadlessSurface::new(width, height);
    let recorder = surface.recorder();
    let pipeline = ImagePipeline::with_fetcher(
        PipelineConfig {
            fetch_timeout,
            ..PipelineConfig::default()
        },
        fetcher,
    );
    let stage = Stage::with_pipeline(test_config(fetch_timeout), Box::new(surface), pipeline);
    (stage, recorder)
}

/// A 100x100 top-left anchored image view at `position`, attached to the
/// root with `uri` as its source.
pub fn add_image_view(stage: &mut Stage, uri: &str, position: Vector3) -> Result<NodeHandle> {
    let scene = stage.scene_mut();
    let view = scene.create_node(NodeKind::ImageView);
    scene.set_parent_origin(view, parent_origin::TOP_LEFT)?;
    scene.set_anchor_point(view, anchor_point::TOP_LEFT)?;
    scene.set_size(view, Vector3::new(100.0, 100.0, 0.0))?;
    scene.set_position(view, position)?;
    scene.set_image_source(view, uri)?;
    stage.add(view)?;
    Ok(view)
}

/// Tick the stage until `done` holds, yielding between frames so worker
/// tasks can progress. Returns false if the condition never held.
pub fn tick_until<F>(rt: &Runtime, stage: &mut Stage, mut done: F) -> Result<bool>
where
    F: FnMut(&Stage) -> bool,
{
    for _ in 0..1_000 {
        rt.block_on(async { stage.tick() })?;
        if done(stage) {
            return Ok(true);
        }
        thread::sleep(Duration::from_millis(2));
    }
    Ok(false)
}

/// Run a handful of extra frames so deferred rebuilds land.
pub fn settle_frames(rt: &Runtime, stage: &mut Stage, frames: u32) -> Result<()> {
    for _ in 0..frames {
        thread::sleep(Duration::from_millis(2));
        rt.block_on(async { stage.tick() })?;
    }
    Ok(())
}
