use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Error;
use bytes::Bytes;
use log::{debug, info, trace, warn};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::info_span;

use image_pipeline::{
    ImagePipeline, ImageRequestState, PipelineConfig, PipelineEvent, TextureHandle, resolve,
};
use scene::{
    Color, ImageSource, LayoutSnapshot, NodeHandle, NodeKind, SceneError, SceneGraph, SceneUpdate,
    Vector3, compute_layout,
};

use crate::config::StageConfig;
use crate::display_list::{DisplayItem, DisplayList, DisplayListDiff};
use crate::scheduler::FrameScheduler;
use crate::surface::{FrameSubmission, SurfaceBinding, Viewport, viewports_for};
use crate::telemetry::{self, FrameStats};

/// What one image-view node currently holds.
enum ImageBinding {
    /// Keyed into the pipeline's shared cache and in-flight tables.
    Remote {
        key: String,
        state: ImageRequestState,
    },
    /// Application-provided pixels uploaded straight to the store,
    /// invisible to the cache.
    Raw { handle: TextureHandle },
}

impl ImageBinding {
    fn state(&self) -> ImageRequestState {
        match self {
            Self::Remote { state, .. } => state.clone(),
            Self::Raw { handle } => ImageRequestState::Ready(*handle),
        }
    }

    fn ready_handle(&self) -> Option<TextureHandle> {
        match self.state() {
            ImageRequestState::Ready(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Requests the render loop to stop after its current frame.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The retained scene, its image pipeline, and the frame loop driving both.
///
/// All mutation funnels through here: callers edit the scene between
/// frames, and [`tick`](Stage::tick) applies everything that queued up,
/// drains pipeline completions, and submits one frame to the surface. A
/// node's visual state therefore never changes between the layout pass and
/// the submission of the frame it was laid out for.
pub struct Stage {
    scene: SceneGraph,
    pipeline: ImagePipeline,
    surface: Box<dyn SurfaceBinding>,
    scheduler: FrameScheduler,
    /// Texture bookkeeping per image-view node with a bound source.
    bindings: HashMap<NodeHandle, ImageBinding>,
    background: Color,
    transparent: bool,
    viewports: Vec<Viewport>,
    display_list: DisplayList,
    /// Nodes placed by the most recent layout pass.
    layout_nodes: u64,
    frame_index: u64,
    /// Set when scene or texture state changed and the retained display
    /// list no longer reflects it.
    needs_rebuild: bool,
    telemetry_enabled: bool,
    shutdown: Arc<AtomicBool>,
}

impl Stage {
    /// Build a stage over the given surface. The scene root spans the
    /// surface and is immutable thereafter; pipeline knobs come from the
    /// configuration.
    #[must_use]
    pub fn new(config: StageConfig, surface: Box<dyn SurfaceBinding>) -> Self {
        let pipeline = ImagePipeline::new(PipelineConfig {
            fetch_timeout: config.fetch_timeout(),
            max_fetch_bytes: config.max_fetch_bytes,
            ..PipelineConfig::default()
        });
        Self::with_pipeline(config, surface, pipeline)
    }

    /// [`new`](Self::new) with a caller-built pipeline, so tests can
    /// inject counting or failing fetchers.
    #[must_use]
    pub fn with_pipeline(
        config: StageConfig,
        surface: Box<dyn SurfaceBinding>,
        pipeline: ImagePipeline,
    ) -> Self {
        let (width, height) = surface.dimensions();
        let background = if config.background.is_some() {
            config.background_color()
        } else {
            surface.background()
        };
        let viewports = viewports_for(width, height, &config.view_mode);
        info!(
            target: "stage",
            "stage {:?} up: {width}x{height}, {} viewport(s), budget {:?}",
            config.window.name,
            viewports.len(),
            config.frame_budget()
        );
        Self {
            scene: SceneGraph::new(Vector3::new(width as f32, height as f32, 0.0)),
            pipeline,
            transparent: surface.transparent(),
            surface,
            scheduler: FrameScheduler::new(config.frame_budget()),
            bindings: HashMap::new(),
            background,
            viewports,
            display_list: DisplayList::new(),
            layout_nodes: 0,
            frame_index: 0,
            needs_rebuild: true,
            telemetry_enabled: config.telemetry_enabled,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The scene's root node, sized to the surface.
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.scene.root()
    }

    /// Attach a node directly under the root.
    pub fn add(&mut self, node: NodeHandle) -> Result<(), SceneError> {
        self.scene.attach(self.scene.root(), node)
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background = color;
    }

    #[must_use]
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Mutable scene access. Changes queue up and take effect atomically
    /// at the next [`tick`](Self::tick).
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Where the node's image request currently stands, or `None` for
    /// nodes without a bound source.
    #[must_use]
    pub fn node_image_state(&self, node: NodeHandle) -> Option<ImageRequestState> {
        self.bindings.get(&node).map(ImageBinding::state)
    }

    /// Read-only pipeline access for inspection.
    #[must_use]
    pub fn pipeline(&self) -> &ImagePipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Produce one frame: apply queued scene mutations, drain pipeline
    /// completions, rebuild layout and the display list if anything
    /// changed, and present the result.
    ///
    /// Request failures degrade their nodes and never surface here; an
    /// error means the surface rejected the frame.
    pub fn tick(&mut self) -> Result<FrameStats, Error> {
        let _span = info_span!("stage.tick").entered();
        let started = Instant::now();

        self.apply_scene_updates();
        self.apply_pipeline_events();

        if self.needs_rebuild {
            if self.scheduler.allow() {
                self.rebuild_frame();
                self.needs_rebuild = false;
            } else {
                trace!(
                    target: "stage",
                    "rebuild deferred by frame budget ({:?})",
                    self.scheduler.budget()
                );
                self.scheduler.incr_deferred();
            }
        }

        self.frame_index = self.frame_index.wrapping_add(1);
        let stats = self.frame_stats(started.elapsed());
        let frame = FrameSubmission {
            frame_index: self.frame_index,
            background: self.background.to_array(),
            transparent: self.transparent,
            viewports: self.viewports.clone(),
            display_list: self.display_list.clone(),
            stats,
        };
        self.surface.present(&frame)?;
        telemetry::maybe_emit(self.telemetry_enabled, &telemetry::frame_stats_json(&stats));
        Ok(stats)
    }

    /// Frame-paced loop calling [`tick`](Self::tick) until a
    /// [`ShutdownHandle`] fires. Outstanding failed requests never stop
    /// it.
    pub async fn run(&mut self) -> Result<(), Error> {
        let mut frames = self.frame_interval();
        info!(target: "stage", "render loop up at {:?} per frame", self.scheduler.budget());
        while !self.shutdown.load(Ordering::Relaxed) {
            frames.tick().await;
            self.tick()?;
        }
        info!(target: "stage", "render loop down after {} frame(s)", self.frame_index);
        Ok(())
    }

    /// Run exactly `frames` paced frames, then return.
    pub async fn run_frames(&mut self, frames: u64) -> Result<(), Error> {
        let mut ticker = self.frame_interval();
        for _ in 0..frames {
            ticker.tick().await;
            self.tick()?;
        }
        Ok(())
    }

    fn frame_interval(&self) -> Interval {
        // interval() panics on a zero period.
        let mut frames = interval(self.scheduler.budget().max(Duration::from_millis(1)));
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
        frames
    }

    /// Apply every scene mutation queued since the last frame.
    fn apply_scene_updates(&mut self) {
        let updates = self.scene.take_updates();
        if updates.is_empty() {
            return;
        }
        let _span = info_span!("stage.apply_updates").entered();
        for update in updates {
            match update {
                SceneUpdate::Created { node, kind } => {
                    trace!(target: "stage", "node created: {node:?} ({kind:?})");
                }
                SceneUpdate::Attached { .. }
                | SceneUpdate::Detached { .. }
                | SceneUpdate::GeometryChanged { .. }
                | SceneUpdate::ColorChanged { .. } => {
                    self.needs_rebuild = true;
                }
                SceneUpdate::Removed { node } => {
                    self.unbind_image(node);
                    self.needs_rebuild = true;
                }
                SceneUpdate::ImageSourceSet { node, source } => {
                    self.unbind_image(node);
                    self.bind_image(node, source);
                    self.needs_rebuild = true;
                }
                SceneUpdate::ImageSourceCleared { node } => {
                    self.unbind_image(node);
                    self.needs_rebuild = true;
                }
            }
        }
    }

    /// Start (or join) the texture request backing a node's new source.
    fn bind_image(&mut self, node: NodeHandle, source: ImageSource) {
        let binding = match source {
            ImageSource::Pixels(buffer) => {
                let handle = self.pipeline.upload_pixels(
                    buffer.width(),
                    buffer.height(),
                    Bytes::copy_from_slice(buffer.bytes()),
                );
                debug!(
                    target: "stage",
                    "raw {}x{} pixels bound to {node:?}",
                    buffer.width(),
                    buffer.height()
                );
                ImageBinding::Raw { handle }
            }
            ImageSource::Uri(uri) => match resolve(&uri) {
                Ok(resolved) => {
                    let key = resolved.key().to_owned();
                    // Interest is tracked per key; the ticket is for
                    // callers who await, which the stage never does.
                    drop(self.pipeline.request(&resolved));
                    let state = match self.pipeline.cached(&key) {
                        Some(handle) => ImageRequestState::Ready(handle),
                        None => ImageRequestState::Pending,
                    };
                    ImageBinding::Remote { key, state }
                }
                Err(err) => {
                    warn!(target: "stage", "image source rejected for {node:?}: {err}");
                    ImageBinding::Remote {
                        key: uri,
                        state: ImageRequestState::Failed(err),
                    }
                }
            },
        };
        self.bindings.insert(node, binding);
    }

    /// Withdraw whatever the node's binding holds: interest for requests
    /// still in flight, a cache reference for ready ones, the raw slot
    /// for uploaded pixels.
    fn unbind_image(&mut self, node: NodeHandle) {
        let Some(binding) = self.bindings.remove(&node) else {
            return;
        };
        match binding {
            ImageBinding::Raw { handle } => {
                self.pipeline.free_texture(handle);
            }
            ImageBinding::Remote { key, state } => match state {
                ImageRequestState::Ready(_) => self.pipeline.release(&key),
                ImageRequestState::Failed(_) => {}
                ImageRequestState::Pending
                | ImageRequestState::Fetching
                | ImageRequestState::Decoding => self.pipeline.cancel(&key),
            },
        }
    }

    /// Drain pipeline completions and move the affected bindings along.
    fn apply_pipeline_events(&mut self) {
        for event in self.pipeline.drain() {
            match event {
                PipelineEvent::Fetching { key } => {
                    self.advance_bindings(&key, ImageRequestState::Fetching);
                }
                PipelineEvent::Decoding { key } => {
                    self.advance_bindings(&key, ImageRequestState::Decoding);
                }
                PipelineEvent::Settled { key, result } => {
                    let state = match result {
                        Ok(handle) => ImageRequestState::Ready(handle),
                        Err(err) => ImageRequestState::Failed(err),
                    };
                    self.advance_bindings(&key, state);
                    self.needs_rebuild = true;
                }
            }
        }
    }

    /// Move every unsettled binding on `key` to `next`. Settled bindings
    /// stay put: a request transitions through its states exactly once,
    /// even when a later request revives the same key.
    fn advance_bindings(&mut self, key: &str, next: ImageRequestState) {
        for binding in self.bindings.values_mut() {
            if let ImageBinding::Remote { key: bound, state } = binding {
                if bound == key && !state.is_settled() {
                    *state = next.clone();
                }
            }
        }
    }

    /// Recompute layout and swap the retained display list if the result
    /// differs.
    fn rebuild_frame(&mut self) {
        let _span = info_span!("stage.rebuild").entered();
        let snapshot = compute_layout(&self.scene);
        self.layout_nodes = snapshot.items.len() as u64;
        let items = self.paint_items(&snapshot);
        match self.display_list.diff(&items) {
            DisplayListDiff::NoChange => {
                trace!(
                    target: "stage",
                    "display list unchanged at generation {}",
                    self.display_list.generation
                );
            }
            DisplayListDiff::ReplaceAll(replacement) => {
                self.display_list.items = replacement;
                let generation = self.display_list.bump_generation();
                debug!(
                    target: "stage",
                    "display list generation {generation}: {} item(s)",
                    self.display_list.items.len()
                );
            }
        }
    }

    /// Flatten a layout snapshot into paint commands. Groups carry no
    /// visual, zero-sized and fully transparent quads are culled, and an
    /// image view renders only once its texture is ready.
    fn paint_items(&self, snapshot: &LayoutSnapshot) -> Vec<DisplayItem> {
        let mut items = Vec::new();
        for laid in &snapshot.items {
            if laid.rect.size.x <= 0.0 || laid.rect.size.y <= 0.0 {
                continue;
            }
            match laid.kind {
                NodeKind::Group => {}
                NodeKind::ColorView => {
                    if !laid.color.is_transparent() {
                        items.push(DisplayItem::Rect {
                            x: laid.rect.origin.x,
                            y: laid.rect.origin.y,
                            width: laid.rect.size.x,
                            height: laid.rect.size.y,
                            color: laid.color.to_array(),
                        });
                    }
                }
                NodeKind::ImageView => {
                    let handle = self
                        .bindings
                        .get(&laid.node)
                        .and_then(ImageBinding::ready_handle);
                    if let Some(texture) = handle {
                        items.push(DisplayItem::Image {
                            x: laid.rect.origin.x,
                            y: laid.rect.origin.y,
                            width: laid.rect.size.x,
                            height: laid.rect.size.y,
                            texture,
                        });
                    }
                }
            }
        }
        items
    }

    fn frame_stats(&self, tick_time: Duration) -> FrameStats {
        FrameStats {
            frame_index: self.frame_index,
            display_items: self.display_list.items.len() as u64,
            layout_nodes: self.layout_nodes,
            textures_live: self.pipeline.texture_count() as u64,
            cache_entries: self.pipeline.cache_len() as u64,
            in_flight: self.pipeline.in_flight_count() as u64,
            requests_spawned: self.pipeline.requests_spawned(),
            requests_failed: self.pipeline.requests_failed(),
            rebuilds_deferred: self.scheduler.deferred(),
            tick_time_us: tick_time.as_micros() as u64,
        }
    }
}
