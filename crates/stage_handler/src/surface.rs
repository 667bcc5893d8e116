//! The fixed-size contract between the stage and the native layer.
//!
//! A surface tells the core its pixel dimensions, clear color, and
//! transparency, and accepts one [`FrameSubmission`] per completed frame.
//! Native window-system events never cross this boundary.

use core::mem::take;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Error;
use log::{trace, warn};

use scene::color::{self, Color};

use crate::config::{StageConfig, StereoscopicMode, ViewModeConfig};
use crate::display_list::DisplayList;
use crate::telemetry::FrameStats;

/// Which eye a viewport renders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Center,
    Left,
    Right,
}

/// One region of the surface with its camera eye offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub eye: Eye,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Horizontal camera shift in stereo-base units (millimeters).
    pub eye_offset: f32,
}

/// Split the surface into viewports for the configured view mode.
///
/// Mono renders one full-surface viewport. Stereo-horizontal splits into
/// left/right halves, stereo-vertical into top/bottom halves, each eye
/// shifted by half the stereo base. Stereo-interlaced is recognized but
/// unsupported; it warns and renders mono.
#[must_use]
pub fn viewports_for(width: u32, height: u32, view_mode: &ViewModeConfig) -> Vec<Viewport> {
    let full_width = width as f32;
    let full_height = height as f32;
    let half_base = view_mode.stereo_base / 2.0;

    let mono = || {
        vec![Viewport {
            eye: Eye::Center,
            x: 0.0,
            y: 0.0,
            width: full_width,
            height: full_height,
            eye_offset: 0.0,
        }]
    };

    match view_mode.stereoscopic_mode {
        StereoscopicMode::Mono => mono(),
        StereoscopicMode::StereoInterlaced => {
            warn!(target: "stage", "stereo-interlaced view mode is not supported; rendering mono");
            mono()
        }
        StereoscopicMode::StereoHorizontal => vec![
            Viewport {
                eye: Eye::Left,
                x: 0.0,
                y: 0.0,
                width: full_width / 2.0,
                height: full_height,
                eye_offset: -half_base,
            },
            Viewport {
                eye: Eye::Right,
                x: full_width / 2.0,
                y: 0.0,
                width: full_width / 2.0,
                height: full_height,
                eye_offset: half_base,
            },
        ],
        StereoscopicMode::StereoVertical => vec![
            Viewport {
                eye: Eye::Left,
                x: 0.0,
                y: 0.0,
                width: full_width,
                height: full_height / 2.0,
                eye_offset: -half_base,
            },
            Viewport {
                eye: Eye::Right,
                x: 0.0,
                y: full_height / 2.0,
                width: full_width,
                height: full_height / 2.0,
                eye_offset: half_base,
            },
        ],
    }
}

/// Everything a presenter needs to put one frame on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSubmission {
    pub frame_index: u64,
    /// Clear color in draw-command order.
    pub background: [f32; 4],
    pub transparent: bool,
    pub viewports: Vec<Viewport>,
    pub display_list: DisplayList,
    pub stats: FrameStats,
}

/// Presentation target for the stage.
///
/// `present` is invoked once per completed frame, after all scene and
/// pipeline state for that frame is final.
pub trait SurfaceBinding: Send {
    /// Target pixel dimensions, fixed for the surface's lifetime.
    fn dimensions(&self) -> (u32, u32);
    /// The surface's native clear color.
    fn background(&self) -> Color;
    fn transparent(&self) -> bool;
    fn present(&mut self, frame: &FrameSubmission) -> Result<(), Error>;
}

/// Shared view of the frames a [`HeadlessSurface`] has presented.
#[derive(Clone, Default)]
pub struct FrameRecorder {
    frames: Arc<Mutex<Vec<FrameSubmission>>>,
}

impl FrameRecorder {
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.lock().len()
    }

    /// Clone of the most recently presented frame, if any.
    #[must_use]
    pub fn last(&self) -> Option<FrameSubmission> {
        self.lock().last().cloned()
    }

    /// Remove and return everything presented so far.
    pub fn take(&self) -> Vec<FrameSubmission> {
        take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FrameSubmission>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, frame: FrameSubmission) {
        self.lock().push(frame);
    }
}

/// Surface with no native window behind it; frames go to a recorder.
/// The demo binary and the test suites present into one of these.
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    background: Color,
    transparent: bool,
    recorder: FrameRecorder,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: color::WHITE,
            transparent: false,
            recorder: FrameRecorder::default(),
        }
    }

    /// Headless stand-in for the window the configuration describes.
    #[must_use]
    pub fn from_config(config: &StageConfig) -> Self {
        Self {
            width: config.window.width,
            height: config.window.height,
            background: config.background_color(),
            transparent: config.window.transparent,
            recorder: FrameRecorder::default(),
        }
    }

    /// Handle for inspecting presented frames after the surface is boxed.
    #[must_use]
    pub fn recorder(&self) -> FrameRecorder {
        self.recorder.clone()
    }
}

impl SurfaceBinding for HeadlessSurface {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn background(&self) -> Color {
        self.background
    }

    fn transparent(&self) -> bool {
        self.transparent
    }

    fn present(&mut self, frame: &FrameSubmission) -> Result<(), Error> {
        trace!(
            target: "stage",
            "frame {} presented: {} item(s), generation {}",
            frame.frame_index,
            frame.display_list.items.len(),
            frame.display_list.generation
        );
        self.recorder.push(frame.clone());
        Ok(())
    }
}
