#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::panic,
        clippy::float_cmp,
        reason = "Tests assert by panicking, including on exact float output"
    )
)]

//! The stage: retained scene, render loop, and surface binding.
//!
//! A [`Stage`] owns one scene graph and one image pipeline and drives both
//! from a frame-paced loop. Each [`tick`](Stage::tick) applies queued
//! scene mutations atomically, drains pipeline completions, recomputes
//! layout when anything changed, and submits a [`FrameSubmission`] to the
//! configured [`SurfaceBinding`]. Configuration is consumed once at stage
//! creation; a headless surface implementation serves the demo binary and
//! the test suites.

pub mod config;
pub mod display_list;
pub mod scheduler;
pub mod state;
pub mod surface;
pub mod telemetry;

pub use config::{StageConfig, StereoscopicMode, ViewModeConfig, WindowConfig};
pub use display_list::{DisplayItem, DisplayList, DisplayListDiff};
pub use scheduler::FrameScheduler;
pub use state::{ShutdownHandle, Stage};
pub use surface::{
    Eye, FrameRecorder, FrameSubmission, HeadlessSurface, SurfaceBinding, Viewport, viewports_for,
};
pub use telemetry::{FrameStats, frame_stats_json};
