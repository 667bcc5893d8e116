//! Stage configuration.
//!
//! Everything here is consumed once at stage creation and immutable
//! afterwards. Configuration comes from three places, later ones winning:
//! built-in defaults, an optional JSON document, and `LUMO_*` environment
//! variables.

use core::time::Duration;
use std::env;

use anyhow::{Context, Error};
use log::warn;
use serde::{Deserialize, Serialize};

use scene::color::{self, Color};

/// Native window placement and identity, forwarded to the surface binding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub transparent: bool,
    pub name: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
            transparent: false,
            name: String::from("lumo"),
        }
    }
}

/// How frames are split across eyes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StereoscopicMode {
    #[default]
    Mono,
    StereoHorizontal,
    StereoVertical,
    /// Recognized but unsupported; the stage warns and renders mono.
    StereoInterlaced,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewModeConfig {
    pub stereoscopic_mode: StereoscopicMode,
    /// Eye separation in millimeters for the stereo modes.
    pub stereo_base: f32,
}

impl Default for ViewModeConfig {
    fn default() -> Self {
        Self {
            stereoscopic_mode: StereoscopicMode::Mono,
            stereo_base: 65.0,
        }
    }
}

/// Runtime configuration for the stage and its image pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StageConfig {
    pub window: WindowConfig,
    pub view_mode: ViewModeConfig,
    /// Stage clear color as a CSS color string; unparseable values warn
    /// and fall back to white.
    pub background: Option<String>,
    /// Frame budget in milliseconds for pacing and rebuild throttling.
    pub frame_budget_ms: u64,
    /// Deadline in milliseconds for one image fetch.
    pub fetch_timeout_ms: u64,
    /// Response/file size cap for image fetches, in bytes.
    pub max_fetch_bytes: usize,
    /// Whether to emit one telemetry JSON line per frame.
    pub telemetry_enabled: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            view_mode: ViewModeConfig::default(),
            background: None,
            frame_budget_ms: 16,
            fetch_timeout_ms: 10_000,
            max_fetch_bytes: 32 * 1024 * 1024,
            telemetry_enabled: false,
        }
    }
}

impl StageConfig {
    /// Defaults plus environment overrides.
    ///
    /// Recognized variables:
    /// - `LUMO_FRAME_BUDGET_MS`: frame budget in milliseconds (minimum 1)
    /// - `LUMO_FETCH_TIMEOUT_MS`: image fetch deadline in milliseconds
    /// - `LUMO_TELEMETRY`: set to "1" to emit telemetry lines
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse a JSON document of recognized options. Absent fields keep
    /// their defaults, so a document holding only `window` is valid.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).context("parsing stage configuration")
    }

    /// Apply `LUMO_*` environment overrides on top of this configuration.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(millis) = env::var("LUMO_FRAME_BUDGET_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
        {
            self.frame_budget_ms = millis.max(1);
        }
        if let Some(millis) = env::var("LUMO_FETCH_TIMEOUT_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
        {
            self.fetch_timeout_ms = millis.max(1);
        }
        if env::var("LUMO_TELEMETRY").ok().as_deref() == Some("1") {
            self.telemetry_enabled = true;
        }
        self
    }

    /// The frame budget as a `Duration`.
    #[inline]
    #[must_use]
    pub const fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }

    /// The image fetch deadline as a `Duration`.
    #[inline]
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// The configured clear color, white when absent or unparseable.
    #[must_use]
    pub fn background_color(&self) -> Color {
        match self.background.as_deref() {
            None => color::WHITE,
            Some(value) => match Color::from_css(value) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(target: "stage", "bad background color {value:?}: {err}; using white");
                    color::WHITE
                }
            },
        }
    }
}
