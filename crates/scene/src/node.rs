use std::path::Path;
use std::sync::Arc;

use crate::color::Color;
use crate::geometry::{Vector3, anchor_point, parent_origin};

/// Closed set of renderable node kinds.
///
/// The tree does not carry behavior per kind; the kind decides what the
/// display-list builder emits for the node (nothing for `Group`, a solid
/// quad for `ColorView`, a textured quad for `ImageView`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Invisible grouping/positioning container.
    Group,
    /// Solid-color quad.
    ColorView,
    /// Textured quad fed by the image pipeline.
    ImageView,
}

/// Raw RGBA8 pixels supplied by the application.
///
/// Buffers are immutable once constructed and cheaply cloneable; two sources
/// compare equal only when they share the same underlying allocation.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bytes: Arc<[u8]>,
}

impl PixelBuffer {
    /// Wrap an RGBA8 byte buffer. Returns `None` unless
    /// `bytes.len() == width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, bytes: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if bytes.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            bytes: bytes.into(),
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for PixelBuffer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

/// Where an `ImageView` gets its pixels from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// `http(s)://`, `file://`, `data:` URI, or a bare filesystem path.
    Uri(String),
    /// Application-provided pixels, uploaded without fetching or caching.
    Pixels(PixelBuffer),
}

impl ImageSource {
    /// The URI string when this source is URI-shaped.
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::Uri(uri) => Some(uri),
            Self::Pixels(_) => None,
        }
    }
}

impl From<&str> for ImageSource {
    fn from(uri: &str) -> Self {
        Self::Uri(uri.to_owned())
    }
}

impl From<String> for ImageSource {
    fn from(uri: String) -> Self {
        Self::Uri(uri)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::Uri(path.to_string_lossy().into_owned())
    }
}

impl From<PixelBuffer> for ImageSource {
    fn from(pixels: PixelBuffer) -> Self {
        Self::Pixels(pixels)
    }
}

/// Per-node attribute block stored in the arena.
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) generation: u32,
    pub(crate) parent_origin: Vector3,
    pub(crate) anchor_point: Vector3,
    pub(crate) position: Vector3,
    pub(crate) size: Vector3,
    pub(crate) color: Color,
    pub(crate) image_source: Option<ImageSource>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind, generation: u32) -> Self {
        Self {
            kind,
            generation,
            parent_origin: parent_origin::DEFAULT,
            anchor_point: anchor_point::DEFAULT,
            position: Vector3::zero(),
            size: Vector3::zero(),
            color: Color::default(),
            image_source: None,
        }
    }
}
