#![allow(
    clippy::min_ident_chars,
    reason = "Vector components are idiomatically named x, y, z"
)]
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::panic, reason = "Tests assert by panicking")
)]

//! Retained scene tree for the Lumo compositor.
//!
//! This crate owns the node model: an arena-backed tree of positioned,
//! sized, anchored visual nodes, plus the pure layout pass that resolves
//! each node's absolute placement from `parent_origin`, `anchor_point`,
//! `position`, and the parent's resolved size. It knows nothing about
//! surfaces, textures, or I/O; the stage crate drives it and feeds image
//! sources to the pipeline crate.

pub mod color;
pub mod geometry;
pub mod graph;
pub mod layout;
mod node;

pub use color::Color;
pub use geometry::{Rect3, Vector3, anchor_point, parent_origin};
pub use graph::{NodeHandle, SceneError, SceneGraph, SceneUpdate};
pub use layout::{LaidOutNode, LayoutSnapshot, compute_layout};
pub use node::{ImageSource, NodeKind, PixelBuffer};
