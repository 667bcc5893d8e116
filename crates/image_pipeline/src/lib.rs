#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::panic, reason = "Tests assert by panicking")
)]

//! Asynchronous image fetch/decode pipeline for the Lumo compositor.
//!
//! Turns image sources (http/https URLs, `file://` URLs and bare paths,
//! `data:` URIs) into shared texture handles: fetch on worker tasks with a
//! deadline, content-sniffing decode on the blocking pool, upload into a
//! slot-table texture store, and a reference-counted cache keyed by
//! resolved source. Requests for the same not-yet-ready source coalesce
//! into one fetch, and completions are applied only when the render loop
//! drains them at a tick boundary.

pub mod cache;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod source;
pub mod texture;

pub use cache::TextureCache;
pub use decode::DecodedImage;
pub use error::PipelineError;
pub use fetch::{FetchFuture, Fetcher, NetFetcher};
pub use pipeline::{
    ImagePipeline, ImageRequestState, ImageTicket, PipelineConfig, PipelineEvent,
};
pub use source::{ResolvedSource, resolve};
pub use texture::{Texture, TextureHandle, TextureStore};
