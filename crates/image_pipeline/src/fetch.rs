use core::future::Future;
use core::pin::Pin;
use std::path::Path;

use bytes::{Bytes, BytesMut};
use reqwest::get as reqwest_get;
use tokio::fs::read as tokio_fs_read;
use tokio_stream::StreamExt as _;
use url::Url;

use crate::error::PipelineError;
use crate::source::{Location, ResolvedSource};

/// Boxed future returned by [`Fetcher::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Bytes, PipelineError>> + Send + 'a>>;

/// Byte retrieval seam.
///
/// The pipeline owns timeout and coalescing; a fetcher only turns one
/// resolved source into bytes. Tests inject counting, hanging, or failing
/// implementations here.
pub trait Fetcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn fetch<'a>(&'a self, source: &'a ResolvedSource, max_bytes: usize) -> FetchFuture<'a>;
}

/// Default fetcher: `reqwest` for http/https, `tokio::fs` for files,
/// passthrough for inline `data:` payloads.
#[derive(Debug, Default)]
pub struct NetFetcher;

impl Fetcher for NetFetcher {
    fn name(&self) -> &'static str {
        "net"
    }

    fn fetch<'a>(&'a self, source: &'a ResolvedSource, max_bytes: usize) -> FetchFuture<'a> {
        Box::pin(async move {
            match &source.location {
                Location::Http(url) => fetch_http(url, max_bytes).await,
                Location::File(path) => fetch_file(path, max_bytes).await,
                Location::Data(bytes) => Ok(bytes.clone()),
            }
        })
    }
}

async fn fetch_http(url: &Url, max_bytes: usize) -> Result<Bytes, PipelineError> {
    let response = reqwest_get(url.clone())
        .await
        .map_err(|err| PipelineError::Network(format!("GET {url}: {err}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Network(format!("GET {url}: status {status}")));
    }

    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| PipelineError::Network(format!("GET {url}: {err}")))?;
        if body.len() + chunk.len() > max_bytes {
            return Err(PipelineError::Network(format!(
                "GET {url}: body exceeds {max_bytes} bytes"
            )));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

async fn fetch_file(path: &Path, max_bytes: usize) -> Result<Bytes, PipelineError> {
    let data = tokio_fs_read(path)
        .await
        .map_err(|err| PipelineError::Network(format!("read {}: {err}", path.display())))?;
    if data.len() > max_bytes {
        return Err(PipelineError::Network(format!(
            "read {}: file exceeds {max_bytes} bytes",
            path.display()
        )));
    }
    Ok(Bytes::from(data))
}
