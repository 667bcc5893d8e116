use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, warn};
use smallvec::SmallVec;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::{JoinHandle, spawn_blocking};
use tokio::time::timeout;

use crate::cache::TextureCache;
use crate::decode::{DecodedImage, decode_rgba8};
use crate::error::PipelineError;
use crate::fetch::{Fetcher, NetFetcher};
use crate::source::{ResolvedSource, resolve};
use crate::texture::{Texture, TextureHandle, TextureStore};

/// Pipeline knobs, fixed at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fetch deadline; requests past it fail instead of blocking forever.
    pub fetch_timeout: Duration,
    /// Response/file size cap in bytes.
    pub max_fetch_bytes: usize,
    /// Largest accepted width or height of a decoded image.
    pub max_decode_dimension: u32,
    /// Concurrent decode jobs on the blocking pool.
    pub decode_permits: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            max_fetch_bytes: 32 * 1024 * 1024,
            max_decode_dimension: 16_384,
            decode_permits: num_cpus::get().clamp(1, 4),
        }
    }
}

/// Lifecycle of one node's image request, as observed between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRequestState {
    Pending,
    Fetching,
    Decoding,
    Ready(TextureHandle),
    Failed(PipelineError),
}

impl ImageRequestState {
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed(_))
    }
}

/// What `drain` reports to the render loop each tick.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Fetching { key: String },
    Decoding { key: String },
    Settled { key: String, result: Result<TextureHandle, PipelineError> },
}

/// Future side of one request; resolves when the render loop drains the
/// completion. Dropping a ticket does not withdraw interest — that is
/// what [`ImagePipeline::cancel`] is for.
#[derive(Debug)]
pub struct ImageTicket {
    rx: oneshot::Receiver<Result<TextureHandle, PipelineError>>,
}

impl ImageTicket {
    fn ready(result: Result<TextureHandle, PipelineError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }
}

impl Future for ImageTicket {
    type Output = Result<TextureHandle, PipelineError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Cancelled),
        })
    }
}

type Waiter = oneshot::Sender<Result<TextureHandle, PipelineError>>;

struct InFlight {
    waiters: SmallVec<Waiter, 2>,
    /// Interested parties (nodes/callers). The fetch is aborted when this
    /// reaches zero, and it seeds the cache reference count on success.
    interest: usize,
    task: JoinHandle<()>,
}

enum WorkerEvent {
    Fetching { key: String },
    Decoding { key: String },
    Done {
        key: String,
        result: Result<DecodedImage, PipelineError>,
    },
}

/// Asynchronous fetch-decode-upload pipeline.
///
/// `request` never blocks: it returns a ticket immediately and schedules
/// work on the runtime. Fetches and decodes run on worker tasks; the
/// texture store and cache are owned here and mutated only by `drain`,
/// `release`, and the raw-upload calls — all driven from the render loop,
/// which is the single writer of shared image state. Concurrent requests
/// for one not-yet-ready source share a single underlying fetch.
pub struct ImagePipeline {
    config: PipelineConfig,
    fetcher: Arc<dyn Fetcher>,
    decode_permits: Arc<Semaphore>,
    store: TextureStore,
    cache: TextureCache,
    in_flight: HashMap<String, InFlight>,
    events_tx: mpsc::UnboundedSender<WorkerEvent>,
    events_rx: mpsc::UnboundedReceiver<WorkerEvent>,
    requests_spawned: u64,
    requests_failed: u64,
}

impl ImagePipeline {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_fetcher(config, Arc::new(NetFetcher))
    }

    /// Construct with an injected fetcher (tests use counting, failing,
    /// and hanging ones).
    #[must_use]
    pub fn with_fetcher(config: PipelineConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let decode_permits = Arc::new(Semaphore::new(config.decode_permits.max(1)));
        debug!(
            target: "image_pipeline",
            "pipeline up: fetcher={} timeout={:?} decode_permits={}",
            fetcher.name(),
            config.fetch_timeout,
            config.decode_permits
        );
        Self {
            config,
            fetcher,
            decode_permits,
            store: TextureStore::new(),
            cache: TextureCache::new(),
            in_flight: HashMap::new(),
            events_tx,
            events_rx,
            requests_spawned: 0,
            requests_failed: 0,
        }
    }

    /// Request a texture for a resolved source. Must be called from within
    /// the runtime (workers are spawned onto it).
    ///
    /// A source already `Ready` in the cache resolves the ticket
    /// immediately, takes one more reference, and performs no I/O. A
    /// source already in flight joins the existing fetch. Anything else
    /// starts one worker.
    pub fn request(&mut self, source: &ResolvedSource) -> ImageTicket {
        let key = source.key();
        if let Some(handle) = self.cache.acquire(key) {
            debug!(target: "image_pipeline", "cache hit for {key}");
            return ImageTicket::ready(Ok(handle));
        }

        let (tx, rx) = oneshot::channel();
        if let Some(entry) = self.in_flight.get_mut(key) {
            entry.waiters.push(tx);
            entry.interest += 1;
            debug!(
                target: "image_pipeline",
                "joined in-flight fetch for {key} ({} interested)",
                entry.interest
            );
            return ImageTicket { rx };
        }

        let task = tokio::spawn(run_request(
            key.to_owned(),
            source.clone(),
            Arc::clone(&self.fetcher),
            self.config.clone(),
            Arc::clone(&self.decode_permits),
            self.events_tx.clone(),
        ));
        let mut waiters: SmallVec<Waiter, 2> = SmallVec::new();
        waiters.push(tx);
        self.in_flight.insert(
            key.to_owned(),
            InFlight {
                waiters,
                interest: 1,
                task,
            },
        );
        self.requests_spawned += 1;
        debug!(target: "image_pipeline", "request spawned for {key}");
        ImageTicket { rx }
    }

    /// [`request`](Self::request) for a raw URI string; resolution errors
    /// come back through the ticket.
    pub fn request_uri(&mut self, uri: &str) -> ImageTicket {
        match resolve(uri) {
            Ok(source) => self.request(&source),
            Err(err) => ImageTicket::ready(Err(err)),
        }
    }

    /// Withdraw one unit of interest from an in-flight request. When the
    /// last one goes, the worker is aborted and outstanding tickets
    /// resolve with `Cancelled`. Ready cache entries are unaffected; use
    /// [`release`](Self::release) for those.
    pub fn cancel(&mut self, key: &str) {
        let abandoned = match self.in_flight.get_mut(key) {
            Some(entry) => {
                entry.interest = entry.interest.saturating_sub(1);
                entry.interest == 0
            }
            None => false,
        };
        if abandoned {
            if let Some(entry) = self.in_flight.remove(key) {
                entry.task.abort();
                debug!(target: "image_pipeline", "aborted fetch for {key}");
            }
        }
    }

    /// Drop one cache reference; the last one evicts the entry and frees
    /// its texture slot.
    pub fn release(&mut self, key: &str) {
        if let Some(handle) = self.cache.release(key) {
            self.store.free(handle);
            debug!(target: "image_pipeline", "evicted {key}");
        }
    }

    /// Apply all completions that arrived since the last call and report
    /// them. Called once per tick by the render loop; this is the only
    /// place fetched textures enter the store and cache, so nothing a
    /// worker does can change visible state mid-frame.
    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(message) = self.events_rx.try_recv() {
            match message {
                WorkerEvent::Fetching { key } => {
                    if self.in_flight.contains_key(&key) {
                        events.push(PipelineEvent::Fetching { key });
                    }
                }
                WorkerEvent::Decoding { key } => {
                    if self.in_flight.contains_key(&key) {
                        events.push(PipelineEvent::Decoding { key });
                    }
                }
                WorkerEvent::Done { key, result } => {
                    let Some(entry) = self.in_flight.remove(&key) else {
                        // Cancelled while the completion sat in the
                        // channel; nobody is interested and the cache
                        // must not learn about it.
                        debug!(target: "image_pipeline", "dropped stale completion for {key}");
                        continue;
                    };
                    let outcome = self.settle(&key, entry, result);
                    events.push(PipelineEvent::Settled {
                        key,
                        result: outcome,
                    });
                }
            }
        }
        events
    }

    fn settle(
        &mut self,
        key: &str,
        entry: InFlight,
        result: Result<DecodedImage, PipelineError>,
    ) -> Result<TextureHandle, PipelineError> {
        let outcome = match result {
            Ok(image) => {
                let handle = self.store.upload(image);
                self.cache.insert(key, handle, entry.interest);
                debug!(
                    target: "image_pipeline",
                    "{key} ready: {}x{} shared by {}",
                    handle.width(),
                    handle.height(),
                    entry.interest
                );
                Ok(handle)
            }
            Err(err) => {
                self.requests_failed += 1;
                warn!(target: "image_pipeline", "{key} failed: {err}");
                Err(err)
            }
        };
        for waiter in entry.waiters {
            let _ = waiter.send(outcome.clone());
        }
        outcome
    }

    /// Upload application-provided pixels. These bypass the shared cache;
    /// the caller frees the handle with [`free_texture`](Self::free_texture)
    /// when the owning node goes away.
    pub fn upload_pixels(&mut self, width: u32, height: u32, pixels: Bytes) -> TextureHandle {
        self.store.upload_raw(width, height, pixels)
    }

    pub fn free_texture(&mut self, handle: TextureHandle) -> bool {
        self.store.free(handle)
    }

    #[must_use]
    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.store.get(handle)
    }

    #[must_use]
    pub fn cached(&self, key: &str) -> Option<TextureHandle> {
        self.cache.peek(key)
    }

    #[must_use]
    pub fn cache_ref_count(&self, key: &str) -> usize {
        self.cache.ref_count(key)
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    #[must_use]
    pub fn requests_spawned(&self) -> u64 {
        self.requests_spawned
    }

    #[must_use]
    pub fn requests_failed(&self) -> u64 {
        self.requests_failed
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

async fn run_request(
    key: String,
    source: ResolvedSource,
    fetcher: Arc<dyn Fetcher>,
    config: PipelineConfig,
    permits: Arc<Semaphore>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    let result = fetch_and_decode(&key, &source, &fetcher, &config, permits, &events).await;
    let _ = events.send(WorkerEvent::Done { key, result });
}

async fn fetch_and_decode(
    key: &str,
    source: &ResolvedSource,
    fetcher: &Arc<dyn Fetcher>,
    config: &PipelineConfig,
    permits: Arc<Semaphore>,
    events: &mpsc::UnboundedSender<WorkerEvent>,
) -> Result<DecodedImage, PipelineError> {
    // data: payloads carry their bytes; everything else goes through the
    // fetcher under the configured deadline.
    let bytes = match source.inline_bytes() {
        Some(bytes) => bytes,
        None => {
            let _ = events.send(WorkerEvent::Fetching {
                key: key.to_owned(),
            });
            match timeout(
                config.fetch_timeout,
                fetcher.fetch(source, config.max_fetch_bytes),
            )
            .await
            {
                Ok(fetched) => fetched?,
                Err(_) => return Err(PipelineError::Timeout(config.fetch_timeout)),
            }
        }
    };

    let _ = events.send(WorkerEvent::Decoding {
        key: key.to_owned(),
    });
    let permit = permits
        .acquire_owned()
        .await
        .map_err(|_| PipelineError::Cancelled)?;
    let max_dimension = config.max_decode_dimension;
    let decoded = spawn_blocking(move || decode_rgba8(&bytes, max_dimension)).await;
    drop(permit);
    match decoded {
        Ok(result) => result,
        Err(join_err) => Err(PipelineError::Decode(format!("decode worker: {join_err}"))),
    }
}

#[cfg(test)]
mod tests {
    use core::future::pending;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use tokio::runtime::Runtime;
    use tokio::time::sleep;

    use super::*;
    use crate::fetch::FetchFuture;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([0x11, 0x22, 0x33, 0xff]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    struct CountingFetcher {
        hits: AtomicUsize,
        payload: Vec<u8>,
    }

    impl CountingFetcher {
        fn png() -> Self {
            Self {
                hits: AtomicUsize::new(0),
                payload: png_bytes(4, 4),
            }
        }

        fn garbage() -> Self {
            Self {
                hits: AtomicUsize::new(0),
                payload: b"definitely not an image".to_vec(),
            }
        }

        fn count(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    impl Fetcher for CountingFetcher {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn fetch<'a>(&'a self, _source: &'a ResolvedSource, _max: usize) -> FetchFuture<'a> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            let payload = Bytes::from(self.payload.clone());
            Box::pin(async move { Ok(payload) })
        }
    }

    struct HangingFetcher;

    impl Fetcher for HangingFetcher {
        fn name(&self) -> &'static str {
            "hanging"
        }

        fn fetch<'a>(&'a self, _source: &'a ResolvedSource, _max: usize) -> FetchFuture<'a> {
            Box::pin(pending())
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn fetch<'a>(&'a self, _source: &'a ResolvedSource, _max: usize) -> FetchFuture<'a> {
            Box::pin(async { Err(PipelineError::Network("connection refused".to_owned())) })
        }
    }

    fn quick_config() -> PipelineConfig {
        PipelineConfig {
            fetch_timeout: Duration::from_millis(250),
            ..PipelineConfig::default()
        }
    }

    /// Pump `drain` until the given key settles.
    async fn settle_key(
        pipeline: &mut ImagePipeline,
        key: &str,
    ) -> Result<TextureHandle, PipelineError> {
        for _ in 0..500 {
            for event in pipeline.drain() {
                if let PipelineEvent::Settled {
                    key: settled,
                    result,
                } = event
                {
                    if settled == key {
                        return result;
                    }
                }
            }
            sleep(Duration::from_millis(2)).await;
        }
        panic!("request for {key} never settled");
    }

    #[test]
    fn concurrent_requests_share_one_fetch() -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        rt.block_on(async {
            let fetcher = Arc::new(CountingFetcher::png());
            let mut pipeline =
                ImagePipeline::with_fetcher(quick_config(), Arc::clone(&fetcher) as Arc<dyn Fetcher>);

            let uri = "https://example.com/shared.png";
            let key = resolve(uri).unwrap().key().to_owned();
            let first = pipeline.request_uri(uri);
            let second = pipeline.request_uri(uri);
            assert_eq!(pipeline.in_flight_count(), 1);

            let handle = settle_key(&mut pipeline, &key).await.unwrap();
            assert_eq!(first.await.unwrap(), handle);
            assert_eq!(second.await.unwrap(), handle);

            assert_eq!(fetcher.count(), 1);
            assert_eq!(pipeline.cache_len(), 1);
            assert_eq!(pipeline.cache_ref_count(&key), 2);
            assert_eq!(pipeline.texture_count(), 1);
        });
        Ok(())
    }

    #[test]
    fn warm_cache_resolves_without_a_new_fetch() -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        rt.block_on(async {
            let fetcher = Arc::new(CountingFetcher::png());
            let mut pipeline =
                ImagePipeline::with_fetcher(quick_config(), Arc::clone(&fetcher) as Arc<dyn Fetcher>);

            let uri = "https://example.com/warm.png";
            let key = resolve(uri).unwrap().key().to_owned();
            let warmup = pipeline.request_uri(uri);
            settle_key(&mut pipeline, &key).await.unwrap();
            warmup.await.unwrap();
            assert_eq!(fetcher.count(), 1);

            // Ready entry: immediate resolution, counter untouched.
            let again = pipeline.request_uri(uri).await.unwrap();
            assert_eq!(again, pipeline.cached(&key).unwrap());
            assert_eq!(fetcher.count(), 1);
            assert_eq!(pipeline.cache_ref_count(&key), 2);
        });
        Ok(())
    }

    #[test]
    fn cancelling_the_last_interest_aborts_the_fetch() -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        rt.block_on(async {
            let mut pipeline =
                ImagePipeline::with_fetcher(quick_config(), Arc::new(HangingFetcher));

            let uri = "https://example.com/slow.png";
            let key = resolve(uri).unwrap().key().to_owned();
            let ticket = pipeline.request_uri(uri);
            assert_eq!(pipeline.in_flight_count(), 1);

            pipeline.cancel(&key);
            assert_eq!(pipeline.in_flight_count(), 0);
            assert_eq!(ticket.await, Err(PipelineError::Cancelled));
            assert!(pipeline.drain().is_empty());
            assert_eq!(pipeline.cache_len(), 0);
        });
        Ok(())
    }

    #[test]
    fn completion_after_cancel_never_touches_the_cache() -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        rt.block_on(async {
            let fetcher = Arc::new(CountingFetcher::png());
            let mut pipeline =
                ImagePipeline::with_fetcher(quick_config(), Arc::clone(&fetcher) as Arc<dyn Fetcher>);

            let uri = "https://example.com/orphan.png";
            let key = resolve(uri).unwrap().key().to_owned();
            let _ticket = pipeline.request_uri(uri);

            // Let the worker finish and queue its completion, then cancel
            // before draining it.
            sleep(Duration::from_millis(50)).await;
            pipeline.cancel(&key);
            let events = pipeline.drain();

            assert!(
                !events
                    .iter()
                    .any(|event| matches!(event, PipelineEvent::Settled { .. }))
            );
            assert_eq!(pipeline.cache_len(), 0);
            assert_eq!(pipeline.texture_count(), 0);
        });
        Ok(())
    }

    #[test]
    fn hanging_fetch_times_out() -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        rt.block_on(async {
            let config = PipelineConfig {
                fetch_timeout: Duration::from_millis(30),
                ..PipelineConfig::default()
            };
            let mut pipeline = ImagePipeline::with_fetcher(config, Arc::new(HangingFetcher));

            let uri = "http://bad.invalid/x.png";
            let key = resolve(uri).unwrap().key().to_owned();
            let ticket = pipeline.request_uri(uri);

            let result = settle_key(&mut pipeline, &key).await;
            assert_eq!(result, Err(PipelineError::Timeout(Duration::from_millis(30))));
            assert_eq!(ticket.await, Err(PipelineError::Timeout(Duration::from_millis(30))));
            assert_eq!(pipeline.cache_len(), 0);
            assert_eq!(pipeline.requests_failed(), 1);
        });
        Ok(())
    }

    #[test]
    fn network_failure_reaches_every_waiter() -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        rt.block_on(async {
            let mut pipeline =
                ImagePipeline::with_fetcher(quick_config(), Arc::new(FailingFetcher));

            let uri = "https://example.com/missing.png";
            let key = resolve(uri).unwrap().key().to_owned();
            let first = pipeline.request_uri(uri);
            let second = pipeline.request_uri(uri);

            let result = settle_key(&mut pipeline, &key).await;
            assert!(matches!(result, Err(PipelineError::Network(_))));
            assert!(matches!(first.await, Err(PipelineError::Network(_))));
            assert!(matches!(second.await, Err(PipelineError::Network(_))));
            assert_eq!(pipeline.cache_len(), 0);
        });
        Ok(())
    }

    #[test]
    fn malformed_bytes_fail_with_decode_and_no_cache_entry() -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        rt.block_on(async {
            let fetcher = Arc::new(CountingFetcher::garbage());
            let mut pipeline =
                ImagePipeline::with_fetcher(quick_config(), fetcher as Arc<dyn Fetcher>);

            let uri = "https://example.com/corrupt.png";
            let key = resolve(uri).unwrap().key().to_owned();
            pipeline.request_uri(uri);

            let result = settle_key(&mut pipeline, &key).await;
            assert!(matches!(result, Err(PipelineError::Decode(_))));
            assert_eq!(pipeline.cache_len(), 0);
            assert_eq!(pipeline.texture_count(), 0);
        });
        Ok(())
    }

    #[test]
    fn data_uri_decodes_without_the_fetcher() -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        rt.block_on(async {
            let fetcher = Arc::new(CountingFetcher::png());
            let mut pipeline =
                ImagePipeline::with_fetcher(quick_config(), Arc::clone(&fetcher) as Arc<dyn Fetcher>);

            let data_uri = format!(
                "data:image/png;base64,{}",
                BASE64.encode(png_bytes(2, 3))
            );
            let ticket = pipeline.request_uri(&data_uri);
            let handle = settle_key(&mut pipeline, &data_uri).await.unwrap();

            assert_eq!((handle.width(), handle.height()), (2, 3));
            assert_eq!(ticket.await.unwrap(), handle);
            assert_eq!(fetcher.count(), 0);
        });
        Ok(())
    }

    #[test]
    fn releasing_the_last_reference_evicts_and_frees() -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        rt.block_on(async {
            let fetcher = Arc::new(CountingFetcher::png());
            let mut pipeline =
                ImagePipeline::with_fetcher(quick_config(), Arc::clone(&fetcher) as Arc<dyn Fetcher>);

            let uri = "https://example.com/short-lived.png";
            let key = resolve(uri).unwrap().key().to_owned();
            pipeline.request_uri(uri);
            pipeline.request_uri(uri);
            let handle = settle_key(&mut pipeline, &key).await.unwrap();

            pipeline.release(&key);
            assert_eq!(pipeline.cache_len(), 1);
            assert!(pipeline.texture(handle).is_some());

            pipeline.release(&key);
            assert_eq!(pipeline.cache_len(), 0);
            assert_eq!(pipeline.texture_count(), 0);
            assert!(pipeline.texture(handle).is_none());

            // A fresh request after eviction fetches again.
            pipeline.request_uri(uri);
            settle_key(&mut pipeline, &key).await.unwrap();
            assert_eq!(fetcher.count(), 2);
        });
        Ok(())
    }

    #[test]
    fn raw_uploads_bypass_the_cache() -> anyhow::Result<()> {
        let rt = Runtime::new()?;
        rt.block_on(async {
            let mut pipeline = ImagePipeline::new(quick_config());
            let handle = pipeline.upload_pixels(2, 2, Bytes::from(vec![0u8; 16]));
            assert_eq!(pipeline.texture_count(), 1);
            assert_eq!(pipeline.cache_len(), 0);
            assert!(pipeline.free_texture(handle));
            assert_eq!(pipeline.texture_count(), 0);
        });
        Ok(())
    }
}
