//! Batched decode dispatch
//!
//! Every sample of a batch is classified independently against an
//! ordered list of capability predicates (hardware, hybrid, host) and
//! decoded on the winning tier. Host work fans out across a fixed
//! worker pool; accelerator stages are submitted to the stream with a
//! pool reservation held for the duration. Reservation failure drops a
//! sample one tier instead of failing the batch; a failure at the host
//! tier is reported per sample.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel::{bounded, unbounded};
use tracing::debug;

use crate::backend::{CropRegion, DecodeBackend, PixelBuffer, PixelDecoder, PixelFormat};
use crate::error::{Error, Result};
use crate::format::{peek_dimensions, ImageDims, ImageFormat};
use crate::pool::AcceleratorPool;
use crate::probe::{CapabilityProbe, HardwareCapability};
use crate::stream::AcceleratorStream;

/// Configuration for a decode dispatcher
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Pixel count above which JPEG samples are eligible for the
    /// accelerated tiers; `0` forces them for every eligible sample,
    /// `u64::MAX` forces host software for everything
    pub hybrid_threshold: u64,

    /// Number of host decode worker threads
    pub worker_threads: usize,

    /// Expected output width used to preallocate the pool; `0` disables
    pub width_hint: u32,

    /// Expected output height used to preallocate the pool; `0` disables
    pub height_hint: u32,

    /// Hard byte budget the pool may grow to
    pub pool_budget: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            hybrid_threshold: 1000 * 1000,
            worker_threads: num_cpus::get(),
            width_hint: 0,
            height_hint: 0,
            pool_budget: 512 * 1024 * 1024,
        }
    }
}

/// One encoded sample entering the dispatcher
#[derive(Debug, Clone)]
pub struct EncodedSample {
    /// Encoded bytes
    pub bytes: Vec<u8>,

    /// Declared container format; sniffed from magic bytes when absent
    pub format: Option<ImageFormat>,

    /// Crop window applied after decode
    pub crop: Option<CropRegion>,
}

impl EncodedSample {
    /// Wrap encoded bytes with no declared format and no crop
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            format: None,
            crop: None,
        }
    }

    /// Attach a crop window
    pub fn with_crop(mut self, crop: CropRegion) -> Self {
        self.crop = Some(crop);
        self
    }

    /// Declare the container format ahead of sniffing
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// A sample that could not be decoded on any tier
#[derive(Debug, Clone)]
pub struct SampleFailure {
    /// Batch index of the failed sample
    pub sample: usize,

    /// Failure description
    pub reason: String,
}

/// Outcome of decoding one batch
///
/// Buffers are batch-indexed: `buffers[i]` belongs to input sample `i`
/// regardless of completion order, and `selections[i]` records the tier
/// that actually decoded it.
#[derive(Debug)]
pub struct BatchDecodeResult {
    /// Decoded buffers, `None` where the sample failed
    pub buffers: Vec<Option<PixelBuffer>>,

    /// Tier that produced each sample's result
    pub selections: Vec<DecodeBackend>,

    /// Per-sample failures, batch-fatal for none of the siblings
    pub failures: Vec<SampleFailure>,

    /// Tier fallbacks performed while decoding this batch
    pub fallbacks: u64,
}

impl BatchDecodeResult {
    /// Whether every sample decoded
    pub fn all_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Assigns each sample of a batch to a decode backend and coordinates
/// execution and accelerator memory budgeting
pub struct DecodeDispatcher {
    config: DispatchConfig,
    capability: HardwareCapability,
    pool: Arc<AcceleratorPool>,
    decoder: Arc<dyn PixelDecoder>,
    workers: rayon::ThreadPool,
    stream: AcceleratorStream,
    fallback_count: AtomicU64,
}

impl DecodeDispatcher {
    /// Build a dispatcher
    ///
    /// The capability probe is consulted once here and cached for the
    /// dispatcher's lifetime.
    pub fn new(
        config: DispatchConfig,
        decoder: Arc<dyn PixelDecoder>,
        probe: &dyn CapabilityProbe,
    ) -> Result<Self> {
        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("decode-worker-{}", i))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;
        let pool = AcceleratorPool::with_hints(
            config.width_hint,
            config.height_hint,
            3,
            config.pool_budget,
        );
        Ok(Self {
            capability: probe.probe(),
            pool,
            decoder,
            workers,
            stream: AcceleratorStream::new(),
            fallback_count: AtomicU64::new(0),
            config,
        })
    }

    /// The cached capability this dispatcher operates under
    pub fn capability(&self) -> HardwareCapability {
        self.capability
    }

    /// The accelerator pool backing hardware and hybrid decodes
    pub fn pool(&self) -> &Arc<AcceleratorPool> {
        &self.pool
    }

    /// Tier fallbacks performed over this dispatcher's lifetime
    ///
    /// Fallbacks are silent on the result path; this counter keeps them
    /// observable for operational diagnostics.
    pub fn fallbacks(&self) -> u64 {
        self.fallback_count.load(Ordering::SeqCst)
    }

    /// Classify one sample against the tier predicates, first
    /// applicable wins
    pub fn classify(
        &self,
        format: ImageFormat,
        dims: Option<ImageDims>,
        output: PixelFormat,
    ) -> DecodeBackend {
        // Formats outside the accelerated tiers skip them entirely
        if !DecodeBackend::Hybrid.supports(format) {
            return DecodeBackend::Host;
        }
        // Unknown size after the header parse decodes on the host
        let Some(dims) = dims else {
            return DecodeBackend::Host;
        };
        if dims.pixel_count() <= self.config.hybrid_threshold {
            return DecodeBackend::Host;
        }
        let out_bytes = expected_output_bytes(dims, output);
        if self.capability.hardware_decoder
            && DecodeBackend::Hardware.supports(format)
            && self.pool.can_accommodate(out_bytes)
        {
            return DecodeBackend::Hardware;
        }
        DecodeBackend::Hybrid
    }

    /// Decode a batch, one backend decision per sample
    pub fn decode_batch(
        &self,
        samples: &[EncodedSample],
        output: PixelFormat,
    ) -> BatchDecodeResult {
        let n = samples.len();
        let (tx, rx) = unbounded();

        self.workers.scope(|scope| {
            for (idx, sample) in samples.iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let (backend, result, fallbacks) = self.decode_sample(idx, sample, output);
                    let _ = tx.send((idx, backend, result, fallbacks));
                });
            }
        });
        drop(tx);

        let mut buffers: Vec<Option<PixelBuffer>> = (0..n).map(|_| None).collect();
        let mut selections = vec![DecodeBackend::Host; n];
        let mut failures = Vec::new();
        let mut fallbacks = 0;
        for (idx, backend, result, sample_fallbacks) in rx {
            selections[idx] = backend;
            fallbacks += sample_fallbacks;
            match result {
                Ok(buffer) => buffers[idx] = Some(buffer),
                Err(Error::SampleDecode { reason, .. }) => {
                    failures.push(SampleFailure { sample: idx, reason })
                }
                Err(error) => failures.push(SampleFailure {
                    sample: idx,
                    reason: error.to_string(),
                }),
            }
        }
        failures.sort_by_key(|f| f.sample);

        BatchDecodeResult {
            buffers,
            selections,
            failures,
            fallbacks,
        }
    }

    /// Decode one sample, walking the fallback chain on backend
    /// unavailability
    fn decode_sample(
        &self,
        idx: usize,
        sample: &EncodedSample,
        output: PixelFormat,
    ) -> (DecodeBackend, Result<PixelBuffer>, u64) {
        let format = sample
            .format
            .unwrap_or_else(|| ImageFormat::from_bytes(&sample.bytes));
        if format == ImageFormat::Unknown || !self.decoder.supports(format) {
            return (
                DecodeBackend::Host,
                Err(Error::UnsupportedFormat(format.name().to_string())),
                0,
            );
        }

        let dims = peek_dimensions(&sample.bytes);
        let mut backend = self.classify(format, dims, output);
        let mut fallbacks = 0;
        loop {
            match self.run_tier(backend, sample, format, dims, output) {
                Err(Error::CapacityExhausted { .. }) if backend != DecodeBackend::Host => {
                    let next = backend
                        .fallback()
                        .expect("non-host tiers always have a fallback");
                    debug!(
                        sample = idx,
                        from = %backend,
                        to = %next,
                        "accelerator capacity unavailable, falling back a decode tier"
                    );
                    self.fallback_count.fetch_add(1, Ordering::SeqCst);
                    fallbacks += 1;
                    backend = next;
                }
                Ok(buffer) => {
                    let result = match sample.crop {
                        Some(region) => buffer.crop(region),
                        None => Ok(buffer),
                    };
                    return (backend, result, fallbacks);
                }
                Err(error) => {
                    // Genuine decode failure: reported per sample, the
                    // rest of the batch continues
                    return (
                        backend,
                        Err(Error::SampleDecode {
                            sample: idx,
                            reason: error.to_string(),
                        }),
                        fallbacks,
                    );
                }
            }
        }
    }

    /// Run one tier for one sample
    fn run_tier(
        &self,
        backend: DecodeBackend,
        sample: &EncodedSample,
        format: ImageFormat,
        dims: Option<ImageDims>,
        output: PixelFormat,
    ) -> Result<PixelBuffer> {
        match backend {
            DecodeBackend::Host => self.decoder.decode(&sample.bytes, format, output),
            DecodeBackend::Hardware | DecodeBackend::Hybrid => {
                let dims = dims.ok_or_else(|| {
                    Error::InvalidHeader("accelerated decode requires known dimensions".into())
                })?;
                // Held until the device stage has produced its buffer
                let reservation = self.pool.reserve(expected_output_bytes(dims, output))?;

                let (tx, rx) = bounded(1);
                let decoder = Arc::clone(&self.decoder);
                let bytes = sample.bytes.clone();
                self.stream.submit(move || {
                    let result = decoder.decode(&bytes, format, output);
                    let _ = tx.send(result);
                })?;
                let buffer = rx
                    .recv()
                    .map_err(|_| Error::Stream("stream worker is gone".into()))??;
                drop(reservation);
                Ok(buffer)
            }
        }
    }
}

/// Bytes one decoded sample occupies in the requested layout
fn expected_output_bytes(dims: ImageDims, output: PixelFormat) -> usize {
    dims.width as usize * dims.height as usize * output.channels()
}
