//! The image decode operator
//!
//! Wraps the dispatch engine as a pipeline [`Operator`]: build-time
//! literals (device placement, output layout, hybrid threshold,
//! preallocation hints) are read from the spec once, while crop
//! rectangles resolve per sample through the argument system and may
//! arrive as tensor-arguments.

use std::sync::Arc;
use std::sync::Once;

use prepline_core::{
    ArgType, Device, OpSchema, OpSpec, Operator, SchemaRegistry, Tensor, TensorBatch, TensorData,
    ArgumentWorkspace,
};

use crate::backend::{CropRegion, PixelDecoder, PixelFormat};
use crate::dispatch::{DecodeDispatcher, DispatchConfig, EncodedSample};
use crate::error::{Error, Result};
use crate::pool::AcceleratorPool;
use crate::probe::CapabilityProbe;

/// Schema name of the image decode operator
pub const IMAGE_DECODE_SCHEMA: &str = "ImageDecode";

/// Register the decode operator schemas; idempotent
pub fn register_schemas() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        SchemaRegistry::register(
            OpSchema::new(IMAGE_DECODE_SCHEMA)
                .inputs(1, 1)
                .outputs(1)
                .arg("device", "mixed")
                .arg("output_type", "rgb")
                .arg("hybrid_threshold", 1_000_000_i64)
                .deprecated_arg("hybrid_huffman_threshold", "hybrid_threshold")
                .arg("preallocate_width_hint", 0_i64)
                .arg("preallocate_height_hint", 0_i64)
                .optional_arg("crop_x", ArgType::Int)
                .optional_arg("crop_y", ArgType::Int)
                .optional_arg("crop_w", ArgType::Int)
                .optional_arg("crop_h", ArgType::Int),
        )
        .expect("decode schemas are registered once");
    });
}

/// Batched image decode with per-sample backend dispatch
pub struct ImageDecodeOperator {
    dispatcher: DecodeDispatcher,
    output_format: PixelFormat,
    output_device: Device,
}

impl std::fmt::Debug for ImageDecodeOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageDecodeOperator")
            .field("output_format", &self.output_format)
            .field("output_device", &self.output_device)
            .finish()
    }
}

impl ImageDecodeOperator {
    /// Build the operator from its spec's build-time literals
    pub fn from_spec(
        spec: &OpSpec,
        decoder: Arc<dyn PixelDecoder>,
        probe: &dyn CapabilityProbe,
    ) -> Result<Self> {
        register_schemas();

        let device: String = spec.get_argument("device", None, 0)?;
        let output_device = match device.as_str() {
            "host" => Device::Host,
            "mixed" => Device::Accelerator,
            other => {
                return Err(Error::Core(prepline_core::Error::InvalidArgument(format!(
                    "Decode device must be \"host\" or \"mixed\", got \"{}\"",
                    other
                ))))
            }
        };
        let output_format =
            PixelFormat::parse(&spec.get_argument::<String>("output_type", None, 0)?)?;

        let threshold: i64 = spec.get_argument("hybrid_threshold", None, 0)?;
        let width_hint: i64 = spec.get_argument("preallocate_width_hint", None, 0)?;
        let height_hint: i64 = spec.get_argument("preallocate_height_hint", None, 0)?;
        let config = DispatchConfig {
            hybrid_threshold: u64::try_from(threshold).map_err(|_| {
                Error::Core(prepline_core::Error::InvalidArgument(
                    "hybrid_threshold must be non-negative".into(),
                ))
            })?,
            width_hint: clamp_hint(width_hint)?,
            height_hint: clamp_hint(height_hint)?,
            ..DispatchConfig::default()
        };

        Ok(Self {
            dispatcher: DecodeDispatcher::new(config, decoder, probe)?,
            output_format,
            output_device,
        })
    }

    /// The dispatcher driving this operator
    pub fn dispatcher(&self) -> &DecodeDispatcher {
        &self.dispatcher
    }

    /// Handle on the accelerator pool, shareable across batches
    pub fn pool(&self) -> Arc<AcceleratorPool> {
        Arc::clone(self.dispatcher.pool())
    }

    /// Resolve the crop rectangle for one sample, if crop arguments
    /// were specified
    ///
    /// `crop_w`/`crop_h` enable cropping; `crop_x`/`crop_y` default to
    /// the image origin. Each parameter may be a literal or a
    /// per-sample tensor-argument.
    fn crop_for_sample(
        &self,
        spec: &OpSpec,
        workspace: &ArgumentWorkspace,
        sample_idx: usize,
    ) -> prepline_core::Result<Option<CropRegion>> {
        if !spec.argument_defined("crop_w") || !spec.argument_defined("crop_h") {
            return Ok(None);
        }
        let width: i64 = spec.get_argument("crop_w", Some(workspace), sample_idx)?;
        let height: i64 = spec.get_argument("crop_h", Some(workspace), sample_idx)?;
        let x: i64 = if spec.argument_defined("crop_x") {
            spec.get_argument("crop_x", Some(workspace), sample_idx)?
        } else {
            0
        };
        let y: i64 = if spec.argument_defined("crop_y") {
            spec.get_argument("crop_y", Some(workspace), sample_idx)?
        } else {
            0
        };

        let to_u32 = |v: i64, name: &str| -> prepline_core::Result<u32> {
            u32::try_from(v).map_err(|_| {
                prepline_core::Error::InvalidArgument(format!(
                    "Crop parameter \"{}\" must be non-negative, got {}",
                    name, v
                ))
            })
        };
        Ok(Some(CropRegion {
            x: to_u32(x, "crop_x")?,
            y: to_u32(y, "crop_y")?,
            width: to_u32(width, "crop_w")?,
            height: to_u32(height, "crop_h")?,
        }))
    }
}

impl Operator for ImageDecodeOperator {
    fn run(
        &mut self,
        spec: &OpSpec,
        workspace: &ArgumentWorkspace,
        inputs: &[Arc<TensorBatch>],
    ) -> prepline_core::Result<Vec<TensorBatch>> {
        let input = inputs.first().ok_or_else(|| {
            prepline_core::Error::PipelineExecution("Decode expects one encoded input".into())
        })?;

        let mut samples = Vec::with_capacity(input.len());
        for idx in 0..input.len() {
            let tensor = input.sample(idx)?;
            let bytes = match tensor.data() {
                TensorData::U8(bytes) => bytes.clone(),
                other => {
                    return Err(prepline_core::Error::InvalidArgument(format!(
                        "Encoded input must hold bytes, sample {} holds {}",
                        idx,
                        other.elem()
                    )))
                }
            };
            let mut sample = EncodedSample::new(bytes);
            if let Some(crop) = self.crop_for_sample(spec, workspace, idx)? {
                sample = sample.with_crop(crop);
            }
            samples.push(sample);
        }

        let result = self.dispatcher.decode_batch(&samples, self.output_format);
        if !result.all_ok() {
            let detail: Vec<String> = result
                .failures
                .iter()
                .map(|f| format!("sample {}: {}", f.sample, f.reason))
                .collect();
            return Err(prepline_core::Error::PipelineExecution(format!(
                "{} of {} samples failed to decode: {}",
                result.failures.len(),
                samples.len(),
                detail.join("; ")
            )));
        }

        let tensors = result
            .buffers
            .into_iter()
            .map(|buffer| {
                let buffer = buffer.expect("failures were checked above");
                Tensor::new(
                    vec![
                        buffer.height as usize,
                        buffer.width as usize,
                        buffer.format.channels(),
                    ],
                    TensorData::U8(buffer.data),
                )
            })
            .collect::<prepline_core::Result<Vec<_>>>()?;
        Ok(vec![TensorBatch::new(self.output_device, tensors)?])
    }
}

fn clamp_hint(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::Core(prepline_core::Error::InvalidArgument(
            "preallocation hints must fit in a non-negative 32-bit value".into(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DecodeBackend;
    use crate::testing::{make_jpeg, make_png, StubDecoder, StubProbe};
    use prepline_core::{PipelineConfig, PipelineGraph};
    use std::collections::HashMap;

    fn decode_spec() -> OpSpec {
        register_schemas();
        OpSpec::new(IMAGE_DECODE_SCHEMA)
    }

    fn build_one_node_pipeline(
        spec: OpSpec,
        hardware: bool,
        extra_external: &[&str],
    ) -> (prepline_core::Pipeline, Arc<AcceleratorPool>) {
        let operator =
            ImageDecodeOperator::from_spec(&spec, Arc::new(StubDecoder), &StubProbe { hardware })
                .unwrap();
        let pool = operator.pool();
        let mut graph = PipelineGraph::new(PipelineConfig::default());
        graph.add_external_input("encoded", Device::Host).unwrap();
        for name in extra_external {
            graph.add_external_input(name, Device::Host).unwrap();
        }
        graph.add_node(spec, Box::new(operator)).unwrap();
        (graph.build().unwrap(), pool)
    }

    #[test]
    fn test_scenario_small_jpeg_batch_uses_accelerated_tiers() {
        // Four JPEGs above a tiny threshold through a one-node
        // pipeline: all decode on hardware/hybrid tiers and come out
        // as accelerator tensors in the requested layout.
        let spec = decode_spec()
            .add_arg("device", "mixed")
            .unwrap()
            .add_arg("output_type", "rgb")
            .unwrap()
            .add_arg("hybrid_threshold", 1_i64)
            .unwrap()
            .add_input("encoded", Device::Host)
            .add_output("decoded", Device::Accelerator)
            .unwrap();
        let (mut pipeline, pool) = build_one_node_pipeline(spec, true, &[]);

        let payloads: Vec<Vec<u8>> = (0..4).map(|i| make_jpeg(32, 24, i)).collect();
        let mut feeds = HashMap::new();
        feeds.insert(
            "encoded".to_string(),
            TensorBatch::from_bytes(payloads).unwrap(),
        );
        let result = pipeline.run_iteration(feeds).unwrap();

        let decoded = result.get("decoded", Device::Accelerator).unwrap();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded.device(), Device::Accelerator);
        for sample in decoded.samples() {
            assert_eq!(sample.shape(), &[24, 32, 3]);
        }
        // Accelerated tiers reserve pool capacity; host-only decode
        // would leave the pool untouched.
        assert!(pool.stats().peak_committed > 0);
    }

    #[test]
    fn test_scenario_png_takes_host_path_with_identical_pixels() {
        let spec = decode_spec()
            .add_arg("device", "mixed")
            .unwrap()
            .add_arg("hybrid_threshold", 0_i64)
            .unwrap()
            .add_input("encoded", Device::Host)
            .add_output("decoded", Device::Accelerator)
            .unwrap();
        let (mut pipeline, pool) = build_one_node_pipeline(spec, true, &[]);

        let png = make_png(24, 18, 7);
        let direct = StubDecoder
            .decode(&png, crate::format::ImageFormat::Png, PixelFormat::Rgb)
            .unwrap();

        let mut feeds = HashMap::new();
        feeds.insert(
            "encoded".to_string(),
            TensorBatch::from_bytes(vec![png]).unwrap(),
        );
        let result = pipeline.run_iteration(feeds).unwrap();

        let decoded = result.get("decoded", Device::Accelerator).unwrap();
        match decoded.sample(0).unwrap().data() {
            TensorData::U8(pixels) => assert_eq!(pixels, &direct.data),
            other => panic!("expected byte pixels, got {:?}", other),
        }
        // PNG skips the accelerated tiers entirely
        assert_eq!(pool.stats().peak_committed, 0);
    }

    #[test]
    fn test_scenario_per_sample_crop_rectangles() {
        let spec = decode_spec()
            .add_arg("device", "host")
            .unwrap()
            .add_argument_input("crop_x", "crop_x_src")
            .unwrap()
            .add_argument_input("crop_y", "crop_y_src")
            .unwrap()
            .add_argument_input("crop_w", "crop_w_src")
            .unwrap()
            .add_argument_input("crop_h", "crop_h_src")
            .unwrap()
            .add_input("encoded", Device::Host)
            .add_output("decoded", Device::Host)
            .unwrap();
        let (mut pipeline, _pool) = build_one_node_pipeline(
            spec,
            false,
            &["crop_x_src", "crop_y_src", "crop_w_src", "crop_h_src"],
        );

        let payloads: Vec<Vec<u8>> = (0..3).map(|i| make_jpeg(64, 64, i)).collect();
        let mut feeds = HashMap::new();
        feeds.insert(
            "encoded".to_string(),
            TensorBatch::from_bytes(payloads).unwrap(),
        );
        feeds.insert(
            "crop_x_src".to_string(),
            TensorBatch::scalars_i64(&[0, 2, 4]).unwrap(),
        );
        feeds.insert(
            "crop_y_src".to_string(),
            TensorBatch::scalars_i64(&[1, 3, 5]).unwrap(),
        );
        feeds.insert(
            "crop_w_src".to_string(),
            TensorBatch::scalars_i64(&[8, 12, 16]).unwrap(),
        );
        feeds.insert(
            "crop_h_src".to_string(),
            TensorBatch::scalars_i64(&[6, 10, 14]).unwrap(),
        );
        let result = pipeline.run_iteration(feeds).unwrap();

        let decoded = result.get("decoded", Device::Host).unwrap();
        let shapes: Vec<&[usize]> = decoded.samples().iter().map(Tensor::shape).collect();
        // Each output matches its own rectangle, not a shared one
        assert_eq!(
            shapes,
            vec![&[6, 8, 3][..], &[10, 12, 3][..], &[14, 16, 3][..]]
        );
    }

    #[test]
    fn test_deprecated_threshold_alias_still_configures() {
        let spec = decode_spec()
            .add_arg("hybrid_huffman_threshold", 0_i64)
            .unwrap();
        assert_eq!(
            spec.get_argument::<i64>("hybrid_threshold", None, 0).unwrap(),
            0
        );
        let operator =
            ImageDecodeOperator::from_spec(&spec, Arc::new(StubDecoder), &StubProbe {
                hardware: false,
            })
            .unwrap();
        // Threshold zero makes a small JPEG eligible for the hybrid tier
        let tier = operator.dispatcher().classify(
            crate::format::ImageFormat::Jpeg,
            Some(crate::format::ImageDims {
                width: 10,
                height: 10,
                channels: 3,
            }),
            PixelFormat::Rgb,
        );
        assert_eq!(tier, DecodeBackend::Hybrid);
    }

    #[test]
    fn test_decode_failure_names_failed_samples() {
        let spec = decode_spec()
            .add_arg("device", "host")
            .unwrap()
            .add_input("encoded", Device::Host)
            .add_output("decoded", Device::Host)
            .unwrap();
        let mut operator =
            ImageDecodeOperator::from_spec(&spec, Arc::new(StubDecoder), &StubProbe {
                hardware: false,
            })
            .unwrap();

        let batch = TensorBatch::from_bytes(vec![
            make_jpeg(8, 8, 0),
            b"definitely not an image".to_vec(),
        ])
        .unwrap();
        let err = operator
            .run(&spec, &ArgumentWorkspace::new(), &[Arc::new(batch)])
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("sample 1"), "got: {}", message);
    }

    #[test]
    fn test_preallocation_hints_size_the_pool() {
        let spec = decode_spec()
            .add_arg("preallocate_width_hint", 128_i64)
            .unwrap()
            .add_arg("preallocate_height_hint", 64_i64)
            .unwrap();
        let operator =
            ImageDecodeOperator::from_spec(&spec, Arc::new(StubDecoder), &StubProbe {
                hardware: true,
            })
            .unwrap();
        assert_eq!(operator.pool().capacity(), 128 * 64 * 3);
    }

    #[test]
    fn test_rejects_unknown_device() {
        let spec = decode_spec().add_arg("device", "quantum").unwrap();
        let err = ImageDecodeOperator::from_spec(&spec, Arc::new(StubDecoder), &StubProbe {
            hardware: false,
        })
        .unwrap_err();
        assert!(err.to_string().contains("quantum"));
    }
}
