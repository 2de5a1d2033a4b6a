//! Batched tensors routed between pipeline stages
//!
//! A [`TensorBatch`] is the unit of data flowing along a pipeline edge:
//! one tensor per sample, all samples sharing an element type, placed on
//! a single device. Samples may have different shapes (e.g. decoded
//! images of different sizes).

use std::fmt;

use crate::argument::{ArgType, ArgValue};
use crate::device::Device;
use crate::error::{Error, Result};

/// Element type of tensor storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElemType {
    /// Unsigned 8-bit integer (raw bytes, interleaved pixels)
    U8,

    /// 64-bit signed integer
    I64,

    /// 32-bit float
    F32,

    /// 64-bit float
    F64,

    /// Boolean
    Bool,
}

impl ElemType {
    /// The semantic argument type this element type reads as, if any
    ///
    /// Only `I64`, `F64` and `Bool` elements can back tensor-arguments;
    /// `U8` and `F32` are data-plane only.
    pub fn arg_type(self) -> Option<ArgType> {
        match self {
            ElemType::I64 => Some(ArgType::Int),
            ElemType::F64 => Some(ArgType::Float),
            ElemType::Bool => Some(ArgType::Bool),
            ElemType::U8 | ElemType::F32 => None,
        }
    }
}

impl fmt::Display for ElemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElemType::U8 => "u8",
            ElemType::I64 => "i64",
            ElemType::F32 => "f32",
            ElemType::F64 => "f64",
            ElemType::Bool => "bool",
        };
        write!(f, "{}", name)
    }
}

/// Typed element storage for one tensor
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    /// Unsigned bytes
    U8(Vec<u8>),

    /// Signed 64-bit integers
    I64(Vec<i64>),

    /// 32-bit floats
    F32(Vec<f32>),

    /// 64-bit floats
    F64(Vec<f64>),

    /// Booleans
    Bool(Vec<bool>),
}

impl TensorData {
    /// Element type tag of this storage
    pub fn elem(&self) -> ElemType {
        match self {
            TensorData::U8(_) => ElemType::U8,
            TensorData::I64(_) => ElemType::I64,
            TensorData::F32(_) => ElemType::F32,
            TensorData::F64(_) => ElemType::F64,
            TensorData::Bool(_) => ElemType::Bool,
        }
    }

    /// Number of stored elements
    pub fn len(&self) -> usize {
        match self {
            TensorData::U8(v) => v.len(),
            TensorData::I64(v) => v.len(),
            TensorData::F32(v) => v.len(),
            TensorData::F64(v) => v.len(),
            TensorData::Bool(v) => v.len(),
        }
    }

    /// Check if the storage holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One sample's dense tensor
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// Shape of the tensor; an empty shape denotes a zero-dimensional scalar
    shape: Vec<usize>,

    /// Element storage in row-major order
    data: TensorData,
}

impl Tensor {
    /// Create a tensor, validating that the storage matches the shape
    pub fn new(shape: Vec<usize>, data: TensorData) -> Result<Self> {
        let volume: usize = shape.iter().product();
        if data.len() != volume {
            return Err(Error::InvalidArgument(format!(
                "Tensor storage holds {} elements but shape {:?} requires {}",
                data.len(),
                shape,
                volume
            )));
        }
        Ok(Self { shape, data })
    }

    /// Create a single-element scalar tensor
    pub fn scalar(data: TensorData) -> Result<Self> {
        Self::new(vec![1], data)
    }

    /// Get the shape
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the element storage
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Get the element type tag
    pub fn elem(&self) -> ElemType {
        self.data.elem()
    }

    /// Total number of elements
    pub fn volume(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether this sample holds exactly one element
    ///
    /// Both a zero-dimensional tensor and a tensor of shape `[1, ...]`
    /// with unit volume count as scalar.
    pub fn is_scalar(&self) -> bool {
        self.volume() == 1
    }

    /// Read the single element as an argument value, if the element type
    /// has a semantic mapping and the tensor is scalar-shaped
    pub fn scalar_arg_value(&self) -> Option<ArgValue> {
        if !self.is_scalar() {
            return None;
        }
        match &self.data {
            TensorData::I64(v) => Some(ArgValue::Int(v[0])),
            TensorData::F64(v) => Some(ArgValue::Float(v[0])),
            TensorData::Bool(v) => Some(ArgValue::Bool(v[0])),
            TensorData::U8(_) | TensorData::F32(_) => None,
        }
    }
}

/// A batch of per-sample tensors on one device
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBatch {
    /// Device the batch lives on
    device: Device,

    /// Shared element type of every sample
    elem: ElemType,

    /// One tensor per sample
    samples: Vec<Tensor>,
}

impl TensorBatch {
    /// Create a batch, validating that all samples share an element type
    pub fn new(device: Device, samples: Vec<Tensor>) -> Result<Self> {
        let elem = samples.first().map(Tensor::elem).ok_or_else(|| {
            Error::InvalidArgument("A tensor batch must hold at least one sample".into())
        })?;
        for (i, sample) in samples.iter().enumerate() {
            if sample.elem() != elem {
                return Err(Error::InvalidArgument(format!(
                    "Sample {} has element type {} but the batch holds {}",
                    i,
                    sample.elem(),
                    elem
                )));
            }
        }
        Ok(Self { device, elem, samples })
    }

    /// Create a host batch of per-sample integer scalars
    pub fn scalars_i64(values: &[i64]) -> Result<Self> {
        let samples = values
            .iter()
            .map(|&v| Tensor::scalar(TensorData::I64(vec![v])))
            .collect::<Result<Vec<_>>>()?;
        Self::new(Device::Host, samples)
    }

    /// Create a host batch of per-sample float scalars
    pub fn scalars_f64(values: &[f64]) -> Result<Self> {
        let samples = values
            .iter()
            .map(|&v| Tensor::scalar(TensorData::F64(vec![v])))
            .collect::<Result<Vec<_>>>()?;
        Self::new(Device::Host, samples)
    }

    /// Create a host batch where each sample is an opaque byte payload
    pub fn from_bytes(payloads: Vec<Vec<u8>>) -> Result<Self> {
        let samples = payloads
            .into_iter()
            .map(|bytes| Tensor::new(vec![bytes.len()], TensorData::U8(bytes)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(Device::Host, samples)
    }

    /// Get the device this batch lives on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Get the shared element type
    pub fn elem(&self) -> ElemType {
        self.elem
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the batch holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get one sample
    pub fn sample(&self, idx: usize) -> Result<&Tensor> {
        self.samples.get(idx).ok_or(Error::IndexOutOfBounds {
            index: idx,
            len: self.samples.len(),
        })
    }

    /// All samples in batch order
    pub fn samples(&self) -> &[Tensor] {
        &self.samples
    }

    /// First sample whose shape is not scalar, if any
    ///
    /// Used to validate tensor-arguments, which must carry exactly one
    /// element per sample.
    pub fn scalar_shape_violation(&self) -> Option<(usize, Vec<usize>)> {
        self.samples
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_scalar())
            .map(|(i, s)| (i, s.shape().to_vec()))
    }

    /// Re-tag this batch onto another device
    ///
    /// Models the cross-device copy performed by the transition stage;
    /// the storage itself is cloned.
    pub fn to_device(&self, device: Device) -> TensorBatch {
        TensorBatch {
            device,
            elem: self.elem,
            samples: self.samples.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape_validation() {
        assert!(Tensor::new(vec![2, 2], TensorData::U8(vec![0; 4])).is_ok());
        assert!(Tensor::new(vec![2, 2], TensorData::U8(vec![0; 3])).is_err());
    }

    #[test]
    fn test_scalar_detection() {
        let scalar = Tensor::scalar(TensorData::I64(vec![7])).unwrap();
        assert!(scalar.is_scalar());
        assert_eq!(scalar.scalar_arg_value(), Some(ArgValue::Int(7)));

        let wide = Tensor::new(vec![3], TensorData::I64(vec![1, 2, 3])).unwrap();
        assert!(!wide.is_scalar());
        assert_eq!(wide.scalar_arg_value(), None);
    }

    #[test]
    fn test_batch_uniform_elem_type() {
        let mixed = vec![
            Tensor::scalar(TensorData::I64(vec![1])).unwrap(),
            Tensor::scalar(TensorData::F64(vec![1.0])).unwrap(),
        ];
        assert!(TensorBatch::new(Device::Host, mixed).is_err());
    }

    #[test]
    fn test_scalar_batch_helpers() {
        let batch = TensorBatch::scalars_i64(&[10, 20, 30]).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.elem(), ElemType::I64);
        assert!(batch.scalar_shape_violation().is_none());
    }

    #[test]
    fn test_scalar_shape_violation_reported() {
        let samples = vec![
            Tensor::scalar(TensorData::I64(vec![1])).unwrap(),
            Tensor::new(vec![2], TensorData::I64(vec![4, 5])).unwrap(),
        ];
        let batch = TensorBatch::new(Device::Host, samples).unwrap();
        assert_eq!(batch.scalar_shape_violation(), Some((1, vec![2])));
    }

    #[test]
    fn test_to_device_retags() {
        let batch = TensorBatch::scalars_i64(&[1]).unwrap();
        let moved = batch.to_device(Device::Accelerator);
        assert_eq!(moved.device(), Device::Accelerator);
        assert_eq!(moved.len(), batch.len());
    }
}
