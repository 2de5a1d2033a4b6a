//! Core abstractions for batched multi-device preprocessing pipelines
//!
//! This crate provides the building blocks for assembling a graph of
//! named processing stages and executing it over batches of samples:
//! operator schemas and their process-wide registry, typed argument
//! storage with three-tier resolution (tensor-argument, literal, schema
//! default), the pipeline graph with automatic device-transition
//! insertion, and per-iteration execution.

#![warn(missing_docs)]

pub mod argument;
pub mod batch;
pub mod device;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod schema;
pub mod spec;
pub mod workspace;

// Re-export key types for convenience
pub use argument::{ArgType, ArgValue, Argument, FromArgValue, IntoArgValue};
pub use batch::{ElemType, Tensor, TensorBatch, TensorData};
pub use device::Device;
pub use error::{Error, Result};
pub use graph::{NodeId, PipelineGraph};
pub use pipeline::{
    IterationResult, IterationStats, Operator, Pipeline, PipelineConfig, PipelineNode,
};
pub use schema::{ArgDef, DeprecatedArg, OpSchema, SchemaRegistry};
pub use spec::{ArgumentInput, OpSpec, TensorId};
pub use workspace::ArgumentWorkspace;
