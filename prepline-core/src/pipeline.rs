//! Pipeline iteration execution
//!
//! A [`Pipeline`] is the built, read-only form of a
//! [`PipelineGraph`](crate::graph::PipelineGraph). Each call to
//! [`Pipeline::run_iteration`] routes tensor batches between operators
//! by `(name, device)`, constructing a fresh [`ArgumentWorkspace`] for
//! every node from its argument-input bindings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::batch::TensorBatch;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::spec::{OpSpec, TensorId};
use crate::workspace::ArgumentWorkspace;

/// A processing stage: consumes input batches, produces output batches
///
/// Operators receive their spec and the per-iteration workspace on every
/// run so that tensor-arguments resolve against the current batch.
pub trait Operator: Send {
    /// Execute one iteration over the current batch
    fn run(
        &mut self,
        spec: &OpSpec,
        workspace: &ArgumentWorkspace,
        inputs: &[Arc<TensorBatch>],
    ) -> Result<Vec<TensorBatch>>;
}

/// Built-in transition stage copying a tensor across the device boundary
///
/// Inserted automatically by the graph whenever a consumer requests a
/// tensor on a different device than its producer emitted it on.
pub struct CopyToDevice {
    /// Device the output is placed on
    target: Device,
}

impl CopyToDevice {
    /// Create a transition stage targeting the given device
    pub fn new(target: Device) -> Self {
        Self { target }
    }
}

impl Operator for CopyToDevice {
    fn run(
        &mut self,
        _spec: &OpSpec,
        _workspace: &ArgumentWorkspace,
        inputs: &[Arc<TensorBatch>],
    ) -> Result<Vec<TensorBatch>> {
        let input = inputs
            .first()
            .ok_or_else(|| Error::PipelineExecution("CopyToDevice expects one input".into()))?;
        Ok(vec![input.to_device(self.target)])
    }
}

/// Configuration for a pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Largest batch size an iteration may carry
    pub max_batch_size: usize,

    /// Number of worker threads available to operators
    pub worker_threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 256,
            worker_threads: num_cpus::get(),
        }
    }
}

/// One node of a built pipeline
pub struct PipelineNode {
    /// The node's specification
    pub(crate) spec: OpSpec,

    /// The operator instance executing the node
    pub(crate) operator: Box<dyn Operator>,
}

/// Statistics from one pipeline iteration
#[derive(Debug, Clone)]
pub struct IterationStats {
    /// Number of nodes executed
    pub nodes_executed: usize,

    /// Wall time of the iteration
    pub execution_time: Duration,
}

/// Tensors produced by one pipeline iteration
pub struct IterationResult {
    tensors: HashMap<TensorId, Arc<TensorBatch>>,
    stats: IterationStats,
}

impl IterationResult {
    /// Fetch a named output
    pub fn get(&self, name: &str, device: Device) -> Option<Arc<TensorBatch>> {
        self.tensors.get(&TensorId::new(name, device)).cloned()
    }

    /// Statistics for this iteration
    pub fn stats(&self) -> &IterationStats {
        &self.stats
    }
}

/// An executable pipeline: ordered nodes plus external feed points
pub struct Pipeline {
    pub(crate) nodes: Vec<PipelineNode>,
    pub(crate) external_inputs: Vec<TensorId>,
    pub(crate) config: PipelineConfig,
}

impl Pipeline {
    /// Get the pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of nodes, including inserted device transitions
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Run one iteration
    ///
    /// `feeds` supplies a batch for every declared external input, keyed
    /// by tensor name. All fed batches must carry the same number of
    /// samples, at most the configured maximum batch size.
    pub fn run_iteration(
        &mut self,
        mut feeds: HashMap<String, TensorBatch>,
    ) -> Result<IterationResult> {
        let start = Instant::now();
        let mut tensors: HashMap<TensorId, Arc<TensorBatch>> = HashMap::new();

        let mut batch_size = None;
        for id in &self.external_inputs {
            let batch = feeds.remove(&id.name).ok_or_else(|| {
                Error::PipelineExecution(format!("No feed supplied for external input \"{}\"", id))
            })?;
            if batch.device() != id.device {
                return Err(Error::PipelineExecution(format!(
                    "External input \"{}\" was fed on device {}",
                    id,
                    batch.device()
                )));
            }
            if batch.len() > self.config.max_batch_size {
                return Err(Error::PipelineExecution(format!(
                    "Feed \"{}\" carries {} samples, the maximum batch size is {}",
                    id,
                    batch.len(),
                    self.config.max_batch_size
                )));
            }
            match batch_size {
                None => batch_size = Some(batch.len()),
                Some(expected) if expected != batch.len() => {
                    return Err(Error::PipelineExecution(format!(
                        "Feed \"{}\" carries {} samples, other feeds carry {}",
                        id,
                        batch.len(),
                        expected
                    )));
                }
                Some(_) => {}
            }
            tensors.insert(id.clone(), Arc::new(batch));
        }
        if let Some(name) = feeds.keys().next() {
            return Err(Error::PipelineExecution(format!(
                "Feed \"{}\" does not match any declared external input",
                name
            )));
        }

        for node in &mut self.nodes {
            let inputs = node
                .spec
                .regular_inputs()
                .iter()
                .map(|id| {
                    tensors.get(id).cloned().ok_or_else(|| {
                        Error::PipelineExecution(format!("Tensor \"{}\" missing at execution", id))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let mut workspace = ArgumentWorkspace::new();
            for arg_input in node.spec.argument_inputs() {
                let id = TensorId::new(&arg_input.tensor_name, Device::Host);
                let batch = tensors.get(&id).cloned().ok_or_else(|| {
                    Error::PipelineExecution(format!("Tensor \"{}\" missing at execution", id))
                })?;
                workspace.bind(&arg_input.arg_name, batch);
            }

            let outputs = node.operator.run(&node.spec, &workspace, &inputs)?;
            if outputs.len() != node.spec.num_output() {
                return Err(Error::PipelineExecution(format!(
                    "Operator \"{}\" produced {} outputs, its spec declares {}",
                    node.spec.schema_name(),
                    outputs.len(),
                    node.spec.num_output()
                )));
            }
            for (idx, output) in outputs.into_iter().enumerate() {
                let id = node.spec.output(idx)?.clone();
                if output.device() != id.device {
                    return Err(Error::PipelineExecution(format!(
                        "Operator \"{}\" produced output \"{}\" on device {}",
                        node.spec.schema_name(),
                        id,
                        output.device()
                    )));
                }
                tensors.insert(id, Arc::new(output));
            }
        }

        let stats = IterationStats {
            nodes_executed: self.nodes.len(),
            execution_time: start.elapsed(),
        };
        Ok(IterationResult { tensors, stats })
    }
}
