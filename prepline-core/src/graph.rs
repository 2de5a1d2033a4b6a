//! Pipeline graph assembly
//!
//! Nodes are operator specifications; edges are shared `(name, device)`
//! tensor identifiers. The graph is a DAG by construction: every input
//! must resolve to an output produced by an earlier node or to a
//! declared external input, so no forward references or cycles can be
//! expressed. Cross-device consumption inserts an explicit copy stage.

use std::collections::{HashMap, HashSet};
use std::sync::Once;

use tracing::warn;

use crate::device::Device;
use crate::error::{Error, Result};
use crate::pipeline::{CopyToDevice, Operator, Pipeline, PipelineConfig, PipelineNode};
use crate::schema::{OpSchema, SchemaRegistry};
use crate::spec::{OpSpec, TensorId};

/// Index of a node in construction order
pub type NodeId = usize;

/// Who produces a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Producer {
    /// Fed by the caller each iteration
    External,

    /// Produced by the node with this index
    Node(NodeId),
}

/// Schema name of the built-in device transition stage
pub const COPY_SCHEMA: &str = "CopyToDevice";

fn ensure_builtin_schemas() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        SchemaRegistry::register(OpSchema::new(COPY_SCHEMA).inputs(1, 1).outputs(1))
            .expect("built-in schemas are registered once");
    });
}

/// An under-construction pipeline graph
pub struct PipelineGraph {
    config: PipelineConfig,
    nodes: Vec<PipelineNode>,
    producers: HashMap<TensorId, Producer>,
    consumed: HashSet<TensorId>,
    external_inputs: Vec<TensorId>,
}

impl PipelineGraph {
    /// Create an empty graph
    pub fn new(config: PipelineConfig) -> Self {
        ensure_builtin_schemas();
        Self {
            config,
            nodes: Vec::new(),
            producers: HashMap::new(),
            consumed: HashSet::new(),
            external_inputs: Vec::new(),
        }
    }

    /// Declare a tensor fed by the caller at each iteration
    pub fn add_external_input(&mut self, name: &str, device: Device) -> Result<()> {
        let id = TensorId::new(name, device);
        if self.producers.contains_key(&id) {
            return Err(Error::InvalidArgument(format!(
                "Tensor \"{}\" already has a producer",
                id
            )));
        }
        self.producers.insert(id.clone(), Producer::External);
        self.external_inputs.push(id);
        Ok(())
    }

    /// Append a node, validating it against its schema and the tensors
    /// produced so far
    ///
    /// Validation: the schema must be registered, the regular input and
    /// output counts must satisfy the schema's arity bounds, and every
    /// input must resolve to an earlier producer. An input requested on
    /// a device its producer did not emit on gets a [`CopyToDevice`]
    /// transition inserted in front of this node.
    pub fn add_node(&mut self, spec: OpSpec, operator: Box<dyn Operator>) -> Result<NodeId> {
        let schema = spec.schema()?.clone();

        let num_regular = spec.num_regular_input();
        if num_regular < schema.min_inputs() || num_regular > schema.max_inputs() {
            return Err(Error::ArityMismatch {
                schema: schema.name().to_string(),
                expected: format!(
                    "between {} and {} inputs",
                    schema.min_inputs(),
                    schema.max_inputs()
                ),
                actual: num_regular,
            });
        }
        if spec.num_output() != schema.num_outputs() {
            return Err(Error::ArityMismatch {
                schema: schema.name().to_string(),
                expected: format!("exactly {} outputs", schema.num_outputs()),
                actual: spec.num_output(),
            });
        }

        for idx in 0..spec.num_input() {
            let id = spec.input(idx)?;
            self.resolve_input(&id, schema.name())?;
        }

        for output in spec.outputs() {
            if self.producers.contains_key(output) {
                return Err(Error::InvalidArgument(format!(
                    "Tensor \"{}\" already has a producer",
                    output
                )));
            }
        }

        let node_id = self.nodes.len();
        for output in spec.outputs() {
            self.producers.insert(output.clone(), Producer::Node(node_id));
        }
        self.nodes.push(PipelineNode { spec, operator });
        Ok(node_id)
    }

    /// Resolve one consumed tensor, inserting a device transition when
    /// only the opposite placement exists
    fn resolve_input(&mut self, id: &TensorId, consumer: &str) -> Result<()> {
        if self.producers.contains_key(id) {
            self.consumed.insert(id.clone());
            return Ok(());
        }

        let other = TensorId::new(&id.name, id.device.other());
        if self.producers.contains_key(&other) {
            self.consumed.insert(other.clone());
            let copy_spec = OpSpec::new(COPY_SCHEMA)
                .add_input(&other.name, other.device)
                .add_output(&id.name, id.device)?;
            let copy_id = self.nodes.len();
            self.producers.insert(id.clone(), Producer::Node(copy_id));
            self.nodes.push(PipelineNode {
                spec: copy_spec,
                operator: Box::new(CopyToDevice::new(id.device)),
            });
            self.consumed.insert(id.clone());
            return Ok(());
        }

        Err(Error::UnresolvedInput {
            tensor: id.to_string(),
            operator: consumer.to_string(),
        })
    }

    /// Number of nodes added so far, including inserted transitions
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Finalize the graph into an executable pipeline
    ///
    /// The execution order is construction order, which is already
    /// topological. Outputs that no node consumes are reported as a
    /// warning only; they may be fetched by the caller after an
    /// iteration.
    pub fn build(self) -> Result<Pipeline> {
        for (id, producer) in &self.producers {
            if matches!(producer, Producer::Node(_)) && !self.consumed.contains(id) {
                warn!(tensor = %id, "pipeline output is not consumed by any node");
            }
        }
        Ok(Pipeline {
            nodes: self.nodes,
            external_inputs: self.external_inputs,
            config: self.config,
        })
    }
}
