//! Operator specifications
//!
//! An [`OpSpec`] describes one concrete operator instance: the schema it
//! is typed by, its ordered regular inputs and outputs, its argument
//! inputs (arguments whose values arrive per-sample at run time), and its
//! literal arguments. A spec is built incrementally by the caller and is
//! effectively read-only once its node has been added to a pipeline
//! graph.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::argument::{Argument, FromArgValue, IntoArgValue};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::schema::{OpSchema, SchemaRegistry};
use crate::workspace::ArgumentWorkspace;

/// A tensor identifier: intermediate data are addressed by name and
/// device, so `("decoded", Host)` and `("decoded", Accelerator)` are two
/// placements of the same logical tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId {
    /// Tensor name, unique among pipeline intermediates
    pub name: String,

    /// Device the tensor is placed on
    pub device: Device,
}

impl TensorId {
    /// Create a tensor identifier
    pub fn new(name: &str, device: Device) -> Self {
        Self {
            name: name.to_string(),
            device,
        }
    }
}

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.device)
    }
}

/// One argument input: an argument whose per-sample values arrive through
/// a named tensor instead of being fixed at specification time
#[derive(Debug, Clone)]
pub struct ArgumentInput {
    /// Name of the schema argument being fed
    pub arg_name: String,

    /// Name of the external tensor carrying the per-sample values
    pub tensor_name: String,
}

/// All parameters needed to construct one operator instance
#[derive(Debug, Clone, Default)]
pub struct OpSpec {
    /// Schema (operator type) name
    schema_name: String,

    /// Resolved schema; absent when the name is unregistered
    schema: Option<Arc<OpSchema>>,

    /// Literal arguments in addition order
    arguments: Vec<Argument>,

    /// Argument name -> index into `arguments`
    argument_idxs: HashMap<String, usize>,

    /// Argument inputs in addition order
    argument_inputs: Vec<ArgumentInput>,

    /// Argument name -> index into `argument_inputs`
    argument_input_idxs: HashMap<String, usize>,

    /// Provenance of arguments set through renamed deprecated names:
    /// maps the regular argument name to the deprecated name actually used
    set_through_deprecated: HashMap<String, String>,

    /// Regular inputs in addition order
    inputs: Vec<TensorId>,

    /// Outputs in addition order
    outputs: Vec<TensorId>,

    /// (name, device) -> index into `outputs`
    output_name_idx: HashMap<TensorId, usize>,
}

impl OpSpec {
    /// Construct a specification for an operator with the given schema name
    pub fn new(schema_name: &str) -> Self {
        Self {
            schema_name: schema_name.to_string(),
            schema: SchemaRegistry::try_get(schema_name),
            ..Self::default()
        }
    }

    /// Get the schema name of the operator
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// Get the resolved schema, failing when the name is unregistered
    pub fn schema(&self) -> Result<&Arc<OpSchema>> {
        self.schema
            .as_ref()
            .ok_or_else(|| Error::UnknownSchema(self.schema_name.clone()))
    }

    /// Add an argument with the given name and value
    ///
    /// Fails with [`Error::ConflictingSpecification`] when the argument
    /// was already set, directly or through a deprecated alias.
    pub fn add_arg<T: IntoArgValue>(self, name: &str, value: T) -> Result<Self> {
        self.set_initialized_arg(name, Argument::new(name, value), false)
    }

    /// Set or overwrite an argument with the given name and value
    ///
    /// Overwriting is only permitted along the same route: setting an
    /// argument directly after it was set through a deprecated alias (or
    /// vice versa) is still a conflicting specification.
    pub fn set_arg<T: IntoArgValue>(self, name: &str, value: T) -> Result<Self> {
        self.set_initialized_arg(name, Argument::new(name, value), true)
    }

    /// Add an argument only when it has not been specified yet
    pub fn add_arg_if_missing<T: IntoArgValue>(self, name: &str, value: T) -> Result<Self> {
        if self.argument_defined(name) {
            return Ok(self);
        }
        self.add_arg(name, value)
    }

    /// Specify the name and device of a regular input
    ///
    /// Input order is strict: the operator receives inputs in the order
    /// they were added.
    pub fn add_input(mut self, name: &str, device: Device) -> Self {
        self.inputs.push(TensorId::new(name, device));
        self
    }

    /// Specify an argument input
    ///
    /// The argument must exist in the schema, and must not also be set
    /// as a literal on this spec.
    pub fn add_argument_input(mut self, arg_name: &str, tensor_name: &str) -> Result<Self> {
        let schema = self.schema()?;
        if !schema.has_argument(arg_name) {
            return Err(Error::UnknownArgument {
                schema: schema.name().to_string(),
                name: arg_name.to_string(),
            });
        }
        if self.argument_idxs.contains_key(arg_name) {
            return Err(Error::ConflictingSpecification {
                name: arg_name.to_string(),
                reason: "already set as a literal argument".into(),
            });
        }
        if self.argument_input_idxs.contains_key(arg_name) {
            return Err(Error::ConflictingSpecification {
                name: arg_name.to_string(),
                reason: "argument input already added".into(),
            });
        }
        self.argument_input_idxs
            .insert(arg_name.to_string(), self.argument_inputs.len());
        self.argument_inputs.push(ArgumentInput {
            arg_name: arg_name.to_string(),
            tensor_name: tensor_name.to_string(),
        });
        Ok(self)
    }

    /// Specify the name and device of an output
    pub fn add_output(mut self, name: &str, device: Device) -> Result<Self> {
        let id = TensorId::new(name, device);
        if self.output_name_idx.contains_key(&id) {
            return Err(Error::InvalidArgument(format!(
                "Output \"{}\" already exists on this spec",
                id
            )));
        }
        self.output_name_idx.insert(id.clone(), self.outputs.len());
        self.outputs.push(id);
        Ok(self)
    }

    /// Number of inputs, regular and argument inputs combined
    pub fn num_input(&self) -> usize {
        self.inputs.len() + self.argument_inputs.len()
    }

    /// Number of regular inputs
    pub fn num_regular_input(&self) -> usize {
        self.inputs.len()
    }

    /// Number of argument inputs
    pub fn num_argument_input(&self) -> usize {
        self.argument_inputs.len()
    }

    /// Number of outputs
    pub fn num_output(&self) -> usize {
        self.outputs.len()
    }

    /// Get an input identifier; regular inputs come first, argument
    /// inputs follow in addition order on the host device
    pub fn input(&self, idx: usize) -> Result<TensorId> {
        if idx < self.inputs.len() {
            return Ok(self.inputs[idx].clone());
        }
        let arg_idx = idx - self.inputs.len();
        let arg = self
            .argument_inputs
            .get(arg_idx)
            .ok_or(Error::IndexOutOfBounds {
                index: idx,
                len: self.num_input(),
            })?;
        Ok(TensorId::new(&arg.tensor_name, Device::Host))
    }

    /// Check whether the input at `idx` is an argument input
    pub fn is_argument_input(&self, idx: usize) -> bool {
        idx >= self.inputs.len() && idx < self.num_input()
    }

    /// Get the argument name fed by the argument input at `idx`
    /// (indexing over all inputs)
    pub fn argument_input_name(&self, idx: usize) -> Result<&str> {
        if !self.is_argument_input(idx) {
            return Err(Error::InvalidArgument(format!(
                "Input {} is not an argument input",
                idx
            )));
        }
        Ok(&self.argument_inputs[idx - self.inputs.len()].arg_name)
    }

    /// All argument inputs in addition order
    pub fn argument_inputs(&self) -> &[ArgumentInput] {
        &self.argument_inputs
    }

    /// All regular inputs in addition order
    pub fn regular_inputs(&self) -> &[TensorId] {
        &self.inputs
    }

    /// Get an output identifier
    pub fn output(&self, idx: usize) -> Result<&TensorId> {
        self.outputs.get(idx).ok_or(Error::IndexOutOfBounds {
            index: idx,
            len: self.outputs.len(),
        })
    }

    /// All outputs in addition order
    pub fn outputs(&self) -> &[TensorId] {
        &self.outputs
    }

    /// Index of the output with the given name and device
    pub fn output_idx_for(&self, name: &str, device: Device) -> Result<usize> {
        let id = TensorId::new(name, device);
        self.output_name_idx
            .get(&id)
            .copied()
            .ok_or_else(|| Error::InvalidArgument(format!("Output \"{}\" does not exist", id)))
    }

    /// Check whether an argument was set as a literal on this spec
    ///
    /// Schema defaults do not count: an optional argument left unset
    /// reports `false`.
    pub fn has_argument(&self, name: &str) -> bool {
        self.argument_idxs.contains_key(name)
    }

    /// Check whether an argument was specified as an argument input
    pub fn has_tensor_argument(&self, name: &str) -> bool {
        self.argument_input_idxs.contains_key(name)
    }

    /// Check whether an argument was specified either way
    pub fn argument_defined(&self, name: &str) -> bool {
        self.has_argument(name) || self.has_tensor_argument(name)
    }

    /// List all arguments specified on this spec
    pub fn list_arguments(&self) -> Vec<&str> {
        self.arguments
            .iter()
            .map(Argument::name)
            .chain(self.argument_inputs.iter().map(|a| a.arg_name.as_str()))
            .collect()
    }

    /// Resolve an argument to a concrete value
    ///
    /// Resolution order:
    /// 1. argument input — requires a workspace; the bound batch must be
    ///    a batch of per-sample scalars whose element type matches the
    ///    requested type exactly, and `sample_idx` selects the sample;
    /// 2. literal argument set on this spec, read through the widening
    ///    table;
    /// 3. the schema's declared default.
    pub fn get_argument<T: FromArgValue>(
        &self,
        name: &str,
        workspace: Option<&ArgumentWorkspace>,
        sample_idx: usize,
    ) -> Result<T> {
        if self.has_tensor_argument(name) {
            let ws = workspace.ok_or_else(|| Error::MissingContext {
                name: name.to_string(),
            })?;
            let batch = ws.argument_input(name)?;
            if let Some((sample, shape)) = batch.scalar_shape_violation() {
                return Err(Error::ShapeMismatch {
                    name: name.to_string(),
                    batch_size: batch.len(),
                    sample,
                    shape,
                });
            }
            let stored = batch.elem();
            if stored.arg_type() != Some(T::REQUESTED) {
                return Err(Error::TypeMismatch {
                    name: name.to_string(),
                    stored: stored.to_string(),
                    requested: T::REQUESTED.to_string(),
                });
            }
            let value = self
                .sample_scalar(batch, sample_idx)?
                .expect("scalar shape was validated");
            return T::from_arg_value(&value).ok_or_else(|| Error::TypeMismatch {
                name: name.to_string(),
                stored: stored.to_string(),
                requested: T::REQUESTED.to_string(),
            });
        }
        if let Some(&idx) = self.argument_idxs.get(name) {
            return self.arguments[idx].get::<T>();
        }
        self.schema()?.default_value::<T>(name)
    }

    /// Non-failing variant of [`OpSpec::get_argument`]
    ///
    /// Same resolution order; any miss or mismatch yields `None` and
    /// schema defaults are consulted only when declared.
    pub fn try_get_argument<T: FromArgValue>(
        &self,
        name: &str,
        workspace: Option<&ArgumentWorkspace>,
        sample_idx: usize,
    ) -> Option<T> {
        if self.has_tensor_argument(name) {
            let batch = workspace?.argument_input(name).ok()?;
            if batch.scalar_shape_violation().is_some() {
                return None;
            }
            if batch.elem().arg_type() != Some(T::REQUESTED) {
                return None;
            }
            let value = self.sample_scalar(batch, sample_idx).ok()??;
            return T::from_arg_value(&value);
        }
        if let Some(&idx) = self.argument_idxs.get(name) {
            return self.arguments[idx].get::<T>().ok();
        }
        let schema = self.schema.as_ref()?;
        if schema.has_argument(name) && schema.has_default(name) {
            return schema.default_value::<T>(name).ok();
        }
        None
    }

    /// Resolve a repeated (sequence-valued) argument
    ///
    /// Sequences resolve from literals and schema defaults only; feeding
    /// a whole sequence through an argument input is unsupported.
    pub fn get_repeated_argument<T>(&self, name: &str) -> Result<Vec<T>>
    where
        Vec<T>: FromArgValue,
    {
        if self.has_tensor_argument(name) {
            return Err(Error::InvalidArgument(format!(
                "Repeated argument \"{}\" cannot be fed through an argument input",
                name
            )));
        }
        if let Some(&idx) = self.argument_idxs.get(name) {
            return self.arguments[idx].get::<Vec<T>>();
        }
        self.schema()?.default_value::<Vec<T>>(name)
    }

    /// Non-failing variant of [`OpSpec::get_repeated_argument`]
    pub fn try_get_repeated_argument<T>(&self, name: &str) -> Option<Vec<T>>
    where
        Vec<T>: FromArgValue,
    {
        if self.has_tensor_argument(name) {
            return None;
        }
        if let Some(&idx) = self.argument_idxs.get(name) {
            return self.arguments[idx].get::<Vec<T>>().ok();
        }
        let schema = self.schema.as_ref()?;
        if schema.has_argument(name) && schema.has_default(name) {
            return schema.default_value::<Vec<T>>(name).ok();
        }
        None
    }

    fn sample_scalar(
        &self,
        batch: &crate::batch::TensorBatch,
        sample_idx: usize,
    ) -> Result<Option<crate::argument::ArgValue>> {
        Ok(batch.sample(sample_idx)?.scalar_arg_value())
    }

    /// Store an argument, applying the deprecated-alias rewrite exactly
    /// once at this boundary
    fn set_initialized_arg(
        mut self,
        given_name: &str,
        argument: Argument,
        allow_update: bool,
    ) -> Result<Self> {
        let deprecation = self
            .schema
            .as_ref()
            .and_then(|s| s.deprecation(given_name).cloned());

        let (storage_name, via) = match deprecation {
            Some(record) => match record.renamed_to {
                Some(new_name) => {
                    warn!(
                        argument = given_name,
                        renamed_to = new_name.as_str(),
                        operator = self.schema_name.as_str(),
                        "setting a deprecated argument; it has been renamed"
                    );
                    (new_name, Some(given_name.to_string()))
                }
                None => {
                    warn!(
                        argument = given_name,
                        operator = self.schema_name.as_str(),
                        "setting a removed argument; the value is dropped"
                    );
                    return Ok(self);
                }
            },
            None => (given_name.to_string(), None),
        };

        if self.argument_input_idxs.contains_key(&storage_name) {
            return Err(Error::ConflictingSpecification {
                name: storage_name,
                reason: "already specified as an argument input".into(),
            });
        }

        let previous_route = self.set_through_deprecated.get(&storage_name).cloned();
        if let Some(&idx) = self.argument_idxs.get(&storage_name) {
            if previous_route != via {
                let reason = match (&previous_route, &via) {
                    (Some(old), None) => {
                        format!("already set through deprecated name \"{}\"", old)
                    }
                    (None, Some(old)) => format!(
                        "set directly and again through deprecated name \"{}\"",
                        old
                    ),
                    (Some(first), Some(second)) => format!(
                        "set through two deprecated names, \"{}\" and \"{}\"",
                        first, second
                    ),
                    (None, None) => unreachable!("identical routes are not a conflict"),
                };
                return Err(Error::ConflictingSpecification {
                    name: storage_name,
                    reason,
                });
            }
            if !allow_update {
                return Err(Error::ConflictingSpecification {
                    name: storage_name,
                    reason: "argument already set".into(),
                });
            }
            self.arguments[idx] = Argument::new(&storage_name, argument.value().clone());
            return Ok(self);
        }

        if let Some(old) = via {
            self.set_through_deprecated
                .insert(storage_name.clone(), old);
        }
        self.argument_idxs
            .insert(storage_name.clone(), self.arguments.len());
        self.arguments
            .push(Argument::new(&storage_name, argument.value().clone()));
        Ok(self)
    }
}

impl fmt::Display for OpSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OpSpec for {}:", self.schema_name)?;
        writeln!(f, "  Inputs:")?;
        for idx in 0..self.num_input() {
            let id = self.input(idx).map_err(|_| fmt::Error)?;
            writeln!(f, "    {}", id)?;
        }
        writeln!(f, "  Outputs:")?;
        for output in &self.outputs {
            writeln!(f, "    {}", output)?;
        }
        writeln!(f, "  Arguments:")?;
        for argument in &self.arguments {
            writeln!(f, "    {}", argument)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::ArgType;
    use crate::batch::{Tensor, TensorBatch, TensorData};
    use crate::schema::OpSchema;
    use std::sync::Arc;

    fn register_test_schema() {
        static ONCE: std::sync::Once = std::sync::Once::new();
        ONCE.call_once(|| {
            SchemaRegistry::register(
                OpSchema::new("SpecTestOp")
                    .inputs(1, 2)
                    .outputs(1)
                    .arg("threshold", 100_i64)
                    .arg("mode", "rgb")
                    .optional_arg("bias", ArgType::Float)
                    .optional_arg("crop_w", ArgType::Int)
                    .arg("scales", vec![1.0_f64, 2.0])
                    .deprecated_arg("old_threshold", "threshold")
                    .deprecated_arg("legacy_threshold", "threshold")
                    .removed_arg("dead_knob"),
            )
            .unwrap();
        });
    }

    fn spec() -> OpSpec {
        register_test_schema();
        OpSpec::new("SpecTestOp")
    }

    #[test]
    fn test_literal_resolution_ignores_workspace() {
        let s = spec().add_arg("threshold", 42_i64).unwrap();
        let ws = ArgumentWorkspace::new();
        assert_eq!(s.get_argument::<i64>("threshold", None, 0).unwrap(), 42);
        assert_eq!(s.get_argument::<i64>("threshold", Some(&ws), 3).unwrap(), 42);
    }

    #[test]
    fn test_schema_default_fallback() {
        let s = spec();
        assert_eq!(s.get_argument::<i64>("threshold", None, 0).unwrap(), 100);
        assert_eq!(s.get_argument::<String>("mode", None, 0).unwrap(), "rgb");
        assert!(matches!(
            s.get_argument::<f64>("bias", None, 0).unwrap_err(),
            Error::NoDefault { .. }
        ));
        assert!(matches!(
            s.get_argument::<i64>("no_such_arg", None, 0).unwrap_err(),
            Error::UnknownArgument { .. }
        ));
    }

    #[test]
    fn test_tensor_argument_requires_workspace() {
        let s = spec().add_argument_input("crop_w", "crop_w_src").unwrap();
        assert!(matches!(
            s.get_argument::<i64>("crop_w", None, 0).unwrap_err(),
            Error::MissingContext { .. }
        ));
    }

    #[test]
    fn test_tensor_argument_per_sample_values() {
        let s = spec().add_argument_input("crop_w", "crop_w_src").unwrap();
        let mut ws = ArgumentWorkspace::new();
        ws.bind("crop_w", Arc::new(TensorBatch::scalars_i64(&[64, 32, 16]).unwrap()));
        assert_eq!(s.get_argument::<i64>("crop_w", Some(&ws), 0).unwrap(), 64);
        assert_eq!(s.get_argument::<i64>("crop_w", Some(&ws), 2).unwrap(), 16);
    }

    #[test]
    fn test_tensor_argument_shape_mismatch() {
        let s = spec().add_argument_input("crop_w", "crop_w_src").unwrap();
        let samples = vec![
            Tensor::scalar(TensorData::I64(vec![1])).unwrap(),
            Tensor::new(vec![2], TensorData::I64(vec![2, 3])).unwrap(),
        ];
        let mut ws = ArgumentWorkspace::new();
        ws.bind(
            "crop_w",
            Arc::new(TensorBatch::new(Device::Host, samples).unwrap()),
        );
        match s.get_argument::<i64>("crop_w", Some(&ws), 0).unwrap_err() {
            Error::ShapeMismatch {
                name, batch_size, ..
            } => {
                assert_eq!(name, "crop_w");
                assert_eq!(batch_size, 2);
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_tensor_argument_exact_type_match() {
        let s = spec().add_argument_input("crop_w", "crop_w_src").unwrap();
        let mut ws = ArgumentWorkspace::new();
        ws.bind("crop_w", Arc::new(TensorBatch::scalars_f64(&[1.0]).unwrap()));
        // Int -> Float widening applies to literals, never to tensor
        // arguments: the element type must match exactly.
        assert!(matches!(
            s.get_argument::<i64>("crop_w", Some(&ws), 0).unwrap_err(),
            Error::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_add_arg_twice_conflicts() {
        let err = spec()
            .add_arg("threshold", 1_i64)
            .unwrap()
            .add_arg("threshold", 2_i64)
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingSpecification { .. }));
    }

    #[test]
    fn test_set_arg_overwrites_same_route() {
        let s = spec()
            .add_arg("threshold", 1_i64)
            .unwrap()
            .set_arg("threshold", 2_i64)
            .unwrap();
        assert_eq!(s.get_argument::<i64>("threshold", None, 0).unwrap(), 2);
    }

    #[test]
    fn test_deprecated_alias_rewrites_to_new_name() {
        let s = spec().add_arg("old_threshold", 7_i64).unwrap();
        assert!(s.has_argument("threshold"));
        assert!(!s.has_argument("old_threshold"));
        assert_eq!(s.get_argument::<i64>("threshold", None, 0).unwrap(), 7);
    }

    #[test]
    fn test_alias_and_direct_set_conflict() {
        let err = spec()
            .add_arg("old_threshold", 7_i64)
            .unwrap()
            .add_arg("threshold", 8_i64)
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingSpecification { .. }));

        let err = spec()
            .add_arg("threshold", 8_i64)
            .unwrap()
            .add_arg("old_threshold", 7_i64)
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingSpecification { .. }));
    }

    #[test]
    fn test_two_aliases_conflict() {
        let err = spec()
            .add_arg("old_threshold", 7_i64)
            .unwrap()
            .add_arg("legacy_threshold", 8_i64)
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingSpecification { .. }));
    }

    #[test]
    fn test_removed_argument_is_dropped() {
        let s = spec().add_arg("dead_knob", 3_i64).unwrap();
        assert!(!s.has_argument("dead_knob"));
        assert!(s.list_arguments().is_empty());
    }

    #[test]
    fn test_literal_and_tensor_argument_conflict() {
        let err = spec()
            .add_arg("crop_w", 10_i64)
            .unwrap()
            .add_argument_input("crop_w", "crop_w_src")
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingSpecification { .. }));

        let err = spec()
            .add_argument_input("crop_w", "crop_w_src")
            .unwrap()
            .add_arg("crop_w", 10_i64)
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingSpecification { .. }));
    }

    #[test]
    fn test_argument_input_must_exist_in_schema() {
        let err = spec()
            .add_argument_input("no_such_arg", "src")
            .unwrap_err();
        assert!(matches!(err, Error::UnknownArgument { .. }));
    }

    #[test]
    fn test_try_get_argument() {
        let s = spec().add_arg("threshold", 9_i64).unwrap();
        assert_eq!(s.try_get_argument::<i64>("threshold", None, 0), Some(9));
        assert_eq!(s.try_get_argument::<i64>("bias", None, 0), None);
        assert_eq!(s.try_get_argument::<i64>("no_such_arg", None, 0), None);

        let s = spec().add_argument_input("crop_w", "src").unwrap();
        assert_eq!(s.try_get_argument::<i64>("crop_w", None, 0), None);
    }

    #[test]
    fn test_repeated_argument_resolution() {
        let s = spec().add_arg("scales", vec![3.0_f64, 4.0]).unwrap();
        assert_eq!(
            s.get_repeated_argument::<f64>("scales").unwrap(),
            vec![3.0, 4.0]
        );
        // Falls back to the schema default when unset
        assert_eq!(
            spec().get_repeated_argument::<f64>("scales").unwrap(),
            vec![1.0, 2.0]
        );
    }

    #[test]
    fn test_input_output_bookkeeping() {
        let s = spec()
            .add_input("encoded", Device::Host)
            .add_argument_input("crop_w", "crop_w_src")
            .unwrap()
            .add_output("decoded", Device::Accelerator)
            .unwrap();
        assert_eq!(s.num_input(), 2);
        assert_eq!(s.num_regular_input(), 1);
        assert_eq!(s.num_argument_input(), 1);
        assert_eq!(s.num_output(), 1);
        assert!(!s.is_argument_input(0));
        assert!(s.is_argument_input(1));
        assert_eq!(s.argument_input_name(1).unwrap(), "crop_w");
        assert_eq!(
            s.input(1).unwrap(),
            TensorId::new("crop_w_src", Device::Host)
        );
        assert_eq!(
            s.output_idx_for("decoded", Device::Accelerator).unwrap(),
            0
        );
        assert!(s.output_idx_for("decoded", Device::Host).is_err());
    }

    #[test]
    fn test_unknown_schema_surfaces_at_schema_access() {
        let s = OpSpec::new("CompletelyUnknownOp");
        assert!(matches!(
            s.schema().unwrap_err(),
            Error::UnknownSchema(_)
        ));
        // Literal arguments still work without a schema
        let s = s.add_arg("x", 1_i64).unwrap();
        assert_eq!(s.get_argument::<i64>("x", None, 0).unwrap(), 1);
    }
}
