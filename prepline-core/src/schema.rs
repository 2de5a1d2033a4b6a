//! Operator schemas and the process-wide schema registry
//!
//! A schema is the static type description of an operator: the arguments
//! it accepts (with semantic types, defaults and required flags),
//! deprecated-argument aliases, and input/output arity bounds. Schemas
//! are created once per operator type at registration and are immutable
//! for the process lifetime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::argument::{ArgType, ArgValue, FromArgValue, IntoArgValue};
use crate::error::{Error, Result};

/// Declaration of a single schema argument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgDef {
    /// Semantic type of the argument
    pub arg_type: ArgType,

    /// Default value used when the argument is not set
    pub default: Option<ArgValue>,

    /// Whether a value must be supplied at specification time
    pub required: bool,
}

/// Deprecation record for a renamed or retired argument name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeprecatedArg {
    /// New name the argument was renamed to; `None` when the argument
    /// was removed and values set under the old name are dropped
    pub renamed_to: Option<String>,
}

/// The static type description of one operator type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpSchema {
    /// Operator type name, the schema's identity
    name: String,

    /// Declared arguments by name
    arguments: HashMap<String, ArgDef>,

    /// Deprecated-alias mapping (old name -> record)
    deprecated: HashMap<String, DeprecatedArg>,

    /// Minimum number of regular inputs
    min_inputs: usize,

    /// Maximum number of regular inputs
    max_inputs: usize,

    /// Exact number of outputs
    num_outputs: usize,
}

impl OpSchema {
    /// Start building a schema for the given operator type name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: HashMap::new(),
            deprecated: HashMap::new(),
            min_inputs: 0,
            max_inputs: 0,
            num_outputs: 0,
        }
    }

    /// Set the accepted regular-input count range
    pub fn inputs(mut self, min: usize, max: usize) -> Self {
        self.min_inputs = min;
        self.max_inputs = max;
        self
    }

    /// Set the exact output count
    pub fn outputs(mut self, num: usize) -> Self {
        self.num_outputs = num;
        self
    }

    /// Declare an optional argument with a default value
    pub fn arg<T: IntoArgValue>(mut self, name: &str, default: T) -> Self {
        let value = default.into_arg_value();
        self.arguments.insert(
            name.to_string(),
            ArgDef {
                arg_type: value.arg_type(),
                default: Some(value),
                required: false,
            },
        );
        self
    }

    /// Declare an optional argument with no default value
    pub fn optional_arg(mut self, name: &str, arg_type: ArgType) -> Self {
        self.arguments.insert(
            name.to_string(),
            ArgDef {
                arg_type,
                default: None,
                required: false,
            },
        );
        self
    }

    /// Declare a required argument
    pub fn required_arg(mut self, name: &str, arg_type: ArgType) -> Self {
        self.arguments.insert(
            name.to_string(),
            ArgDef {
                arg_type,
                default: None,
                required: true,
            },
        );
        self
    }

    /// Declare a deprecated alias for an existing argument
    pub fn deprecated_arg(mut self, old_name: &str, renamed_to: &str) -> Self {
        self.deprecated.insert(
            old_name.to_string(),
            DeprecatedArg {
                renamed_to: Some(renamed_to.to_string()),
            },
        );
        self
    }

    /// Declare a removed argument whose values are dropped when set
    pub fn removed_arg(mut self, old_name: &str) -> Self {
        self.deprecated
            .insert(old_name.to_string(), DeprecatedArg { renamed_to: None });
        self
    }

    /// Get the operator type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum accepted regular-input count
    pub fn min_inputs(&self) -> usize {
        self.min_inputs
    }

    /// Maximum accepted regular-input count
    pub fn max_inputs(&self) -> usize {
        self.max_inputs
    }

    /// Exact output count
    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Check whether the schema declares an argument with this name
    pub fn has_argument(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    /// Get an argument declaration
    pub fn arg_def(&self, name: &str) -> Result<&ArgDef> {
        self.arguments.get(name).ok_or_else(|| Error::UnknownArgument {
            schema: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// All declared argument names
    pub fn argument_names(&self) -> impl Iterator<Item = &str> {
        self.arguments.keys().map(String::as_str)
    }

    /// Get the deprecation record for a name, if any
    pub fn deprecation(&self, name: &str) -> Option<&DeprecatedArg> {
        self.deprecated.get(name)
    }

    /// Check whether the schema has a default for the argument
    pub fn has_default(&self, name: &str) -> bool {
        self.arguments
            .get(name)
            .map_or(false, |def| def.default.is_some())
    }

    /// Resolve the schema default for an argument as `T`
    ///
    /// Fails with [`Error::UnknownArgument`] when no such argument is
    /// declared and [`Error::NoDefault`] when it is declared without a
    /// default value.
    pub fn default_value<T: FromArgValue>(&self, name: &str) -> Result<T> {
        let def = self.arg_def(name)?;
        let value = def.default.as_ref().ok_or_else(|| Error::NoDefault {
            schema: self.name.clone(),
            name: name.to_string(),
        })?;
        T::from_arg_value(value).ok_or_else(|| Error::TypeMismatch {
            name: name.to_string(),
            stored: value.arg_type().to_string(),
            requested: T::REQUESTED.to_string(),
        })
    }

    /// Serialize this schema to a binary format
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::Serialization)
    }

    /// Deserialize a schema from a binary format
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(Error::Serialization)
    }
}

/// Process-wide table of registered schemas
///
/// Populated once per operator type during the registration phase and
/// read-only afterwards; concurrent reads take the shared lock only.
static REGISTRY: Lazy<RwLock<HashMap<String, Arc<OpSchema>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Accessor for the process-wide schema registry
pub struct SchemaRegistry;

impl SchemaRegistry {
    /// Register a schema under its type name
    ///
    /// Registration is write-once: re-registering a name fails with
    /// [`Error::SchemaRedefined`].
    pub fn register(schema: OpSchema) -> Result<Arc<OpSchema>> {
        let mut table = REGISTRY.write().expect("schema registry poisoned");
        if table.contains_key(schema.name()) {
            return Err(Error::SchemaRedefined(schema.name().to_string()));
        }
        let schema = Arc::new(schema);
        table.insert(schema.name().to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Look up a schema by operator type name
    pub fn get(name: &str) -> Result<Arc<OpSchema>> {
        Self::try_get(name).ok_or_else(|| Error::UnknownSchema(name.to_string()))
    }

    /// Look up a schema, returning `None` when unregistered
    pub fn try_get(name: &str) -> Option<Arc<OpSchema>> {
        REGISTRY
            .read()
            .expect("schema registry poisoned")
            .get(name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defaults() {
        let schema = OpSchema::new("SchemaDefaultsOp")
            .inputs(1, 1)
            .outputs(1)
            .arg("threshold", 100_i64)
            .optional_arg("bias", ArgType::Float)
            .required_arg("mode", ArgType::String);

        assert_eq!(schema.default_value::<i64>("threshold").unwrap(), 100);
        // Int default widens to Float on request
        assert_eq!(schema.default_value::<f64>("threshold").unwrap(), 100.0);
        assert!(matches!(
            schema.default_value::<f64>("bias").unwrap_err(),
            Error::NoDefault { .. }
        ));
        assert!(matches!(
            schema.default_value::<i64>("missing").unwrap_err(),
            Error::UnknownArgument { .. }
        ));
    }

    #[test]
    fn test_registry_is_write_once() {
        SchemaRegistry::register(OpSchema::new("WriteOnceOp").outputs(1)).unwrap();
        let err = SchemaRegistry::register(OpSchema::new("WriteOnceOp")).unwrap_err();
        assert!(matches!(err, Error::SchemaRedefined(_)));
        assert!(SchemaRegistry::try_get("WriteOnceOp").is_some());
        assert!(SchemaRegistry::try_get("NeverRegisteredOp").is_none());
    }

    #[test]
    fn test_schema_binary_round_trip() {
        let schema = OpSchema::new("RoundTripOp")
            .inputs(0, 2)
            .outputs(1)
            .arg("scale", 1.5_f64)
            .deprecated_arg("old_scale", "scale");
        let bytes = schema.serialize().unwrap();
        let restored = OpSchema::deserialize(&bytes).unwrap();
        assert_eq!(restored.name(), "RoundTripOp");
        assert_eq!(restored.default_value::<f64>("scale").unwrap(), 1.5);
        assert!(restored.deprecation("old_scale").is_some());
    }
}
