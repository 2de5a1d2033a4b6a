//! Error types for pipeline construction and argument resolution

use thiserror::Error;

/// Result type for pipeline construction and argument resolution
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pipeline construction and argument resolution
///
/// Schema, argument and graph errors are structural: they indicate a
/// programming error in the code that builds the pipeline and are always
/// fatal to the enclosing build step.
#[derive(Error, Debug)]
pub enum Error {
    /// No schema was registered under the given name
    #[error("No schema registered under name \"{0}\"")]
    UnknownSchema(String),

    /// A schema with this name was already registered
    #[error("Schema \"{0}\" is already registered")]
    SchemaRedefined(String),

    /// The schema declares no argument with this name
    #[error("Operator \"{schema}\" has no argument named \"{name}\"")]
    UnknownArgument {
        /// Schema the lookup was performed against
        schema: String,
        /// Requested argument name
        name: String,
    },

    /// The argument is declared but has no default and was never set
    #[error("Argument \"{name}\" of operator \"{schema}\" was not set and has no default value")]
    NoDefault {
        /// Schema the lookup was performed against
        schema: String,
        /// Requested argument name
        name: String,
    },

    /// A value of one semantic type was requested as an incompatible type
    #[error("Argument \"{name}\": stored as {stored}, requested as {requested}")]
    TypeMismatch {
        /// Argument name
        name: String,
        /// Type the value was stored with
        stored: String,
        /// Type the caller asked for
        requested: String,
    },

    /// A tensor-argument was not a batch of per-sample scalars
    #[error(
        "Argument \"{name}\": expected a batch of {batch_size} scalars, \
         sample {sample} has shape {shape:?}"
    )]
    ShapeMismatch {
        /// Argument name
        name: String,
        /// Number of samples in the offending batch
        batch_size: usize,
        /// First sample with a non-scalar shape
        sample: usize,
        /// Shape of that sample
        shape: Vec<usize>,
    },

    /// A tensor-argument was read without a workspace
    #[error("Argument \"{name}\" is data-dependent and requires a workspace to resolve")]
    MissingContext {
        /// Argument name
        name: String,
    },

    /// No tensor was bound under an argument-input name this iteration
    #[error("No tensor bound for argument input \"{name}\" in the current iteration")]
    UnboundArgumentInput {
        /// Argument-input name
        name: String,
    },

    /// An argument was specified twice, directly or through a deprecated alias
    #[error("Conflicting specification for argument \"{name}\": {reason}")]
    ConflictingSpecification {
        /// Logical argument name
        name: String,
        /// How the conflict arose
        reason: String,
    },

    /// A node input does not resolve to any earlier producer
    #[error("Input \"{tensor}\" of operator \"{operator}\" is not produced by any earlier node")]
    UnresolvedInput {
        /// Full tensor identifier (name and device)
        tensor: String,
        /// Consuming operator
        operator: String,
    },

    /// A node's input or output count violates its schema
    #[error("Operator \"{schema}\" expects {expected}, got {actual}")]
    ArityMismatch {
        /// Schema of the offending node
        schema: String,
        /// Human-readable arity bound
        expected: String,
        /// Actual count
        actual: usize,
    },

    /// Sample or tensor index out of bounds
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Valid length
        len: usize,
    },

    /// Invalid argument to an API call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operator execution error
    #[error("Pipeline execution error: {0}")]
    PipelineExecution(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}
