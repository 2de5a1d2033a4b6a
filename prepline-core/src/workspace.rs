//! Per-iteration context supplying tensor-argument values
//!
//! An [`ArgumentWorkspace`] lives for exactly one pipeline iteration: it
//! maps argument-input names to the concrete per-sample batches bound
//! for the current batch, and is discarded afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use crate::batch::TensorBatch;
use crate::error::{Error, Result};

/// Runtime bindings for one pipeline iteration
#[derive(Debug, Clone, Default)]
pub struct ArgumentWorkspace {
    /// Argument-input name -> bound batch
    inputs: HashMap<String, Arc<TensorBatch>>,
}

impl ArgumentWorkspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a batch under an argument-input name
    pub fn bind(&mut self, name: &str, batch: Arc<TensorBatch>) {
        self.inputs.insert(name.to_string(), batch);
    }

    /// Fetch the batch bound under an argument-input name
    pub fn argument_input(&self, name: &str) -> Result<&TensorBatch> {
        self.inputs
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| Error::UnboundArgumentInput {
                name: name.to_string(),
            })
    }

    /// Check whether a tensor name is bound
    pub fn has(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    /// Number of bound tensors
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Check if no tensors are bound
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_fetch() {
        let mut ws = ArgumentWorkspace::new();
        assert!(ws.is_empty());
        ws.bind("crop_w_in", Arc::new(TensorBatch::scalars_i64(&[64, 32]).unwrap()));
        assert!(ws.has("crop_w_in"));
        assert_eq!(ws.argument_input("crop_w_in").unwrap().len(), 2);
        assert!(matches!(
            ws.argument_input("missing").unwrap_err(),
            Error::UnboundArgumentInput { .. }
        ));
    }
}
