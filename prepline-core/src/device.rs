//! Execution domains for tensors and operators

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The execution domain a tensor lives on or an operator runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Device {
    /// General-purpose processor memory
    Host,

    /// Specialized parallel processor memory
    Accelerator,
}

impl Device {
    /// The other domain
    pub fn other(self) -> Device {
        match self {
            Device::Host => Device::Accelerator,
            Device::Accelerator => Device::Host,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Host => write!(f, "host"),
            Device::Accelerator => write!(f, "accelerator"),
        }
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Device::Host),
            "accelerator" => Ok(Device::Accelerator),
            other => Err(Error::InvalidArgument(format!("Unknown device: {}", other))),
        }
    }
}
