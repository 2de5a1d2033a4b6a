//! Hardware decode capability probing
//!
//! Whether the accelerator carries a dedicated decode engine is decided
//! by an external probe, consulted once when a dispatcher is built and
//! cached for its lifetime.

/// What the capability probe reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareCapability {
    /// Whether a dedicated hardware decode engine is present and usable
    pub hardware_decoder: bool,

    /// Device driver version as (major, minor)
    pub driver_version: (u32, u32),
}

impl HardwareCapability {
    /// Capability of a machine with no accelerator decode engine
    pub fn none() -> Self {
        Self {
            hardware_decoder: false,
            driver_version: (0, 0),
        }
    }
}

/// External collaborator reporting the accelerator's decode capability
pub trait CapabilityProbe: Send + Sync {
    /// Probe the device once
    fn probe(&self) -> HardwareCapability;
}

/// Default probe reporting no hardware decode engine
#[derive(Debug, Default)]
pub struct NullProbe;

impl CapabilityProbe for NullProbe {
    fn probe(&self) -> HardwareCapability {
        HardwareCapability::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_probe_reports_no_engine() {
        let cap = NullProbe.probe();
        assert!(!cap.hardware_decoder);
    }
}
