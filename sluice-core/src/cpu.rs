//! CPU utilisation sensors queried by the statistics reporter

use parking_lot::Mutex;
use sysinfo::System;

/// Source of a host CPU utilisation snapshot
pub trait CpuSensor: Send + Sync {
    /// Utilisation in whole percent, rounded up
    fn utilization(&self) -> u32;
}

/// Sensor backed by `sysinfo`.
///
/// Usage is computed over the time between two consecutive calls, so a
/// sensor polled once per report measures the whole report interval.
pub struct SystemCpuSensor {
    system: Mutex<System>,
}

impl SystemCpuSensor {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SystemCpuSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSensor for SystemCpuSensor {
    fn utilization(&self) -> u32 {
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.global_cpu_usage().max(0.0).ceil() as u32
    }
}

/// Sensor that always reports the same value
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCpuSensor(pub u32);

impl CpuSensor for FixedCpuSensor {
    fn utilization(&self) -> u32 {
        self.0
    }
}
