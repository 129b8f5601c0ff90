// One GPU as reported by the provider. `None` means the provider did not
// report a usable value for that field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceMetric {
    pub index: Option<u32>,
    pub name: String,
    pub utilization_percent: Option<u32>,
    pub temperature_celsius: Option<i32>,
    pub memory_total_mib: Option<f64>,
    pub memory_used_mib: Option<f64>,
    /// Present only when both memory fields are present and the total is non-zero.
    pub memory_percent: Option<f64>,
    pub power_watts: Option<f64>,
    pub fan_percent: Option<u32>,
}

// Per-core utilisation in OS core order, each value in 0..=100
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CpuSample {
    pub per_core: Vec<f32>,
}

impl CpuSample {
    pub fn new(per_core: Vec<f32>) -> Self {
        Self {
            per_core: per_core.into_iter().map(|v| v.clamp(0.0, 100.0)).collect(),
        }
    }

    pub fn core_count(&self) -> usize {
        self.per_core.len()
    }
}

// System RAM; percent comes from the host probe
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemorySample {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f32,
}

impl MemorySample {
    pub fn used_mib(&self) -> u64 {
        self.used_bytes / (1024 * 1024)
    }

    pub fn total_mib(&self) -> u64 {
        self.total_bytes / (1024 * 1024)
    }
}

/// One tick's combined readings. Built fresh every tick and dropped once the
/// reconciler has turned it into a plan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sample {
    /// Logical tick count, starting at 1 for the first sample.
    pub timestamp: u64,
    pub cpu: CpuSample,
    /// `None` when the memory probe failed this tick.
    pub memory: Option<MemorySample>,
    pub gpus: Vec<DeviceMetric>,
}
