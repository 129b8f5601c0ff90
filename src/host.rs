use crate::data::MemorySample;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// CPU and RAM readings from the local OS.
///
/// `None` marks a reading that could not be taken this tick; the caller keeps
/// sampling the other families regardless.
pub trait HostProbe: Send {
    fn cpu_usage(&mut self) -> Option<Vec<f32>>;
    fn memory(&mut self) -> Option<MemorySample>;
}

pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());

        // usage is a delta against the previous refresh, so the very first
        // reading can be all zeroes
        Self {
            system: System::new_with_specifics(refresh_kind),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SysinfoProbe {
    fn cpu_usage(&mut self) -> Option<Vec<f32>> {
        self.system.refresh_cpu_usage();
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return None;
        }
        Some(cpus.iter().map(|cpu| cpu.cpu_usage()).collect())
    }

    fn memory(&mut self) -> Option<MemorySample> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return None;
        }
        let used = self.system.used_memory();
        Some(MemorySample {
            used_bytes: used,
            total_bytes: total,
            percent: (used as f32 / total as f32) * 100.0,
        })
    }
}
