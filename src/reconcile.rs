//! Decides, per section, whether the panel must rebuild its elements or can
//! update the existing ones in place.
//!
//! A section is rebuilt when its element count differs from the previous tick
//! (cores or GPUs appeared/disappeared, or the section was hidden before).
//! Otherwise every element keeps its identity and only receives new values,
//! which keeps hover and scroll state intact.

use crate::config::{CoreOrientation, DisplayFlags, Settings};
use crate::data::{DeviceMetric, MemorySample, Sample};
use log::debug;

pub const NO_GPU_TEXT: &str = "GPU: N/A (nvidia-smi not found or returned no GPUs)";

/// Element counts of the previously rendered sections. `None` means the
/// section was not shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cardinality {
    pub cpu: Option<usize>,
    /// Number of devices; the zero-GPU placeholder counts as `Some(0)`.
    pub gpu: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SectionPlan<T> {
    /// Drop every existing element and create these, in order.
    Rebuild(Vec<T>),
    /// Push each value into the existing element at the same index.
    Update(Vec<T>),
}

impl<T> SectionPlan<T> {
    pub fn elements(&self) -> &[T] {
        match self {
            SectionPlan::Rebuild(elements) | SectionPlan::Update(elements) => elements,
        }
    }

    pub fn is_rebuild(&self) -> bool {
        matches!(self, SectionPlan::Rebuild(_))
    }

    fn decide(previous: Option<usize>, current: usize, elements: Vec<T>) -> Self {
        if previous == Some(current) {
            SectionPlan::Update(elements)
        } else {
            SectionPlan::Rebuild(elements)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoreReading {
    pub index: usize,
    pub percent: f32,
}

impl CoreReading {
    pub fn bar_value(&self) -> u8 {
        self.percent.clamp(0.0, 100.0) as u8
    }

    pub fn label(&self, orientation: CoreOrientation) -> String {
        match orientation {
            CoreOrientation::Horizontal => format!("{}%", self.bar_value()),
            CoreOrientation::Vertical => format!("Core {}: {:.1}%", self.index, self.percent),
        }
    }
}

/// A bar with its caption.
#[derive(Clone, Debug, PartialEq)]
pub struct Gauge {
    pub text: String,
    pub value: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RamReading {
    pub memory: Option<MemorySample>,
}

impl RamReading {
    pub fn gauge(&self) -> Gauge {
        match self.memory {
            Some(mem) => Gauge {
                text: format!(
                    "RAM: {} MiB / {} MiB ({:.1}%)",
                    mem.used_mib(),
                    mem.total_mib(),
                    mem.percent
                ),
                value: mem.percent.clamp(0.0, 100.0) as u8,
            },
            None => Gauge {
                text: "RAM: N/A".to_string(),
                value: 0,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GpuReading {
    pub title: String,
    pub core: Option<Gauge>,
    pub vram: Option<Gauge>,
    pub meta: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GpuElement {
    /// Shown instead of an empty section when no device was reported.
    Placeholder,
    Device(GpuReading),
}

impl GpuElement {
    pub fn is_device(&self) -> bool {
        matches!(self, GpuElement::Device(_))
    }
}

fn or_na<T>(value: Option<T>, show: impl FnOnce(T) -> String) -> String {
    value.map(show).unwrap_or_else(|| "N/A".to_string())
}

fn gpu_reading(gpu: &DeviceMetric, flags: &DisplayFlags) -> GpuReading {
    let name = if gpu.name.is_empty() { "GPU" } else { &gpu.name };
    let title = format!("{name} (GPU {})", or_na(gpu.index, |i| i.to_string()));

    let core = flags.show_gpu_core.then(|| Gauge {
        text: format!(
            "GPU Core Util: {}",
            or_na(gpu.utilization_percent, |u| format!("{u}%"))
        ),
        value: gpu.utilization_percent.unwrap_or(0).min(100) as u8,
    });

    let vram = flags.show_gpu_vram.then(|| {
        let text = match (gpu.memory_used_mib, gpu.memory_total_mib) {
            (Some(used), Some(total)) => format!(
                "VRAM: {used:.0} MiB / {total:.0} MiB ({})",
                or_na(gpu.memory_percent, |p| format!("{p:.1}%"))
            ),
            _ => "VRAM: N/A".to_string(),
        };
        Gauge {
            text,
            value: gpu.memory_percent.unwrap_or(0.0).clamp(0.0, 100.0) as u8,
        }
    });

    let meta = flags.show_gpu_meta.then(|| {
        format!(
            "T:{} | Fan:{} | P:{}",
            or_na(gpu.temperature_celsius, |t| format!("{t}°C")),
            or_na(gpu.fan_percent, |f| format!("{f}%")),
            or_na(gpu.power_watts, |p| format!("{p:.1}W")),
        )
    });

    GpuReading {
        title,
        core,
        vram,
        meta,
    }
}

/// What the panel should do with this tick's sample. Hidden sections are `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPlan {
    pub tick: u64,
    pub cpu: Option<SectionPlan<CoreReading>>,
    pub ram: Option<RamReading>,
    pub gpu: Option<SectionPlan<GpuElement>>,
}

impl RenderPlan {
    /// Element counts this plan leaves behind, to feed into the next tick.
    pub fn cardinality(&self) -> Cardinality {
        Cardinality {
            cpu: self.cpu.as_ref().map(|plan| plan.elements().len()),
            gpu: self
                .gpu
                .as_ref()
                .map(|plan| plan.elements().iter().filter(|e| e.is_device()).count()),
        }
    }
}

pub fn reconcile(previous: &Cardinality, sample: &Sample, flags: &DisplayFlags) -> RenderPlan {
    let cpu = flags.show_cpu.then(|| {
        let cores: Vec<CoreReading> = sample
            .cpu
            .per_core
            .iter()
            .enumerate()
            .map(|(index, &percent)| CoreReading { index, percent })
            .collect();
        SectionPlan::decide(previous.cpu, cores.len(), cores)
    });

    let ram = flags.show_ram.then(|| RamReading {
        memory: sample.memory,
    });

    let gpu = flags.show_gpu().then(|| {
        let elements = if sample.gpus.is_empty() {
            vec![GpuElement::Placeholder]
        } else {
            sample
                .gpus
                .iter()
                .map(|gpu| GpuElement::Device(gpu_reading(gpu, flags)))
                .collect()
        };
        SectionPlan::decide(previous.gpu, sample.gpus.len(), elements)
    });

    RenderPlan {
        tick: sample.timestamp,
        cpu,
        ram,
        gpu,
    }
}

/// Everything besides cardinality that shapes the elements. A change forces
/// every visible section to be rebuilt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub flags: DisplayFlags,
    pub orientation: CoreOrientation,
}

impl From<&Settings> for Layout {
    fn from(settings: &Settings) -> Self {
        Self {
            flags: settings.display_flags(),
            orientation: settings.core_orientation,
        }
    }
}

/// Carries the previous tick's cardinality from one sample to the next.
#[derive(Debug, Default)]
pub struct Reconciler {
    previous: Cardinality,
    layout: Option<Layout>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> Cardinality {
        self.previous
    }

    pub fn reconcile(&mut self, sample: &Sample, layout: Layout) -> RenderPlan {
        if self.layout != Some(layout) {
            if self.layout.is_some() {
                debug!("layout changed, rebuilding all sections");
            }
            self.previous = Cardinality::default();
            self.layout = Some(layout);
        }

        let plan = reconcile(&self.previous, sample, &layout.flags);
        let next = plan.cardinality();
        if next != self.previous {
            debug!("cardinality {:?} -> {:?}", self.previous, next);
        }
        self.previous = next;
        plan
    }
}
