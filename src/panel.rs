use crate::data::Sample;
use crate::reconcile::{
    CoreReading, GpuElement, Layout, RamReading, Reconciler, RenderPlan, SectionPlan,
};
use log::{debug, warn};

/// A rendered element. `id` is assigned at creation and survives updates.
#[derive(Clone, Debug, PartialEq)]
pub struct Element<T> {
    pub id: u64,
    pub value: T,
}

/// The element set the window draws from, kept by position.
#[derive(Debug, Default)]
pub struct Panel {
    next_id: u64,
    pub cores: Vec<Element<CoreReading>>,
    pub ram: Option<RamReading>,
    pub gpus: Vec<Element<GpuElement>>,
    pub tick: u64,
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, plan: RenderPlan) {
        self.tick = plan.tick;
        self.ram = plan.ram;
        apply_section(&mut self.next_id, &mut self.cores, plan.cpu, "cpu");
        apply_section(&mut self.next_id, &mut self.gpus, plan.gpu, "gpu");
    }
}

/// Panel fed by the reconciler. Only the latest sample is kept, so a layout
/// change can be shown at once instead of on the next tick.
#[derive(Debug, Default)]
pub struct LivePanel {
    reconciler: Reconciler,
    panel: Panel,
    latest: Option<Sample>,
}

impl LivePanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn ingest(&mut self, sample: Sample, layout: Layout) {
        let plan = self.reconciler.reconcile(&sample, layout);
        self.panel.apply(plan);
        self.latest = Some(sample);
    }

    /// Re-plans the latest sample under `layout`. Does nothing before the
    /// first sample arrives.
    pub fn relayout(&mut self, layout: Layout) {
        if let Some(sample) = &self.latest {
            let plan = self.reconciler.reconcile(sample, layout);
            self.panel.apply(plan);
        }
    }
}

fn apply_section<T>(
    next_id: &mut u64,
    elements: &mut Vec<Element<T>>,
    plan: Option<SectionPlan<T>>,
    section: &str,
) {
    let mut rebuild = |elements: &mut Vec<Element<T>>, values: Vec<T>| {
        elements.clear();
        for value in values {
            *next_id += 1;
            elements.push(Element { id: *next_id, value });
        }
    };

    match plan {
        None => elements.clear(),
        Some(SectionPlan::Rebuild(values)) => {
            debug!("rebuilding {section} section with {} element(s)", values.len());
            rebuild(elements, values);
        }
        Some(SectionPlan::Update(values)) if values.len() == elements.len() => {
            for (element, value) in elements.iter_mut().zip(values) {
                element.value = value;
            }
        }
        Some(SectionPlan::Update(values)) => {
            warn!(
                "{section} update for {} element(s) but {} exist, rebuilding",
                values.len(),
                elements.len()
            );
            rebuild(elements, values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CoreOrientation, DisplayFlag, Settings};
    use crate::data::{CpuSample, DeviceMetric, MemorySample};

    fn cores(values: &[f32]) -> Vec<CoreReading> {
        values
            .iter()
            .enumerate()
            .map(|(index, &percent)| CoreReading { index, percent })
            .collect()
    }

    fn plan(cpu: SectionPlan<CoreReading>) -> RenderPlan {
        RenderPlan {
            tick: 1,
            cpu: Some(cpu),
            ram: None,
            gpu: Some(SectionPlan::Rebuild(vec![GpuElement::Placeholder])),
        }
    }

    #[test]
    fn update_keeps_element_identity() {
        let mut panel = Panel::new();
        panel.apply(plan(SectionPlan::Rebuild(cores(&[1.0, 2.0]))));
        let ids: Vec<u64> = panel.cores.iter().map(|e| e.id).collect();

        panel.apply(plan(SectionPlan::Update(cores(&[50.0, 60.0]))));
        assert_eq!(panel.cores.iter().map(|e| e.id).collect::<Vec<_>>(), ids);
        assert_eq!(panel.cores[1].value.percent, 60.0);
    }

    #[test]
    fn rebuild_replaces_elements() {
        let mut panel = Panel::new();
        panel.apply(plan(SectionPlan::Rebuild(cores(&[1.0, 2.0]))));
        let old: Vec<u64> = panel.cores.iter().map(|e| e.id).collect();

        panel.apply(plan(SectionPlan::Rebuild(cores(&[1.0, 2.0, 3.0]))));
        assert_eq!(panel.cores.len(), 3);
        assert!(panel.cores.iter().all(|e| !old.contains(&e.id)));
        assert_eq!(panel.gpus.len(), 1);
    }

    #[test]
    fn mismatched_update_falls_back_to_rebuild() {
        let mut panel = Panel::new();
        panel.apply(plan(SectionPlan::Rebuild(cores(&[1.0]))));
        panel.apply(plan(SectionPlan::Update(cores(&[1.0, 2.0]))));
        assert_eq!(panel.cores.len(), 2);
    }

    #[test]
    fn hidden_section_is_cleared() {
        let mut panel = Panel::new();
        panel.apply(plan(SectionPlan::Rebuild(cores(&[1.0]))));
        panel.apply(RenderPlan {
            tick: 2,
            cpu: None,
            ram: None,
            gpu: None,
        });
        assert!(panel.cores.is_empty());
        assert!(panel.gpus.is_empty());
        assert_eq!(panel.tick, 2);
    }

    fn sample() -> Sample {
        Sample {
            timestamp: 7,
            cpu: CpuSample::new(vec![10.0, 20.0]),
            memory: Some(MemorySample {
                used_bytes: 1 << 30,
                total_bytes: 4 << 30,
                percent: 25.0,
            }),
            gpus: vec![DeviceMetric {
                index: Some(0),
                name: "GPU".to_string(),
                memory_total_mib: Some(8192.0),
                memory_used_mib: Some(4096.0),
                memory_percent: Some(50.0),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn relayout_applies_without_a_new_sample() {
        let settings = Settings::default();
        let mut live = LivePanel::new();
        live.relayout(Layout::from(&settings));
        assert!(live.panel().cores.is_empty());

        live.ingest(sample(), Layout::from(&settings));
        assert!(live.panel().ram.is_some());
        let GpuElement::Device(reading) = &live.panel().gpus[0].value else {
            panic!("expected a device element");
        };
        assert!(reading.vram.is_some());
        let core_ids: Vec<u64> = live.panel().cores.iter().map(|c| c.id).collect();

        let hidden = settings
            .with_flag(DisplayFlag::Ram, false)
            .with_flag(DisplayFlag::GpuVram, false);
        live.relayout(Layout::from(&hidden));
        assert!(live.panel().ram.is_none());
        let GpuElement::Device(reading) = &live.panel().gpus[0].value else {
            panic!("expected a device element");
        };
        assert!(reading.vram.is_none());
        assert!(reading.core.is_some());
        assert_eq!(live.panel().tick, 7);

        let vertical = hidden.with_orientation(CoreOrientation::Vertical);
        live.relayout(Layout::from(&vertical));
        assert_eq!(live.panel().cores.len(), 2);
        assert!(live.panel().cores.iter().all(|c| !core_ids.contains(&c.id)));

        live.relayout(Layout::from(&vertical.with_flag(DisplayFlag::Cpu, false)));
        assert!(live.panel().cores.is_empty());
    }
}
