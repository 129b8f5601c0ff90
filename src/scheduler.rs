use crate::data::{CpuSample, Sample};
use crate::host::HostProbe;
use crate::monitor::GpuSource;
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Produces one [`Sample`] per tick from the host probe and the GPU source.
/// Holds no rendering state.
pub struct SampleScheduler<H, G> {
    host: H,
    gpus: G,
    ticks: u64,
}

impl<H: HostProbe, G: GpuSource> SampleScheduler<H, G> {
    pub fn new(host: H, gpus: G) -> Self {
        Self {
            host,
            gpus,
            ticks: 0,
        }
    }

    /// Samples CPU, memory and GPUs independently. A family that fails is
    /// reported empty (CPU, GPU) or absent (memory) without touching the others.
    pub async fn tick(&mut self) -> Sample {
        self.ticks += 1;

        let cpu = match self.host.cpu_usage() {
            Some(per_core) => CpuSample::new(per_core),
            None => {
                warn!("CPU usage unavailable on tick {}", self.ticks);
                CpuSample::default()
            }
        };

        let memory = self.host.memory();
        if memory.is_none() {
            warn!("memory usage unavailable on tick {}", self.ticks);
        }

        let gpus = self.gpus.fetch_gpu_metrics().await;

        debug!(
            "tick {}: {} core(s), {} GPU(s)",
            self.ticks,
            cpu.core_count(),
            gpus.len()
        );

        Sample {
            timestamp: self.ticks,
            cpu,
            memory,
            gpus,
        }
    }

    /// Ticks every `period` until the receiving side of `sender` goes away.
    /// A tick that overruns the period delays the next one; ticks never overlap.
    pub async fn run(mut self, period: Duration, sender: Sender<Sample>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let sample = self.tick().await;
            if sender.send(sample).is_err() {
                break;
            }
        }
        info!("sampler stopped after {} tick(s)", self.ticks);
    }
}

/// Runs `scheduler` on its own thread with a single-threaded runtime.
pub fn spawn_sampler<H, G>(
    scheduler: SampleScheduler<H, G>,
    period: Duration,
    sender: Sender<Sample>,
) -> std::io::Result<JoinHandle<()>>
where
    H: HostProbe + 'static,
    G: GpuSource + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("sampler".to_string())
        .spawn(move || runtime.block_on(scheduler.run(period, sender)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DeviceMetric, MemorySample};
    use crossbeam_channel::bounded;

    struct FakeHost {
        cores: Option<Vec<f32>>,
        memory: Option<MemorySample>,
    }

    impl HostProbe for FakeHost {
        fn cpu_usage(&mut self) -> Option<Vec<f32>> {
            self.cores.clone()
        }

        fn memory(&mut self) -> Option<MemorySample> {
            self.memory
        }
    }

    struct FakeGpus(Vec<DeviceMetric>);

    impl GpuSource for FakeGpus {
        async fn fetch_gpu_metrics(&self) -> Vec<DeviceMetric> {
            self.0.clone()
        }
    }

    fn memory() -> MemorySample {
        MemorySample {
            used_bytes: 4 << 30,
            total_bytes: 16 << 30,
            percent: 25.0,
        }
    }

    fn gpu(index: u32) -> DeviceMetric {
        DeviceMetric {
            index: Some(index),
            name: format!("GPU {index}"),
            utilization_percent: Some(10),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn tick_combines_all_families() {
        let host = FakeHost {
            cores: Some(vec![0.0, 50.0, 120.0]),
            memory: Some(memory()),
        };
        let mut scheduler = SampleScheduler::new(host, FakeGpus(vec![gpu(0)]));

        let sample = scheduler.tick().await;
        assert_eq!(sample.timestamp, 1);
        assert_eq!(sample.cpu.per_core, vec![0.0, 50.0, 100.0]);
        assert_eq!(sample.memory, Some(memory()));
        assert_eq!(sample.gpus, vec![gpu(0)]);

        assert_eq!(scheduler.tick().await.timestamp, 2);
    }

    #[tokio::test]
    async fn failing_family_does_not_blank_the_others() {
        let host = FakeHost {
            cores: None,
            memory: Some(memory()),
        };
        let mut scheduler = SampleScheduler::new(host, FakeGpus(vec![gpu(0), gpu(1)]));
        let sample = scheduler.tick().await;
        assert_eq!(sample.cpu.core_count(), 0);
        assert_eq!(sample.memory, Some(memory()));
        assert_eq!(sample.gpus.len(), 2);

        let host = FakeHost {
            cores: Some(vec![10.0, 20.0]),
            memory: None,
        };
        let mut scheduler = SampleScheduler::new(host, FakeGpus(Vec::new()));
        let sample = scheduler.tick().await;
        assert_eq!(sample.cpu.core_count(), 2);
        assert!(sample.memory.is_none());
        assert!(sample.gpus.is_empty());
    }

    #[test]
    fn sampler_thread_stops_when_receiver_is_dropped() {
        let host = FakeHost {
            cores: Some(vec![1.0]),
            memory: Some(memory()),
        };
        let scheduler = SampleScheduler::new(host, FakeGpus(Vec::new()));
        let (sender, receiver) = bounded(1);
        let handle = spawn_sampler(scheduler, Duration::from_millis(10), sender).unwrap();

        let first = receiver.recv().unwrap();
        let second = receiver.recv().unwrap();
        assert_eq!(first.timestamp, 1);
        assert_eq!(second.timestamp, 2);

        drop(receiver);
        handle.join().unwrap();
    }
}
