//! Desktop system widget: samples per-core CPU load, RAM and NVIDIA GPU
//! telemetry and keeps a small egui panel in sync with it.
//!
//! Data flows `scheduler` → `monitor`/`host` → `normalize` → [`Sample`] →
//! `reconcile` → `panel`.

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod host;
pub mod monitor;
pub mod normalize;
pub mod panel;
pub mod reconcile;
pub mod scheduler;

pub use config::{DisplayFlags, Settings};
pub use data::{CpuSample, DeviceMetric, MemorySample, Sample};
pub use error::{ConfigError, MonitorError};
pub use reconcile::{reconcile, Cardinality, RenderPlan, SectionPlan};
