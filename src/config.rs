//! Widget settings as stored in `widget_config.json`.
//!
//! Settings are loaded once into an immutable [`Settings`] value. A change
//! (a display toggle, the core orientation) builds a new value which the
//! caller saves and passes on; nothing is shared and mutated in place.

use crate::error::ConfigError;
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INTERVAL_MS: u64 = 1000;
pub const MIN_INTERVAL_MS: u64 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoreOrientation {
    #[default]
    Horizontal,
    Vertical,
}

impl CoreOrientation {
    pub fn toggled(self) -> Self {
        match self {
            CoreOrientation::Horizontal => CoreOrientation::Vertical,
            CoreOrientation::Vertical => CoreOrientation::Horizontal,
        }
    }
}

/// Which sections of the panel are shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayFlags {
    pub show_cpu: bool,
    pub show_ram: bool,
    pub show_gpu_core: bool,
    pub show_gpu_vram: bool,
    pub show_gpu_meta: bool,
}

impl DisplayFlags {
    pub fn show_gpu(&self) -> bool {
        self.show_gpu_core || self.show_gpu_vram || self.show_gpu_meta
    }
}

impl Default for DisplayFlags {
    fn default() -> Self {
        Self {
            show_cpu: true,
            show_ram: true,
            show_gpu_core: true,
            show_gpu_vram: true,
            show_gpu_meta: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayFlag {
    Cpu,
    Ram,
    GpuCore,
    GpuVram,
    GpuMeta,
}

impl DisplayFlag {
    pub const ALL: [DisplayFlag; 5] = [
        DisplayFlag::Cpu,
        DisplayFlag::Ram,
        DisplayFlag::GpuCore,
        DisplayFlag::GpuVram,
        DisplayFlag::GpuMeta,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DisplayFlag::Cpu => "CPU per-core",
            DisplayFlag::Ram => "RAM",
            DisplayFlag::GpuCore => "GPU core util",
            DisplayFlag::GpuVram => "GPU VRAM",
            DisplayFlag::GpuMeta => "GPU meta (temp|fan|power)",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settings {
    /// Sampling period in milliseconds.
    pub interval: u64,
    pub core_orientation: CoreOrientation,
    pub width: u32,
    pub height: u32,
    pub start_minimized: bool,
    pub show_cpu: bool,
    pub show_ram: bool,
    pub show_gpu_core: bool,
    pub show_gpu_vram: bool,
    pub show_gpu_meta: bool,
    /// Keys this crate does not use, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        let flags = DisplayFlags::default();
        Self {
            interval: DEFAULT_INTERVAL_MS,
            core_orientation: CoreOrientation::default(),
            width: 480,
            height: 300,
            start_minimized: false,
            show_cpu: flags.show_cpu,
            show_ram: flags.show_ram,
            show_gpu_core: flags.show_gpu_core,
            show_gpu_vram: flags.show_gpu_vram,
            show_gpu_meta: flags.show_gpu_meta,
            extra: Map::new(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("syswidget").join("widget_config.json"))
    }

    /// Loads from the user config directory, falling back to defaults.
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_or_default(&path),
            Err(e) => {
                warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Reads `path`, treating a missing file as defaults. Missing keys take
    /// their default value.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<Value>(&data)? {
            Value::Object(map) => Ok(Self::from_map(map)),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    /// Reads each known key on its own. A key with an unusable value takes
    /// its default without disturbing the others; unknown keys go to `extra`.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let d = Self::default();
        Self {
            interval: take(&mut map, "interval", d.interval),
            core_orientation: take(&mut map, "core_orientation", d.core_orientation),
            width: take(&mut map, "width", d.width),
            height: take(&mut map, "height", d.height),
            start_minimized: take(&mut map, "start_minimized", d.start_minimized),
            show_cpu: take(&mut map, "show_cpu", d.show_cpu),
            show_ram: take(&mut map, "show_ram", d.show_ram),
            show_gpu_core: take(&mut map, "show_gpu_core", d.show_gpu_core),
            show_gpu_vram: take(&mut map, "show_gpu_vram", d.show_gpu_vram),
            show_gpu_meta: take(&mut map, "show_gpu_meta", d.show_gpu_meta),
            extra: map,
        }
    }

    pub fn load_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            warn!("ignoring settings at {path:?}: {e}");
            Self::default()
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Sampling period; `0` means the default and anything shorter than
    /// [`MIN_INTERVAL_MS`] is raised to it.
    pub fn sampling_interval(&self) -> Duration {
        let ms = match self.interval {
            0 => DEFAULT_INTERVAL_MS,
            ms => ms.max(MIN_INTERVAL_MS),
        };
        Duration::from_millis(ms)
    }

    pub fn display_flags(&self) -> DisplayFlags {
        DisplayFlags {
            show_cpu: self.show_cpu,
            show_ram: self.show_ram,
            show_gpu_core: self.show_gpu_core,
            show_gpu_vram: self.show_gpu_vram,
            show_gpu_meta: self.show_gpu_meta,
        }
    }

    pub fn flag(&self, flag: DisplayFlag) -> bool {
        match flag {
            DisplayFlag::Cpu => self.show_cpu,
            DisplayFlag::Ram => self.show_ram,
            DisplayFlag::GpuCore => self.show_gpu_core,
            DisplayFlag::GpuVram => self.show_gpu_vram,
            DisplayFlag::GpuMeta => self.show_gpu_meta,
        }
    }

    pub fn with_flag(&self, flag: DisplayFlag, on: bool) -> Self {
        let mut next = self.clone();
        match flag {
            DisplayFlag::Cpu => next.show_cpu = on,
            DisplayFlag::Ram => next.show_ram = on,
            DisplayFlag::GpuCore => next.show_gpu_core = on,
            DisplayFlag::GpuVram => next.show_gpu_vram = on,
            DisplayFlag::GpuMeta => next.show_gpu_meta = on,
        }
        next
    }

    pub fn with_orientation(&self, orientation: CoreOrientation) -> Self {
        Self {
            core_orientation: orientation,
            ..self.clone()
        }
    }
}

// removes `key` so a bad value is never written back next to the field
fn take<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str, default: T) -> T {
    match map.remove(key) {
        None => default,
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("settings key {key:?} is invalid ({e}); using the default");
            default
        }),
    }
}
