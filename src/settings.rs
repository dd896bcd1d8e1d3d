use std::path::Path;
use std::{fs, io};

use log::{info, warn};
use serde::{Deserialize, Serialize};

const SETTINGS_FILE: &str = "settings.json";

/// Window and renderer settings, read from `settings.json` when present.
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub shadow_map_size: u32,
    pub resolution: Resolution,
    pub present_mode: PresentModeSetting,
    pub clear_color: [f32; 3],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadow_map_size: 512,
            resolution: Resolution::default(),
            present_mode: PresentModeSetting::Fifo,
            clear_color: [0.0; 3],
        }
    }
}

impl RenderSettings {
    pub fn load() -> Self {
        Self::load_from_path(SETTINGS_FILE)
    }

    /// Never fails: unreadable or malformed files log a warning and yield
    /// the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No render settings at {}, using defaults", path.display());
                return Self::default();
            }
            Err(err) => {
                warn!("Cannot read {}: {err}; using default render settings", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&contents) {
            Ok(settings) => {
                info!("Loaded render settings from {}", path.display());
                settings.sanitized()
            }
            Err(err) => {
                warn!("Cannot parse {}: {err}; using default render settings", path.display());
                Self::default()
            }
        }
    }

    /// Replaces values the renderer cannot use with their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.shadow_map_size == 0 {
            warn!("shadow_map_size must be positive, using {}", defaults.shadow_map_size);
            self.shadow_map_size = defaults.shadow_map_size;
        }
        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("resolution {:?} has a zero side, using {:?}", self.resolution, defaults.resolution);
            self.resolution = defaults.resolution;
        }
        if !self.clear_color.iter().all(|c| c.is_finite()) {
            warn!("clear_color {:?} is not finite, using black", self.clear_color);
            self.clear_color = defaults.clear_color;
        }
        self
    }

    /// The configured mode if the surface supports it, else FIFO, else
    /// whatever the surface lists first.
    pub fn present_mode(&self, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        let desired = wgpu::PresentMode::from(self.present_mode);
        if available.contains(&desired) {
            return desired;
        }
        let fallback = if available.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            available.first().copied().unwrap_or(wgpu::PresentMode::Fifo)
        };
        warn!("Present mode {desired:?} is unsupported, using {fallback:?}");
        fallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeSetting {
    #[default]
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
    AutoVsync,
    AutoNoVsync,
}

impl From<PresentModeSetting> for wgpu::PresentMode {
    fn from(setting: PresentModeSetting) -> Self {
        match setting {
            PresentModeSetting::Fifo => Self::Fifo,
            PresentModeSetting::FifoRelaxed => Self::FifoRelaxed,
            PresentModeSetting::Immediate => Self::Immediate,
            PresentModeSetting::Mailbox => Self::Mailbox,
            PresentModeSetting::AutoVsync => Self::AutoVsync,
            PresentModeSetting::AutoNoVsync => Self::AutoNoVsync,
        }
    }
}
