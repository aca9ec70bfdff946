//! Configuration file – reads/writes `~/.posefit/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use posefit_types::{Calibration, DetectorModel, FrameSize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Persisted settings stored in `~/.posefit/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pose model backing the session (`lightning`, `thunder` or `off`).
    pub detector: DetectorModel,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Display refresh rate of the render loop.
    pub render_hz: f32,
    /// Target detection rate; the detector may be slower.
    pub pose_hz: f32,
    pub calibration: Calibration,
}

impl Config {
    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.frame_width, self.frame_height)
    }

    /// Copy with non-positive or non-finite loop rates replaced by the
    /// defaults and the calibration clamped.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let rate_or = |hz: f32, d: f32| if hz.is_finite() && hz > 0.0 { hz } else { d };
        Self {
            render_hz: rate_or(self.render_hz, defaults.render_hz),
            pose_hz: rate_or(self.pose_hz, defaults.pose_hz),
            calibration: self.calibration.sanitized(),
            ..self.clone()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: DetectorModel::default(),
            frame_width: 640,
            frame_height: 480,
            render_hz: 60.0,
            pose_hz: 30.0,
            calibration: Calibration::default(),
        }
    }
}

/// Return the path to `~/.posefit/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".posefit").join("config.toml")
}

/// Load the config with environment overrides applied. A missing file yields
/// the defaults.
pub fn load() -> Result<Config, ConfigError> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// `None` if the file does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: Config = toml::from_str(&raw)?;
    Ok(Some(cfg.sanitized()))
}

/// Apply `POSEFIT_*` environment variable overrides to `cfg`. Unparseable
/// values are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `POSEFIT_DETECTOR` | `detector` |
/// | `POSEFIT_SMOOTHING` | `calibration.smoothing_factor` |
/// | `POSEFIT_DEPTH_OFFSET` | `calibration.depth_offset` |
/// | `POSEFIT_RENDER_HZ` | `render_hz` |
/// | `POSEFIT_POSE_HZ` | `pose_hz` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("POSEFIT_DETECTOR")
        && let Ok(model) = v.parse::<DetectorModel>()
    {
        cfg.detector = model;
    }
    if let Ok(v) = std::env::var("POSEFIT_SMOOTHING")
        && let Ok(s) = v.trim().parse::<f32>()
    {
        cfg.calibration.smoothing_factor = s;
    }
    if let Ok(v) = std::env::var("POSEFIT_DEPTH_OFFSET")
        && let Ok(d) = v.trim().parse::<f32>()
    {
        cfg.calibration.depth_offset = d;
    }
    if let Ok(v) = std::env::var("POSEFIT_RENDER_HZ")
        && let Ok(hz) = v.trim().parse::<f32>()
        && hz.is_finite()
        && hz > 0.0
    {
        cfg.render_hz = hz;
    }
    if let Ok(v) = std::env::var("POSEFIT_POSE_HZ")
        && let Ok(hz) = v.trim().parse::<f32>()
        && hz.is_finite()
        && hz > 0.0
    {
        cfg.pose_hz = hz;
    }
    *cfg = cfg.sanitized();
}

/// Save the config, creating `~/.posefit/` if necessary.
pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
        // Owner-only directory (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(write_err)?;
        }
    }
    let raw = toml::to_string_pretty(cfg)?;
    // Owner-only file (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}
