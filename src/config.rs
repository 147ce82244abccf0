use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::CaptureError;
use crate::persist::OutputLayout;
use crate::session::SessionConfig;

const DEFAULT_LEFT: &str = "0";
const DEFAULT_RIGHT: &str = "1";
const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;
const DEFAULT_OUTPUT_DIR: &str = ".";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CaptureConfigFile {
    left: Option<String>,
    right: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub left: String,
    pub right: String,
    pub width: u32,
    pub height: u32,
    pub output_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::from_file(CaptureConfigFile::default())
    }
}

impl CaptureConfig {
    /// Defaults, then the file named by `STEREO_CAPTURE_CONFIG`, then
    /// `STEREO_CAPTURE_*` environment overrides.
    pub fn load() -> Result<Self, CaptureError> {
        let config_path = std::env::var("STEREO_CAPTURE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CaptureConfigFile) -> Self {
        Self {
            left: file.left.unwrap_or_else(|| DEFAULT_LEFT.to_string()),
            right: file.right.unwrap_or_else(|| DEFAULT_RIGHT.to_string()),
            width: file.width.unwrap_or(DEFAULT_WIDTH),
            height: file.height.unwrap_or(DEFAULT_HEIGHT),
            output_dir: file
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        }
    }

    fn apply_env(&mut self) -> Result<(), CaptureError> {
        if let Some(left) = non_empty_var("STEREO_CAPTURE_LEFT") {
            self.left = left;
        }
        if let Some(right) = non_empty_var("STEREO_CAPTURE_RIGHT") {
            self.right = right;
        }
        if let Some(width) = non_empty_var("STEREO_CAPTURE_WIDTH") {
            self.width = parse_dimension("STEREO_CAPTURE_WIDTH", &width)?;
        }
        if let Some(height) = non_empty_var("STEREO_CAPTURE_HEIGHT") {
            self.height = parse_dimension("STEREO_CAPTURE_HEIGHT", &height)?;
        }
        if let Some(dir) = non_empty_var("STEREO_CAPTURE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&mut self) -> Result<(), CaptureError> {
        self.left = self.left.trim().to_string();
        self.right = self.right.trim().to_string();
        if self.left.is_empty() || self.right.is_empty() {
            return Err(CaptureError::Config(
                "left and right sources must be set".to_string(),
            ));
        }
        if self.left == self.right {
            return Err(CaptureError::Config(format!(
                "left and right sources must differ (both are {})",
                self.left
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::Config(
                "width and height must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            left: self.left.clone(),
            right: self.right.clone(),
            width: self.width,
            height: self.height,
            output: OutputLayout::under(&self.output_dir),
        }
    }
}

fn read_config_file(path: &Path) -> Result<CaptureConfigFile, CaptureError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CaptureError::Config(format!("failed to read config file {}: {}", path.display(), e))
    })?;
    toml::from_str(&raw)
        .map_err(|e| CaptureError::Config(format!("invalid config file {}: {}", path.display(), e)))
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_dimension(key: &str, value: &str) -> Result<u32, CaptureError> {
    value
        .trim()
        .parse()
        .map_err(|_| CaptureError::Config(format!("{} must be a positive integer", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_two_usb_cameras() {
        let cfg = CaptureConfig::default();
        assert_eq!(cfg.left, "0");
        assert_eq!(cfg.right, "1");
        assert_eq!((cfg.width, cfg.height), (1280, 720));
        let session = cfg.session_config();
        assert_eq!(session.output.left, PathBuf::from("./camera0"));
    }

    #[test]
    fn rejects_identical_sources() {
        let mut cfg = CaptureConfig {
            right: "0".to_string(),
            ..CaptureConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(CaptureError::Config(_))));
    }

    #[test]
    fn rejects_zero_size() {
        let mut cfg = CaptureConfig {
            width: 0,
            ..CaptureConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
