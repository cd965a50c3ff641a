use crate::DEFAULT_UTILITY;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the `uvcdynctrl` binary
    pub utility: PathBuf,
    /// Upper bound on any single invocation
    pub timeout_ms: u64,
    pub nudge: NudgeSteps,
    pub motors: MotorNames,
}

/// Relative step sizes for one press of a pan/tilt arrow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NudgeSteps {
    pub pan: i64,
    pub tilt: i64,
}

/// Names of the motor controls the convenience operations drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorNames {
    pub pan_relative: String,
    pub tilt_relative: String,
    pub pan_reset: String,
    pub tilt_reset: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            utility: PathBuf::from(DEFAULT_UTILITY),
            timeout_ms: 5_000,
            nudge: NudgeSteps::default(),
            motors: MotorNames::default(),
        }
    }
}

impl Default for NudgeSteps {
    fn default() -> Self {
        Self {
            pan: 700,
            tilt: 500,
        }
    }
}

impl Default for MotorNames {
    fn default() -> Self {
        Self {
            pan_relative: "Pan (relative)".to_string(),
            tilt_relative: "Tilt (relative)".to_string(),
            pan_reset: "Pan Reset".to_string(),
            tilt_reset: "Tilt Reset".to_string(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Load a YAML config; missing keys fall back to defaults.
pub fn load_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading config: {}", path.display()))?;
    let config: Config =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing yaml: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_quickcam_ptz() {
        let c = Config::default();
        assert_eq!(c.utility, Path::new("/usr/bin/uvcdynctrl"));
        assert_eq!(c.timeout(), Duration::from_secs(5));
        assert_eq!((c.nudge.pan, c.nudge.tilt), (700, 500));
        assert_eq!(c.motors.pan_reset, "Pan Reset");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "utility: /opt/bin/uvcdynctrl\nnudge:\n  tilt: 250\n";
        let c: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.utility, Path::new("/opt/bin/uvcdynctrl"));
        assert_eq!(c.nudge.tilt, 250);
        assert_eq!(c.nudge.pan, 700);
        assert_eq!(c.timeout_ms, 5_000);
        assert_eq!(c.motors, MotorNames::default());
    }

    #[test]
    fn test_load_config_file() {
        let path = std::env::temp_dir().join(format!("cam-controls-{}.yaml", std::process::id()));
        fs::write(&path, "timeout_ms: 250\nmotors:\n  pan_reset: Pan Home\n").unwrap();
        let c = load_config_file(&path).unwrap();
        assert_eq!(c.timeout_ms, 250);
        assert_eq!(c.motors.pan_reset, "Pan Home");
        assert_eq!(c.motors.tilt_reset, "Tilt Reset");
        let _ = fs::remove_file(&path);

        assert!(load_config_file("/nonexistent/camctl.yaml").is_err());
    }
}
