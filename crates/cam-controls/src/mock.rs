use crate::{render_command, ControlTool, ControlValue, Error, Result, DEFAULT_UTILITY};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Listing of a Logitech QuickCam PTZ class camera.
pub const SAMPLE_LISTING: &str = "\
Listing available controls for device video0:
  Brightness
    ID      : 0x00000001,
    Type    : Dword,
    Flags   : { CAN_READ, CAN_WRITE, CAN_USE, AUTO_UPDATE },
    Values  : [ 0 .. 255, step size: 1 ],
    Default : 128
  Contrast
    ID      : 0x00000002,
    Type    : Dword,
    Flags   : { CAN_READ, CAN_WRITE, CAN_USE, AUTO_UPDATE },
    Values  : [ 0 .. 255, step size: 1 ],
    Default : 32
  White Balance Temperature, Auto
    ID      : 0x0000000c,
    Type    : Boolean,
    Flags   : { CAN_READ, CAN_WRITE, CAN_USE, AUTO_UPDATE },
    Values  : [ 0 .. 1, step size: 1 ],
    Default : 1
  Power Line Frequency
    ID      : 0x0000000d,
    Type    : Choice,
    Flags   : { CAN_READ, CAN_WRITE, CAN_USE, AUTO_UPDATE },
    Values  : { 'Disabled'[0], '50 Hz'[1], '60 Hz'[2] },
    Default : 2
  Exposure, Auto
    ID      : 0x0000000f,
    Type    : Choice,
    Flags   : { CAN_READ, CAN_WRITE, CAN_USE, AUTO_UPDATE },
    Values  : { 'Manual Mode'[1], 'Aperture Priority Mode'[3] },
    Default : 3
  Pan (relative)
    ID      : 0x0000001a,
    Type    : Dword,
    Flags   : { CAN_WRITE, CAN_USE },
    Values  : [ -4480 .. 4480, step size: 1 ],
    Default : 0
  Tilt (relative)
    ID      : 0x0000001b,
    Type    : Dword,
    Flags   : { CAN_WRITE, CAN_USE },
    Values  : [ -1920 .. 1920, step size: 1 ],
    Default : 0
  Pan Reset
    ID      : 0x0000001c,
    Type    : Button,
    Flags   : { CAN_WRITE, CAN_USE },
  Tilt Reset
    ID      : 0x0000001d,
    Type    : Button,
    Flags   : { CAN_WRITE, CAN_USE },
";

/// In-process stand-in for the utility. Each instance is independent.
#[derive(Debug, Clone)]
pub struct MockTool {
    utility: PathBuf,
    listing: String,
    sent: Vec<(String, ControlValue)>,
    failing: HashSet<String>,
}

impl Default for MockTool {
    fn default() -> Self {
        Self::with_listing(SAMPLE_LISTING)
    }
}

impl MockTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(listing: impl Into<String>) -> Self {
        Self {
            utility: PathBuf::from(DEFAULT_UTILITY),
            listing: listing.into(),
            sent: Vec::new(),
            failing: HashSet::new(),
        }
    }

    /// Path shown in rendered commands; nothing is executed.
    pub fn with_utility(mut self, utility: impl Into<PathBuf>) -> Self {
        self.utility = utility.into();
        self
    }

    pub fn utility(&self) -> &Path {
        &self.utility
    }

    /// Make every set of `name` fail as a non-zero exit would.
    pub fn fail_on(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }

    /// Every set attempted so far, failed ones included, in order.
    pub fn sent(&self) -> &[(String, ControlValue)] {
        &self.sent
    }
}

impl ControlTool for MockTool {
    fn describe_set(&self, name: &str, value: &ControlValue) -> String {
        render_command(&self.utility, name, value)
    }

    fn list_controls(&mut self) -> Result<String> {
        Ok(self.listing.clone())
    }

    fn set_control(&mut self, name: &str, value: &ControlValue) -> Result<()> {
        self.sent.push((name.to_string(), value.clone()));
        if self.failing.contains(name) {
            return Err(Error::CommandFailed {
                command: self.describe_set(name, value),
                status: Some(1),
                stderr: format!("ERROR: Unable to set the control '{name}'"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Grouping;

    #[test]
    fn test_sample_listing_classifies() {
        let reg = crate::discover(&mut MockTool::new()).unwrap();
        assert_eq!(reg.device_id(), Some("video0"));
        let names = |g: Grouping| reg.group(g).keys().cloned().collect::<Vec<_>>();
        assert_eq!(
            names(Grouping::Motor),
            ["Pan (relative)", "Pan Reset", "Tilt (relative)", "Tilt Reset"]
        );
        assert_eq!(names(Grouping::Slider), ["Brightness", "Contrast"]);
        assert_eq!(
            names(Grouping::Toggle),
            ["White Balance Temperature, Auto"]
        );
        assert_eq!(
            names(Grouping::Choice),
            ["Exposure, Auto", "Power Line Frequency"]
        );
        assert!(reg.diagnostics().is_empty());
    }

    #[test]
    fn test_records_sets_and_failures() {
        let mut tool = MockTool::new().fail_on("Gain");
        tool.set_control("Brightness", &ControlValue::Int(10))
            .unwrap();
        assert!(tool.set_control("Gain", &ControlValue::Int(1)).is_err());
        assert_eq!(tool.sent().len(), 2);
        assert_eq!(tool.sent()[1].0, "Gain");
    }

    #[test]
    fn test_rendered_command_uses_configured_utility() {
        let tool = MockTool::new().with_utility("/opt/uvc/bin/uvcdynctrl");
        assert_eq!(
            tool.describe_set("Brightness", &ControlValue::Int(64)),
            "/opt/uvc/bin/uvcdynctrl -s 'Brightness' -- 64"
        );
        assert_eq!(
            MockTool::new().describe_set("Brightness", &ControlValue::Int(64)),
            "/usr/bin/uvcdynctrl -s 'Brightness' -- 64"
        );
    }
}
