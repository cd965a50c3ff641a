use crate::{ControlValue, Result};

/// A minimal blocking interface to the device-control utility.
pub trait ControlTool {
    /// Human-readable rendering of the set command, as it is reported to observers.
    fn describe_set(&self, name: &str, value: &ControlValue) -> String;

    /// Produce the raw control listing for the device.
    fn list_controls(&mut self) -> Result<String>;

    /// Change one control. Fails when the utility reports an error.
    fn set_control(&mut self, name: &str, value: &ControlValue) -> Result<()>;
}
