//! cam-controls: discovery and dispatch of UVC camera controls
//!
//! Controls are discovered by running `uvcdynctrl -c -v` and feeding its listing through a
//! line-oriented parser. Parsed controls are classified into motor, slider, toggle and choice
//! groupings. Value changes go back out through the same utility via a [`Dispatcher`].
//! The default build enables a `mock` tool backend so flows are testable without a camera.

mod types;
pub use types::{Control, ControlKind, ControlValue};

mod error;
pub use error::{Diagnostic, Error, Result};

mod parser;
pub use parser::{classify_line, parse_listing, ControlParser, Line};

mod registry;
pub use registry::{ControlRegistry, Grouping};

mod traits;
pub use traits::ControlTool;

mod uvcdynctrl;
pub use uvcdynctrl::{render_command, UvcDynCtrl, DEFAULT_UTILITY};

mod dispatch;
pub use dispatch::{
    DispatchEvent, DispatchObserver, Dispatcher, LogObserver, Operation, RecordingObserver,
};

mod config;
pub use config::{load_config_file, Config, MotorNames, NudgeSteps};

mod metrics;
pub use metrics::{ControlMetrics, MetricsHub};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockTool, SAMPLE_LISTING};

/// Run discovery against `tool` and build a fresh registry.
///
/// The only error path is the tool failing to produce a listing; per-control problems are
/// recorded as [`Diagnostic`]s on the returned registry.
pub fn discover<T: ControlTool + ?Sized>(tool: &mut T) -> Result<ControlRegistry> {
    let listing = tool.list_controls()?;
    let registry = parse_listing(&listing);
    tracing::info!(
        device = registry.device_id().unwrap_or("unknown"),
        motors = registry.motor_controls().len(),
        sliders = registry.slider_controls().len(),
        toggles = registry.toggle_controls().len(),
        choices = registry.choice_controls().len(),
        diagnostics = registry.diagnostics().len(),
        "discovered controls"
    );
    Ok(registry)
}

/// Probe the configured utility, then run discovery against it.
///
/// A missing or non-executable utility fails with [`Error::MissingUtility`] before anything
/// is run or parsed.
pub fn discover_device(config: &Config) -> Result<ControlRegistry> {
    let mut tool = UvcDynCtrl::from_config(config)?;
    discover(&mut tool)
}
