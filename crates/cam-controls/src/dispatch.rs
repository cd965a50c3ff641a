//! Command dispatch: (control, value) pairs out to the tool backend
//!
//! Every command is announced to a [`DispatchObserver`] before it runs and its outcome is
//! reported afterwards. Values are passed through untouched; bounds and choice validation are
//! left to whoever produced the value.

use crate::{
    Config, Control, ControlTool, ControlValue, Error, MetricsHub, MotorNames, NudgeSteps, Result,
};
use time::OffsetDateTime;
use tracing::{error, info};

/// One command about to be issued.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    pub issued_at: OffsetDateTime,
    pub control: String,
    pub value: ControlValue,
    /// Shell-style rendering of the command line
    pub command: String,
}

/// Side channel for a message log.
pub trait DispatchObserver {
    /// Called before the command runs.
    fn on_dispatch(&mut self, event: &DispatchEvent);

    /// Called once the command has finished or failed.
    fn on_outcome(&mut self, _event: &DispatchEvent, _outcome: &Result<()>) {}
}

/// Forwards dispatch events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl DispatchObserver for LogObserver {
    fn on_dispatch(&mut self, event: &DispatchEvent) {
        info!(command = %event.command, "dispatch");
    }

    fn on_outcome(&mut self, event: &DispatchEvent, outcome: &Result<()>) {
        if let Err(e) = outcome {
            error!(control = %event.control, error = %e, "dispatch failed");
        }
    }
}

/// Keeps every event and failure in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<DispatchEvent>,
    pub failures: Vec<(DispatchEvent, String)>,
}

impl DispatchObserver for RecordingObserver {
    fn on_dispatch(&mut self, event: &DispatchEvent) {
        self.events.push(event.clone());
    }

    fn on_outcome(&mut self, event: &DispatchEvent, outcome: &Result<()>) {
        if let Err(e) = outcome {
            self.failures.push((event.clone(), e.to_string()));
        }
    }
}

/// Everything a user can ask the dispatcher to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Set { control: String, value: ControlValue },
    PanLeft,
    PanRight,
    TiltUp,
    TiltDown,
    ResetToOrigin,
}

pub struct Dispatcher<T, O = LogObserver> {
    tool: T,
    observer: O,
    nudge: NudgeSteps,
    motors: MotorNames,
    metrics: Option<MetricsHub>,
}

impl<T: ControlTool> Dispatcher<T, LogObserver> {
    pub fn new(tool: T, config: &Config) -> Self {
        Self::with_observer(tool, config, LogObserver)
    }
}

impl<T: ControlTool, O: DispatchObserver> Dispatcher<T, O> {
    pub fn with_observer(tool: T, config: &Config, observer: O) -> Self {
        Self {
            tool,
            observer,
            nudge: config.nudge,
            motors: config.motors.clone(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHub) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn tool_mut(&mut self) -> &mut T {
        &mut self.tool
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Set `control` to `value` through the tool backend.
    pub fn send(&mut self, control: &str, value: impl Into<ControlValue>) -> Result<()> {
        let value = value.into();
        let event = DispatchEvent {
            issued_at: OffsetDateTime::now_utc(),
            command: self.tool.describe_set(control, &value),
            control: control.to_string(),
            value,
        };
        self.observer.on_dispatch(&event);
        let outcome = self.tool.set_control(&event.control, &event.value);
        if let Some(m) = &self.metrics {
            m.ctl.commands_sent.inc();
            if outcome.is_err() {
                m.ctl.commands_failed.inc();
            }
        }
        self.observer.on_outcome(&event, &outcome);
        outcome
    }

    pub fn perform(&mut self, op: Operation) -> Result<()> {
        match op {
            Operation::Set { control, value } => self.send(&control, value),
            Operation::PanLeft => self.pan_left(),
            Operation::PanRight => self.pan_right(),
            Operation::TiltUp => self.tilt_up(),
            Operation::TiltDown => self.tilt_down(),
            Operation::ResetToOrigin => self.reset_to_origin(),
        }
    }

    pub fn pan_left(&mut self) -> Result<()> {
        let name = self.motors.pan_relative.clone();
        self.send(&name, -self.nudge.pan)
    }

    pub fn pan_right(&mut self) -> Result<()> {
        let name = self.motors.pan_relative.clone();
        self.send(&name, self.nudge.pan)
    }

    pub fn tilt_up(&mut self) -> Result<()> {
        let name = self.motors.tilt_relative.clone();
        self.send(&name, -self.nudge.tilt)
    }

    pub fn tilt_down(&mut self) -> Result<()> {
        let name = self.motors.tilt_relative.clone();
        self.send(&name, self.nudge.tilt)
    }

    /// Pan reset, then tilt reset. The tilt reset is attempted even if the pan reset
    /// failed; the first error is returned.
    pub fn reset_to_origin(&mut self) -> Result<()> {
        let pan = self.motors.pan_reset.clone();
        let tilt = self.motors.tilt_reset.clone();
        let first = self.send(&pan, 0);
        let second = self.send(&tilt, 0);
        first.and(second)
    }

    /// Send a slider position, truncated to an integer.
    pub fn set_slider(&mut self, control: &str, position: f64) -> Result<()> {
        self.send(control, ControlValue::from_slider(position))
    }

    pub fn set_toggle(&mut self, control: &str, on: bool) -> Result<()> {
        self.send(control, on)
    }

    /// Send the device value behind a choice label.
    pub fn select_choice(&mut self, control: &Control, label: &str) -> Result<()> {
        let key = control
            .choice_key(label)
            .ok_or_else(|| Error::UnknownChoice {
                control: control.name.clone(),
                label: label.to_string(),
            })?
            .to_string();
        self.send(&control.name, ControlValue::Text(key))
    }
}
