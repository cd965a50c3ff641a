use crate::{Control, ControlKind, Diagnostic};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::warn;

/// The four disjoint control groupings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    Motor,
    Slider,
    Toggle,
    Choice,
}

impl Grouping {
    pub const ALL: [Grouping; 4] = [
        Grouping::Motor,
        Grouping::Slider,
        Grouping::Toggle,
        Grouping::Choice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Grouping::Motor => "motor",
            Grouping::Slider => "slider",
            Grouping::Toggle => "toggle",
            Grouping::Choice => "choice",
        }
    }
}

/// Discovered controls for one device, classified by how they are driven.
///
/// Rebuilt from scratch on every discovery; there is no incremental update.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ControlRegistry {
    device_id: Option<String>,
    motor: BTreeMap<String, Control>,
    slider: BTreeMap<String, Control>,
    toggle: BTreeMap<String, Control>,
    choice: BTreeMap<String, Control>,
    #[serde(skip)]
    diagnostics: Vec<Diagnostic>,
}

/// Pan/tilt names are motor controls whatever their kind.
#[allow(clippy::expect_used)]
pub(crate) fn is_motor_name(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Pan|Tilt").expect("motor pattern"))
        .is_match(name)
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn set_device_id(&mut self, device: impl Into<String>) {
        self.device_id = Some(device.into());
    }

    /// Route a finished control into its grouping.
    ///
    /// Returns the grouping it landed in, or `None` when it was dropped with a diagnostic.
    pub fn classify(&mut self, control: Control) -> Option<Grouping> {
        let grouping = if is_motor_name(&control.name) {
            Grouping::Motor
        } else {
            match &control.kind {
                Some(ControlKind::Range) => Grouping::Slider,
                Some(ControlKind::Toggle) => Grouping::Toggle,
                Some(ControlKind::Choice) => Grouping::Choice,
                Some(ControlKind::Button) => {
                    self.report(Diagnostic::ClassificationAnomaly {
                        control: control.name,
                    });
                    return None;
                }
                Some(ControlKind::Unknown(word)) => {
                    let kind = word.clone();
                    self.report(Diagnostic::UnrecognizedKind {
                        control: control.name,
                        kind,
                    });
                    return None;
                }
                None => {
                    self.report(Diagnostic::UnrecognizedKind {
                        control: control.name,
                        kind: String::new(),
                    });
                    return None;
                }
            }
        };
        self.insert(grouping, control);
        Some(grouping)
    }

    fn insert(&mut self, grouping: Grouping, control: Control) {
        let mut duplicate = false;
        for g in Grouping::ALL {
            duplicate |= self.group_mut(g).remove(&control.name).is_some();
        }
        if duplicate {
            self.report(Diagnostic::DuplicateName {
                control: control.name.clone(),
            });
        }
        self.group_mut(grouping)
            .insert(control.name.clone(), control);
    }

    fn report(&mut self, diag: Diagnostic) {
        warn!(%diag, "control classification");
        self.diagnostics.push(diag);
    }

    pub(crate) fn push_diagnostic(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    fn group_mut(&mut self, grouping: Grouping) -> &mut BTreeMap<String, Control> {
        match grouping {
            Grouping::Motor => &mut self.motor,
            Grouping::Slider => &mut self.slider,
            Grouping::Toggle => &mut self.toggle,
            Grouping::Choice => &mut self.choice,
        }
    }

    pub fn group(&self, grouping: Grouping) -> &BTreeMap<String, Control> {
        match grouping {
            Grouping::Motor => &self.motor,
            Grouping::Slider => &self.slider,
            Grouping::Toggle => &self.toggle,
            Grouping::Choice => &self.choice,
        }
    }

    pub fn motor_controls(&self) -> &BTreeMap<String, Control> {
        &self.motor
    }

    pub fn slider_controls(&self) -> &BTreeMap<String, Control> {
        &self.slider
    }

    pub fn toggle_controls(&self) -> &BTreeMap<String, Control> {
        &self.toggle
    }

    pub fn choice_controls(&self) -> &BTreeMap<String, Control> {
        &self.choice
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Look a control up by name in whichever grouping holds it.
    pub fn get(&self, name: &str) -> Option<(Grouping, &Control)> {
        Grouping::ALL
            .into_iter()
            .find_map(|g| self.group(g).get(name).map(|c| (g, c)))
    }

    /// Total number of classified controls.
    pub fn len(&self) -> usize {
        Grouping::ALL.iter().map(|g| self.group(*g).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
