use crate::Diagnostic;
use core::fmt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Value shape of a control, as declared by the `Type` line of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// Bounded numeric (`Dword`, `Word`, `Byte`)
    Range,
    /// Enumerated labels keyed by device value (`Choice`)
    Choice,
    /// Momentary action (`Button`)
    Button,
    /// On/off (`Boolean`)
    Toggle,
    /// Any other type word; kept so it can be reported.
    Unknown(String),
}

impl ControlKind {
    /// Map a type word from the utility's listing onto a kind.
    pub fn from_type_word(word: &str) -> Self {
        match word {
            "Dword" | "Word" | "Byte" => ControlKind::Range,
            "Choice" => ControlKind::Choice,
            "Button" => ControlKind::Button,
            "Boolean" => ControlKind::Toggle,
            other => ControlKind::Unknown(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ControlKind::Unknown(_))
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKind::Range => f.write_str("range"),
            ControlKind::Choice => f.write_str("choice"),
            ControlKind::Button => f.write_str("button"),
            ControlKind::Toggle => f.write_str("toggle"),
            ControlKind::Unknown(word) => write!(f, "unknown({word})"),
        }
    }
}

/// One discovered device parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ControlKind>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Device value (integer as text) to label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
}

impl Control {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set_kind(&mut self, kind: ControlKind) {
        self.kind = Some(kind);
    }

    /// Populate the kind-specific fields from the text inside a `Values` line.
    ///
    /// On error the affected fields are left unset and the control stays inert.
    pub fn set_values(&mut self, text: &str) -> Result<(), Diagnostic> {
        match &self.kind {
            None => Err(Diagnostic::ValuesWithoutKind {
                control: self.name.clone(),
            }),
            Some(ControlKind::Range) => self.set_range(text),
            Some(ControlKind::Choice) => self.set_choices(text),
            Some(ControlKind::Button) | Some(ControlKind::Toggle) => Ok(()),
            Some(ControlKind::Unknown(word)) => Err(Diagnostic::UnrecognizedKind {
                control: self.name.clone(),
                kind: word.clone(),
            }),
        }
    }

    fn set_range(&mut self, text: &str) -> Result<(), Diagnostic> {
        let parsed = range_pattern().captures(text).and_then(|caps| {
            let min = caps[1].parse::<f64>().ok()?;
            let max = caps[2].parse::<f64>().ok()?;
            let step = caps[3].parse::<f64>().ok()?;
            Some((min, max, step))
        });
        match parsed {
            Some((min, max, step)) if min <= max => {
                self.min = Some(min);
                self.max = Some(max);
                self.step = Some(step);
                Ok(())
            }
            _ => Err(self.malformed(text)),
        }
    }

    fn set_choices(&mut self, text: &str) -> Result<(), Diagnostic> {
        let mut choices = BTreeMap::new();
        for caps in choice_pattern().captures_iter(text) {
            choices.insert(caps[2].trim().to_string(), caps[1].to_string());
        }
        if choices.is_empty() {
            return Err(self.malformed(text));
        }
        self.choices = Some(choices);
        Ok(())
    }

    fn malformed(&self, text: &str) -> Diagnostic {
        Diagnostic::MalformedValue {
            control: self.name.clone(),
            text: text.to_string(),
        }
    }

    /// The default as a discrete key: truncated toward zero, then stringified.
    ///
    /// Choice keys and toggle states are integers in text form while defaults are parsed as
    /// floats, so `1.0` and `1.9` both become `"1"`.
    pub fn default_key(&self) -> Option<String> {
        let d = self.default?;
        if !d.is_finite() {
            return None;
        }
        Some(format!("{}", d.trunc() as i64))
    }

    /// Label of the default entry of a choice control.
    pub fn default_label(&self) -> Option<&str> {
        let key = self.default_key()?;
        self.choices
            .as_ref()
            .and_then(|c| c.get(&key))
            .map(String::as_str)
    }

    /// Default state of a toggle: on when the truncated default is non-zero, so `0.5` is off.
    pub fn default_toggle(&self) -> Option<bool> {
        self.default_key().map(|k| k != "0")
    }

    /// Reverse lookup from a choice label to the device value to send.
    pub fn choice_key(&self, label: &str) -> Option<&str> {
        self.choices
            .as_ref()?
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .map(|(k, _)| k.as_str())
    }
}

/// A value handed to the utility's set command, rendered verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ControlValue {
    /// Interpret user input without changing how it renders.
    ///
    /// Text only becomes `Int` or `Float` when the number prints back identically; anything
    /// else (`007`, `1e3`, `+5`) stays `Text` so the utility receives exactly what was typed.
    pub fn parse(s: &str) -> Self {
        if let Ok(i) = s.parse::<i64>() {
            if i.to_string() == s {
                return ControlValue::Int(i);
            }
        }
        if let Ok(f) = s.parse::<f64>() {
            if f.to_string() == s {
                return ControlValue::Float(f);
            }
        }
        ControlValue::Text(s.to_string())
    }

    /// Slider positions are sent as integers.
    pub fn from_slider(position: f64) -> Self {
        ControlValue::Int(position.trunc() as i64)
    }
}

impl From<i64> for ControlValue {
    fn from(v: i64) -> Self {
        ControlValue::Int(v)
    }
}

impl From<i32> for ControlValue {
    fn from(v: i32) -> Self {
        ControlValue::Int(i64::from(v))
    }
}

impl From<f64> for ControlValue {
    fn from(v: f64) -> Self {
        ControlValue::Float(v)
    }
}

impl From<bool> for ControlValue {
    fn from(on: bool) -> Self {
        ControlValue::Int(i64::from(on))
    }
}

impl From<&str> for ControlValue {
    fn from(v: &str) -> Self {
        ControlValue::Text(v.to_string())
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Int(v) => write!(f, "{v}"),
            ControlValue::Float(v) => write!(f, "{v}"),
            ControlValue::Text(v) => f.write_str(v),
        }
    }
}

const NUMBER: &str = r"-?\d+(?:\.\d+)?";

#[allow(clippy::expect_used)]
fn range_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"({NUMBER})\s*\.\.\s*({NUMBER})\s*,\s*step size:\s*({NUMBER})"
        ))
        .expect("range pattern")
    })
}

#[allow(clippy::expect_used)]
fn choice_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^']+)'\[([^\]]+)\]").expect("choice pattern"))
}
