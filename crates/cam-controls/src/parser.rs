//! Line-oriented parser for `uvcdynctrl -c -v` listings
//!
//! A listing looks like:
//!
//! ```text
//! Listing available controls for device video0:
//!   Brightness
//!     ID      : 0x00000001,
//!     Type    : Dword,
//!     Flags   : { CAN_READ, CAN_WRITE },
//!     Values  : [ 0 .. 255, step size: 1 ],
//!     Default : 128
//! ```
//!
//! Each line is classified on its own by [`classify_line`]; [`ControlParser`] holds the one
//! piece of state (the control being built) and flushes it into a [`ControlRegistry`] when the
//! next control label or the end of input arrives.

use crate::{Control, ControlKind, ControlRegistry, Diagnostic};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// What a single listing line means to the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Line<'a> {
    /// `Listing available ... video<N>`, carries `video<N>`
    DeviceHeader(String),
    /// A bare label starting a new control
    ControlLabel(&'a str),
    /// `Type : <word>`
    Type(&'a str),
    /// `Flags : ...`
    Flags,
    /// `Values : [ ... ],` or `Values : { ... },`, carries the bracketed text
    Values(&'a str),
    /// `Default : <number>`
    Default(f64),
    /// Anything else
    Skip,
}

type Matcher = for<'a> fn(&Patterns, &'a str) -> Option<Line<'a>>;

/// Matchers in priority order; the first hit wins.
const MATCH_ORDER: [Matcher; 6] = [
    match_header,
    match_label,
    match_type,
    match_flags,
    match_values,
    match_default,
];

struct Patterns {
    header: Regex,
    label: Regex,
    kind: Regex,
    flags: Regex,
    values_square: Regex,
    values_curly: Regex,
    default: Regex,
}

#[allow(clippy::expect_used)]
fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("listing pattern");
        Patterns {
            header: re(r"Listing available .*?video([0-9]+)"),
            label: re(r"^\s*([^:]*[^:\s])\s*$"),
            kind: re(r"^\s*Type\s*:\s*(\w+)"),
            flags: re(r"^\s*Flags\s*:"),
            values_square: re(r"^\s*Values\s*:\s*\[\s*(.*?)\s*\]\s*,?\s*$"),
            values_curly: re(r"^\s*Values\s*:\s*\{\s*(.*?)\s*\}\s*,?\s*$"),
            default: re(r"^\s*Default\s*:\s*(\S+?),?\s*$"),
        }
    })
}

fn match_header<'a>(p: &Patterns, line: &'a str) -> Option<Line<'a>> {
    let caps = p.header.captures(line)?;
    Some(Line::DeviceHeader(format!("video{}", &caps[1])))
}

fn match_label<'a>(p: &Patterns, line: &'a str) -> Option<Line<'a>> {
    let caps = p.label.captures(line)?;
    caps.get(1).map(|m| Line::ControlLabel(m.as_str()))
}

fn match_type<'a>(p: &Patterns, line: &'a str) -> Option<Line<'a>> {
    let caps = p.kind.captures(line)?;
    caps.get(1).map(|m| Line::Type(m.as_str()))
}

fn match_flags<'a>(p: &Patterns, line: &'a str) -> Option<Line<'a>> {
    p.flags.is_match(line).then_some(Line::Flags)
}

fn match_values<'a>(p: &Patterns, line: &'a str) -> Option<Line<'a>> {
    let caps = p
        .values_square
        .captures(line)
        .or_else(|| p.values_curly.captures(line))?;
    caps.get(1).map(|m| Line::Values(m.as_str()))
}

fn match_default<'a>(p: &Patterns, line: &'a str) -> Option<Line<'a>> {
    let caps = p.default.captures(line)?;
    caps[1].parse::<f64>().ok().map(Line::Default)
}

/// Classify one line of a listing.
pub fn classify_line(line: &str) -> Line<'_> {
    let p = patterns();
    MATCH_ORDER
        .iter()
        .find_map(|m| m(p, line))
        .unwrap_or(Line::Skip)
}

/// Streaming state machine over listing lines.
#[derive(Debug, Default)]
pub struct ControlParser {
    current: Option<Control>,
    registry: ControlRegistry,
}

impl ControlParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, raw: &str) {
        let line = raw.trim_end_matches(['\r', '\n']);
        match classify_line(line) {
            Line::DeviceHeader(device) => {
                debug!(%device, "device header");
                self.registry.set_device_id(device);
            }
            Line::ControlLabel(name) => {
                self.flush();
                debug!(control = name, "new control");
                self.current = Some(Control::new(name));
            }
            Line::Type(word) => {
                if let Some(c) = self.current.as_mut() {
                    c.set_kind(ControlKind::from_type_word(word));
                } else {
                    debug!(word, "type line outside a control");
                }
            }
            Line::Flags | Line::Skip => {}
            Line::Values(text) => {
                if let Some(c) = self.current.as_mut() {
                    if let Err(diag) = c.set_values(text) {
                        warn!(%diag, "control values");
                        self.registry.push_diagnostic(diag);
                    }
                } else {
                    debug!(text, "values line outside a control");
                }
            }
            Line::Default(value) => {
                if let Some(c) = self.current.as_mut() {
                    c.default = Some(value);
                }
            }
        }
    }

    /// Flush the last control and hand over the registry.
    pub fn finish(mut self) -> ControlRegistry {
        self.flush();
        self.registry
    }

    fn flush(&mut self) {
        if let Some(control) = self.current.take() {
            self.registry.classify(control);
        }
    }
}

/// Parse a complete listing into a fresh registry.
pub fn parse_listing(text: &str) -> ControlRegistry {
    let mut parser = ControlParser::new();
    for line in text.lines() {
        parser.feed_line(line);
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = "\
Listing available controls for video0
Brightness
    Type   : Dword
    Values : [ 0 .. 255, step size: 1 ],
    Default: 128
Pan (relative)
    Type   : Dword
    Values : [ -500 .. 500, step size: 1 ],
    Default: 0
";

    #[test]
    fn test_classify_line_order() {
        assert_eq!(
            classify_line("Listing available controls for device video3:"),
            Line::DeviceHeader("video3".into())
        );
        assert_eq!(classify_line("  Brightness"), Line::ControlLabel("Brightness"));
        assert_eq!(
            classify_line("  Pan (relative)  "),
            Line::ControlLabel("Pan (relative)")
        );
        assert_eq!(classify_line("    Type    : Dword,"), Line::Type("Dword"));
        assert_eq!(
            classify_line("    Flags   : { CAN_READ, CAN_WRITE },"),
            Line::Flags
        );
        assert_eq!(
            classify_line("    Values  : [ 0 .. 255, step size: 1 ],"),
            Line::Values("0 .. 255, step size: 1")
        );
        assert_eq!(
            classify_line("    Values  : { 'Disabled'[0], '50 Hz'[1] },"),
            Line::Values("'Disabled'[0], '50 Hz'[1]")
        );
        assert_eq!(classify_line("    Default : 128"), Line::Default(128.0));
        assert_eq!(classify_line("    ID      : 0x00000001,"), Line::Skip);
        assert_eq!(classify_line(""), Line::Skip);
        assert_eq!(classify_line("     "), Line::Skip);
    }

    #[test]
    fn test_header_beats_label() {
        // no colon, so it would also read as a bare label
        assert_eq!(
            classify_line("Listing available controls for video0"),
            Line::DeviceHeader("video0".into())
        );
    }

    #[test]
    fn test_choice_values_in_square_brackets() {
        assert_eq!(
            classify_line("Values : [ 'Off'[0], 'On'[1] ],"),
            Line::Values("'Off'[0], 'On'[1]")
        );
    }

    #[test]
    fn test_end_to_end_scenario() {
        let reg = parse_listing(SCENARIO);
        assert_eq!(reg.device_id(), Some("video0"));

        let sliders = reg.slider_controls();
        assert_eq!(sliders.len(), 1);
        let b = &sliders["Brightness"];
        assert_eq!(b.kind, Some(ControlKind::Range));
        assert_eq!((b.min, b.max, b.step), (Some(0.0), Some(255.0), Some(1.0)));
        assert_eq!(b.default, Some(128.0));

        let motors = reg.motor_controls();
        assert_eq!(motors.len(), 1);
        let p = &motors["Pan (relative)"];
        assert_eq!(p.kind, Some(ControlKind::Range));
        assert_eq!((p.min, p.max, p.step), (Some(-500.0), Some(500.0), Some(1.0)));
        assert_eq!(p.default, Some(0.0));

        assert!(reg.choice_controls().is_empty());
        assert!(reg.toggle_controls().is_empty());
        assert!(reg.diagnostics().is_empty());
    }

    #[test]
    fn test_k_records_flush_k_controls() {
        for k in 0..6 {
            let mut text = String::from("Listing available controls for device video1:\n");
            for i in 0..k {
                text.push_str(&format!(
                    "  Control {i}\n    Type : Dword,\n    Values : [ 0 .. {i}, step size: 1 ],\n    Default : 0\n"
                ));
            }
            let reg = parse_listing(&text);
            assert_eq!(reg.len(), k);
            if k > 0 {
                let last = format!("Control {}", k - 1);
                assert!(reg.slider_controls().contains_key(&last));
            }
        }
    }

    #[test]
    fn test_full_uvcdynctrl_listing() {
        let text = "\
Listing available controls for device video0:
  Brightness
    ID      : 0x00000001,
    Type    : Dword,
    Flags   : { CAN_READ, CAN_WRITE, CAN_USE },
    Values  : [ 0 .. 255, step size: 1 ],
    Default : 128
  White Balance Temperature, Auto
    ID      : 0x0000000c,
    Type    : Boolean,
    Flags   : { CAN_READ, CAN_WRITE, CAN_USE },
    Values  : [ 0 .. 1, step size: 1 ],
    Default : 1
  Power Line Frequency
    ID      : 0x0000000d,
    Type    : Choice,
    Flags   : { CAN_READ, CAN_WRITE, CAN_USE },
    Values  : { 'Disabled'[0], '50 Hz'[1], '60 Hz'[2] },
    Default : 2
  Pan Reset
    ID      : 0x0000001d,
    Type    : Button,
    Flags   : { CAN_WRITE, CAN_USE },
  Tilt (relative)
    ID      : 0x0000001c,
    Type    : Dword,
    Flags   : { CAN_WRITE, CAN_USE },
    Values  : [ -480 .. 480, step size: 1 ],
    Default : 0
";
        let reg = parse_listing(text);
        assert_eq!(reg.device_id(), Some("video0"));
        assert_eq!(reg.len(), 5);
        assert!(reg.slider_controls().contains_key("Brightness"));

        let wb = &reg.toggle_controls()["White Balance Temperature, Auto"];
        assert_eq!(wb.default_toggle(), Some(true));

        let plf = &reg.choice_controls()["Power Line Frequency"];
        assert_eq!(plf.default_label(), Some("60 Hz"));

        let motors = reg.motor_controls();
        assert_eq!(motors["Pan Reset"].kind, Some(ControlKind::Button));
        assert_eq!(motors["Tilt (relative)"].min, Some(-480.0));
        assert!(reg.diagnostics().is_empty());
    }

    #[test]
    fn test_flags_line_is_not_stored() {
        let reg = parse_listing("Gain\n  Type : Dword\n  Flags : { CAN_READ }\n");
        assert!(reg.slider_controls()["Gain"].flags.is_empty());
    }

    #[test]
    fn test_malformed_values_keep_control() {
        let reg = parse_listing("Gain\n  Type : Dword\n  Values : [ lots ],\n  Default : 3\n");
        let gain = &reg.slider_controls()["Gain"];
        assert!(gain.min.is_none());
        assert_eq!(gain.default, Some(3.0));
        assert!(matches!(
            reg.diagnostics(),
            [Diagnostic::MalformedValue { .. }]
        ));
    }

    #[test]
    fn test_field_lines_before_any_control_are_ignored() {
        let reg = parse_listing("  Type : Dword\n  Default : 4\nZoom\n  Type : Dword\n");
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.slider_controls()["Zoom"].default, None);
    }

    #[test]
    fn test_unknown_kind_excluded() {
        let reg = parse_listing(
            "Extension Unit\n  Type : Raw\n  Values : [ 0 .. 1, step size: 1 ],\n",
        );
        assert_eq!(reg.len(), 0);
        assert!(reg
            .diagnostics()
            .iter()
            .all(|d| matches!(d, Diagnostic::UnrecognizedKind { .. })));
        assert_eq!(reg.diagnostics().len(), 2);
    }
}
