use crate::{ControlRegistry, Grouping};
use prometheus::{Encoder, IntCounter, IntGaugeVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct ControlMetrics {
    pub commands_sent: IntCounter,
    pub commands_failed: IntCounter,
    pub controls_discovered: IntGaugeVec,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub ctl: ControlMetrics,
}

impl MetricsHub {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let commands_sent = IntCounter::new("camctl_commands_sent", "Set commands dispatched")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let commands_failed =
            IntCounter::new("camctl_commands_failed", "Set commands that reported failure")
                .map_err(|e| format!("metrics init error: {e}"))?;
        let controls_discovered = IntGaugeVec::new(
            Opts::new(
                "camctl_controls_discovered",
                "Controls classified by the last discovery",
            ),
            &["grouping"],
        )
        .map_err(|e| format!("metrics init error: {e}"))?;
        let ctl = ControlMetrics {
            commands_sent,
            commands_failed,
            controls_discovered,
        };
        let _ = registry.register(Box::new(ctl.commands_sent.clone()));
        let _ = registry.register(Box::new(ctl.commands_failed.clone()));
        let _ = registry.register(Box::new(ctl.controls_discovered.clone()));
        Ok(Self { registry, ctl })
    }

    /// Publish per-grouping counts of a fresh registry.
    pub fn record_discovery(&self, reg: &ControlRegistry) {
        for g in Grouping::ALL {
            self.ctl
                .controls_discovered
                .with_label_values(&[g.as_str()])
                .set(reg.group(g).len() as i64);
        }
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_gauges() {
        let hub = MetricsHub::new().unwrap();
        let reg = crate::parse_listing("Zoom\n  Type : Dword\nFocus, Auto\n  Type : Boolean\n");
        hub.record_discovery(&reg);
        let text = hub.encode_text();
        assert!(text.contains("camctl_controls_discovered{grouping=\"slider\"} 1"));
        assert!(text.contains("camctl_controls_discovered{grouping=\"toggle\"} 1"));
        assert!(text.contains("camctl_controls_discovered{grouping=\"motor\"} 0"));
    }
}
