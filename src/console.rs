use crate::governor::FlightMetrics;
use crate::{info, log};
use itertools::Itertools;

/// Downstream diagnostics panel model: deduplicates and truncates the
/// cycle's messages to a fixed display budget. Purely one-way; nothing
/// here feeds back into the decision core.
#[derive(Debug)]
pub struct DiagnosticsPanel {
    budget: usize,
}

pub const TRUNCATION_NOTE: &str = "Additional messages truncated.";

impl DiagnosticsPanel {
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    /// Order-preserving dedup, then truncation with an indicator line.
    pub fn prepare(&self, messages: &[String]) -> Vec<String> {
        let mut unique: Vec<String> = messages.iter().unique().cloned().collect();
        if unique.len() > self.budget {
            unique.truncate(self.budget);
            unique.push(String::from(TRUNCATION_NOTE));
        }
        unique
    }

    /// Writes the per-cycle summary, the raw navigation line when metrics
    /// resolved this cycle, and the prepared messages.
    pub fn render(
        &self,
        live_rate: f64,
        ceiling: u32,
        ete_s: f64,
        metrics: Option<&FlightMetrics>,
        messages: &[String],
    ) {
        info!(
            "rate {live_rate:.2}x -> ceiling {ceiling}x | ETE {} ({}x = {})",
            format_ete(ete_s, 1),
            ceiling,
            format_ete(ete_s, ceiling)
        );
        if let Some(metrics) = metrics {
            log!(
                "Next fix {:.1} nm at {:03.0} deg, required VS {:+.0} fpm.",
                metrics.clearance.next,
                metrics.bearing_to_next_deg,
                metrics.required_fpm
            );
        }
        for line in self.prepare(messages) {
            log!("{line}");
        }
    }
}

/// `HH:MM:SS` en-route time under the given compression, clamped to a day.
fn format_ete(seconds: f64, compression: u32) -> String {
    let compressed = if compression > 0 { seconds / f64::from(compression) } else { seconds };
    let clamped = compressed.max(0.0).min(24.0 * 3600.0 - 1.0) as u64;
    format!("{:02}:{:02}:{:02}", clamped / 3600, (clamped % 3600) / 60, clamped % 60)
}

#[cfg(test)]
mod tests {
    use super::{DiagnosticsPanel, TRUNCATION_NOTE, format_ete};
    use crate::config::GovernorConfig;
    use crate::governor::FlightMetrics;
    use crate::telemetry::snapshot::tests::cruise_snapshot;

    fn msgs(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|m| String::from(*m)).collect()
    }

    #[test]
    fn dedup_preserves_first_occurrence_order() {
        let panel = DiagnosticsPanel::new(8);
        let prepared = panel.prepare(&msgs(&["AP Off", "Close to waypoint.", "AP Off"]));
        assert_eq!(prepared, msgs(&["AP Off", "Close to waypoint."]));
    }

    #[test]
    fn truncates_at_the_budget_with_indicator() {
        let panel = DiagnosticsPanel::new(2);
        let prepared = panel.prepare(&msgs(&["a", "b", "c", "d"]));
        assert_eq!(prepared.len(), 3);
        assert_eq!(prepared[2], TRUNCATION_NOTE);
    }

    #[test]
    fn budget_boundary_has_no_indicator() {
        let panel = DiagnosticsPanel::new(3);
        let prepared = panel.prepare(&msgs(&["a", "b", "c"]));
        assert_eq!(prepared, msgs(&["a", "b", "c"]));
    }

    #[test]
    fn render_accepts_resolved_and_missing_metrics() {
        let panel = DiagnosticsPanel::new(8);
        let config = GovernorConfig::default();
        let metrics = FlightMetrics::derive(&cruise_snapshot(), &config).unwrap();
        panel.render(1.0, 16, 5400.0, Some(&metrics), &msgs(&["Flight stable."]));
        panel.render(1.0, 1, 5400.0, None, &msgs(&["DATA ERROR: DECEL"]));
    }

    #[test]
    fn ete_formats_and_compresses() {
        assert_eq!(format_ete(5400.0, 1), "01:30:00");
        assert_eq!(format_ete(5400.0, 4), "00:22:30");
        assert_eq!(format_ete(-5.0, 1), "00:00:00");
        assert_eq!(format_ete(1e9, 1), "23:59:59");
    }
}
