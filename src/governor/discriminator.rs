use super::history::RateCeilingHistory;
use super::metrics::FlightMetrics;
use crate::common::math::rate_steps;
use crate::common::sample_window::SampleWindow;
use crate::config::GovernorConfig;
use crate::error::GovernorError;
use crate::poi::PoiStore;
use crate::telemetry::TelemetrySnapshot;
use regex::Regex;
use std::sync::LazyLock;

/// Charted fixes are short, all-uppercase alphanumeric tokens. Anything
/// else is treated as synthetic. Advisory only; the check trades a handful
/// of false positives worldwide for catching user and FMS-generated fixes.
static CHARTED_IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z0-9]+$").unwrap());

/// Prefixes the FMS uses for synthetic fixes.
const SYNTHETIC_PREFIXES: [&str; 4] = ["HOLD", "USR", "WP", "POI"];
/// Above this AGL the custom-waypoint heuristic is moot and skipped.
const CUSTOM_IDENT_CEILING_FT: f64 = 10_000.0;
/// A current vertical speed within this fraction of the required one means
/// the level change is already established.
const FLC_ESTABLISHED_FRACTION: f64 = 0.25;

/// One cycle's decision: the smoothed rate ceiling, the raw (unsmoothed)
/// verdict behind it, an edge-triggered pause request, and the diagnostics
/// in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub ceiling: u32,
    pub raw_ceiling: u32,
    pub pause_at_tod: bool,
    pub diagnostics: Vec<String>,
}

/// The stability discriminator: a bank of independent, side-effect-free
/// predicates, each contributing a candidate ceiling. The cycle's raw
/// ceiling is the minimum across triggered candidates (or `max_rate` when
/// none trigger), then smoothed through the ceiling history.
///
/// Every predicate is evaluated every cycle. No short-circuiting: predicate
/// order must never change the result, and every relevant diagnostic must
/// surface.
pub struct Discriminator {
    history: RateCeilingHistory,
    heading_window: SampleWindow,
    vsi_window: SampleWindow,
    have_paused_at_tod: bool,
    first_waypoint: Option<String>,
    poi: PoiStore,
}

impl Discriminator {
    /// Rolling window length for the turbulence samples.
    const TURBULENCE_WINDOW: usize = 10;

    pub fn new(poi: PoiStore) -> Self {
        Self {
            history: RateCeilingHistory::new(RateCeilingHistory::WINDOW),
            heading_window: SampleWindow::new(Self::TURBULENCE_WINDOW),
            vsi_window: SampleWindow::new(Self::TURBULENCE_WINDOW),
            have_paused_at_tod: false,
            first_waypoint: None,
            poi,
        }
    }

    pub fn tod_latched(&self) -> bool {
        self.have_paused_at_tod
    }

    /// Verdict for a cycle without a usable snapshot: forced minimum, fed
    /// through the same history so the hysteresis covers outages too.
    pub fn degraded(&mut self, error: &GovernorError, config: &GovernorConfig) -> Verdict {
        let diagnostics = vec![format!("DATA ERROR: DECEL ({error})")];
        self.conclude(vec![config.min_rate], false, diagnostics, config)
    }

    /// Evaluates the full predicate bank against one cycle's data.
    pub fn evaluate(
        &mut self,
        snapshot: &TelemetrySnapshot,
        metrics: Result<&FlightMetrics, &GovernorError>,
        system_load: f64,
        config: &GovernorConfig,
    ) -> Verdict {
        if self.first_waypoint.is_none() && snapshot.flight_plan_valid() {
            self.first_waypoint = Some(snapshot.prev_wp_ident.clone());
        }
        self.heading_window.push(snapshot.heading_rad);
        self.vsi_window.push(snapshot.vsi_fpm);

        let mut msgs = Vec::new();
        let mut candidates = Vec::new();
        let mut pause = false;

        // Cautious-cap bank.
        if self.angles_aggressive(snapshot, config, &mut msgs) {
            candidates.push(config.cautious_rate);
        }
        if self.turbulent(config, &mut msgs) {
            candidates.push(config.cautious_rate);
        }
        if let Ok(metrics) = metrics {
            if Self::vs_aggressive(snapshot, metrics, config, &mut msgs) {
                candidates.push(config.cautious_rate);
            }
            if Self::waypoint_close(metrics, config, &mut msgs) {
                candidates.push(config.cautious_rate);
            }
            let flc = Self::flc_imminent(snapshot, metrics, config, &mut msgs);
            if flc {
                candidates.push(config.cautious_rate);
                if config.pause_at_tod && !self.have_paused_at_tod {
                    self.have_paused_at_tod = true;
                    pause = true;
                    msgs.push(String::from("Pause at TOD."));
                }
            }
        }
        match self.poi_distance_nm(snapshot) {
            Some(d) if d < config.poi_near_nm => {
                msgs.push(format!("Very close to POI: {d:.1} nm."));
                candidates.push(config.min_rate);
            }
            Some(d) if d < config.poi_far_nm => {
                msgs.push(format!("Close to POI: {d:.1} nm."));
                candidates.push(config.cautious_rate);
            }
            _ => {}
        }

        // Forced-minimum bank.
        if !self.autopilot_sane(snapshot, config, &mut msgs) {
            candidates.push(config.min_rate);
        }
        if Self::approach_hold_veto(snapshot, config, &mut msgs) {
            candidates.push(config.min_rate);
        }
        if snapshot.next_wp_ident.contains("HOLD") {
            msgs.push(String::from("In a hold."));
            candidates.push(config.min_rate);
        }
        if Self::last_leg_and_low(snapshot, config, &mut msgs) {
            candidates.push(config.min_rate);
        }
        if config.ete_guarded && snapshot.ete_s < config.min_approach_time_min * 60.0 {
            msgs.push(format!(
                "Less than {:.0} minutes from destination.",
                config.min_approach_time_min
            ));
            candidates.push(config.min_rate);
        }
        if config.check_cruise_configuration && !Self::cruise_configured(snapshot, &mut msgs) {
            candidates.push(config.min_rate);
        }
        if system_load > config.resource_load_limit {
            msgs.push(format!("Resource overload: {:.0}%.", system_load * 100.0));
            candidates.push(config.min_rate);
        }
        if !snapshot.flight_plan_valid() {
            msgs.push(String::from("No valid flight plan. Stability undefined."));
            candidates.push(config.min_rate);
        }
        match metrics {
            Ok(metrics) => {
                if Self::too_low(snapshot, metrics, &mut msgs) {
                    candidates.push(config.min_rate);
                }
                if self.custom_waypoint_close(snapshot, metrics, config, &mut msgs) {
                    candidates.push(config.min_rate);
                }
            }
            Err(error) => {
                msgs.push(format!("DATA ERROR: DECEL ({error})"));
                candidates.push(config.min_rate);
            }
        }

        if candidates.is_empty() {
            msgs.push(String::from("Flight stable."));
        }
        self.conclude(candidates, pause, msgs, config)
    }

    /// Reduce-by-min over the candidates, then smooth through the history.
    /// The numeric ceiling always lands in `[min_rate, max_rate]`; a pause
    /// travels as its own edge-triggered signal and never poisons the
    /// smoothing window.
    fn conclude(
        &mut self,
        candidates: Vec<u32>,
        pause: bool,
        diagnostics: Vec<String>,
        config: &GovernorConfig,
    ) -> Verdict {
        let raw_ceiling = candidates
            .into_iter()
            .min()
            .unwrap_or(config.max_rate)
            .clamp(config.min_rate, config.max_rate);
        self.history.push(raw_ceiling);
        let ceiling = self
            .history
            .floor()
            .unwrap_or(config.min_rate)
            .clamp(config.min_rate, config.max_rate);
        Verdict { ceiling, raw_ceiling, pause_at_tod: pause, diagnostics }
    }

    /// Pitch or bank beyond the configured bounds. The default bounds are
    /// what keeps time compression from inducing porpoising and waddling.
    fn angles_aggressive(
        &self,
        snapshot: &TelemetrySnapshot,
        config: &GovernorConfig,
        msgs: &mut Vec<String>,
    ) -> bool {
        let pitch = snapshot.pitch_rad.to_degrees().abs();
        let bank = snapshot.bank_rad.to_degrees().abs();
        if pitch > config.max_pitch_deg || bank > config.max_bank_deg {
            msgs.push(format!("Aggressive angles detected: {pitch:.0} deg / {bank:.0} deg."));
            true
        } else {
            false
        }
    }

    /// Vertical speed worse than the required one, outside the configured
    /// band (widened when the required VS itself is aggressive), or
    /// descending into the ground inside the approach-time horizon.
    fn vs_aggressive(
        snapshot: &TelemetrySnapshot,
        metrics: &FlightMetrics,
        config: &GovernorConfig,
        msgs: &mut Vec<String>,
    ) -> bool {
        let vsi = snapshot.vsi_fpm;
        let required = metrics.required_fpm;
        let overshoot = (required > 0.0 && vsi > required) || (required < 0.0 && vsi < required);
        let band = config.max_vsi.abs().max(config.min_vsi.abs()).max(required.abs());
        let outside_band = vsi > band || vsi < -band;
        let mut aggressive = overshoot || outside_band;
        if aggressive {
            msgs.push(format!("Aggressive vertical speed: {vsi:.0} fpm."));
        }
        if vsi < 0.0 {
            let minutes_to_ground = (snapshot.agl_ft + metrics.min_agl_cruise_ft) / vsi.abs();
            if minutes_to_ground < config.min_approach_time_min {
                msgs.push(format!(
                    "VSI may impact ground in less than {:.0} minutes.",
                    config.min_approach_time_min
                ));
                aggressive = true;
            }
        }
        aggressive
    }

    /// Heading or vertical-speed scatter over the rolling windows beyond
    /// the configured thresholds.
    fn turbulent(&self, config: &GovernorConfig, msgs: &mut Vec<String>) -> bool {
        let heading = self.heading_window.circular_spread();
        let vsi = self.vsi_window.spread();
        let heading_turbulence = heading > config.heading_turbulence_deg.to_radians();
        let vsi_turbulence = vsi > config.vsi_turbulence_fpm;
        if heading_turbulence {
            msgs.push(format!("Heading turbulence of {:.1} deg.", heading.to_degrees()));
        }
        if vsi_turbulence {
            msgs.push(format!("VSI turbulence of {vsi:.0} fpm."));
        }
        heading_turbulence || vsi_turbulence
    }

    /// Within the speed-scaled buffer of either adjacent fix. The FMS
    /// switches waypoints early to cut corners, so the buffer has to cover
    /// the deceleration cascade on both sides of the switch.
    fn waypoint_close(
        metrics: &FlightMetrics,
        config: &GovernorConfig,
        msgs: &mut Vec<String>,
    ) -> bool {
        let base = config.minimum_waypoint_distance_nm;
        let per_step = metrics.ground_speed_nmps * config.waypoint_buffer_s;
        let prev_buffer = base.max(per_step * f64::from(rate_steps(config.cautious_rate, 1)));
        let next_buffer = base.max(per_step * f64::from(rate_steps(config.max_rate, 1)));
        let close =
            metrics.clearance.prev < prev_buffer || metrics.clearance.next < next_buffer;
        if close {
            msgs.push(format!(
                "Close ({prev_buffer:.2}, {next_buffer:.2}) to waypoint: ({:.2} nm, {:.2} nm).",
                metrics.clearance.prev, metrics.clearance.next
            ));
        }
        close
    }

    /// A flight-level change is due sooner than the deceleration cascade
    /// can finish. Suppressed when the current VS is already established on
    /// the required profile, and for climbs when climb deceleration is off.
    fn flc_imminent(
        snapshot: &TelemetrySnapshot,
        metrics: &FlightMetrics,
        config: &GovernorConfig,
        msgs: &mut Vec<String>,
    ) -> bool {
        if metrics.target_altitude_change_ft == 0.0 {
            return false;
        }
        let established = (metrics.required_fpm - snapshot.vsi_fpm).abs()
            < metrics.required_fpm.abs() * FLC_ESTABLISHED_FRACTION;
        if established {
            return false;
        }
        if !config.decel_for_climb && metrics.target_altitude_change_ft > 0.0 {
            return false;
        }
        let horizon_s =
            config.descent_safety_factor * f64::from(rate_steps(config.max_rate, 1));
        if metrics.time_to_flc_s < horizon_s {
            msgs.push(String::from("Flight level change needed."));
            true
        } else {
            false
        }
    }

    /// Sane autopilot: master plus lateral nav. Unguarded installations
    /// accept master alone (some aircraft never report a nav lock, leaving
    /// the crew no way to hand control back), at reduced protection.
    fn autopilot_sane(
        &self,
        snapshot: &TelemetrySnapshot,
        config: &GovernorConfig,
        msgs: &mut Vec<String>,
    ) -> bool {
        if snapshot.ap_master && snapshot.nav_lock {
            true
        } else if !config.nav_guarded && snapshot.ap_master {
            msgs.push(String::from("Simrate not LNAV guarded."));
            true
        } else {
            msgs.push(String::from("AP not active."));
            false
        }
    }

    fn approach_hold_veto(
        snapshot: &TelemetrySnapshot,
        config: &GovernorConfig,
        msgs: &mut Vec<String>,
    ) -> bool {
        if !(snapshot.ap_master && snapshot.approach_hold) {
            return false;
        }
        if config.approach_hold_guarded {
            msgs.push(String::from("Approach hold mode on."));
            true
        } else {
            msgs.push(String::from("Approach hold unguarded."));
            false
        }
    }

    fn last_leg_and_low(
        snapshot: &TelemetrySnapshot,
        config: &GovernorConfig,
        msgs: &mut Vec<String>,
    ) -> bool {
        if snapshot.is_last_leg() && snapshot.agl_ft < config.min_agl_descent_ft {
            msgs.push(String::from("Last waypoint and low."));
            true
        } else {
            false
        }
    }

    fn cruise_configured(snapshot: &TelemetrySnapshot, msgs: &mut Vec<String>) -> bool {
        let mut configured = true;
        if snapshot.flaps_percent > 0.0 {
            msgs.push(String::from("Flaps extended."));
            configured = false;
        }
        if snapshot.landing_lights {
            msgs.push(String::from("Lights not configured for cruise."));
            configured = false;
        }
        configured
    }

    /// Below the dynamic minimum safe cruise altitude.
    fn too_low(
        snapshot: &TelemetrySnapshot,
        metrics: &FlightMetrics,
        msgs: &mut Vec<String>,
    ) -> bool {
        if snapshot.agl_ft > metrics.min_agl_cruise_ft {
            return false;
        }
        msgs.push(format!("Plane close to ground: {:.0} ft AGL.", snapshot.agl_ft));
        msgs.push(format!(
            "Minimum altitude: {:.0} ft.",
            metrics.ground_elevation_ft + metrics.min_agl_cruise_ft
        ));
        true
    }

    /// Non-charted fix nearby, or the destination itself inside the custom
    /// buffer. Synthetic fixes get the larger buffer because their position
    /// tends to be wherever the planner clicked, not a charted gate.
    fn custom_waypoint_close(
        &self,
        snapshot: &TelemetrySnapshot,
        metrics: &FlightMetrics,
        config: &GovernorConfig,
        msgs: &mut Vec<String>,
    ) -> bool {
        let buffer = config.custom_waypoint_distance_nm;
        let (custom_prev, custom_next) = self.custom_waypoints(snapshot);
        let close = (custom_prev && metrics.clearance.prev < buffer)
            || (custom_next && metrics.clearance.next < buffer)
            || metrics.distance_to_destination_nm < buffer;
        if close {
            msgs.push(String::from("Close to custom waypoint."));
        }
        close
    }

    /// Advisory classification of the adjacent fixes as non-charted.
    fn custom_waypoints(&self, snapshot: &TelemetrySnapshot) -> (bool, bool) {
        if snapshot.agl_ft > CUSTOM_IDENT_CEILING_FT {
            return (false, false);
        }
        let prev_is_first = self.first_waypoint.as_deref() == Some(snapshot.prev_wp_ident.as_str());
        (
            prev_is_first || Self::is_custom_ident(&snapshot.prev_wp_ident),
            Self::is_custom_ident(&snapshot.next_wp_ident),
        )
    }

    pub(super) fn is_custom_ident(ident: &str) -> bool {
        let first_token = ident.split_whitespace().next().unwrap_or("");
        SYNTHETIC_PREFIXES.iter().any(|p| ident.starts_with(p))
            || first_token.len() > 5
            || !CHARTED_IDENT.is_match(first_token)
    }

    fn poi_distance_nm(&self, snapshot: &TelemetrySnapshot) -> Option<f64> {
        self.poi.nearest_nm(snapshot.position).map(|(d, _)| d)
    }
}
