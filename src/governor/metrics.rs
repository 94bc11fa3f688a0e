use crate::common::geo;
use crate::common::math::{FEET_PER_NM, METERS_TO_FEET, MPS_TO_NMPS, rate_steps};
use crate::config::GovernorConfig;
use crate::error::GovernorError;
use crate::telemetry::TelemetrySnapshot;

/// Synthetic identifier the FMS emits for the initial-climb fix.
pub const IDENT_INITIAL_CLIMB: &str = "TIMECLB";
/// Synthetic identifier for missed-approach / vectors legs.
pub const IDENT_VECTORS: &str = "VECTORS";

/// Great-circle distances from the current position to the adjacent
/// flight-plan fixes, in nm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointClearance {
    pub prev: f64,
    pub next: f64,
}

/// Flight-mechanics quantities derived once per cycle from the raw
/// snapshot. Everything the discriminator's predicates consume lives here;
/// the predicates themselves stay side-effect-free.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightMetrics {
    pub clearance: WaypointClearance,
    /// Ground speed in nautical miles per second.
    pub ground_speed_nmps: f64,
    pub ground_elevation_ft: f64,
    /// Next target altitude after synthetic-fix and VNAV flooring.
    pub next_wp_alt_ft: f64,
    /// Altitude delta to the next target, dead-banded to zero inside the
    /// configured tolerance.
    pub target_altitude_change_ft: f64,
    /// Vertical speed needed to hit the target by the next transition
    /// point, signed; 0 on degenerate geometry.
    pub required_fpm: f64,
    /// Vertical speed the configured climb/descent angle would produce at
    /// the current ground speed, signed like the altitude change.
    pub target_fpm: f64,
    pub chosen_angle_deg: f64,
    /// Along-track length of the flight-level change, nm.
    pub flc_length_nm: f64,
    pub distance_to_flc_nm: f64,
    pub time_to_flc_s: f64,
    pub distance_to_destination_nm: f64,
    /// Dynamic minimum safe cruise altitude, ft AGL.
    pub min_agl_cruise_ft: f64,
    /// Display-only bearing to the next fix, degrees.
    pub bearing_to_next_deg: f64,
}

impl FlightMetrics {
    /// Derives the cycle's metrics.
    ///
    /// # Errors
    /// [`GovernorError::Geometry`] on degenerate coordinates; callers treat
    /// this as "no safe data this cycle."
    pub fn derive(
        snapshot: &TelemetrySnapshot,
        config: &GovernorConfig,
    ) -> Result<Self, GovernorError> {
        let clearance = WaypointClearance {
            prev: geo::great_circle_nm(snapshot.position, snapshot.prev_wp)?,
            next: geo::great_circle_nm(snapshot.position, snapshot.next_wp)?,
        };
        let bearing_to_next_deg = geo::initial_bearing_deg(snapshot.position, snapshot.next_wp)?;
        let ground_speed_nmps = snapshot.ground_speed_mps * MPS_TO_NMPS;
        let ground_elevation_ft = snapshot.ground_elevation_ft();
        let next_wp_alt_ft = next_waypoint_altitude(snapshot, config);

        let raw_change = next_wp_alt_ft - snapshot.alt_indicated_ft;
        let target_altitude_change_ft =
            if raw_change.abs() < config.altitude_change_tolerance_ft { 0.0 } else { raw_change };

        let chosen_angle_deg = if target_altitude_change_ft > 0.0 {
            config.angle_of_climb
        } else {
            config.degrees_of_descent
        };

        let gs_fpm = ground_speed_nmps * 60.0 * FEET_PER_NM;
        let required_fpm = required_fpm(gs_fpm, target_altitude_change_ft, clearance.next);
        let target_fpm = if target_altitude_change_ft == 0.0 {
            0.0
        } else {
            gs_fpm * chosen_angle_deg.to_radians().sin() * target_altitude_change_ft.signum()
        };

        // Solve the descent/climb triangle for the along-track distance the
        // level change needs at the chosen angle.
        let flc_length_nm = if target_altitude_change_ft == 0.0 {
            0.0
        } else {
            (target_altitude_change_ft / chosen_angle_deg.to_radians().tan()).abs() / FEET_PER_NM
        };
        let distance_to_flc_nm = if target_altitude_change_ft == 0.0 {
            clearance.next
        } else {
            clearance.next - flc_length_nm
        };
        let time_to_flc_s = if ground_speed_nmps <= 0.0 {
            0.0
        } else {
            (distance_to_flc_nm / ground_speed_nmps).max(0.0)
        };

        Ok(Self {
            clearance,
            ground_speed_nmps,
            ground_elevation_ft,
            next_wp_alt_ft,
            target_altitude_change_ft,
            required_fpm,
            target_fpm,
            chosen_angle_deg,
            flc_length_nm,
            distance_to_flc_nm,
            time_to_flc_s,
            distance_to_destination_nm: ground_speed_nmps * snapshot.ete_s.max(0.0),
            min_agl_cruise_ft: min_agl_cruise(snapshot.vsi_fpm, target_fpm, config),
            bearing_to_next_deg,
        })
    }
}

/// Next target altitude in feet. Synthetic fixes resolve against ground
/// elevation; targets are assumed to sit on the ground when VNAV guidance
/// is off or the coded altitude is implausibly low (uncoded fixes read as
/// zero-ish, and an eventual landing is the only sane target then).
fn next_waypoint_altitude(snapshot: &TelemetrySnapshot, config: &GovernorConfig) -> f64 {
    let ground = snapshot.ground_elevation_ft();
    let mut alt = snapshot.next_wp_alt_m * METERS_TO_FEET;
    if snapshot.next_wp_ident == IDENT_INITIAL_CLIMB {
        alt = ground + config.min_agl_cruise_ft;
    } else if snapshot.next_wp_ident == IDENT_VECTORS {
        alt = ground;
    }
    if !config.waypoint_vnav || alt < ground + config.waypoint_minimum_agl_ft {
        alt = ground;
    }
    alt
}

/// Vertical speed needed to reach the target altitude by the next
/// transition point: the right triangle over the remaining distance.
/// Arcsine domain violations and zero distance both collapse to 0.
fn required_fpm(gs_fpm: f64, altitude_change_ft: f64, next_clearance_nm: f64) -> f64 {
    let distance_ft = next_clearance_nm * FEET_PER_NM;
    if distance_ft <= 0.0 {
        return 0.0;
    }
    let ratio = altitude_change_ft / distance_ft;
    if ratio.abs() > 1.0 {
        return 0.0;
    }
    gs_fpm * ratio.asin()
}

/// Dynamic minimum safe cruise altitude: the configured base, widened (when
/// protection is on) to the altitude lost while halving all the way down
/// from `max_rate` at the more aggressive of target and actual vertical
/// speed. Faster cruise rates demand more ground clearance.
fn min_agl_cruise(vsi_fpm: f64, target_fpm: f64, config: &GovernorConfig) -> f64 {
    if !config.min_agl_protection {
        return config.min_agl_cruise_ft;
    }
    let worst_fpm = if target_fpm.abs() > vsi_fpm.abs() { target_fpm } else { vsi_fpm };
    let steps = f64::from(rate_steps(config.max_rate, 1));
    let decel_loss_ft = worst_fpm.abs() / 60.0 * steps * config.cycle_seconds();
    config.min_agl_cruise_ft.max(decel_loss_ft)
}
