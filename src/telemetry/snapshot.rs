use super::backoff::AdaptiveBackoff;
use super::port::{SimVar, TelemetryPort};
use crate::config::GovernorConfig;
use crate::error::GovernorError;

/// Point-in-time telemetry, replaced wholesale each cycle.
///
/// Every field passed through the adaptive-backoff read before the snapshot
/// was considered complete; a field that never resolved fails the whole
/// refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub prev_wp_ident: String,
    pub next_wp_ident: String,
    /// Previous fix `(lat, lon)` in degrees.
    pub prev_wp: (f64, f64),
    /// Next fix `(lat, lon)` in degrees.
    pub next_wp: (f64, f64),
    /// Current position `(lat, lon)` in degrees.
    pub position: (f64, f64),
    /// Next fix altitude in meters, as delivered by the transport.
    pub next_wp_alt_m: f64,
    pub prev_wp_valid: bool,
    pub wp_index: u32,
    pub wp_count: u32,
    pub pitch_rad: f64,
    pub bank_rad: f64,
    pub heading_rad: f64,
    pub vsi_fpm: f64,
    pub agl_ft: f64,
    pub alt_indicated_ft: f64,
    /// Ground speed in meters per second.
    pub ground_speed_mps: f64,
    /// Estimated time en route in seconds.
    pub ete_s: f64,
    pub ap_master: bool,
    pub nav_lock: bool,
    pub approach_hold: bool,
    pub flaps_percent: f64,
    pub landing_lights: bool,
    /// Live simulation rate as last reported by the transport.
    pub sim_rate: f64,
}

impl TelemetrySnapshot {
    /// Ground elevation under the vehicle in feet.
    pub fn ground_elevation_ft(&self) -> f64 {
        self.alt_indicated_ft - self.agl_ft
    }

    /// Flight plan sanity: a valid previous fix, a non-empty plan, and an
    /// index that has not run past the plan.
    pub fn flight_plan_valid(&self) -> bool {
        self.prev_wp_valid && self.wp_count > 0 && self.wp_index <= self.wp_count
    }

    /// Is the FMS targeting the final leg? Waypoint indices skip, so the
    /// last leg reports `count - 1` rather than `count`.
    pub fn is_last_leg(&self) -> bool {
        self.wp_index + 1 >= self.wp_count
    }
}

/// Resolves full snapshots through a [`TelemetryPort`], pacing retries with
/// [`AdaptiveBackoff`]. The backoff state persists across cycles.
pub struct SnapshotReader {
    backoff: AdaptiveBackoff,
    retry_budget: u32,
    retry_notes: Vec<String>,
}

impl SnapshotReader {
    pub fn new(config: &GovernorConfig) -> Self {
        Self {
            backoff: AdaptiveBackoff::new(
                config.backoff_min_ms,
                config.backoff_max_ms,
                config.backoff_growth_ms,
                config.backoff_decrement_ms,
            ),
            retry_budget: config.read_retry_budget,
            retry_notes: Vec::new(),
        }
    }

    /// Retry warnings accumulated during the most recent refresh.
    pub fn retry_notes(&self) -> &[String] {
        &self.retry_notes
    }

    /// Reads every variable of a cycle's snapshot. Loading the whole set in
    /// one pass (rather than on demand) keeps the request pattern regular,
    /// which the transport tolerates far better than bursts.
    ///
    /// # Errors
    /// [`GovernorError::TelemetryUnavailable`] when a field stays null past
    /// its retry budget, [`GovernorError::ConnectionLost`] when the handle
    /// dies mid-refresh.
    pub async fn refresh(
        &mut self,
        port: &mut dyn TelemetryPort,
    ) -> Result<TelemetrySnapshot, GovernorError> {
        self.retry_notes.clear();
        Ok(TelemetrySnapshot {
            prev_wp_ident: self.read_text(port, SimVar::GpsWpPrevId).await?,
            next_wp_ident: self.read_text(port, SimVar::GpsWpNextId).await?,
            prev_wp: (
                self.read_number(port, SimVar::GpsWpPrevLat).await?,
                self.read_number(port, SimVar::GpsWpPrevLon).await?,
            ),
            next_wp: (
                self.read_number(port, SimVar::GpsWpNextLat).await?,
                self.read_number(port, SimVar::GpsWpNextLon).await?,
            ),
            position: (
                self.read_number(port, SimVar::GpsPositionLat).await?,
                self.read_number(port, SimVar::GpsPositionLon).await?,
            ),
            next_wp_alt_m: self.read_number(port, SimVar::GpsWpNextAlt).await?,
            prev_wp_valid: self.read_flag(port, SimVar::GpsWpPrevValid).await?,
            wp_index: self.read_number(port, SimVar::GpsFlightPlanWpIndex).await?.max(0.0) as u32,
            wp_count: self.read_number(port, SimVar::GpsFlightPlanWpCount).await?.max(0.0) as u32,
            pitch_rad: self.read_number(port, SimVar::PlanePitchDegrees).await?,
            bank_rad: self.read_number(port, SimVar::PlaneBankDegrees).await?,
            heading_rad: self.read_number(port, SimVar::PlaneHeadingDegreesMagnetic).await?,
            vsi_fpm: self.read_number(port, SimVar::VerticalSpeed).await?,
            agl_ft: self.read_number(port, SimVar::PlaneAltAboveGround).await?,
            alt_indicated_ft: self.read_number(port, SimVar::IndicatedAltitude).await?,
            ground_speed_mps: self.read_number(port, SimVar::GpsGroundSpeed).await?,
            ete_s: self.read_number(port, SimVar::GpsEte).await?,
            ap_master: self.read_flag(port, SimVar::AutopilotMaster).await?,
            nav_lock: self.read_flag(port, SimVar::AutopilotNav1Lock).await?,
            approach_hold: self.read_flag(port, SimVar::AutopilotApproachHold).await?,
            flaps_percent: self.read_number(port, SimVar::FlapsHandlePercent).await?,
            landing_lights: self.read_flag(port, SimVar::LightLanding).await?,
            sim_rate: self.read_number(port, SimVar::SimulationRate).await?,
        })
    }

    async fn read_resolved(
        &mut self,
        port: &mut dyn TelemetryPort,
        var: SimVar,
    ) -> Result<super::value::TelemetryValue, GovernorError> {
        for attempt in 0..=self.retry_budget {
            if let Some(value) = port.read(var).await? {
                self.backoff.on_hit();
                if attempt > 0 {
                    self.retry_notes.push(format!("Retried {var} {attempt} times."));
                }
                return Ok(value);
            }
            tokio::time::sleep(self.backoff.on_miss()).await;
        }
        Err(GovernorError::TelemetryUnavailable(var.to_string()))
    }

    async fn read_number(
        &mut self,
        port: &mut dyn TelemetryPort,
        var: SimVar,
    ) -> Result<f64, GovernorError> {
        self.read_resolved(port, var)
            .await?
            .as_number()
            .ok_or_else(|| GovernorError::TelemetryUnavailable(var.to_string()))
    }

    async fn read_flag(
        &mut self,
        port: &mut dyn TelemetryPort,
        var: SimVar,
    ) -> Result<bool, GovernorError> {
        Ok(self.read_number(port, var).await? != 0.0)
    }

    async fn read_text(
        &mut self,
        port: &mut dyn TelemetryPort,
        var: SimVar,
    ) -> Result<String, GovernorError> {
        self.read_resolved(port, var)
            .await?
            .as_text()
            .map(String::from)
            .ok_or_else(|| GovernorError::TelemetryUnavailable(var.to_string()))
    }
}
