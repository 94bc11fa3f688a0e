use super::value::TelemetryValue;
use crate::error::GovernorError;
use async_trait::async_trait;
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Named telemetry variables the governor reads each cycle.
///
/// The display form is the transport-side variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SimVar {
    GpsWpPrevId,
    GpsWpPrevLat,
    GpsWpPrevLon,
    GpsWpPrevValid,
    GpsPositionLat,
    GpsPositionLon,
    GpsWpNextId,
    GpsWpNextLat,
    GpsWpNextLon,
    GpsWpNextAlt,
    GpsFlightPlanWpIndex,
    GpsFlightPlanWpCount,
    GpsEte,
    GpsGroundSpeed,
    PlanePitchDegrees,
    PlaneBankDegrees,
    PlaneHeadingDegreesMagnetic,
    PlaneAltAboveGround,
    IndicatedAltitude,
    VerticalSpeed,
    AutopilotMaster,
    AutopilotNav1Lock,
    AutopilotApproachHold,
    FlapsHandlePercent,
    LightLanding,
    SimulationRate,
}

impl SimVar {
    /// Identifier variables arrive as byte buffers and decode to text.
    pub fn is_textual(self) -> bool {
        matches!(self, SimVar::GpsWpPrevId | SimVar::GpsWpNextId)
    }
}

/// Fire-and-forget named actions on the command sink. Effects are only
/// observable through a subsequent read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum SimCommand {
    #[strum(serialize = "SIM_RATE_INCR")]
    RateIncrease,
    #[strum(serialize = "SIM_RATE_DECR")]
    RateDecrease,
    #[strum(serialize = "PAUSE_ON")]
    Pause,
    #[strum(serialize = "PAUSE_OFF")]
    Unpause,
    #[strum(serialize = "BAROMETRIC")]
    BarometerSet,
    #[strum(serialize = "HEADING_BUG_INC")]
    HeadingBugNudge,
}

/// Read side of the transport: a named-variable port with nullable results
/// and unbounded latency. `Ok(None)` means the variable did not resolve this
/// attempt; [`GovernorError::ConnectionLost`] means the handle died.
#[async_trait]
pub trait TelemetryPort: Send {
    async fn read(&mut self, var: SimVar) -> Result<Option<TelemetryValue>, GovernorError>;
}

/// Write side of the transport.
#[async_trait]
pub trait CommandSink: Send {
    async fn send(&mut self, command: SimCommand) -> Result<(), GovernorError>;
}

/// The full transport handle. Exclusively owned by the cycle loop: the
/// transport is documented as unsafe under concurrent or rapid access.
pub trait SimPort: TelemetryPort + CommandSink {}

impl<T: TelemetryPort + CommandSink> SimPort for T {}

#[cfg(test)]
mod tests {
    use super::{SimCommand, SimVar};
    use std::str::FromStr;

    #[test]
    fn sim_var_names_match_transport_convention() {
        assert_eq!(SimVar::GpsWpPrevLat.to_string(), "GPS_WP_PREV_LAT");
        assert_eq!(SimVar::PlaneAltAboveGround.to_string(), "PLANE_ALT_ABOVE_GROUND");
        assert_eq!(SimVar::from_str("SIMULATION_RATE").unwrap(), SimVar::SimulationRate);
    }

    #[test]
    fn command_names_match_transport_events() {
        assert_eq!(SimCommand::RateIncrease.to_string(), "SIM_RATE_INCR");
        assert_eq!(SimCommand::BarometerSet.to_string(), "BAROMETRIC");
    }

    #[test]
    fn only_ident_vars_are_textual() {
        assert!(SimVar::GpsWpNextId.is_textual());
        assert!(!SimVar::VerticalSpeed.is_textual());
    }
}
