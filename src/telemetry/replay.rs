use super::port::{CommandSink, SimCommand, SimVar, TelemetryPort};
use super::value::TelemetryValue;
use crate::error::GovernorError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use strum_macros::Display;

/// One recorded telemetry frame: transport variable name to value.
pub type Frame = HashMap<String, serde_json::Value>;

#[derive(Debug, Display)]
pub enum ReplayError {
    #[strum(to_string = "cannot read replay script: {0}")]
    Io(String),
    #[strum(to_string = "cannot parse replay script: {0}")]
    Parse(String),
}

impl std::error::Error for ReplayError {}

/// An in-process transport that replays recorded telemetry frames.
///
/// Stands in for the live transport during development and in tests. The
/// port advances one frame per snapshot refresh (keyed on the refresh's
/// leading variable) and keeps its own live simulation rate, so rate
/// commands have the same read-it-back-later observability as the real
/// sink. Variables absent from a frame read as null, which exercises the
/// adaptive-backoff path.
pub struct ReplayPort {
    frames: Vec<Frame>,
    cursor: usize,
    started: bool,
    sim_rate: f64,
    paused: bool,
    drop_counts: HashMap<String, u32>,
    swallow_rate_commands: bool,
    sent: Vec<SimCommand>,
}

impl ReplayPort {
    /// Leading variable of a refresh; serving it advances the frame cursor.
    const FRAME_MARKER: SimVar = SimVar::GpsWpPrevId;

    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            cursor: 0,
            started: false,
            sim_rate: 1.0,
            paused: false,
            drop_counts: HashMap::new(),
            swallow_rate_commands: false,
            sent: Vec::new(),
        }
    }

    pub fn single_frame(frame: Frame) -> Self {
        Self::new(vec![frame])
    }

    /// Loads a JSON array of frames recorded from a live session.
    pub fn from_script_file(path: &Path) -> Result<Self, ReplayError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ReplayError::Io(e.to_string()))?;
        let frames: Vec<Frame> =
            serde_json::from_str(&raw).map_err(|e| ReplayError::Parse(e.to_string()))?;
        Ok(Self::new(frames))
    }

    /// The next `count` reads of `var` resolve to null.
    pub fn drop_first_reads(&mut self, var: &str, count: u32) {
        self.drop_counts.insert(String::from(var), count);
    }

    /// Makes rate commands land without effect, as a miscalibrated live
    /// transport occasionally does.
    pub fn swallow_rate_commands(&mut self) {
        self.swallow_rate_commands = true;
    }

    pub fn live_rate(&self) -> f64 {
        self.sim_rate
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn sent_commands(&self) -> &[SimCommand] {
        &self.sent
    }

    fn current_frame(&self) -> Option<&Frame> {
        if self.frames.is_empty() {
            None
        } else {
            Some(&self.frames[self.cursor.min(self.frames.len() - 1)])
        }
    }

    /// A complete steady-cruise frame, the baseline for tests.
    pub fn cruise_frame() -> Frame {
        let mut frame = Frame::new();
        let numbers = [
            ("GPS_WP_PREV_LAT", 47.0),
            ("GPS_WP_PREV_LON", 10.0),
            ("GPS_WP_PREV_VALID", 1.0),
            ("GPS_POSITION_LAT", 47.0),
            ("GPS_POSITION_LON", 11.0),
            ("GPS_WP_NEXT_LAT", 47.0),
            ("GPS_WP_NEXT_LON", 12.0),
            ("GPS_WP_NEXT_ALT", 3048.0),
            ("GPS_FLIGHT_PLAN_WP_INDEX", 2.0),
            ("GPS_FLIGHT_PLAN_WP_COUNT", 6.0),
            ("GPS_ETE", 5400.0),
            ("GPS_GROUND_SPEED", 120.0),
            ("PLANE_PITCH_DEGREES", 0.01),
            ("PLANE_BANK_DEGREES", -0.01),
            ("PLANE_HEADING_DEGREES_MAGNETIC", 1.55),
            ("PLANE_ALT_ABOVE_GROUND", 9000.0),
            ("INDICATED_ALTITUDE", 10_000.0),
            ("VERTICAL_SPEED", 0.0),
            ("AUTOPILOT_MASTER", 1.0),
            ("AUTOPILOT_NAV1_LOCK", 1.0),
            ("AUTOPILOT_APPROACH_HOLD", 0.0),
            ("FLAPS_HANDLE_PERCENT", 0.0),
            ("LIGHT_LANDING", 0.0),
        ];
        for (name, value) in numbers {
            frame.insert(String::from(name), serde_json::json!(value));
        }
        frame.insert(String::from("GPS_WP_PREV_ID"), serde_json::json!("ROTAX"));
        frame.insert(String::from("GPS_WP_NEXT_ID"), serde_json::json!("KERAX"));
        frame
    }
}

#[async_trait]
impl TelemetryPort for ReplayPort {
    async fn read(&mut self, var: SimVar) -> Result<Option<TelemetryValue>, GovernorError> {
        let name = var.to_string();
        if let Some(remaining) = self.drop_counts.get_mut(&name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }
        if var == Self::FRAME_MARKER {
            if self.started && !self.frames.is_empty() {
                self.cursor = (self.cursor + 1).min(self.frames.len() - 1);
            }
            self.started = true;
        }
        if var == SimVar::SimulationRate {
            return Ok(Some(TelemetryValue::Number(self.sim_rate)));
        }
        let Some(frame) = self.current_frame() else {
            return Err(GovernorError::ConnectionLost);
        };
        Ok(match frame.get(&name) {
            Some(serde_json::Value::Number(n)) => n.as_f64().map(TelemetryValue::Number),
            Some(serde_json::Value::String(s)) => {
                Some(TelemetryValue::from_ident_bytes(s.as_bytes()))
            }
            _ => None,
        })
    }
}

#[async_trait]
impl CommandSink for ReplayPort {
    async fn send(&mut self, command: SimCommand) -> Result<(), GovernorError> {
        self.sent.push(command);
        match command {
            SimCommand::RateIncrease if !self.swallow_rate_commands => {
                self.sim_rate = (self.sim_rate * 2.0).min(128.0);
            }
            SimCommand::RateDecrease if !self.swallow_rate_commands => {
                self.sim_rate = (self.sim_rate / 2.0).max(1.0);
            }
            SimCommand::Pause => self.paused = true,
            SimCommand::Unpause => self.paused = false,
            // The corrective pair has no replayable effect.
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ReplayPort;
    use crate::telemetry::{CommandSink, SimCommand, SimVar, TelemetryPort};

    #[tokio::test]
    async fn advances_one_frame_per_refresh_marker() {
        let mut near = ReplayPort::cruise_frame();
        near.insert(String::from("GPS_POSITION_LON"), serde_json::json!(11.9));
        let mut port = ReplayPort::new(vec![ReplayPort::cruise_frame(), near]);
        let first = port.read(SimVar::GpsWpPrevId).await.unwrap();
        assert!(first.is_some());
        let lon = port.read(SimVar::GpsPositionLon).await.unwrap().unwrap();
        assert_eq!(lon.as_number(), Some(11.0));
        port.read(SimVar::GpsWpPrevId).await.unwrap();
        let lon = port.read(SimVar::GpsPositionLon).await.unwrap().unwrap();
        assert_eq!(lon.as_number(), Some(11.9));
        // Past the last frame the tail frame keeps replaying.
        port.read(SimVar::GpsWpPrevId).await.unwrap();
        assert!(port.read(SimVar::GpsPositionLon).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rate_commands_are_observable_via_readback() {
        let mut port = ReplayPort::single_frame(ReplayPort::cruise_frame());
        port.send(SimCommand::RateIncrease).await.unwrap();
        port.send(SimCommand::RateIncrease).await.unwrap();
        let rate = port.read(SimVar::SimulationRate).await.unwrap().unwrap();
        assert_eq!(rate.as_number(), Some(4.0));
        port.send(SimCommand::RateDecrease).await.unwrap();
        assert_eq!(port.live_rate(), 2.0);
    }

    #[tokio::test]
    async fn empty_script_reads_as_lost_connection() {
        let mut port = ReplayPort::new(Vec::new());
        let err = port.read(SimVar::GpsPositionLat).await.unwrap_err();
        assert_eq!(err, crate::error::GovernorError::ConnectionLost);
    }
}
