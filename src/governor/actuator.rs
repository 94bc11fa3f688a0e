use super::discriminator::Verdict;
use crate::common::math::{nearest_rate_step, rate_steps};
use crate::config::GovernorConfig;
use crate::error::GovernorError;
use crate::telemetry::{SimCommand, SimPort, SimVar};
use crate::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActuatorMode {
    Running,
    Paused,
}

/// Drives the live simulation rate toward the verdict's ceiling, one
/// power-of-two step per cycle. Rate changes go through relative
/// increment/decrement commands, so the actuator re-reads the live rate
/// every cycle instead of trusting its own bookkeeping.
pub struct RateActuator {
    mode: ActuatorMode,
    commanded: u32,
}

impl RateActuator {
    pub fn new() -> Self {
        Self { mode: ActuatorMode::Running, commanded: 1 }
    }

    pub fn is_paused(&self) -> bool {
        self.mode == ActuatorMode::Paused
    }

    /// The rate the last issued command should have produced.
    pub fn commanded(&self) -> u32 {
        self.commanded
    }

    /// One actuation cycle: at most one rate step toward the ceiling, then
    /// the pause latch if the verdict requests it. While paused no rate
    /// commands are sent.
    pub async fn update(
        &mut self,
        port: &mut dyn SimPort,
        verdict: &Verdict,
        live_rate: f64,
    ) -> Result<(), GovernorError> {
        if self.mode == ActuatorMode::Paused {
            return Ok(());
        }
        let current = nearest_rate_step(live_rate);
        let target = verdict.ceiling;
        if current < target {
            self.step(port, SimCommand::RateIncrease, current * 2).await?;
        } else if current > target {
            self.step(port, SimCommand::RateDecrease, (current / 2).max(1)).await?;
        } else {
            self.commanded = current;
        }
        if verdict.pause_at_tod {
            info!("Pausing simulation at top of descent.");
            port.send(SimCommand::Pause).await?;
            self.mode = ActuatorMode::Paused;
        }
        Ok(())
    }

    /// Clears the pause latch on operator request.
    pub async fn resume(&mut self, port: &mut dyn SimPort) -> Result<(), GovernorError> {
        if self.mode == ActuatorMode::Paused {
            port.send(SimCommand::Unpause).await?;
            self.mode = ActuatorMode::Running;
            info!("Simulation resumed.");
        }
        Ok(())
    }

    /// Exit contract: leave the simulator unpaused at the minimum rate.
    /// Bounded by the halving cascade from the live rate (or the configured
    /// maximum, whichever is higher) plus margin so a wedged transport
    /// cannot hang shutdown. The live rate can sit above the maximum when
    /// something outside the loop raised it.
    pub async fn wind_down(
        &mut self,
        port: &mut dyn SimPort,
        config: &GovernorConfig,
    ) -> Result<(), GovernorError> {
        let live = match port.read(SimVar::SimulationRate).await? {
            Some(value) => value.as_number().unwrap_or(f64::from(self.commanded)),
            None => f64::from(self.commanded),
        };
        let attempts = rate_steps(nearest_rate_step(live).max(config.max_rate), 2);
        for _ in 0..attempts {
            let live = match port.read(SimVar::SimulationRate).await? {
                Some(value) => value.as_number().unwrap_or(1.0),
                None => break,
            };
            if nearest_rate_step(live) <= config.min_rate {
                break;
            }
            self.step(port, SimCommand::RateDecrease, config.min_rate).await?;
        }
        if self.mode == ActuatorMode::Paused {
            port.send(SimCommand::Unpause).await?;
            self.mode = ActuatorMode::Running;
        }
        self.commanded = config.min_rate;
        info!("Simulation rate wound down.");
        Ok(())
    }

    /// Sends one rate command plus the corrective pair, then verifies the
    /// result with a single non-blocking readback.
    async fn step(
        &mut self,
        port: &mut dyn SimPort,
        command: SimCommand,
        expected: u32,
    ) -> Result<(), GovernorError> {
        port.send(command).await?;
        // Rate switches glitch the indicated altitude and jog the heading
        // bug; resetting both right after masks the transient.
        port.send(SimCommand::BarometerSet).await?;
        port.send(SimCommand::HeadingBugNudge).await?;
        self.commanded = expected;
        if let Some(value) = port.read(SimVar::SimulationRate).await? {
            if let Some(live) = value.as_number() {
                if nearest_rate_step(live) != expected {
                    warn!("Rate readback {live:.1} does not match commanded {expected}.");
                }
            }
        }
        Ok(())
    }
}

impl Default for RateActuator {
    fn default() -> Self {
        Self::new()
    }
}
