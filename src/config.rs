use strum_macros::Display;

#[derive(Debug, Clone, PartialEq, Display)]
pub enum ConfigError {
    #[strum(to_string = "rate {0} is not a power of two")]
    RateNotPowerOfTwo(u32),
    #[strum(to_string = "rates must satisfy min <= cautious <= max, got {0}/{1}/{2}")]
    RateOrdering(u32, u32, u32),
    #[strum(to_string = "{0} must lie in (0, 1]")]
    UnitIntervalBound(&'static str),
    #[strum(to_string = "{0} must be positive")]
    NonPositive(&'static str),
}

impl std::error::Error for ConfigError {}

/// The threshold bundle the discriminator and actuator run against.
///
/// Immutable for the duration of a cycle. A small subset (`max_rate`,
/// `cautious_rate`, `pause_at_tod`) can be hot-swapped between cycles via
/// [`GovernorConfig::reconfigure`]; every applied change bumps `version` so
/// downstream consumers can tell which bundle produced a verdict.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Rates are simulation time-compression factors, powers of two.
    pub min_rate: u32,
    pub cautious_rate: u32,
    pub max_rate: u32,

    /// Vertical speed band in feet per minute.
    pub min_vsi: f64,
    pub max_vsi: f64,
    pub max_pitch_deg: f64,
    pub max_bank_deg: f64,

    /// Proximity buffer around flight-plan fixes, in seconds of travel.
    pub waypoint_buffer_s: f64,
    pub minimum_waypoint_distance_nm: f64,
    pub custom_waypoint_distance_nm: f64,

    pub min_agl_cruise_ft: f64,
    pub min_agl_descent_ft: f64,
    pub min_approach_time_min: f64,
    pub waypoint_minimum_agl_ft: f64,
    pub altitude_change_tolerance_ft: f64,

    pub degrees_of_descent: f64,
    pub angle_of_climb: f64,
    pub descent_safety_factor: f64,
    pub decel_for_climb: bool,

    pub nav_guarded: bool,
    pub approach_hold_guarded: bool,
    pub ete_guarded: bool,
    pub check_cruise_configuration: bool,
    pub min_agl_protection: bool,
    pub waypoint_vnav: bool,
    pub pause_at_tod: bool,

    /// External resource-contention signal limit, fraction in (0, 1].
    pub resource_load_limit: f64,

    /// Turbulence thresholds over the rolling sample windows.
    pub heading_turbulence_deg: f64,
    pub vsi_turbulence_fpm: f64,

    /// Point-of-interest proximity thresholds in nm.
    pub poi_near_nm: f64,
    pub poi_far_nm: f64,

    /// Adaptive-backoff bounds for telemetry reads.
    pub read_retry_budget: u32,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_growth_ms: u64,
    pub backoff_decrement_ms: u64,

    /// Inter-cycle quantum in milliseconds.
    pub cycle_ms: u64,

    #[serde(skip)]
    version: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            min_rate: 1,
            cautious_rate: 2,
            max_rate: 16,
            min_vsi: -2000.0,
            max_vsi: 2000.0,
            max_pitch_deg: 10.0,
            max_bank_deg: 20.0,
            waypoint_buffer_s: 40.0,
            minimum_waypoint_distance_nm: 1.0,
            custom_waypoint_distance_nm: 10.0,
            min_agl_cruise_ft: 1000.0,
            min_agl_descent_ft: 3000.0,
            min_approach_time_min: 7.0,
            waypoint_minimum_agl_ft: 500.0,
            altitude_change_tolerance_ft: 100.0,
            degrees_of_descent: 3.0,
            angle_of_climb: 3.0,
            descent_safety_factor: 1.0,
            decel_for_climb: true,
            nav_guarded: true,
            approach_hold_guarded: true,
            ete_guarded: true,
            check_cruise_configuration: true,
            min_agl_protection: true,
            waypoint_vnav: true,
            pause_at_tod: false,
            resource_load_limit: 0.95,
            heading_turbulence_deg: 3.0,
            vsi_turbulence_fpm: 950.0,
            poi_near_nm: 3.0,
            poi_far_nm: 7.0,
            read_retry_budget: 50,
            backoff_min_ms: 10,
            backoff_max_ms: 1000,
            backoff_growth_ms: 5,
            backoff_decrement_ms: 2,
            cycle_ms: 2000,
            version: 0,
        }
    }
}

/// The hot-swappable subset, applied between cycles only.
#[derive(Debug, Clone, Copy, PartialEq, Display)]
pub enum ConfigUpdate {
    #[strum(to_string = "max rate -> {0}")]
    MaxRate(u32),
    #[strum(to_string = "cautious rate -> {0}")]
    CautiousRate(u32),
    #[strum(to_string = "pause at TOD -> {0}")]
    PauseAtTod(bool),
}

impl GovernorConfig {
    /// # Errors
    /// Rejects non-power-of-two or misordered rates, out-of-range bounds,
    /// and non-positive geometry angles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for rate in [self.min_rate, self.cautious_rate, self.max_rate] {
            if !rate.is_power_of_two() {
                return Err(ConfigError::RateNotPowerOfTwo(rate));
            }
        }
        if !(self.min_rate <= self.cautious_rate && self.cautious_rate <= self.max_rate) {
            return Err(ConfigError::RateOrdering(self.min_rate, self.cautious_rate, self.max_rate));
        }
        if !(self.resource_load_limit > 0.0 && self.resource_load_limit <= 1.0) {
            return Err(ConfigError::UnitIntervalBound("resource_load_limit"));
        }
        if self.degrees_of_descent <= 0.0 || self.angle_of_climb <= 0.0 {
            return Err(ConfigError::NonPositive("descent/climb angle"));
        }
        if self.cycle_ms == 0 {
            return Err(ConfigError::NonPositive("cycle_ms"));
        }
        Ok(())
    }

    /// Pausing at TOD supersedes waypoint VNAV tracking; holding both on
    /// would re-arm a descent the governor just paused for.
    pub fn normalized(mut self) -> Self {
        if self.pause_at_tod {
            self.waypoint_vnav = false;
        }
        self
    }

    /// Applies one hot-swap update, validating before commit.
    ///
    /// # Errors
    /// The update is discarded and the current bundle kept when the result
    /// would not validate.
    pub fn reconfigure(&mut self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let mut next = self.clone();
        match update {
            ConfigUpdate::MaxRate(rate) => next.max_rate = rate,
            ConfigUpdate::CautiousRate(rate) => next.cautious_rate = rate,
            ConfigUpdate::PauseAtTod(pause) => next.pause_at_tod = pause,
        }
        next = next.normalized();
        next.validate()?;
        next.version = self.version + 1;
        *self = next;
        Ok(())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn cycle_seconds(&self) -> f64 {
        self.cycle_ms as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConfigUpdate, GovernorConfig};

    #[test]
    fn default_bundle_validates() {
        let config = GovernorConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.version(), 0);
    }

    #[test]
    fn rejects_non_power_of_two_and_misordered_rates() {
        let mut config = GovernorConfig::default();
        config.max_rate = 12;
        assert_eq!(config.validate(), Err(ConfigError::RateNotPowerOfTwo(12)));
        config.max_rate = 2;
        config.cautious_rate = 8;
        assert_eq!(config.validate(), Err(ConfigError::RateOrdering(1, 8, 2)));
    }

    #[test]
    fn reconfigure_applies_subset_and_bumps_version() {
        let mut config = GovernorConfig::default();
        config.reconfigure(ConfigUpdate::MaxRate(32)).unwrap();
        assert_eq!(config.max_rate, 32);
        assert_eq!(config.version(), 1);
        config.reconfigure(ConfigUpdate::PauseAtTod(true)).unwrap();
        assert_eq!(config.version(), 2);
        assert!(!config.waypoint_vnav, "pause at TOD forces VNAV off");
    }

    #[test]
    fn invalid_reconfigure_keeps_the_old_bundle() {
        let mut config = GovernorConfig::default();
        let err = config.reconfigure(ConfigUpdate::MaxRate(12)).unwrap_err();
        assert_eq!(err, ConfigError::RateNotPowerOfTwo(12));
        assert_eq!(config.max_rate, 16);
        assert_eq!(config.version(), 0);
    }
}
