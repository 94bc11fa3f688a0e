/// One meter per second expressed in nautical miles per second.
pub const MPS_TO_NMPS: f64 = 5.4e-4;
/// Feet per nautical mile.
pub const FEET_PER_NM: f64 = 6076.118;
/// Feet per meter.
pub const METERS_TO_FEET: f64 = 3.280_84;

/// Number of halving operations (plus a safety margin) needed to bring
/// `rate` down to 1: `max(ceil(log2(rate)), 0) + margin`.
///
/// Used throughout the discriminator to scale distance and altitude buffers
/// proportionally to how fast the simulation currently runs.
pub fn rate_steps(rate: u32, safety_margin: u32) -> u32 {
    let ceil_log2 = if rate <= 1 { 0 } else { u32::BITS - (rate - 1).leading_zeros() };
    ceil_log2 + safety_margin
}

/// Rounds a live (possibly fractional) rate reading to the nearest
/// power-of-two step the actuator can command.
pub fn nearest_rate_step(live: f64) -> u32 {
    if !live.is_finite() || live < 1.0 {
        return 1;
    }
    let rounded = live.round_ties_even() as u32;
    if rounded.is_power_of_two() {
        rounded
    } else {
        let below = 1 << (u32::BITS - 1 - rounded.leading_zeros());
        let above = below << 1;
        if rounded - below <= above - rounded { below } else { above }
    }
}

#[cfg(test)]
mod tests {
    use super::{nearest_rate_step, rate_steps};

    #[test]
    fn rate_steps_matches_halving_counts() {
        assert_eq!(rate_steps(1, 1), 1);
        assert_eq!(rate_steps(2, 1), 2);
        assert_eq!(rate_steps(4, 1), 3);
        assert_eq!(rate_steps(8, 1), 4);
        assert_eq!(rate_steps(16, 1), 5);
        assert_eq!(rate_steps(16, 0), 4);
    }

    #[test]
    fn nearest_step_snaps_to_powers_of_two() {
        assert_eq!(nearest_rate_step(1.0), 1);
        assert_eq!(nearest_rate_step(0.25), 1);
        assert_eq!(nearest_rate_step(3.0), 2);
        assert_eq!(nearest_rate_step(4.9), 4);
        assert_eq!(nearest_rate_step(11.0), 8);
        assert_eq!(nearest_rate_step(13.0), 16);
        assert_eq!(nearest_rate_step(f64::NAN), 1);
    }
}
