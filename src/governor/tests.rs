use super::discriminator::{Discriminator, Verdict};
use super::metrics::FlightMetrics;
use super::RateActuator;
use crate::config::GovernorConfig;
use crate::poi::{PointOfInterest, PoiStore};
use crate::telemetry::replay::ReplayPort;
use crate::telemetry::snapshot::tests::cruise_snapshot;
use crate::telemetry::{SimCommand, TelemetrySnapshot};
use rand::{rng, Rng};

fn discriminator() -> Discriminator {
    Discriminator::new(PoiStore::from_points(Vec::new()))
}

fn verdict_for(
    snapshot: &TelemetrySnapshot,
    bank: &mut Discriminator,
    config: &GovernorConfig,
) -> Verdict {
    let metrics = FlightMetrics::derive(snapshot, config);
    bank.evaluate(snapshot, metrics.as_ref(), 0.0, config)
}

fn poi_at(lat: f64, lon: f64) -> PoiStore {
    PoiStore::from_points(vec![PointOfInterest {
        name: String::from("Neuschwanstein"),
        category: String::from("castle"),
        lat,
        lon,
    }])
}

#[test]
fn stable_cruise_clears_the_full_ceiling() {
    let config = GovernorConfig::default();
    let snapshot = cruise_snapshot();
    let mut bank = discriminator();
    let verdict = verdict_for(&snapshot, &mut bank, &config);
    assert_eq!(verdict.raw_ceiling, config.max_rate);
    assert_eq!(verdict.ceiling, config.max_rate);
    assert!(!verdict.pause_at_tod);
    assert!(verdict.diagnostics.contains(&String::from("Flight stable.")));
}

#[test]
fn forced_minimum_dominates_cautious_caps() {
    let config = GovernorConfig::default();
    let mut snapshot = cruise_snapshot();
    snapshot.ap_master = false;
    snapshot.pitch_rad = 0.35;
    let mut bank = discriminator();
    let verdict = verdict_for(&snapshot, &mut bank, &config);
    assert_eq!(verdict.raw_ceiling, config.min_rate);
    assert!(verdict.diagnostics.contains(&String::from("AP not active.")));
}

#[test]
fn aggressive_angles_cap_at_the_cautious_rate() {
    let config = GovernorConfig::default();
    let mut snapshot = cruise_snapshot();
    snapshot.bank_rad = 0.6;
    let mut bank = discriminator();
    let verdict = verdict_for(&snapshot, &mut bank, &config);
    assert_eq!(verdict.raw_ceiling, config.cautious_rate);
}

#[test]
fn waypoint_ident_classification() {
    for charted in ["KJFK", "EDDF", "KERAX"] {
        assert!(!Discriminator::is_custom_ident(charted), "{charted}");
    }
    for custom in ["USR01", "HOLD1", "kjfk", "TIMECLB"] {
        assert!(Discriminator::is_custom_ident(custom), "{custom}");
    }
}

#[test]
fn vsi_scatter_caps_at_the_cautious_rate() {
    let config = GovernorConfig::default();
    let mut bank = discriminator();
    let snapshot = cruise_snapshot();
    verdict_for(&snapshot, &mut bank, &config);
    let mut bumpy = cruise_snapshot();
    bumpy.vsi_fpm = 1000.0;
    let verdict = verdict_for(&bumpy, &mut bank, &config);
    assert_eq!(verdict.raw_ceiling, config.cautious_rate);
    assert!(verdict.diagnostics.iter().any(|m| m.starts_with("VSI turbulence")));
}

#[test]
fn heading_scatter_caps_at_the_cautious_rate() {
    let config = GovernorConfig::default();
    let mut bank = discriminator();
    let snapshot = cruise_snapshot();
    verdict_for(&snapshot, &mut bank, &config);
    let mut swinging = cruise_snapshot();
    swinging.heading_rad += 0.2;
    let verdict = verdict_for(&swinging, &mut bank, &config);
    assert_eq!(verdict.raw_ceiling, config.cautious_rate);
    assert!(verdict.diagnostics.iter().any(|m| m.starts_with("Heading turbulence")));
}

#[test]
fn ceiling_stays_in_bounds_for_randomized_telemetry() {
    let config = GovernorConfig::default();
    let mut bank = discriminator();
    let mut rng = rng();
    for _ in 0..300 {
        let mut snapshot = cruise_snapshot();
        snapshot.pitch_rad = rng.random_range(-0.8..0.8);
        snapshot.bank_rad = rng.random_range(-1.2..1.2);
        snapshot.heading_rad = rng.random_range(0.0..std::f64::consts::TAU);
        snapshot.vsi_fpm = rng.random_range(-6000.0..6000.0);
        snapshot.agl_ft = rng.random_range(0.0..20_000.0);
        snapshot.ete_s = rng.random_range(0.0..7200.0);
        snapshot.ap_master = rng.random_bool(0.8);
        snapshot.nav_lock = rng.random_bool(0.8);
        snapshot.approach_hold = rng.random_bool(0.1);
        snapshot.flaps_percent = rng.random_range(0.0..100.0);
        if rng.random_bool(0.05) {
            snapshot.position.0 = f64::NAN;
        }
        let load = rng.random_range(0.0..1.2);
        let metrics = FlightMetrics::derive(&snapshot, &config);
        let verdict = bank.evaluate(&snapshot, metrics.as_ref(), load, &config);
        assert!(verdict.ceiling >= config.min_rate && verdict.ceiling <= config.max_rate);
        assert!(verdict.raw_ceiling >= config.min_rate && verdict.raw_ceiling <= config.max_rate);
        assert!(verdict.ceiling <= verdict.raw_ceiling);
        assert!(!verdict.diagnostics.is_empty());
    }
}

#[test]
fn outage_floors_the_smoothed_ceiling_for_a_full_window() {
    let config = GovernorConfig::default();
    let snapshot = cruise_snapshot();
    let mut bank = discriminator();
    assert_eq!(verdict_for(&snapshot, &mut bank, &config).ceiling, config.max_rate);
    let outage = bank.degraded(&crate::error::GovernorError::ConnectionLost, &config);
    assert_eq!(outage.ceiling, config.min_rate);
    for _ in 0..9 {
        let verdict = verdict_for(&snapshot, &mut bank, &config);
        assert_eq!(verdict.raw_ceiling, config.max_rate);
        assert_eq!(verdict.ceiling, config.min_rate);
    }
    // Tenth clean cycle evicts the outage verdict from the window.
    assert_eq!(verdict_for(&snapshot, &mut bank, &config).ceiling, config.max_rate);
}

#[test]
fn tod_pause_fires_exactly_once_per_session() {
    let mut config = GovernorConfig::default();
    config.pause_at_tod = true;
    config.waypoint_vnav = false;
    config.descent_safety_factor = 60.0;
    let snapshot = cruise_snapshot();
    let mut bank = discriminator();
    let first = verdict_for(&snapshot, &mut bank, &config);
    assert!(first.pause_at_tod);
    assert!(bank.tod_latched());
    let second = verdict_for(&snapshot, &mut bank, &config);
    assert!(!second.pause_at_tod);
    assert_eq!(second.raw_ceiling, config.cautious_rate);
}

#[test]
fn poi_proximity_tiers() {
    let config = GovernorConfig::default();
    let snapshot = cruise_snapshot();

    // Roughly four nautical miles abeam: cautious tier.
    let mut far = Discriminator::new(poi_at(47.0, 11.1));
    assert_eq!(verdict_for(&snapshot, &mut far, &config).raw_ceiling, config.cautious_rate);

    // Under a mile: forced minimum.
    let mut near = Discriminator::new(poi_at(47.0, 11.02));
    assert_eq!(verdict_for(&snapshot, &mut near, &config).raw_ceiling, config.min_rate);
}

#[test]
fn resource_overload_forces_minimum() {
    let config = GovernorConfig::default();
    let snapshot = cruise_snapshot();
    let mut bank = discriminator();
    let metrics = FlightMetrics::derive(&snapshot, &config);
    let verdict = bank.evaluate(&snapshot, metrics.as_ref(), 0.99, &config);
    assert_eq!(verdict.raw_ceiling, config.min_rate);
}

fn clear_verdict(ceiling: u32) -> Verdict {
    Verdict { ceiling, raw_ceiling: ceiling, pause_at_tod: false, diagnostics: Vec::new() }
}

#[tokio::test]
async fn actuator_converges_one_doubling_per_cycle() {
    let mut port = ReplayPort::single_frame(ReplayPort::cruise_frame());
    let mut actuator = RateActuator::new();
    let verdict = clear_verdict(16);
    for expected in [2.0, 4.0, 8.0, 16.0] {
        let live = port.live_rate();
        actuator.update(&mut port, &verdict, live).await.unwrap();
        assert_eq!(port.live_rate(), expected);
    }
    // Every rate command is chased by the barometer and heading-bug pair.
    for chunk in port.sent_commands().chunks(3) {
        assert_eq!(chunk, [
            SimCommand::RateIncrease,
            SimCommand::BarometerSet,
            SimCommand::HeadingBugNudge
        ]);
    }
    // At the ceiling the actuator goes quiet.
    let live = port.live_rate();
    let sent = port.sent_commands().len();
    actuator.update(&mut port, &verdict, live).await.unwrap();
    assert_eq!(port.sent_commands().len(), sent);
}

#[tokio::test]
async fn actuator_halves_toward_a_lowered_ceiling() {
    let mut port = ReplayPort::single_frame(ReplayPort::cruise_frame());
    for _ in 0..4 {
        use crate::telemetry::CommandSink;
        port.send(SimCommand::RateIncrease).await.unwrap();
    }
    assert_eq!(port.live_rate(), 16.0);
    let mut actuator = RateActuator::new();
    let verdict = clear_verdict(4);
    let live = port.live_rate();
    actuator.update(&mut port, &verdict, live).await.unwrap();
    assert_eq!(port.live_rate(), 8.0);
    let live = port.live_rate();
    actuator.update(&mut port, &verdict, live).await.unwrap();
    assert_eq!(port.live_rate(), 4.0);
}

#[tokio::test]
async fn swallowed_rate_commands_do_not_runaway() {
    let mut port = ReplayPort::single_frame(ReplayPort::cruise_frame());
    port.swallow_rate_commands();
    let mut actuator = RateActuator::new();
    let verdict = clear_verdict(16);
    for _ in 0..3 {
        let live = port.live_rate();
        actuator.update(&mut port, &verdict, live).await.unwrap();
    }
    assert_eq!(port.live_rate(), 1.0);
    assert_eq!(actuator.commanded(), 2);
}

#[tokio::test]
async fn pause_latch_and_resume() {
    let mut port = ReplayPort::single_frame(ReplayPort::cruise_frame());
    let mut actuator = RateActuator::new();
    let mut verdict = clear_verdict(1);
    verdict.pause_at_tod = true;
    actuator.update(&mut port, &verdict, 1.0).await.unwrap();
    assert!(port.is_paused());
    assert!(actuator.is_paused());
    // While paused the actuator sends nothing, whatever the verdict says.
    let sent = port.sent_commands().len();
    actuator.update(&mut port, &clear_verdict(16), 1.0).await.unwrap();
    assert_eq!(port.sent_commands().len(), sent);
    actuator.resume(&mut port).await.unwrap();
    assert!(!port.is_paused());
    assert!(!actuator.is_paused());
}

#[tokio::test]
async fn wind_down_leaves_the_sim_unpaused_at_minimum() {
    let config = GovernorConfig::default();
    let mut port = ReplayPort::single_frame(ReplayPort::cruise_frame());
    {
        use crate::telemetry::CommandSink;
        for _ in 0..4 {
            port.send(SimCommand::RateIncrease).await.unwrap();
        }
        port.send(SimCommand::Pause).await.unwrap();
    }
    let mut actuator = RateActuator::new();
    let mut verdict = clear_verdict(1);
    verdict.pause_at_tod = true;
    let live = port.live_rate();
    actuator.update(&mut port, &verdict, live).await.unwrap();
    actuator.wind_down(&mut port, &config).await.unwrap();
    assert_eq!(port.live_rate(), 1.0);
    assert!(!port.is_paused());
}

#[tokio::test]
async fn wind_down_covers_an_externally_raised_rate() {
    let config = GovernorConfig::default();
    let mut port = ReplayPort::single_frame(ReplayPort::cruise_frame());
    {
        use crate::telemetry::CommandSink;
        // Something outside the loop pushed the rate well past the
        // configured maximum of 16.
        for _ in 0..7 {
            port.send(SimCommand::RateIncrease).await.unwrap();
        }
    }
    assert_eq!(port.live_rate(), 128.0);
    let mut actuator = RateActuator::new();
    actuator.wind_down(&mut port, &config).await.unwrap();
    assert_eq!(port.live_rate(), 1.0);
    assert!(!port.is_paused());
}
