#![allow(dead_code, clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod logger;

mod common;
mod config;
mod console;
mod error;
mod governor;
mod poi;
mod system;
mod telemetry;

use crate::config::{ConfigUpdate, GovernorConfig};
use crate::console::DiagnosticsPanel;
use crate::error::GovernorError;
use crate::governor::{Discriminator, FlightMetrics, RateActuator};
use crate::poi::PoiStore;
use crate::system::{GpuMemoryProbe, IdleLoadProbe, LoadProbe};
use crate::telemetry::replay::ReplayPort;
use crate::telemetry::{SimVar, SnapshotReader, TelemetryPort};
use std::env;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

/// Replay script path; without it the binary idles on a canned cruise frame.
const REPLAY_ENV: &str = "GOVERNOR_REPLAY";
/// Optional JSON threshold-bundle override.
const CONFIG_ENV: &str = "GOVERNOR_CONFIG";
/// Optional JSON point-of-interest file.
const POI_ENV: &str = "GOVERNOR_POI";
/// Set to sample GPU memory pressure instead of the idle probe.
const GPU_PROBE_ENV: &str = "GOVERNOR_GPU_PROBE";

const DIAGNOSTIC_BUDGET: usize = 8;
const RECONNECT_BASE: Duration = Duration::from_secs(2);
const RECONNECT_CAP: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperatorCommand {
    SetMaxRate(u32),
    SetCautiousRate(u32),
    SetPauseAtTod(bool),
    Resume,
    Quit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = load_config();
    if let Err(e) = config.validate() {
        fatal!("Invalid configuration: {e}");
    }

    let (command_tx, command_rx) = mpsc::channel::<OperatorCommand>(8);
    tokio::spawn(operator_console(command_tx.clone()));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = command_tx.send(OperatorCommand::Quit).await;
        }
    });

    let mut probe: Box<dyn LoadProbe> = if env::var(GPU_PROBE_ENV).is_ok() {
        Box::new(GpuMemoryProbe)
    } else {
        Box::new(IdleLoadProbe)
    };
    run_sessions(config, command_rx, probe.as_mut()).await;
    info!("Governor stopped.");
}

/// Outer session loop. Each connected session owns fresh decision state; a
/// lost connection tears it all down and retries with a capped linear
/// back-off.
async fn run_sessions(
    mut config: GovernorConfig,
    mut commands: mpsc::Receiver<OperatorCommand>,
    probe: &mut dyn LoadProbe,
) {
    let panel = DiagnosticsPanel::new(DIAGNOSTIC_BUDGET);
    let mut failures: u32 = 0;
    loop {
        let mut port = match open_port() {
            Ok(port) => port,
            Err(e) => {
                error!("Cannot open telemetry port: {e}");
                return;
            }
        };
        let mut reader = SnapshotReader::new(&config);
        let mut bank = Discriminator::new(load_poi());
        let mut actuator = RateActuator::new();
        info!("Session started (config v{}).", config.version());

        let end = run_session(
            &mut port,
            &mut reader,
            &mut bank,
            &mut actuator,
            &mut config,
            &mut commands,
            probe,
            &panel,
        )
        .await;
        match end {
            SessionEnd::Quit => {
                if let Err(e) = actuator.wind_down(&mut port, &config).await {
                    error!("Wind-down failed: {e}");
                }
                return;
            }
            SessionEnd::ConnectionLost => {
                // The dead handle cannot take the wind-down commands; the
                // next session starts from whatever rate the sim kept.
                failures += 1;
                let delay = (RECONNECT_BASE * failures).min(RECONNECT_CAP);
                warn!("Telemetry connection lost, reconnecting in {}s.", delay.as_secs());
                tokio::time::sleep(delay).await;
            }
        }
    }
}

enum SessionEnd {
    Quit,
    ConnectionLost,
}

#[allow(clippy::too_many_arguments)]
async fn run_session(
    port: &mut ReplayPort,
    reader: &mut SnapshotReader,
    bank: &mut Discriminator,
    actuator: &mut RateActuator,
    config: &mut GovernorConfig,
    commands: &mut mpsc::Receiver<OperatorCommand>,
    probe: &mut dyn LoadProbe,
    panel: &DiagnosticsPanel,
) -> SessionEnd {
    loop {
        match run_cycle(port, reader, bank, actuator, probe, panel, config).await {
            Ok(()) => {}
            Err(GovernorError::ConnectionLost) => return SessionEnd::ConnectionLost,
            Err(e) => error!("Cycle failed: {e}"),
        }

        while let Ok(command) = commands.try_recv() {
            match command {
                OperatorCommand::Quit => return SessionEnd::Quit,
                OperatorCommand::Resume => {
                    if let Err(e) = actuator.resume(port).await {
                        error!("Resume failed: {e}");
                    }
                }
                OperatorCommand::SetMaxRate(rate) => apply(config, ConfigUpdate::MaxRate(rate)),
                OperatorCommand::SetCautiousRate(rate) => {
                    apply(config, ConfigUpdate::CautiousRate(rate));
                }
                OperatorCommand::SetPauseAtTod(pause) => {
                    apply(config, ConfigUpdate::PauseAtTod(pause));
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(config.cycle_ms)).await;
    }
}

/// One governor cycle: refresh, derive, discriminate, actuate, render.
async fn run_cycle(
    port: &mut ReplayPort,
    reader: &mut SnapshotReader,
    bank: &mut Discriminator,
    actuator: &mut RateActuator,
    probe: &mut dyn LoadProbe,
    panel: &DiagnosticsPanel,
    config: &GovernorConfig,
) -> Result<(), GovernorError> {
    let (verdict, live_rate, ete_s, metrics) = match reader.refresh(port).await {
        Ok(snapshot) => {
            let metrics = FlightMetrics::derive(&snapshot, config);
            let load = probe.sample();
            let verdict = bank.evaluate(&snapshot, metrics.as_ref(), load, config);
            (verdict, snapshot.sim_rate, snapshot.ete_s, metrics.ok())
        }
        Err(GovernorError::ConnectionLost) => return Err(GovernorError::ConnectionLost),
        Err(e) => {
            let live = match port.read(SimVar::SimulationRate).await? {
                Some(value) => value.as_number().unwrap_or(1.0),
                None => f64::from(actuator.commanded()),
            };
            (bank.degraded(&e, config), live, 0.0, None)
        }
    };

    actuator.update(port, &verdict, live_rate).await?;
    event!(
        "verdict raw={} smoothed={} commanded={}",
        verdict.raw_ceiling,
        verdict.ceiling,
        actuator.commanded()
    );

    let mut messages = verdict.diagnostics;
    messages.extend_from_slice(reader.retry_notes());
    panel.render(live_rate, verdict.ceiling, ete_s, metrics.as_ref(), &messages);
    Ok(())
}

fn apply(config: &mut GovernorConfig, update: ConfigUpdate) {
    match config.reconfigure(update) {
        Ok(()) => info!("Reconfigured: {update} (v{}).", config.version()),
        Err(e) => error!("Rejected {update}: {e}"),
    }
}

/// Reads operator commands from stdin, one per line.
async fn operator_console(commands: mpsc::Sender<OperatorCommand>) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_command(&line) {
            Some(command) => {
                if commands.send(command).await.is_err() {
                    return;
                }
            }
            None => {
                if !line.trim().is_empty() {
                    warn!("Unknown command: {line}");
                }
            }
        }
    }
}

fn parse_command(line: &str) -> Option<OperatorCommand> {
    let mut tokens = line.split_whitespace();
    let command = match (tokens.next()?, tokens.next()) {
        ("quit" | "q", None) => OperatorCommand::Quit,
        ("resume" | "r", None) => OperatorCommand::Resume,
        ("max", Some(rate)) => OperatorCommand::SetMaxRate(rate.parse().ok()?),
        ("cautious", Some(rate)) => OperatorCommand::SetCautiousRate(rate.parse().ok()?),
        ("tod", Some("on")) => OperatorCommand::SetPauseAtTod(true),
        ("tod", Some("off")) => OperatorCommand::SetPauseAtTod(false),
        _ => return None,
    };
    if tokens.next().is_some() {
        return None;
    }
    Some(command)
}

fn load_config() -> GovernorConfig {
    let Ok(path) = env::var(CONFIG_ENV) else {
        return GovernorConfig::default().normalized();
    };
    match std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str::<GovernorConfig>(&raw).map_err(|e| e.to_string()))
    {
        Ok(config) => {
            info!("Configuration loaded from {path}.");
            config.normalized()
        }
        Err(e) => {
            warn!("Cannot load {path} ({e}), using defaults.");
            GovernorConfig::default().normalized()
        }
    }
}

fn load_poi() -> PoiStore {
    let Ok(path) = env::var(POI_ENV) else {
        return PoiStore::from_points(Vec::new());
    };
    match PoiStore::load(Path::new(&path)) {
        Ok(store) => {
            info!("Loaded {} points of interest.", store.len());
            store
        }
        Err(e) => {
            warn!("Cannot load points of interest: {e}");
            PoiStore::from_points(Vec::new())
        }
    }
}

fn open_port() -> Result<ReplayPort, Box<dyn std::error::Error>> {
    match env::var(REPLAY_ENV) {
        Ok(path) => {
            info!("Replaying telemetry from {path}.");
            Ok(ReplayPort::from_script_file(Path::new(&path))?)
        }
        Err(_) => {
            warn!("{REPLAY_ENV} not set, idling on a canned cruise frame.");
            Ok(ReplayPort::single_frame(ReplayPort::cruise_frame()))
        }
    }
}
