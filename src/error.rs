use strum_macros::Display;

/// Error taxonomy of the governor core.
///
/// `TelemetryUnavailable` and `Geometry` are converted into a forced-minimum
/// verdict at the discriminator boundary and never abort the cycle loop.
/// `ConnectionLost` propagates to the session layer, which tears down all
/// session-scoped state and re-enters the reconnect sequence.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum GovernorError {
    #[strum(to_string = "telemetry variable {0} never resolved within its retry budget")]
    TelemetryUnavailable(String),
    #[strum(to_string = "degenerate geometry: {0}")]
    Geometry(String),
    #[strum(to_string = "telemetry transport handle invalidated")]
    ConnectionLost,
}

impl std::error::Error for GovernorError {}
