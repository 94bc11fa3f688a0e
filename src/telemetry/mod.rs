pub mod backoff;
pub mod port;
pub mod replay;
pub mod snapshot;
pub mod value;

pub use port::{CommandSink, SimCommand, SimPort, SimVar, TelemetryPort};
pub use snapshot::{SnapshotReader, TelemetrySnapshot};
pub use value::TelemetryValue;
