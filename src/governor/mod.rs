//! The closed control loop: derived flight metrics feed a bank of safety
//! predicates whose reduced verdict the actuator walks the live rate toward.

mod actuator;
mod discriminator;
mod history;
mod metrics;

#[cfg(test)]
mod tests;

pub use actuator::RateActuator;
pub use discriminator::{Discriminator, Verdict};
pub use history::RateCeilingHistory;
pub use metrics::{FlightMetrics, WaypointClearance};
