pub mod geo;
pub mod math;
pub mod sample_window;
