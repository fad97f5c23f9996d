//! Personal cellar: storage locations, bottles and their lifecycle, drink
//! logs and summary statistics.

pub mod manager;


pub use manager::{CellarManager, CellarSummary};
