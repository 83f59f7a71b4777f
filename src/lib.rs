//! Refine Sim - Monte Carlo simulator for the equipment refine gacha
//!
//! Simulates repeated refine attempts with a ramping success rate and an
//! energy gauge that forces success once full, then bins the attempt counts
//! of many runs into a chart-ready histogram.

pub mod config;
pub mod error;
pub mod histogram;
pub mod materials;
pub mod probability;
pub mod simulation;
pub mod stats;

pub use config::*;
pub use error::*;
pub use histogram::*;
pub use materials::*;
pub use probability::*;
pub use simulation::*;
pub use stats::*;
