//! Tactical motif detection
//!
//! Ray motifs (pins, skewers, x-rays, discovered attacks, batteries) come
//! from one walk over every slider; point motifs have their own detectors.

mod detector;
pub mod forks;
pub mod king;
pub mod material;
pub mod rays;
mod types;

pub use detector::analyze_tactics;
pub use types::*;
