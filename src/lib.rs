//! Shows aggregate CPU utilization as lit rings on a PiGlow-style LED board.
//!
//! [`stat`] turns two `/proc/stat` snapshots into a utilization ratio,
//! [`render`] maps a ratio onto six concentric rings and [`daemon`] drives
//! both from a timer until asked to stop.

pub mod config;
pub mod daemon;
pub mod error;
pub mod led;
pub mod monitor;
pub mod render;
pub mod report;
pub mod stat;

pub use error::{Error, Result};
