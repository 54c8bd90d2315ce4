//! LED output surface.

pub mod fake;
mod piglow;

pub use piglow::{Bus, PiGlow, DEFAULT_ADDRESS, DEFAULT_BUS};

use crate::error::Result;

/// Number of concentric ring groups on the board.
pub const RING_COUNT: usize = 6;

/// Capability interface to the LED peripheral.
pub trait LedSurface {
    /// Checks that the hardware answers. Consulted once at startup.
    fn is_present(&mut self) -> bool;

    /// Sets every LED of `ring` to `intensity`.
    fn set_ring(&mut self, ring: usize, intensity: u8) -> Result<()>;

    /// Turns every LED off and puts the controller to sleep.
    fn all_off(&mut self) -> Result<()>;
}
