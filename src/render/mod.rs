//! Maps a utilization ratio onto the six LED rings.

use crate::error::Result;
use crate::led::{LedSurface, RING_COUNT};

/// Round half up: `floor(x + 0.5)`.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// 8-bit intensity for a brightness fraction in `[0.0, 1.0]`.
pub fn brightness_byte(brightness: f64) -> u8 {
    round_half_up(brightness * 255.0).clamp(0.0, 255.0) as u8
}

/// How many rings a utilization ratio lights, `0..=6`.
///
/// Six steps rather than five keeps an all-dark state for an idle CPU
/// distinct from "one ring lit". Non-finite input lights nothing.
pub fn lit_ring_count(utilization: f64) -> usize {
    if !utilization.is_finite() {
        return 0;
    }
    round_half_up(utilization * RING_COUNT as f64).clamp(0.0, RING_COUNT as f64) as usize
}

/// Intensity of every ring for a utilization and brightness. Rings fill
/// from the highest index down.
pub fn ring_states(utilization: f64, brightness: f64) -> [u8; RING_COUNT] {
    let intensity = brightness_byte(brightness);
    let threshold = RING_COUNT - lit_ring_count(utilization);

    let mut rings = [0u8; RING_COUNT];
    for (ring, state) in rings.iter_mut().enumerate() {
        if ring >= threshold {
            *state = intensity;
        }
    }
    rings
}

/// Writes all six rings to the surface and returns what was written.
pub fn render<L: LedSurface + ?Sized>(surface: &mut L, utilization: f64, brightness: f64) -> Result<[u8; RING_COUNT]> {
    let rings = ring_states(utilization, brightness);
    for (ring, intensity) in rings.iter().enumerate() {
        surface.set_ring(ring, *intensity)?;
    }
    Ok(rings)
}
