use std::io;

use super::{LedSurface, RING_COUNT};
use crate::error::{Error, Result};

/// One call made against a [`RecordingSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedWrite {
    Ring { ring: usize, intensity: u8 },
    AllOff,
}

/// In-memory LED surface that records every write, used in tests.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    present: bool,
    rings: [u8; RING_COUNT],
    writes: Vec<LedWrite>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            present: true,
            rings: [0; RING_COUNT],
            writes: Vec::new(),
        }
    }

    /// A surface whose presence check fails.
    pub fn absent() -> Self {
        Self { present: false, ..Self::new() }
    }

    /// Current intensity of every ring.
    pub fn rings(&self) -> [u8; RING_COUNT] {
        self.rings
    }

    pub fn writes(&self) -> &[LedWrite] {
        &self.writes
    }

    pub fn all_off_count(&self) -> usize {
        self.writes.iter().filter(|w| **w == LedWrite::AllOff).count()
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl LedSurface for RecordingSurface {
    fn is_present(&mut self) -> bool {
        self.present
    }

    fn set_ring(&mut self, ring: usize, intensity: u8) -> Result<()> {
        let slot = self.rings.get_mut(ring).ok_or_else(|| {
            Error::Peripheral(io::Error::new(io::ErrorKind::InvalidInput, format!("no ring {}", ring)))
        })?;
        *slot = intensity;
        self.writes.push(LedWrite::Ring { ring, intensity });
        Ok(())
    }

    fn all_off(&mut self) -> Result<()> {
        self.rings = [0; RING_COUNT];
        self.writes.push(LedWrite::AllOff);
        Ok(())
    }
}
