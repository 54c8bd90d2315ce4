//! PiGlow board: one SN3218 18-channel PWM controller on the I2C bus.

use std::io;

use rppal::i2c::I2c;
use tracing::debug;

use super::{LedSurface, RING_COUNT};
use crate::error::{Error, Result};

pub const DEFAULT_BUS: u8 = 1;
pub const DEFAULT_ADDRESS: u16 = 0x54;

const LED_COUNT: usize = 18;

// SN3218 registers
const REG_SHUTDOWN: u8 = 0x00;
const REG_PWM: u8 = 0x01;
const REG_LED_CONTROL: u8 = 0x13;
const REG_UPDATE: u8 = 0x16;

/// LED channels per ring, one per leg. Ring 0 is the outer (red) ring,
/// ring 5 the inner (white) one.
const RINGS: [[usize; 3]; RING_COUNT] = [
    [6, 17, 0],
    [7, 16, 1],
    [8, 15, 2],
    [5, 13, 3],
    [4, 11, 14],
    [9, 10, 12],
];

/// One I2C transaction per packet: register followed by its data.
pub trait Bus {
    fn send(&mut self, packet: &[u8]) -> io::Result<()>;
}

fn bus_error(err: rppal::i2c::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

impl Bus for I2c {
    fn send(&mut self, packet: &[u8]) -> io::Result<()> {
        let written = self.write(packet).map_err(bus_error)?;
        if written != packet.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short I2C write: {} of {} bytes", written, packet.len()),
            ));
        }
        Ok(())
    }
}

/// PiGlow driver. Keeps a shadow of all 18 PWM values and pushes the whole
/// frame on every change.
pub struct PiGlow<B: Bus = I2c> {
    bus: B,
    frame: [u8; LED_COUNT],
}

impl PiGlow<I2c> {
    /// Opens `/dev/i2c-<bus>` and binds it to the controller address.
    pub fn open(bus: u8, address: u16) -> io::Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(bus_error)?;
        i2c.set_slave_address(address).map_err(bus_error)?;
        Ok(Self::with_bus(i2c))
    }
}

impl<B: Bus> PiGlow<B> {
    pub fn with_bus(bus: B) -> Self {
        Self { bus, frame: [0; LED_COUNT] }
    }

    fn command(&mut self, packet: &[u8]) -> io::Result<()> {
        self.bus.send(packet)
    }

    /// Wakes the controller, enables every channel and blanks the frame.
    fn wake(&mut self) -> io::Result<()> {
        self.command(&[REG_SHUTDOWN, 0x01])?;
        self.command(&[REG_LED_CONTROL, 0x3f, 0x3f, 0x3f])?;
        self.frame = [0; LED_COUNT];
        self.push_frame()
    }

    fn push_frame(&mut self) -> io::Result<()> {
        let mut packet = [0u8; LED_COUNT + 1];
        packet[0] = REG_PWM;
        packet[1..].copy_from_slice(&self.frame);
        self.command(&packet)?;
        self.command(&[REG_UPDATE, 0xff])
    }
}

impl<B: Bus> LedSurface for PiGlow<B> {
    fn is_present(&mut self) -> bool {
        match self.wake() {
            Ok(()) => true,
            Err(err) => {
                debug!("PiGlow presence check failed: {}", err);
                false
            }
        }
    }

    fn set_ring(&mut self, ring: usize, intensity: u8) -> Result<()> {
        let leds = RINGS.get(ring).ok_or_else(|| {
            Error::Peripheral(io::Error::new(io::ErrorKind::InvalidInput, format!("no ring {}", ring)))
        })?;
        for &led in leds {
            self.frame[led] = intensity;
        }
        self.push_frame()?;
        Ok(())
    }

    fn all_off(&mut self) -> Result<()> {
        self.frame = [0; LED_COUNT];
        self.push_frame()?;
        self.command(&[REG_SHUTDOWN, 0x00])?;
        Ok(())
    }
}
