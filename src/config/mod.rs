//! Command line options and the validated runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::led::{DEFAULT_ADDRESS, DEFAULT_BUS};
use crate::stat::PROC_STAT;

/// Show CPU utilization as lit rings on a PiGlow LED board
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// CPU poll period (in milliseconds)
    #[arg(long, env = "CPU_GLOW_PERIOD", default_value_t = 200)]
    pub period: u64,

    /// LED brightness (fraction of max brightness, 0 to 1.0)
    #[arg(long, env = "CPU_GLOW_BRIGHTNESS", default_value_t = 0.02, allow_negative_numbers = true)]
    pub brightness: f64,

    /// I2C bus number the board is attached to (/dev/i2c-N)
    #[arg(long, env = "CPU_GLOW_I2C_BUS", default_value_t = DEFAULT_BUS)]
    pub i2c_bus: u8,

    /// I2C address of the LED controller
    #[arg(long, env = "CPU_GLOW_I2C_ADDRESS", default_value_t = DEFAULT_ADDRESS, value_parser = parse_address)]
    pub i2c_address: u16,

    /// CPU accounting file
    #[arg(long, env = "CPU_GLOW_STAT_PATH", default_value = PROC_STAT)]
    pub stat_path: PathBuf,

    /// Seconds to wait before exiting when no board is found
    #[arg(long, env = "CPU_GLOW_ABSENT_DELAY", default_value_t = 10)]
    pub absent_delay: u64,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, env = "CPU_GLOW_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Print one JSON line per sample on stdout
    #[arg(long, env = "CPU_GLOW_REPORT")]
    pub report: bool,
}

fn parse_address(raw: &str) -> std::result::Result<u16, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => raw.parse::<u16>(),
    };
    match parsed {
        Ok(address) if address <= 0x7f => Ok(address),
        Ok(address) => Err(format!("0x{:x} is not a 7-bit I2C address", address)),
        Err(_) => Err(format!("invalid I2C address {:?}", raw)),
    }
}

/// Validated, immutable runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub period: Duration,
    pub brightness: f64,
    pub i2c_bus: u8,
    pub i2c_address: u16,
    pub stat_path: PathBuf,
    pub absent_delay: Duration,
    pub report: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<Config> {
        if !(0.0..=1.0).contains(&self.brightness) {
            return Err(Error::Brightness(self.brightness));
        }
        if self.period == 0 {
            return Err(Error::Period);
        }

        Ok(Config {
            period: Duration::from_millis(self.period),
            brightness: self.brightness,
            i2c_bus: self.i2c_bus,
            i2c_address: self.i2c_address,
            stat_path: self.stat_path,
            absent_delay: Duration::from_secs(self.absent_delay),
            report: self.report,
        })
    }
}
