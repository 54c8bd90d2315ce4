//! Reads the aggregate CPU line of `/proc/stat` and turns snapshot pairs
//! into a utilization ratio.

pub mod scripted;

use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

pub const PROC_STAT: &str = "/proc/stat";

/// MARK: CPU time snapshot
/**!
Only the aggregate line starting with `cpu ` is used. Every column is a
cumulative tick count since boot:
    * user:    time spent in user mode
    * nice:    time spent in user mode with low priority
    * system:  time spent in kernel mode
    * idle:    time spent idle, excluding I/O wait
    * iowait:  time waiting for I/O to complete
    * irq:     time servicing hardware interrupts
    * softirq: time servicing soft interrupts

Steal and guest columns are ignored.
 */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub io_wait: u64,
    pub irq: u64,
    pub soft_irq: u64,
}

impl CpuSnapshot {
    // Sums saturate: the counters come from a user-selectable file.
    pub fn busy_ticks(&self) -> u64 {
        [self.nice, self.system, self.irq, self.soft_irq]
            .iter()
            .fold(self.user, |sum, ticks| sum.saturating_add(*ticks))
    }

    pub fn idle_ticks(&self) -> u64 {
        self.idle.saturating_add(self.io_wait)
    }

    pub fn total_ticks(&self) -> u64 {
        self.busy_ticks().saturating_add(self.idle_ticks())
    }

    /// Parses the aggregate `cpu ` line out of a `/proc/stat` dump.
    pub fn parse(contents: &str) -> std::result::Result<Self, String> {
        let cpu_line = contents
            .lines()
            .find(|line| line.starts_with("cpu "))
            .ok_or_else(|| String::from("no aggregate `cpu` line"))?;

        let fields: Vec<&str> = cpu_line.split_whitespace().skip(1).collect();
        let field = |index: usize, name: &str, required: bool| -> std::result::Result<u64, String> {
            match fields.get(index) {
                Some(raw) => raw.parse::<u64>().map_err(|_| format!("{} is not a tick count: {:?}", name, raw)),
                None if required => Err(format!("missing {} column", name)),
                // iowait, irq and softirq are absent on very old kernels
                None => Ok(0),
            }
        };

        Ok(CpuSnapshot {
            user: field(0, "user", true)?,
            nice: field(1, "nice", true)?,
            system: field(2, "system", true)?,
            idle: field(3, "idle", true)?,
            io_wait: field(4, "iowait", false)?,
            irq: field(5, "irq", false)?,
            soft_irq: field(6, "softirq", false)?,
        })
    }
}

/// Source of cumulative CPU counters.
pub trait StatSource {
    fn read(&mut self) -> Result<CpuSnapshot>;
}

/// Reads snapshots from `/proc/stat` (or a file with the same layout).
#[derive(Debug, Clone)]
pub struct ProcStat {
    path: PathBuf,
}

impl ProcStat {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for ProcStat {
    fn default() -> Self {
        Self::new(PROC_STAT)
    }
}

impl StatSource for ProcStat {
    fn read(&mut self) -> Result<CpuSnapshot> {
        let contents = fs::read_to_string(&self.path).map_err(|source| Error::StatRead {
            path: self.path.clone(),
            source,
        })?;

        CpuSnapshot::parse(&contents).map_err(|reason| Error::StatParse {
            path: self.path.clone(),
            reason,
        })
    }
}

/// Fraction of ticks between two snapshots that were not idle.
///
/// Counters that went backwards count as zero elapsed ticks. When no ticks
/// elapsed at all the CPU is reported as idle. The result is clamped to
/// `[0.0, 1.0]`.
pub fn compute_utilization(previous: &CpuSnapshot, current: &CpuSnapshot) -> f64 {
    let delta_idle = current.idle_ticks().saturating_sub(previous.idle_ticks());
    let delta_total = current.total_ticks().saturating_sub(previous.total_ticks());

    if delta_total == 0 {
        return 0.0;
    }

    let percent_idle = delta_idle as f64 / delta_total as f64;
    (1.0 - percent_idle).clamp(0.0, 1.0)
}
