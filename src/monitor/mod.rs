//! Host summary gathered through sysinfo and procfs, logged once at startup.

use procfs::{Current, Meminfo};
use serde::{Deserialize, Serialize};
use sysinfo::{System, SystemExt};
use tracing::warn;

use crate::error::{Error, Result};

/// Host summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub os_type: String,        // OS name
    pub kernel_version: String, // kernel release
    pub os_version: String,     // distribution version
    pub host_name: String,      // host name
    pub physical_cores: u64,    // physical cores
    pub logical_cores: u64,     // logical cores, hyper-threads included
    pub mem_total: u64,         // physical memory in bytes
}

impl HostInfo {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub struct Monitor {
    sys: System,
}

impl Monitor {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    /// Collects what is available; lookups that fail are logged and left
    /// empty.
    pub fn host_info(&mut self) -> HostInfo {
        let mut info = HostInfo {
            os_type: self.sys.name().unwrap_or_default(),
            kernel_version: self.sys.kernel_version().unwrap_or_default(),
            os_version: self.sys.os_version().unwrap_or_default(),
            host_name: self.sys.host_name().unwrap_or_default(),
            ..Default::default()
        };

        match Self::cpu_cores() {
            Ok((physical, logical)) => {
                info.physical_cores = physical;
                info.logical_cores = logical;
            }
            Err(err) => warn!("cpu info unavailable: {}", err),
        }

        match Self::mem_total() {
            Ok(total) => info.mem_total = total,
            Err(err) => warn!("memory info unavailable: {}", err),
        }

        info
    }

    fn cpu_cores() -> Result<(u64, u64)> {
        let cpu_info = procfs::CpuInfo::current().map_err(|err| Error::convert_string(&err.to_string()))?;
        let physical = cpu_info
            .fields
            .get("cpu cores")
            .and_then(|cores| cores.parse::<u64>().ok())
            .unwrap_or(0);
        Ok((physical, cpu_info.num_cores() as u64))
    }

    fn mem_total() -> Result<u64> {
        let mem_info = Meminfo::current().map_err(|err| Error::convert_string(&err.to_string()))?;
        Ok(mem_info.mem_total)
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}
