use std::collections::VecDeque;
use std::io;

use super::{CpuSnapshot, StatSource};
use crate::error::{Error, Result};

/// Replays a fixed sequence of snapshots, used to drive the loop in tests.
///
/// Once the script runs dry every further read fails like a vanished
/// `/proc/stat` would.
#[derive(Debug, Default)]
pub struct ScriptedStat {
    script: VecDeque<Option<CpuSnapshot>>,
    reads: usize,
}

impl ScriptedStat {
    pub fn new(snapshots: impl IntoIterator<Item = CpuSnapshot>) -> Self {
        Self {
            script: snapshots.into_iter().map(Some).collect(),
            reads: 0,
        }
    }

    /// Queues a read failure after the snapshots already scripted.
    pub fn then_fail(mut self) -> Self {
        self.script.push_back(None);
        self
    }

    #[cfg(test)]
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl StatSource for ScriptedStat {
    fn read(&mut self) -> Result<CpuSnapshot> {
        self.reads += 1;
        match self.script.pop_front() {
            Some(Some(snapshot)) => Ok(snapshot),
            _ => Err(Error::StatRead {
                path: "scripted".into(),
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_in_order_then_fails() {
        let first = CpuSnapshot { user: 1, ..Default::default() };
        let second = CpuSnapshot { user: 2, ..Default::default() };
        let mut source = ScriptedStat::new([first, second]).then_fail();

        assert_eq!(source.read().unwrap(), first);
        assert_eq!(source.read().unwrap(), second);
        assert!(source.read().is_err());
        assert!(source.read().is_err());
        assert_eq!(source.reads(), 4);
    }
}
