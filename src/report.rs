//! `--report` output: one JSON line per sample.

use std::io::{self, Write};

use crate::daemon::Sample;

/// Writes one JSON object per line.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn emit(&mut self, sample: &Sample) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, sample)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_object_per_line() {
        let mut buf = Vec::new();
        let mut reporter = Reporter::new(&mut buf);
        reporter.emit(&Sample { tick: 1, utilization: 0.5, lit_rings: 3, intensity: 5 }).unwrap();
        reporter.emit(&Sample { tick: 2, utilization: 0.0, lit_rings: 0, intensity: 5 }).unwrap();
        drop(reporter);

        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["tick"], 1);
        assert_eq!(first["lit_rings"], 3);
        assert_eq!(first["intensity"], 5);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["tick"], 2);
        assert_eq!(second["utilization"], 0.0);
    }
}
