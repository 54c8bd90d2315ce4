//! Sampling and rendering loop.
//!
//! A [`Gauge`] owns the stat source, the LED surface and the previous
//! snapshot. [`supervise`] runs it on its own task until a stop future
//! resolves, then hands the surface back for the final all-off write.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::led::LedSurface;
use crate::render::{self, brightness_byte, lit_ring_count};
use crate::stat::{compute_utilization, CpuSnapshot, StatSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub tick: u64,
    pub utilization: f64,
    pub lit_rings: usize,
    pub intensity: u8,
}

pub struct Gauge<S, L> {
    source: S,
    surface: L,
    previous: CpuSnapshot,
    brightness: f64,
    state: LoopState,
    ticks: u64,
}

impl<S: StatSource, L: LedSurface> Gauge<S, L> {
    /// Takes the initial snapshot that the first tick is measured against.
    pub fn start(mut source: S, surface: L, brightness: f64) -> Result<Self> {
        let previous = source.read()?;
        Ok(Self {
            source,
            surface,
            previous,
            brightness,
            state: LoopState::Idle,
            ticks: 0,
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn previous(&self) -> &CpuSnapshot {
        &self.previous
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn surface(&self) -> &L {
        &self.surface
    }

    /// Reads a fresh snapshot, renders the utilization since the previous
    /// one and keeps the fresh snapshot for the next tick.
    ///
    /// A failed read is returned as is; a failed LED write is logged and
    /// the tick still counts.
    pub fn tick(&mut self) -> Result<Sample> {
        let current = self.source.read()?;
        let utilization = compute_utilization(&self.previous, &current);
        self.previous = current;
        self.ticks += 1;

        if let Err(err) = render::render(&mut self.surface, utilization, self.brightness) {
            warn!("tick {}: {}", self.ticks, err);
        }

        let sample = Sample {
            tick: self.ticks,
            utilization,
            lit_rings: lit_ring_count(utilization),
            intensity: brightness_byte(self.brightness),
        };
        debug!(tick = sample.tick, utilization = sample.utilization, lit_rings = sample.lit_rings, "sampled");
        Ok(sample)
    }

    /// Ticks every `period` until `cancel` flips to `true` (or its sender
    /// goes away). A tick that has started always finishes.
    pub async fn run<F>(mut self, period: Duration, mut cancel: watch::Receiver<bool>, mut on_sample: F) -> Result<Self>
    where
        F: FnMut(&Sample),
    {
        self.state = LoopState::Running;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *cancel.borrow_and_update() {
                break;
            }
            tokio::select! {
                biased;
                changed = cancel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let sample = self.tick()?;
                    on_sample(&sample);
                }
            }
        }

        self.state = LoopState::Stopping;
        debug!("sampler stopped after {} ticks", self.ticks);
        Ok(self)
    }

    /// Turns every LED off. Only the first call writes.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == LoopState::Stopped {
            return Ok(());
        }
        self.surface.all_off()?;
        self.state = LoopState::Stopped;
        Ok(())
    }
}

/// Checks the board once. When it does not answer, waits `absent_delay`
/// before reporting it missing so a supervisor restarting the daemon does
/// not spin.
pub async fn check_board<L: LedSurface>(surface: &mut L, location: &str, absent_delay: Duration) -> Result<()> {
    if surface.is_present() {
        return Ok(());
    }
    Err(board_absent(location, absent_delay).await)
}

/// The delayed failure for a board that could not even be opened.
pub async fn board_absent(location: &str, absent_delay: Duration) -> Error {
    warn!("no LED board on {}, exiting in {}s", location, absent_delay.as_secs());
    time::sleep(absent_delay).await;
    Error::PeripheralAbsent(location.to_string())
}

/// SIGINT and SIGTERM listeners. Installed up front so a signal arriving
/// during startup is queued rather than killing the process.
pub struct StopSignals {
    interrupt: Option<Signal>,
    terminate: Option<Signal>,
}

impl StopSignals {
    pub fn install() -> Self {
        Self {
            interrupt: listen(SignalKind::interrupt(), "SIGINT"),
            terminate: listen(SignalKind::terminate(), "SIGTERM"),
        }
    }

    /// Resolves on the first SIGINT or SIGTERM.
    pub async fn wait(mut self) {
        tokio::select! {
            _ = recv(&mut self.interrupt) => info!("interrupt received"),
            _ = recv(&mut self.terminate) => info!("terminate received"),
        }
    }
}

fn listen(kind: SignalKind, name: &str) -> Option<Signal> {
    match signal(kind) {
        Ok(stream) => Some(stream),
        Err(err) => {
            warn!("unable to listen for {}: {}", name, err);
            None
        }
    }
}

async fn recv(stream: &mut Option<Signal>) {
    match stream {
        Some(stream) => {
            stream.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Runs `gauge` on a dedicated task until `stop` resolves, then stops the
/// timer, waits for any in-flight tick and switches every LED off.
///
/// If the loop fails first (a stat read error) the error is returned
/// straight away and the LEDs are left as they are.
pub async fn supervise<S, L, F, Q>(gauge: Gauge<S, L>, period: Duration, stop: Q, on_sample: F) -> Result<Gauge<S, L>>
where
    S: StatSource + Send + 'static,
    L: LedSurface + Send + 'static,
    F: FnMut(&Sample) + Send + 'static,
    Q: Future<Output = ()>,
{
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut task = tokio::spawn(gauge.run(period, cancel_rx, on_sample));

    let finished = tokio::select! {
        joined = &mut task => Some(joined),
        _ = stop => None,
    };

    let joined = match finished {
        Some(joined) => joined,
        None => {
            info!("stop requested, halting sampler");
            let _ = cancel_tx.send(true);
            task.await
        }
    };

    let mut gauge = joined.map_err(|err| Error::Task(err.to_string()))??;
    gauge.shutdown()?;
    info!("all LEDs off");
    Ok(gauge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led::fake::{LedWrite, RecordingSurface};
    use crate::stat::scripted::ScriptedStat;
    use std::sync::{Arc, Mutex};

    const PERIOD: Duration = Duration::from_millis(200);

    fn snap(busy: u64, idle: u64) -> CpuSnapshot {
        CpuSnapshot { user: busy, idle, ..Default::default() }
    }

    #[test]
    fn start_reads_initial_snapshot() {
        let gauge = Gauge::start(ScriptedStat::new([snap(1, 1)]), RecordingSurface::new(), 0.02).unwrap();
        assert_eq!(gauge.state(), LoopState::Idle);
        assert_eq!(gauge.previous(), &snap(1, 1));
        assert_eq!(gauge.ticks(), 0);
        assert!(gauge.surface().writes().is_empty());
    }

    #[test]
    fn start_fails_without_initial_snapshot() {
        let result = Gauge::start(ScriptedStat::default(), RecordingSurface::new(), 0.02);
        assert!(matches!(result, Err(Error::StatRead { .. })));
    }

    #[test]
    fn tick_replaces_previous_and_renders() {
        let mut gauge =
            Gauge::start(ScriptedStat::new([snap(0, 0), snap(50, 50)]), RecordingSurface::new(), 1.0).unwrap();
        let sample = gauge.tick().unwrap();

        assert_eq!(sample, Sample { tick: 1, utilization: 0.5, lit_rings: 3, intensity: 255 });
        assert_eq!(gauge.previous(), &snap(50, 50));
        assert_eq!(gauge.surface().rings(), [0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn shutdown_writes_all_off_once() {
        let mut gauge = Gauge::start(ScriptedStat::new([snap(0, 0)]), RecordingSurface::new(), 0.02).unwrap();
        gauge.shutdown().unwrap();
        gauge.shutdown().unwrap();
        assert_eq!(gauge.state(), LoopState::Stopped);
        assert_eq!(gauge.surface().all_off_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn two_ticks_then_stop() {
        let source = ScriptedStat::new([snap(0, 0), snap(30, 70), snap(130, 70)]);
        let gauge = Gauge::start(source, RecordingSurface::new(), 1.0).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let stop = time::sleep(PERIOD * 2 + PERIOD / 2);
        let gauge = supervise(gauge, PERIOD, stop, move |s: &Sample| sink.lock().unwrap().push(*s))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!((seen[0].utilization - 0.3).abs() < 1e-9);
        assert!((seen[1].utilization - 1.0).abs() < 1e-9);
        assert_eq!(gauge.previous(), &snap(130, 70));
        assert_eq!(gauge.ticks(), 2);
        assert_eq!(gauge.source.reads(), 3);
        assert_eq!(gauge.state(), LoopState::Stopped);

        let writes = gauge.surface().writes();
        assert_eq!(writes.len(), 2 * 6 + 1);
        assert_eq!(writes.last(), Some(&LedWrite::AllOff));
        assert_eq!(gauge.surface().all_off_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_first_tick_only_turns_off() {
        let gauge = Gauge::start(ScriptedStat::new([snap(0, 0)]), RecordingSurface::new(), 0.02).unwrap();
        let gauge = supervise(gauge, PERIOD, async {}, |_: &Sample| {}).await.unwrap();

        assert_eq!(gauge.ticks(), 0);
        assert_eq!(gauge.surface().writes(), &[LedWrite::AllOff]);
    }

    #[tokio::test(start_paused = true)]
    async fn read_failure_ends_the_loop() {
        let source = ScriptedStat::new([snap(0, 0), snap(10, 10)]).then_fail();
        let gauge = Gauge::start(source, RecordingSurface::new(), 0.02).unwrap();

        let result = supervise(gauge, PERIOD, std::future::pending(), |_: &Sample| {}).await;
        assert!(matches!(result, Err(Error::StatRead { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn absent_board_waits_then_fails_without_writing() {
        let mut surface = RecordingSurface::absent();
        let delay = Duration::from_secs(10);
        let started = Instant::now();

        let result = check_board(&mut surface, "i2c-1", delay).await;

        assert!(started.elapsed() >= delay);
        match result {
            Err(err @ Error::PeripheralAbsent(_)) => {
                assert_eq!(err.exit_code(), 3);
                assert!(err.to_string().contains("i2c-1"));
            }
            other => panic!("expected absent board, got {:?}", other),
        }
        assert!(surface.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn present_board_passes_immediately() {
        let mut surface = RecordingSurface::new();
        let started = Instant::now();
        check_board(&mut surface, "i2c-1", Duration::from_secs(10)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn terminate_raised_before_waiting_is_kept() {
        let signals = StopSignals::install();
        // SAFETY: raise only delivers SIGTERM to this process, whose handler is installed above.
        assert_eq!(unsafe { libc::raise(libc::SIGTERM) }, 0);
        time::timeout(Duration::from_secs(5), signals.wait())
            .await
            .expect("queued SIGTERM was lost");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_cancel_sender_stops_run() {
        let gauge = Gauge::start(ScriptedStat::new([snap(0, 0)]), RecordingSurface::new(), 0.02).unwrap();
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let gauge = gauge.run(PERIOD, rx, |_: &Sample| {}).await.unwrap();
        assert_eq!(gauge.state(), LoopState::Stopping);
        assert_eq!(gauge.ticks(), 0);
    }
}
