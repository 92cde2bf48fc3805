//! ProducerProcess - runs a Producer on a dedicated sampling thread
//!
//! Lifecycle: `NEW -> RUNNING <-> PAUSED -> STOPPED`.
//!
//! The controller and the worker share a mutex/condvar control block. The
//! worker waits on the condvar between ticks, so `pause` and `join` take
//! effect within one sampling period. Rows are handed to the shared
//! [`DataStore`] in sampling order.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{DataStore, SensorId, Table};
use sensors::Sensor;
use serde::Serialize;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::{MetricsSnapshot, ProcessConfig, ProcessMetrics};
use crate::error::{ProducerError, Result};
use crate::producer::{Producer, SensorSummary};

/// Process lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    New,
    Running,
    Paused,
    Stopped,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the sampling loop ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LoopExit {
    /// Stop requested by the controller
    Stopped,
    /// Too many consecutive store failures
    Aborted {
        consecutive_store_failures: u32,
        last_error: String,
    },
}

/// Outcome of a finished sampling loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopReport {
    pub ticks: u64,
    pub rows_put: u64,
    pub sensor_failures: u64,
    pub store_failures: u64,
    pub exit: LoopExit,
}

impl LoopReport {
    fn new(snapshot: MetricsSnapshot, exit: LoopExit) -> Self {
        Self {
            ticks: snapshot.ticks,
            rows_put: snapshot.rows_put,
            sensor_failures: snapshot.sensor_failures,
            store_failures: snapshot.store_failures,
            exit,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.exit, LoopExit::Aborted { .. })
    }
}

struct Control {
    state: ProcessState,
    worker_done: bool,
    exit: Option<LoopExit>,
    worker: Option<JoinHandle<()>>,
}

struct Shared {
    control: Mutex<Control>,
    signal: Condvar,
    producer: Mutex<Producer>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs a [`Producer`] on a fixed cadence and feeds a [`DataStore`].
///
/// All control methods take `&self`; the process can be shared across
/// controlling threads behind an `Arc`.
pub struct ProducerProcess {
    config: ProcessConfig,
    store: Arc<dyn DataStore>,
    shared: Arc<Shared>,
    metrics: Arc<ProcessMetrics>,
}

impl ProducerProcess {
    /// Create a process with an empty producer
    pub fn new(config: ProcessConfig, store: Arc<dyn DataStore>) -> Self {
        Self::with_producer_instance(config, Producer::new(), store)
    }

    /// Create a process around an already populated producer
    pub fn with_producer_instance(
        config: ProcessConfig,
        producer: Producer,
        store: Arc<dyn DataStore>,
    ) -> Self {
        Self {
            config,
            store,
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    state: ProcessState::New,
                    worker_done: false,
                    exit: None,
                    worker: None,
                }),
                signal: Condvar::new(),
                producer: Mutex::new(producer),
            }),
            metrics: Arc::new(ProcessMetrics::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    pub fn state(&self) -> ProcessState {
        lock(&self.shared.control).state
    }

    /// True while RUNNING or PAUSED and the worker has not exited
    pub fn is_alive(&self) -> bool {
        let ctl = lock(&self.shared.control);
        matches!(ctl.state, ProcessState::Running | ProcessState::Paused) && !ctl.worker_done
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Start sampling, or resume from PAUSED.
    ///
    /// # Errors
    /// [`ProducerError::InvalidState`] once STOPPED.
    #[instrument(name = "process_start", skip(self), fields(process = %self.config.name))]
    pub fn start(&self) -> Result<()> {
        let mut ctl = lock(&self.shared.control);
        match ctl.state {
            ProcessState::New => {
                let handle = self.spawn_worker()?;
                ctl.worker = Some(handle);
                self.transition(&mut ctl, ProcessState::Running);
                info!(period = ?self.config.sampling_period, "process started");
            }
            ProcessState::Paused => {
                self.transition(&mut ctl, ProcessState::Running);
                self.shared.signal.notify_all();
                info!("process resumed");
            }
            ProcessState::Running => debug!("already running"),
            ProcessState::Stopped => {
                return Err(ProducerError::invalid_state(
                    &self.config.name,
                    ctl.state,
                    "start",
                ))
            }
        }
        Ok(())
    }

    /// Suspend sampling; the worker stays alive.
    ///
    /// # Errors
    /// [`ProducerError::InvalidState`] from NEW or STOPPED.
    #[instrument(name = "process_pause", skip(self), fields(process = %self.config.name))]
    pub fn pause(&self) -> Result<()> {
        let mut ctl = lock(&self.shared.control);
        match ctl.state {
            ProcessState::Running => {
                self.transition(&mut ctl, ProcessState::Paused);
                self.shared.signal.notify_all();
                info!("process paused");
                Ok(())
            }
            ProcessState::Paused => {
                debug!("already paused");
                Ok(())
            }
            state => Err(ProducerError::invalid_state(&self.config.name, state, "pause")),
        }
    }

    /// Stop the loop and wait for the worker to exit.
    ///
    /// # Errors
    /// - [`ProducerError::InvalidState`] from NEW or STOPPED
    /// - [`ProducerError::WorkerPanicked`] if the worker thread panicked
    #[instrument(name = "process_join", skip(self), fields(process = %self.config.name))]
    pub fn join(&self) -> Result<LoopReport> {
        let handle = self.request_stop()?;
        self.finish(handle)
    }

    /// Like [`ProducerProcess::join`] with a bounded wait.
    ///
    /// On timeout the worker is detached, the process stays STOPPED and
    /// [`ProducerError::Unresponsive`] is returned.
    #[instrument(name = "process_join_timeout", skip(self), fields(process = %self.config.name))]
    pub fn join_timeout(&self, timeout: Duration) -> Result<LoopReport> {
        let handle = self.request_stop()?;
        let deadline = Instant::now() + timeout;

        let mut ctl = lock(&self.shared.control);
        while !ctl.worker_done {
            let now = Instant::now();
            if now >= deadline {
                error!(timeout = ?timeout, "worker unresponsive, detaching");
                drop(handle);
                return Err(ProducerError::Unresponsive {
                    process: self.config.name.clone(),
                    timeout,
                });
            }
            ctl = self
                .shared
                .signal
                .wait_timeout(ctl, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        drop(ctl);

        self.finish(handle)
    }

    /// Read buffered rows, optionally preceded by the store's cache
    pub fn read(&self, include_cache: bool) -> Result<Table> {
        let memory = self.store.read()?;
        if !include_cache {
            return Ok(memory);
        }
        let cached = self.store.cached()?;
        Ok(Table::concat([cached, memory]))
    }

    /// Run `f` with exclusive access to the producer.
    ///
    /// # Errors
    /// [`ProducerError::InvalidState`] while RUNNING.
    pub fn with_producer<R>(&self, f: impl FnOnce(&mut Producer) -> Result<R>) -> Result<R> {
        // holding the control lock keeps the worker from resuming mid-mutation
        let ctl = lock(&self.shared.control);
        if ctl.state == ProcessState::Running && !ctl.worker_done {
            return Err(ProducerError::invalid_state(
                &self.config.name,
                ctl.state,
                "modify sensors",
            ));
        }
        let mut producer = lock(&self.shared.producer);
        f(&mut producer)
    }

    pub fn add_sensor(&self, sensor: Box<dyn Sensor>) -> Result<bool> {
        self.with_producer(|p| p.add_sensor(sensor))
    }

    pub fn remove_sensor(&self, sensor_id: &SensorId) -> Result<bool> {
        self.with_producer(|p| Ok(p.remove_sensor(sensor_id).is_some()))
    }

    /// Member sensors and their channel keys
    pub fn sensors(&self) -> Vec<SensorSummary> {
        lock(&self.shared.producer).summaries()
    }

    fn transition(&self, ctl: &mut Control, next: ProcessState) {
        debug!(from = %ctl.state, to = %next, "state transition");
        ctl.state = next;
        observability::record_state(&self.config.name, next.as_str());
    }

    fn request_stop(&self) -> Result<Option<JoinHandle<()>>> {
        let mut ctl = lock(&self.shared.control);
        match ctl.state {
            ProcessState::Running | ProcessState::Paused => {
                self.transition(&mut ctl, ProcessState::Stopped);
                self.shared.signal.notify_all();
                info!("stop requested");
                Ok(ctl.worker.take())
            }
            state => Err(ProducerError::invalid_state(&self.config.name, state, "join")),
        }
    }

    fn finish(&self, handle: Option<JoinHandle<()>>) -> Result<LoopReport> {
        if let Some(handle) = handle {
            handle.join().map_err(|_| ProducerError::WorkerPanicked {
                process: self.config.name.clone(),
            })?;
        }
        let exit = lock(&self.shared.control)
            .exit
            .take()
            .unwrap_or(LoopExit::Stopped);
        let report = LoopReport::new(self.metrics.snapshot(), exit);
        info!(
            ticks = report.ticks,
            rows_put = report.rows_put,
            aborted = report.is_aborted(),
            "process stopped"
        );
        Ok(report)
    }

    fn spawn_worker(&self) -> Result<JoinHandle<()>> {
        let worker = Worker {
            name: self.config.name.clone(),
            period: self.config.sampling_period,
            max_store_failures: self.config.max_consecutive_store_failures.max(1),
            shared: Arc::clone(&self.shared),
            store: Arc::clone(&self.store),
            metrics: Arc::clone(&self.metrics),
        };
        thread::Builder::new()
            .name(format!("producer-{}", self.config.name))
            .spawn(move || worker.run())
            .map_err(|source| ProducerError::Spawn {
                process: self.config.name.clone(),
                source,
            })
    }
}

impl Drop for ProducerProcess {
    fn drop(&mut self) {
        if let Ok(Some(handle)) = self.request_stop() {
            let _ = handle.join();
        }
    }
}

impl fmt::Debug for ProducerProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerProcess")
            .field("name", &self.config.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Marks the worker finished on every exit path, including panics
struct DoneGuard<'a>(&'a Shared);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        lock(&self.0.control).worker_done = true;
        self.0.signal.notify_all();
    }
}

struct Worker {
    name: String,
    period: Duration,
    max_store_failures: u32,
    shared: Arc<Shared>,
    store: Arc<dyn DataStore>,
    metrics: Arc<ProcessMetrics>,
}

impl Worker {
    fn run(self) {
        let _done = DoneGuard(&self.shared);
        info!(process = %self.name, "sampling loop started");

        lock(&self.shared.producer).open_all();
        let exit = self.sample_until_stopped();
        lock(&self.shared.producer).close_all();

        match &exit {
            LoopExit::Stopped => info!(process = %self.name, "sampling loop stopped"),
            LoopExit::Aborted {
                consecutive_store_failures,
                last_error,
            } => error!(
                process = %self.name,
                consecutive_store_failures,
                last_error = %last_error,
                "sampling loop aborted"
            ),
        }
        lock(&self.shared.control).exit = Some(exit);
    }

    fn sample_until_stopped(&self) -> LoopExit {
        let mut consecutive_failures = 0u32;
        let mut next_tick = Instant::now();

        loop {
            if self.wait_while_paused() {
                next_tick = Instant::now();
            }
            if self.stopping() {
                return LoopExit::Stopped;
            }

            let started = Instant::now();
            let sample = lock(&self.shared.producer).sample();
            self.metrics.record_tick();

            for failure in &sample.failures {
                self.metrics.record_sensor_failure();
                observability::record_sensor_failure(&self.name, failure.sensor_id.as_str());
            }

            if let Some(row) = sample.row {
                let tick = row.timestamp;
                match self.store.put(row) {
                    Ok(()) => {
                        consecutive_failures = 0;
                        self.metrics.record_row_put();
                        observability::record_row_put(&self.name);
                        trace!(process = %self.name, tick = %tick, "row put");
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        self.metrics.record_store_failure();
                        observability::record_store_failure(&self.name);
                        warn!(
                            process = %self.name,
                            tick = %tick,
                            error = %e,
                            consecutive_failures,
                            "store rejected row, dropped"
                        );
                        if consecutive_failures >= self.max_store_failures {
                            return LoopExit::Aborted {
                                consecutive_store_failures: consecutive_failures,
                                last_error: e.to_string(),
                            };
                        }
                    }
                }
            }
            observability::record_tick(&self.name, started.elapsed().as_secs_f64() * 1000.0);

            next_tick += self.period;
            let now = Instant::now();
            if next_tick < now {
                // overran the period, skip the missed ticks
                next_tick = now;
            }
            self.wait_until(next_tick);
        }
    }

    /// Block while PAUSED. Returns true if the worker actually waited.
    fn wait_while_paused(&self) -> bool {
        let mut ctl = lock(&self.shared.control);
        let mut waited = false;
        while matches!(ctl.state, ProcessState::Paused | ProcessState::New) {
            waited = true;
            ctl = self
                .shared
                .signal
                .wait(ctl)
                .unwrap_or_else(PoisonError::into_inner);
        }
        waited
    }

    fn stopping(&self) -> bool {
        lock(&self.shared.control).state == ProcessState::Stopped
    }

    /// Sleep until `deadline` or until the state leaves RUNNING
    fn wait_until(&self, deadline: Instant) {
        let mut ctl = lock(&self.shared.control);
        while ctl.state == ProcessState::Running {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            ctl = self
                .shared
                .signal
                .wait_timeout(ctl, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
