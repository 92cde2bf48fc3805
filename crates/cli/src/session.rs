//! Recording session: wires sensors, store and sampling process together
//! and drives the process through a timed plan.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{AcquisitionBlueprint, DataStore, Table};
use observability::TableSummary;
use producer::{LoopExit, LoopReport, ProcessConfig, ProducerProcess, SensorSummary};
use sensors::SensorFactory;
use serde::Serialize;
use store::{BufferedStore, StoreConfig, StoreMetricsSnapshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

const MIN_DRAIN_INTERVAL: Duration = Duration::from_millis(1);
const MAX_DRAIN_INTERVAL: Duration = Duration::from_secs(1);

/// One step of a recording plan
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Record(Duration),
    Pause(Duration),
}

/// How long to record and whether to pause in between
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub phases: Vec<Phase>,
    /// Report cached rows as well as the in-memory buffer
    pub include_cache: bool,
    pub keep_cache: bool,
}

impl SessionPlan {
    /// Record for `duration`, optionally pausing once after `pause.0` for `pause.1`.
    /// A pause starting at or after `duration` is ignored.
    pub fn new(duration: Duration, pause: Option<(Duration, Duration)>) -> Self {
        let phases = match pause {
            Some((after, length)) if after < duration => vec![
                Phase::Record(after),
                Phase::Pause(length),
                Phase::Record(duration - after),
            ],
            _ => vec![Phase::Record(duration)],
        };
        Self {
            phases,
            include_cache: true,
            keep_cache: false,
        }
    }

    pub fn recording_time(&self) -> Duration {
        self.phases
            .iter()
            .map(|phase| match phase {
                Phase::Record(d) => *d,
                Phase::Pause(_) => Duration::ZERO,
            })
            .sum()
    }
}

/// A configured process with its store
pub struct Session {
    store: Arc<BufferedStore>,
    process: Arc<ProducerProcess>,
}

impl Session {
    /// Build sensors from the blueprint and plug them into a fresh process
    #[instrument(name = "session_build", skip(blueprint), fields(process = %blueprint.process.name))]
    pub fn build(blueprint: &AcquisitionBlueprint, plug_dummy: bool) -> Result<Self> {
        let store = Arc::new(BufferedStore::new(StoreConfig::from(&blueprint.store)));
        let process = ProducerProcess::new(
            ProcessConfig::from(&blueprint.process),
            Arc::clone(&store) as Arc<dyn DataStore>,
        );

        for sensor in SensorFactory::build_all(blueprint).context("Failed to build sensors")? {
            let id = sensor.id().clone();
            if !process
                .add_sensor(sensor)
                .with_context(|| format!("Failed to add sensor '{id}'"))?
            {
                warn!(sensor_id = %id, "Sensor already present, skipped");
            }
        }

        if plug_dummy && producer::plug_dummy_sensor(&process)? {
            info!(sensor_id = producer::DUMMY_SENSOR_ID, "Dummy sensor plugged");
        }

        Ok(Self {
            store,
            process: Arc::new(process),
        })
    }

    pub fn process(&self) -> &ProducerProcess {
        &self.process
    }

    /// Run the plan, stop the process and collect everything it recorded.
    ///
    /// `shutdown` cuts the plan short; the rows sampled so far are still
    /// collected.
    pub async fn record(
        &self,
        plan: &SessionPlan,
        shutdown: impl Future<Output = ()>,
    ) -> Result<SessionStats> {
        tokio::pin!(shutdown);
        let started = Instant::now();
        let mut interrupted = false;

        let mut drain = tokio::time::interval(self.drain_interval());
        drain.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(interval = ?drain.period(), "Store drain interval");

        'phases: for phase in &plan.phases {
            let wait = match *phase {
                Phase::Record(d) => {
                    self.process.start()?;
                    d
                }
                Phase::Pause(d) => {
                    self.process.pause()?;
                    d
                }
            };
            debug!(?phase, "Session phase");

            let phase_end = tokio::time::sleep(wait);
            tokio::pin!(phase_end);
            loop {
                tokio::select! {
                    _ = &mut phase_end => break,
                    _ = drain.tick() => self.drain_store().await?,
                    _ = &mut shutdown => {
                        warn!("Received shutdown signal, stopping acquisition...");
                        interrupted = true;
                        break 'phases;
                    }
                }
            }
        }

        let report = self.stop().await?;
        let table = self.process.read(plan.include_cache)?;
        let store = self.store.metrics().snapshot();

        if !plan.keep_cache {
            self.store
                .delete_cache()
                .context("Failed to delete store cache")?;
        }

        Ok(SessionStats {
            process: self.process.name().to_string(),
            sensors: self.process.sensors(),
            duration: started.elapsed(),
            interrupted,
            summary: TableSummary::from_table(&table),
            report,
            store,
            table,
        })
    }

    /// A quarter of the time the worker needs to fill the store queue
    fn drain_interval(&self) -> Duration {
        let capacity = u32::try_from(self.store.config().queue_capacity).unwrap_or(u32::MAX);
        let fill_time = self.process.config().sampling_period.saturating_mul(capacity);
        (fill_time / 4).clamp(MIN_DRAIN_INTERVAL, MAX_DRAIN_INTERVAL)
    }

    /// Move queued rows into the store buffer, committing overflow to the cache.
    ///
    /// A failed commit keeps the rows buffered, so it is retried on the next
    /// drain and only logged here.
    async fn drain_store(&self) -> Result<()> {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || store.read().map(|table| table.len()))
            .await
            .context("Drain task failed")?;
        match result {
            Ok(buffered) => debug!(buffered, "Store drained"),
            Err(e) => warn!(error = %e, "Store drain failed, rows kept in memory"),
        }
        Ok(())
    }

    /// Join the worker off the async runtime
    async fn stop(&self) -> Result<LoopReport> {
        let process = Arc::clone(&self.process);
        let report = tokio::task::spawn_blocking(move || match process.config().join_timeout {
            Some(timeout) => process.join_timeout(timeout),
            None => process.join(),
        })
        .await
        .context("Join task failed")??;
        Ok(report)
    }
}

/// Statistics from a recording session
#[derive(Debug)]
pub struct SessionStats {
    pub process: String,
    pub sensors: Vec<SensorSummary>,
    /// Wall-clock time including pauses
    pub duration: Duration,
    pub interrupted: bool,
    pub report: LoopReport,
    pub store: StoreMetricsSnapshot,
    pub summary: TableSummary,
    pub table: Table,
}

/// On-disk form of a session
#[derive(Serialize)]
struct Recording<'a> {
    process: &'a str,
    sensors: &'a [SensorSummary],
    report: &'a LoopReport,
    table: &'a Table,
}

impl SessionStats {
    /// Rows per second of wall-clock time
    pub fn rows_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.report.rows_put as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Write sensors, loop report and table as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let recording = Recording {
            process: &self.process,
            sensors: &self.sensors,
            report: &self.report,
            table: &self.table,
        };
        let json =
            serde_json::to_string_pretty(&recording).context("Failed to serialize recording")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), rows = self.table.len(), "Recording written");
        Ok(())
    }

    pub fn print_summary(&self) {
        println!("\n=== Session '{}' ===\n", self.process);

        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Interrupted: {}", self.interrupted);
        println!("  Ticks: {}", self.report.ticks);
        println!("  Rows put: {}", self.report.rows_put);
        println!("  Rows/s: {:.2}", self.rows_per_second());
        println!("  Sensor failures: {}", self.report.sensor_failures);
        println!("  Store failures: {}", self.report.store_failures);
        match &self.report.exit {
            LoopExit::Stopped => println!("  Exit: stopped"),
            LoopExit::Aborted {
                consecutive_store_failures,
                last_error,
            } => println!("  Exit: aborted after {consecutive_store_failures} store failures ({last_error})"),
        }

        println!("\nStore");
        println!("  Rows enqueued: {}", self.store.rows_enqueued);
        println!("  Rows dropped: {}", self.store.rows_dropped);
        println!("  Rows flushed to cache: {}", self.store.rows_flushed);

        println!("\nSensors ({}):", self.sensors.len());
        for sensor in &self.sensors {
            println!("  - {}: {}", sensor.id, sensor.channels.join(", "));
        }

        println!();
        print!("{}", self.summary);
        println!();
    }
}
