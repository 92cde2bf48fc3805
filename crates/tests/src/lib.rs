//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - contract snapshot checks
//! - config -> sensors -> process -> store runs
//! - store failure and sensor failure paths

#[cfg(test)]
mod contract_tests {
    use chrono::{Duration, TimeZone, Utc};
    use contracts::{ChannelInfo, Packet, Row, SensorId};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_column_key_format() {
        let channel = ChannelInfo::new("torque", "Nm").unwrap();
        assert_eq!(channel.display(), "torque (Nm)");
        assert_eq!(channel.to_string(), "torque (Nm)");
    }

    #[test]
    fn test_row_merge_keeps_earliest_timestamp() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = t0 + Duration::milliseconds(3);

        let mut row = Row::new(later);
        row.merge(Packet::new(SensorId::from("a"), t0, vec![("x (V)".into(), 1.0)]));
        assert_eq!(row.timestamp, t0);
        assert_eq!(row.get("x (V)"), Some(1.0));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AcquisitionBlueprint, ContractError, DataStore, Row, Table};
    use producer::{LoopExit, ProcessConfig, ProcessState, Producer, ProducerProcess};
    use sensors::{Fallible, GeneratorError, GeneratorSensor, SensorFactory};
    use store::{BufferedStore, StoreConfig};

    fn blueprint(toml: &str) -> AcquisitionBlueprint {
        ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap()
    }

    fn process_from(blueprint: &AcquisitionBlueprint) -> (ProducerProcess, Arc<BufferedStore>) {
        let store = Arc::new(BufferedStore::new(StoreConfig::from(&blueprint.store)));
        let mut producer = Producer::new();
        for sensor in SensorFactory::build_all(blueprint).unwrap() {
            assert!(producer.add_sensor(sensor).unwrap());
        }
        let process = ProducerProcess::with_producer_instance(
            ProcessConfig::from(&blueprint.process),
            producer,
            store.clone(),
        );
        (process, store)
    }

    const TWO_SENSORS: &str = r#"
[process]
name = "bench"
sampling_period_ms = 5

[store]
buffer_length = 8

[[sensors]]
id = "imada"
generator = { kind = "constant", value = 1.5 }
channels = [{ name = "torque", unit = "Nm" }]

[[sensors]]
id = "daq"
generator = { kind = "sequence", values = [1.0, 2.0, 3.0] }
channels = [
    { name = "voltage", unit = "V" },
    { name = "current", unit = "A" },
]
"#;

    /// End-to-end: config -> SensorFactory -> ProducerProcess -> BufferedStore
    #[test]
    fn test_e2e_config_to_table() {
        let blueprint = blueprint(TWO_SENSORS);
        let (process, store) = process_from(&blueprint);

        process.start().unwrap();
        thread::sleep(Duration::from_millis(200));
        let report = process.join().unwrap();
        assert_eq!(process.state(), ProcessState::Stopped);
        assert_eq!(report.exit, LoopExit::Stopped);
        assert!(report.rows_put >= 5, "only {} rows", report.rows_put);

        let table = process.read(true).unwrap();
        assert_eq!(table.len() as u64, report.rows_put);
        assert_eq!(table.columns(), blueprint.channel_keys().as_slice());
        // older rows were committed to the memory cache
        assert!(store.cached().unwrap().len() >= table.len().saturating_sub(8));

        for row in table.rows() {
            assert_eq!(row.get("torque (Nm)"), Some(1.5));
            // both daq channels come from one generator call sequence
            let v = row.get("voltage (V)").unwrap();
            let a = row.get("current (A)").unwrap();
            assert!([1.0, 2.0, 3.0].contains(&v));
            assert!([1.0, 2.0, 3.0].contains(&a));
        }

        let timestamps = table.timestamps();
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));

        let summary = observability::TableSummary::from_table(&table);
        assert_eq!(summary.rows, table.len());
        assert_eq!(summary.channels["torque (Nm)"].mean, 1.5);
    }

    #[test]
    fn test_e2e_json_lines_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("runs").join("bench.jsonl");
        let config = TWO_SENSORS.replace(
            "buffer_length = 8",
            &format!("buffer_length = 3\ncache_path = {:?}", cache.display().to_string()),
        );
        let blueprint = blueprint(&config);
        let (process, store) = process_from(&blueprint);

        process.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        let report = process.join().unwrap();

        let memory = process.read(false).unwrap();
        assert!(memory.len() <= 3);
        assert!(cache.exists());

        let all = process.read(true).unwrap();
        assert_eq!(all.len() as u64, report.rows_put);

        store.delete_cache().unwrap();
        assert!(!cache.exists());
        assert_eq!(process.read(true).unwrap().len(), memory.len());
    }

    #[test]
    fn test_e2e_dummy_sensor_pause_resume() {
        let store: Arc<dyn DataStore> = Arc::new(BufferedStore::new(StoreConfig::new(1000, None)));
        let process = ProducerProcess::new(
            ProcessConfig::new("torque").with_sampling_period(Duration::from_millis(5)),
            store,
        );
        assert!(producer::plug_dummy_sensor(&process).unwrap());
        // plugging twice is a no-op
        assert!(!producer::plug_dummy_sensor(&process).unwrap());

        process.start().unwrap();
        thread::sleep(Duration::from_millis(80));
        process.pause().unwrap();
        assert_eq!(process.state(), ProcessState::Paused);

        // let an in-flight tick settle
        thread::sleep(Duration::from_millis(20));
        let paused_rows = process.metrics().rows_put;
        assert!(paused_rows > 0);
        thread::sleep(Duration::from_millis(60));
        assert_eq!(process.metrics().rows_put, paused_rows);

        // sensors can change while paused
        let extra = GeneratorSensor::with_generator("aux", || 7.0)
            .with_channels([contracts::ChannelInfo::new("aux", "V").unwrap()])
            .unwrap();
        assert!(process.add_sensor(Box::new(extra)).unwrap());

        process.start().unwrap();
        thread::sleep(Duration::from_millis(80));
        let report = process.join().unwrap();
        assert!(report.rows_put > paused_rows);

        let table = process.read(true).unwrap();
        let aux = table.column("aux (V)");
        assert_eq!(aux.len(), table.len());
        // rows sampled before the sensor was added have no aux value
        assert_eq!(aux.first().copied().flatten(), None);
        assert_eq!(aux.last().copied().flatten(), Some(7.0));
    }

    /// Store that rejects every row
    #[derive(Default)]
    struct BrokenStore {
        attempts: AtomicU64,
    }

    impl DataStore for BrokenStore {
        fn put(&self, _row: Row) -> Result<(), ContractError> {
            self.attempts.fetch_add(1, Ordering::Relaxed);
            Err(ContractError::StoreClosed)
        }

        fn read(&self) -> Result<Table, ContractError> {
            Ok(Table::new())
        }

        fn flush(&self) -> Result<(), ContractError> {
            Ok(())
        }

        fn cached(&self) -> Result<Table, ContractError> {
            Ok(Table::new())
        }

        fn delete_cache(&self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    #[test]
    fn test_e2e_store_failures_abort_loop() {
        let store = Arc::new(BrokenStore::default());
        let process = ProducerProcess::new(
            ProcessConfig::new("broken")
                .with_sampling_period(Duration::from_millis(2))
                .with_max_consecutive_store_failures(3),
            store.clone(),
        );
        producer::plug_dummy_sensor(&process).unwrap();

        process.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        assert!(!process.is_alive());

        let report = process.join().unwrap();
        assert!(report.is_aborted());
        assert_eq!(report.rows_put, 0);
        assert_eq!(report.store_failures, 3);
        assert_eq!(store.attempts.load(Ordering::Relaxed), 3);
        match report.exit {
            LoopExit::Aborted {
                consecutive_store_failures,
                ..
            } => assert_eq!(consecutive_store_failures, 3),
            LoopExit::Stopped => panic!("expected abort"),
        }
    }

    #[test]
    fn test_e2e_failing_sensor_is_skipped() {
        let blueprint = blueprint(TWO_SENSORS);
        let (process, _store) = process_from(&blueprint);

        let adc_timeout = || -> Result<f64, GeneratorError> { Err(GeneratorError::new("adc timeout")) };
        let broken = GeneratorSensor::with_generator("broken", Fallible(adc_timeout))
        .with_channels([contracts::ChannelInfo::new("temperature", "degC").unwrap()])
        .unwrap();
        // self-test does not read values, so the sensor is accepted
        assert!(process.add_sensor(Box::new(broken)).unwrap());

        process.start().unwrap();
        thread::sleep(Duration::from_millis(60));
        let report = process.join().unwrap();

        assert_eq!(report.exit, LoopExit::Stopped);
        assert!(report.rows_put > 0);
        assert_eq!(report.sensor_failures, report.ticks);

        let table = process.read(true).unwrap();
        assert!(!table.contains_column("temperature (degC)"));
        assert!(table.rows().iter().all(|row| row.get("torque (Nm)") == Some(1.5)));
    }

    /// A reader draining the store keeps a small queue from filling up
    #[tokio::test]
    async fn test_e2e_async_reader_keeps_queue_free() {
        let config = TWO_SENSORS
            .replace("sampling_period_ms = 5", "sampling_period_ms = 1")
            .replace("buffer_length = 8", "buffer_length = 8\nqueue_capacity = 16");
        let blueprint = blueprint(&config);
        let (process, store) = process_from(&blueprint);
        let process = Arc::new(process);

        process.start().unwrap();
        let mut drain = tokio::time::interval(Duration::from_millis(4));
        let deadline = tokio::time::Instant::now() + Duration::from_millis(200);
        while tokio::time::Instant::now() < deadline {
            drain.tick().await;
            store.read().unwrap();
        }

        let worker = Arc::clone(&process);
        let report = tokio::task::spawn_blocking(move || worker.join())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.exit, LoopExit::Stopped);
        assert!(report.rows_put > 16, "only {} rows", report.rows_put);
        assert_eq!(store.metrics().snapshot().rows_dropped, 0);
        assert_eq!(process.read(true).unwrap().len() as u64, report.rows_put);
    }

    #[test]
    fn test_e2e_resampled_read() {
        let config = TWO_SENSORS.replace(
            "buffer_length = 8",
            "buffer_length = 1000\nresampling_frequency_hz = 20.0",
        );
        let blueprint = blueprint(&config);
        let (process, _store) = process_from(&blueprint);

        process.start().unwrap();
        thread::sleep(Duration::from_millis(300));
        let report = process.join().unwrap();

        let table = process.read(false).unwrap();
        assert!(!table.is_empty());
        assert!((table.len() as u64) < report.rows_put);
        // constant channel survives averaging
        assert!(table.rows().iter().all(|row| row.get("torque (Nm)") == Some(1.5)));
    }
}
