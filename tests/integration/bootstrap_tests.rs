//! Integration tests for the startup sequence and the storage pipeline.

use crate::mock_hw::{CollectSink, MockSensors, MockStorage, MockTime};

use airlogger::adapters::file_sink::FileSink;
use airlogger::adapters::log_sink::ConsoleSink;
use airlogger::app::ports::StorageError;
use airlogger::app::record::parse_csv_line;
use airlogger::app::sample::ClockState;
use airlogger::app::service::{bootstrap, SampleLoop, Startup};
use airlogger::config::{LogFormat, LoggerConfig, StorageFailurePolicy};
use airlogger::error::Error;

fn quick_config() -> LoggerConfig {
    LoggerConfig {
        calibration_samples: 3,
        ..LoggerConfig::default()
    }
}

fn logging(startup: Startup) -> SampleLoop {
    match startup {
        Startup::Logging(sl) => sl,
        Startup::ConsoleOnly(_) => panic!("expected storage to be up, got console-only"),
        Startup::Halted(e) => panic!("expected storage to be up, halted on {e}"),
    }
}

// ── Startup order ─────────────────────────────────────────────

#[test]
fn bootstrap_warms_up_then_calibrates() {
    let config = quick_config();
    let mut hw = MockSensors::new().with_adc(2000);
    let mut storage = MockStorage::new();
    let mut time = MockTime::default();

    let sl = logging(bootstrap(&config, &mut hw, &mut storage, &mut time).unwrap());

    assert_eq!(time.delays, vec![12_000, 1_000, 1_000, 1_000]);
    assert!(hw.prepared);
    assert!(hw.rtc_initialised);
    assert_eq!(hw.rtc, Some(ClockState::new(2019, 12, 25, 12, 30, 0)));
    assert_eq!(storage.init_calls, 1);
    assert!(sl.channels().iter().all(|c| c.is_calibrated()));
}

#[test]
fn bootstrap_without_boot_clock_leaves_rtc_alone() {
    let config = LoggerConfig {
        boot_clock: None,
        ..quick_config()
    };
    let mut hw = MockSensors::new().with_adc(2000);
    bootstrap(&config, &mut hw, &mut MockStorage::new(), &mut MockTime::default()).unwrap();
    assert!(hw.rtc_initialised);
    assert_eq!(hw.rtc, None);
}

#[test]
fn rtc_failure_is_tolerated() {
    let mut hw = MockSensors::new().with_adc(2000);
    hw.rtc_fail = true;
    let result = bootstrap(&quick_config(), &mut hw, &mut MockStorage::new(), &mut MockTime::default());
    assert!(matches!(result, Ok(Startup::Logging(_))));
}

#[test]
fn storage_failure_halts_before_calibration() {
    let config = quick_config();
    assert_eq!(config.storage.on_init_failure, StorageFailurePolicy::Halt);
    let mut hw = MockSensors::new().with_adc(2000);
    let mut storage = MockStorage::missing_card();
    let mut time = MockTime::default();

    let startup = bootstrap(&config, &mut hw, &mut storage, &mut time).unwrap();

    assert!(matches!(startup, Startup::Halted(StorageError::InitFailed)));
    assert_eq!(hw.adc_reads, 0, "no calibration reads after a storage failure");
    assert_eq!(time.delays, vec![12_000]);
    assert!(storage.files.is_empty());
}

#[test]
fn console_only_policy_keeps_sampling_without_the_card() {
    let mut config = quick_config();
    config.storage.on_init_failure = StorageFailurePolicy::ConsoleOnly;
    let mut hw = MockSensors::new().with_adc(2000);
    let mut storage = MockStorage::missing_card();

    let startup = bootstrap(&config, &mut hw, &mut storage, &mut MockTime::default()).unwrap();
    let Startup::ConsoleOnly(mut sl) = startup else {
        panic!("expected console-only startup");
    };
    assert!(sl.channels().iter().all(|c| c.is_calibrated()));

    let mut sinks = (CollectSink::default(), None::<FileSink<MockStorage>>);
    sl.run_cycle(&mut hw, &mut sinks);
    sl.run_cycle(&mut hw, &mut sinks);
    assert_eq!(sinks.0.samples.len(), 2);
    assert!(sinks.0.samples.iter().all(|s| s.gases.iter().all(Option::is_some)));
    assert!(storage.files.is_empty());
}

#[test]
fn halt_idles_on_the_time_port() {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use airlogger::app::ports::{Clock, TimePort};

    struct Budget(Vec<u32>);
    impl Clock for Budget {
        fn uptime_ms(&self) -> u64 {
            self.0.iter().map(|&ms| ms as u64).sum()
        }
    }
    impl TimePort for Budget {
        fn delay_ms(&mut self, ms: u32) {
            self.0.push(ms);
            assert!(self.0.len() < 3, "still halted");
        }
    }

    let mut time = Budget(Vec::new());
    let stopped = catch_unwind(AssertUnwindSafe(|| airlogger::app::service::halt(&mut time)));
    assert!(stopped.is_err());
    assert_eq!(time.0, vec![1_000, 1_000, 1_000]);
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = LoggerConfig {
        calibration_samples: 0,
        ..LoggerConfig::default()
    };
    let mut time = MockTime::default();
    let result = bootstrap(&config, &mut MockSensors::new(), &mut MockStorage::new(), &mut time);
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(time.delays.is_empty());
}

// ── Storage pipeline ──────────────────────────────────────────

#[test]
fn every_cycle_appends_one_csv_line() {
    let config = quick_config();
    let mut hw = MockSensors::new().with_adc(2000);
    hw.push_pm(3.0, 5.0, 7.0);
    let mut storage = MockStorage::new();
    let mut sl = logging(bootstrap(&config, &mut hw, &mut storage, &mut MockTime::default()).unwrap());

    let mut sinks = (ConsoleSink::new(config.gas_labels()), FileSink::new(storage, &config));
    let emitted = [sl.run_cycle(&mut hw, &mut sinks), sl.run_cycle(&mut hw, &mut sinks)];

    let file = sinks.1.storage().file("data.txt");
    let lines: Vec<&str> = file.lines().collect();
    assert_eq!(lines.len(), 2);
    for (line, sample) in lines.iter().zip(&emitted) {
        let parsed = parse_csv_line(line).unwrap();
        assert_eq!(parsed.particulates, sample.particulates);
        for (p, s) in parsed.gases.iter().zip(&sample.gases) {
            assert!((p.unwrap() - s.unwrap()).abs() <= 0.005 + s.unwrap() * 1e-6);
        }
    }
    assert_eq!(sinks.1.stats().written, 2);
}

#[test]
fn write_failures_are_counted_and_do_not_stop_the_console() {
    let config = quick_config();
    let mut hw = MockSensors::new().with_adc(2000);
    let mut storage = MockStorage::new();
    let mut sl = logging(bootstrap(&config, &mut hw, &mut storage, &mut MockTime::default()).unwrap());
    storage.fail_appends = true;

    let mut sinks = (CollectSink::default(), FileSink::new(storage, &config));
    sl.run_cycle(&mut hw, &mut sinks);
    sl.run_cycle(&mut hw, &mut sinks);

    assert_eq!(sinks.0.samples.len(), 2);
    let stats = sinks.1.stats();
    assert_eq!(stats.written, 0);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.last_error, Some(StorageError::IoError));
}

#[test]
fn block_format_writes_the_labelled_block() {
    let mut config = quick_config();
    config.storage.format = LogFormat::Block;
    let mut hw = MockSensors::new().with_adc(2000);
    let mut storage = MockStorage::new();
    let mut sl = logging(bootstrap(&config, &mut hw, &mut storage, &mut MockTime::default()).unwrap());

    let mut sink = FileSink::new(storage, &config);
    sl.run_cycle(&mut hw, &mut sink);

    let file = sink.storage().file("data.txt");
    assert!(file.starts_with("| Time: 2019-12-25T12:30:00\t|\n| PM 1.0: 0.00"));
    assert!(file.contains("| LPG: "));
    assert!(file.trim_end().ends_with('*'));
}

#[test]
fn console_only_mode_drops_file_records() {
    let config = quick_config();
    let mut hw = MockSensors::new().with_adc(2000);
    let mut sl = airlogger::app::service::SampleLoop::new(&config);
    let mut sinks = (CollectSink::default(), None::<FileSink<MockStorage>>);
    sl.run_cycle(&mut hw, &mut sinks);
    assert_eq!(sinks.0.samples.len(), 1);
}
