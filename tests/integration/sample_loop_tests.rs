//! Integration tests for the per-cycle SampleLoop pipeline.
//!
//! Sensors are mocked at the port boundary, except where the real PMS5003
//! driver and `HardwareAdapter` are exercised over a scripted UART.

use crate::mock_hw::{CollectSink, MockRtc, MockSensors, MockTime, ScriptedSerial, StepClock};

use airlogger::adapters::hardware::HardwareAdapter;
use airlogger::app::ports::SensorError;
use airlogger::app::sample::{ClockState, ParticulateReading};
use airlogger::app::service::{LoopPhase, SampleLoop};
use airlogger::config::LoggerConfig;
use airlogger::sensors::calibration::{CalibrationPlan, CalibrationPolicy};
use airlogger::sensors::dht22::Dht22;
use airlogger::sensors::pms5003::{PmsFrame, Pms5003};

fn config() -> LoggerConfig {
    LoggerConfig::default()
}

// ── Particulates ──────────────────────────────────────────────

#[test]
fn missing_particulate_reading_keeps_previous_values() {
    let mut sl = SampleLoop::new(&config());
    let mut hw = MockSensors::new().with_adc(2000);
    let mut sink = CollectSink::default();

    // First cycle: nothing yet → zeros.
    let first = sl.run_cycle(&mut hw, &mut sink);
    assert_eq!(first.particulates, ParticulateReading::default());

    hw.push_pm(1.0, 2.0, 3.0);
    let second = sl.run_cycle(&mut hw, &mut sink);
    assert_eq!(second.particulates.pm2_5, 2.0);

    // Timeout → carried forward.
    let third = sl.run_cycle(&mut hw, &mut sink);
    assert_eq!(third.particulates, second.particulates);

    assert_eq!(sink.samples.len(), 3);
    assert_eq!(sl.cycles(), 3);
    assert_eq!(sl.phase(), LoopPhase::Idle);
}

#[test]
fn corrupt_pms_frame_keeps_previous_values_through_real_driver() {
    let good = PmsFrame {
        pm_cf1: [5, 9, 12],
        pm_atm: [4, 8, 11],
        particle_counts: [0; 6],
    }
    .encode();
    let mut corrupt = PmsFrame {
        pm_cf1: [50, 90, 120],
        pm_atm: [40, 80, 110],
        particle_counts: [0; 6],
    }
    .encode();
    corrupt[31] = corrupt[31].wrapping_add(1);

    let serial = ScriptedSerial {
        rx: vec![good.to_vec(), corrupt.to_vec()].into(),
        ..Default::default()
    };
    let mut hw = HardwareAdapter::new(
        Pms5003::new(serial, StepClock::default()),
        Dht22::new(7),
        MockRtc::default(),
    );
    let mut sl = SampleLoop::new(&config());
    let mut sink = CollectSink::default();

    let first = sl.run_cycle(&mut hw, &mut sink);
    assert_eq!(first.particulates.pm2_5, 8.0);

    let second = sl.run_cycle(&mut hw, &mut sink);
    assert_eq!(second.particulates, first.particulates);
    assert_eq!(sink.samples[1].particulates.pm10_0, 11.0);
}

#[test]
fn first_cycle_after_passive_mode_ack_still_reads_particulates() {
    use airlogger::app::ports::ParticulatePort;

    // The sensor acknowledges the passive-mode command with an 8-byte reply
    // that is still queued when the first frame is requested.
    let mut rx = vec![0x42, 0x4D, 0x00, 0x04, 0xE1, 0x00, 0x01, 0x74];
    rx.extend_from_slice(
        &PmsFrame {
            pm_cf1: [7, 14, 21],
            pm_atm: [6, 12, 18],
            particle_counts: [0; 6],
        }
        .encode(),
    );
    let serial = ScriptedSerial {
        rx: vec![rx].into(),
        ..Default::default()
    };
    let mut hw = HardwareAdapter::new(
        Pms5003::new(serial, StepClock::default()),
        Dht22::new(7),
        MockRtc::default(),
    );
    hw.prepare().unwrap();

    let first = SampleLoop::new(&config()).run_cycle(&mut hw, &mut CollectSink::default());
    assert_eq!(
        first.particulates,
        ParticulateReading { pm1_0: 6.0, pm2_5: 12.0, pm10_0: 18.0 }
    );
}

// ── Gases ─────────────────────────────────────────────────────

#[test]
fn gases_are_missing_until_calibrated() {
    let mut sl = SampleLoop::new(&config());
    let mut hw = MockSensors::new().with_adc(2000);
    let mut sink = CollectSink::default();

    let before = sl.run_cycle(&mut hw, &mut sink);
    assert_eq!(before.gases, [None, None, None]);

    let mut time = MockTime::default();
    let plan = CalibrationPlan::new(3, 1000, CalibrationPolicy::IncludeAll).unwrap();
    sl.calibrate(&mut hw, &mut time, &plan);

    let after = sl.run_cycle(&mut hw, &mut sink);
    // Same air as during calibration → ratio equals the clean-air ratio.
    let co2 = after.gases[1].unwrap();
    let expected = 110.47 * 3.6f32.powf(-2.862);
    assert!((co2 - expected).abs() / expected < 1e-3, "co2 = {co2}");
    assert!(after.gases.iter().all(Option::is_some));
}

#[test]
fn failed_gas_channel_is_missing_but_others_report() {
    let mut sl = SampleLoop::new(&config());
    let mut hw = MockSensors::new().with_adc(2000);
    let mut time = MockTime::default();
    let plan = CalibrationPlan::new(1, 0, CalibrationPolicy::IncludeAll).unwrap();
    sl.calibrate(&mut hw, &mut time, &plan);

    hw.adc.insert(4, None);
    let s = sl.run_cycle(&mut hw, &mut CollectSink::default());
    assert_eq!(s.gases[0], None);
    assert!(s.gases[1].is_some());
    assert!(s.gases[2].is_some());
}

// ── Climate / clock ───────────────────────────────────────────

#[test]
fn climate_and_clock_failures_become_missing_fields() {
    let mut sl = SampleLoop::new(&config());
    let mut hw = MockSensors::new().with_adc(2000);
    hw.climate = Err(SensorError::Timeout);
    hw.rtc_fail = true;

    let s = sl.run_cycle(&mut hw, &mut CollectSink::default());
    assert_eq!(s.temperature_c, None);
    assert_eq!(s.humidity_pct, None);
    assert_eq!(s.timestamp, None);
}

#[test]
fn sample_carries_climate_and_timestamp() {
    let mut sl = SampleLoop::new(&config());
    let mut hw = MockSensors::new().with_adc(2000);
    let t = ClockState::new(2019, 12, 25, 12, 30, 2);
    hw.rtc = Some(t);

    let s = sl.run_cycle(&mut hw, &mut CollectSink::default());
    assert_eq!(s.temperature_c, Some(22.5));
    assert_eq!(s.humidity_pct, Some(41.0));
    assert_eq!(s.timestamp, Some(t));
}

#[test]
fn each_cycle_reads_every_gas_channel_once() {
    let mut sl = SampleLoop::new(&config());
    let mut hw = MockSensors::new().with_adc(2000);
    sl.run_cycle(&mut hw, &mut CollectSink::default());
    let per_update = config().adc.samples_per_update as u32;
    assert_eq!(hw.adc_reads, 3 * per_update);
}
