//! Tests for the session runner, driven against the simulated attoDRY.

use std::{io::Cursor, time::Duration};

use rstest::*;

use attodry_client::{
    AttoDryError, Session, SessionConfig, SimAttoDry, SimOp, ValveState,
};

const INPUT: &str = "COM6\nE:\\log.txt\n77\n";

/// Session configuration with all delays removed so tests run instantly.
fn fast_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.valve_delay = Duration::ZERO;
    config.log_capture_delay = Duration::ZERO;
    config.poll_interval = Duration::ZERO;
    config
}

/// Run one full session and return the result, the device, and everything
/// that was printed.
fn run_session(
    device: SimAttoDry,
    input: &str,
) -> (Result<(), AttoDryError>, SimAttoDry, String) {
    let mut session = Session::new(device, fast_config());
    let mut input = Cursor::new(input.to_string());
    let mut output = Vec::new();
    let result = session.run(&mut input, &mut output);
    (
        result,
        session.into_device(),
        String::from_utf8(output).unwrap(),
    )
}

/// The full success scenario prints the exact line sequence scripted
/// consumers rely on.
#[rstest]
fn test_success_scenario_output() {
    let mut device = SimAttoDry::new();
    device.set_device_error(0, "No errors");

    let (result, device, output) = run_session(device, INPUT);
    result.unwrap();

    let expected = "\
Enter the COM port (e.g. COM6)
Enter the file for logging e.g. E:\\myLog.txt
Begin
Connected
running
Enter desired user temperature (4 to 300K)
GetUserTemperature 295
GetProportionalGain 25
GetAttodryErrorStatus 0
GetUserTemperature 77
GetAttodryErrorMessage No errors
Disconnected
Ended
";
    assert_eq!(output, expected);

    assert_eq!(device.last_port(), Some("COM6"));
    assert_eq!(device.call_count(SimOp::Disconnect), 1);
    assert_eq!(device.call_count(SimOp::End), 1);
}

/// Two valve toggles leave the valve in its original state.
#[rstest]
fn test_valve_cycle_is_net_idempotent() {
    let (result, device, _) = run_session(SimAttoDry::new(), INPUT);
    result.unwrap();

    assert_eq!(device.valve_toggle_count(), 2);
    assert_eq!(device.sample_space_valve(), ValveState::Closed);
}

/// Logging is started exactly once and stopped after the start, never the
/// other way around.
#[rstest]
fn test_logging_starts_before_stop() {
    let (result, device, _) = run_session(SimAttoDry::new(), INPUT);
    result.unwrap();

    assert_eq!(device.call_count(SimOp::StartLogging), 1);
    assert_eq!(device.call_count(SimOp::StopLogging), 1);
    let start = device
        .calls()
        .iter()
        .position(|&op| op == SimOp::StartLogging)
        .unwrap();
    let stop = device
        .calls()
        .iter()
        .position(|&op| op == SimOp::StopLogging)
        .unwrap();
    assert!(start < stop);
    assert!(device.log_target().is_none());
}

/// Any post-connect failure tears the session down exactly once and
/// forwards the device error code.
#[rstest]
#[case(SimOp::IsDeviceInitialised)]
#[case(SimOp::SetUserTemperature)]
#[case(SimOp::GetUserTemperature)]
#[case(SimOp::ToggleSampleSpaceValve)]
#[case(SimOp::GetProportionalGain)]
#[case(SimOp::StartLogging)]
#[case(SimOp::GetErrorStatus)]
#[case(SimOp::StopLogging)]
#[case(SimOp::GetErrorMessage)]
fn test_failure_tears_down_once(#[case] op: SimOp) {
    let mut device = SimAttoDry::new();
    device.fail_with(op, 9);

    let (result, device, output) = run_session(device, INPUT);
    let err = result.unwrap_err();

    assert_eq!(err.exit_code(), 9);
    assert_eq!(device.call_count(op), 1);
    assert_eq!(device.call_count(SimOp::Disconnect), 1);
    assert_eq!(device.call_count(SimOp::End), 1);
    assert!(output.ends_with("Disconnected\nEnded\n"));
}

/// A failed logging start means stop is never attempted.
#[rstest]
fn test_no_stop_after_failed_start() {
    let mut device = SimAttoDry::new();
    device.fail_with(SimOp::StartLogging, 5);

    let (result, device, _) = run_session(device, INPUT);
    assert_eq!(result.unwrap_err().exit_code(), 5);
    assert_eq!(device.call_count(SimOp::StopLogging), 0);
}

/// A failed begin only ends the server; nothing past the prompts is
/// printed.
#[rstest]
fn test_begin_failure_ends_server_only() {
    let mut device = SimAttoDry::new();
    device.fail_with(SimOp::Begin, 2);

    let (result, device, output) = run_session(device, INPUT);
    assert_eq!(result.unwrap_err().exit_code(), 2);
    assert_eq!(device.call_count(SimOp::End), 1);
    assert_eq!(device.call_count(SimOp::Disconnect), 0);
    assert!(!output.contains("Begin"));
}

/// A failed connect aborts with no teardown at all; the last printed line
/// is "Begin".
#[rstest]
fn test_connect_failure_skips_teardown() {
    let mut device = SimAttoDry::new();
    device.fail_with(SimOp::Connect, 3);

    let (result, device, output) = run_session(device, INPUT);
    assert_eq!(result.unwrap_err().exit_code(), 3);
    assert_eq!(device.call_count(SimOp::Disconnect), 0);
    assert_eq!(device.call_count(SimOp::End), 0);
    assert!(output.ends_with("Begin\n"));
    assert!(!output.contains("Connected"));
}

/// Non-numeric temperature input falls back to 0 K instead of aborting.
#[rstest]
fn test_lenient_temperature_parsing() {
    let (result, device, output) = run_session(SimAttoDry::new(), "COM6\nE:\\log.txt\nwarm\n");
    result.unwrap();

    assert_eq!(device.user_temperature().as_kelvin(), 0.0);
    assert!(output.contains("GetUserTemperature 0\n"));
}

/// The printed error message never exceeds the configured cap.
#[rstest]
fn test_error_message_capped() {
    let mut config = fast_config();
    config.error_message_capacity = 10;

    let mut device = SimAttoDry::new();
    device.set_device_error(0, "0123456789ABCDEF");

    let mut session = Session::new(device, config);
    let mut input = Cursor::new(INPUT.to_string());
    let mut output = Vec::new();
    session.run(&mut input, &mut output).unwrap();

    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("GetAttodryErrorMessage 0123456789\n"));
    assert!(!output.contains("ABCDEF"));
}
