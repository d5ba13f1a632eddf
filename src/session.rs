//! The session runner that drives one full attoDRY device lifecycle.
//!
//! The sequence is strictly linear: collect the port and log path, begin
//! the control server, connect, poll until the device is initialized, set
//! a user temperature, cycle the sample space valve, read the proportional
//! gain, log telemetry for a while, read back status and error text, and
//! tear down. Every failing device call aborts the remaining sequence.

use std::{
    io::{BufRead, Write},
    thread,
    time::Duration,
};

use measurements::Temperature;

use crate::{AttoDryDevice, AttoDryError, DeviceModel, LogInterval, LogMode};

/// Configuration for a [`Session`].
///
/// The defaults match the instrument's pace: one second between the valve
/// toggles and ten seconds of telemetry capture before the second
/// temperature read.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The device model the control server is started for.
    pub model: DeviceModel,
    /// Delay after each sample space valve toggle.
    pub valve_delay: Duration,
    /// How long the log accumulates samples before the second temperature
    /// read.
    pub log_capture_delay: Duration,
    /// Pause between readiness polls while waiting for the device to
    /// initialize. The wait itself is unbounded.
    pub poll_interval: Duration,
    /// Telemetry capture interval for the logging session.
    pub log_interval: LogInterval,
    /// Whether logging replaces or extends an existing file.
    pub log_mode: LogMode,
    /// Upper bound, in bytes, for the device error message.
    pub error_message_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            model: DeviceModel::AttoDry800,
            valve_delay: Duration::from_secs(1),
            log_capture_delay: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            log_interval: LogInterval::OneSecond,
            log_mode: LogMode::Overwrite,
            error_message_capacity: 500,
        }
    }
}

/// One control session with an attoDRY device.
///
/// The session owns the device handle for its whole lifetime, so there is
/// exactly one place that can release it. [`Session::run`] performs the
/// complete sequence once; see the crate documentation for an example.
pub struct Session<T: AttoDryDevice> {
    device: T,
    config: SessionConfig,
}

impl<T: AttoDryDevice> Session<T> {
    /// Create a new session for the given device handle.
    ///
    /// # Arguments
    /// * `device` - Anything implementing the [`AttoDryDevice`] capability
    ///   set, e.g., the [`crate::SimAttoDry`] simulator.
    /// * `config` - Timing and logging configuration for the run.
    pub fn new(device: T, config: SessionConfig) -> Self {
        Session { device, config }
    }

    /// Consume the session and hand the device handle back.
    ///
    /// Mostly useful in tests to inspect a simulator after a run.
    pub fn into_device(self) -> T {
        self.device
    }

    /// Run the full device lifecycle once.
    ///
    /// Prompts for the COM port, the log file path, and the desired user
    /// temperature on `input`, and prints the status lines of the sequence
    /// to `out`. A non-numeric temperature silently falls back to 0 K.
    ///
    /// On any device failure the session disconnects and ends the control
    /// server exactly once and returns the failing call's error, with two
    /// deliberate exceptions: a failing begin only ends the server, and a
    /// failing connect performs no teardown at all. Scripted consumers of
    /// the status lines rely on both.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: &mut R,
        out: &mut W,
    ) -> Result<(), AttoDryError> {
        let port = prompt(input, out, "Enter the COM port (e.g. COM6)")?;
        let log_path = prompt(input, out, r"Enter the file for logging e.g. E:\myLog.txt")?;

        if let Err(e) = self.device.begin(self.config.model) {
            // The server never came up; end it without disconnecting.
            let _ = self.device.end();
            return Err(e);
        }
        writeln!(out, "Begin")?;

        // A failed connect aborts with the server still running. Scripted
        // consumers of the status lines depend on nothing being printed
        // past this point.
        self.device.connect(&port)?;
        writeln!(out, "Connected")?;

        while !self.checked(out, |d| d.is_device_initialised())? {
            thread::sleep(self.config.poll_interval);
        }
        writeln!(out, "running")?;

        let desired = prompt(input, out, "Enter desired user temperature (4 to 300K)")?;
        let desired = Temperature::from_kelvin(desired.trim().parse().unwrap_or(0.0));
        self.checked(out, |d| d.set_user_temperature(desired))?;

        // The device applies the setpoint on its own schedule, so this
        // read still reports the previous value.
        let temperature = self.checked(out, |d| d.get_user_temperature())?;
        writeln!(out, "GetUserTemperature {}", temperature.as_kelvin())?;

        // Open and close the sample space valve again; two toggles leave
        // the valve where it started.
        self.checked(out, |d| d.toggle_sample_space_valve())?;
        thread::sleep(self.config.valve_delay);
        self.checked(out, |d| d.toggle_sample_space_valve())?;
        thread::sleep(self.config.valve_delay);

        let gain = self.checked(out, |d| d.get_proportional_gain())?;
        writeln!(out, "GetProportionalGain {gain}")?;

        let (interval, mode) = (self.config.log_interval, self.config.log_mode);
        self.checked(out, |d| d.start_logging(&log_path, interval, mode))?;

        let status = self.checked(out, |d| d.get_error_status())?;
        writeln!(out, "GetAttodryErrorStatus {status}")?;

        // Let the log accumulate some samples before reading back.
        thread::sleep(self.config.log_capture_delay);

        let temperature = self.checked(out, |d| d.get_user_temperature())?;
        writeln!(out, "GetUserTemperature {}", temperature.as_kelvin())?;

        self.checked(out, |d| d.stop_logging())?;

        let capacity = self.config.error_message_capacity;
        let message = self.checked(out, |d| d.get_error_message(capacity))?;
        writeln!(out, "GetAttodryErrorMessage {message}")?;

        self.close_server(out)
    }

    /// Run a device call and tear the session down if it fails.
    ///
    /// Teardown errors never mask the original failure.
    fn checked<W, F, V>(&mut self, out: &mut W, call: F) -> Result<V, AttoDryError>
    where
        W: Write,
        F: FnOnce(&mut T) -> Result<V, AttoDryError>,
    {
        match call(&mut self.device) {
            Ok(value) => Ok(value),
            Err(e) => {
                let _ = self.close_server(out);
                Err(e)
            }
        }
    }

    /// Disconnect from the device and end the control server.
    ///
    /// Both calls are always attempted, so a failing disconnect cannot
    /// leak a running server; the first failure is reported.
    fn close_server<W: Write>(&mut self, out: &mut W) -> Result<(), AttoDryError> {
        let disconnected = self.device.disconnect();
        writeln!(out, "Disconnected")?;
        let ended = self.device.end();
        writeln!(out, "Ended")?;
        disconnected?;
        ended
    }
}

/// Print a prompt line and read one line of input, without the trailing
/// line break.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    message: &str,
) -> Result<String, AttoDryError> {
    writeln!(out, "{message}")?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
