//! A scriptable stand-in for the attoDRY control library.
//!
//! The simulator implements the full [`AttoDryDevice`] capability set with
//! a small in-memory device model: readiness after a number of polls, a
//! setpoint that only becomes visible after a few calls, a valve, a pump,
//! and a logging session. Tests script failures per operation and inspect
//! the recorded call sequence afterwards. Misuse of the capability set,
//! such as operating while disconnected, panics; this is a test interface,
//! so the panic is justified.

use std::collections::HashMap;

use measurements::Temperature;

use crate::{AttoDryDevice, AttoDryError, DeviceModel, LogInterval, LogMode, ValveState};

/// One operation of the capability set.
///
/// Used to script failures and to assert on the recorded call sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    /// [`AttoDryDevice::begin`]
    Begin,
    /// [`AttoDryDevice::connect`]
    Connect,
    /// [`AttoDryDevice::disconnect`]
    Disconnect,
    /// [`AttoDryDevice::end`]
    End,
    /// [`AttoDryDevice::is_device_initialised`]
    IsDeviceInitialised,
    /// [`AttoDryDevice::is_device_connected`]
    IsDeviceConnected,
    /// [`AttoDryDevice::set_user_temperature`]
    SetUserTemperature,
    /// [`AttoDryDevice::get_user_temperature`]
    GetUserTemperature,
    /// [`AttoDryDevice::get_sample_temperature`]
    GetSampleTemperature,
    /// [`AttoDryDevice::get_4k_stage_temperature`]
    Get4kStageTemperature,
    /// [`AttoDryDevice::get_reservoir_temperature`]
    GetReservoirTemperature,
    /// [`AttoDryDevice::get_proportional_gain`]
    GetProportionalGain,
    /// [`AttoDryDevice::set_proportional_gain`]
    SetProportionalGain,
    /// [`AttoDryDevice::toggle_sample_space_valve`]
    ToggleSampleSpaceValve,
    /// [`AttoDryDevice::get_sample_space_valve`]
    GetSampleSpaceValve,
    /// [`AttoDryDevice::toggle_pump`]
    TogglePump,
    /// [`AttoDryDevice::is_pumping`]
    IsPumping,
    /// [`AttoDryDevice::start_logging`]
    StartLogging,
    /// [`AttoDryDevice::stop_logging`]
    StopLogging,
    /// [`AttoDryDevice::get_error_status`]
    GetErrorStatus,
    /// [`AttoDryDevice::get_error_message`]
    GetErrorMessage,
}

impl SimOp {
    /// The trait method name for this operation.
    pub fn name(self) -> &'static str {
        match self {
            SimOp::Begin => "begin",
            SimOp::Connect => "connect",
            SimOp::Disconnect => "disconnect",
            SimOp::End => "end",
            SimOp::IsDeviceInitialised => "is_device_initialised",
            SimOp::IsDeviceConnected => "is_device_connected",
            SimOp::SetUserTemperature => "set_user_temperature",
            SimOp::GetUserTemperature => "get_user_temperature",
            SimOp::GetSampleTemperature => "get_sample_temperature",
            SimOp::Get4kStageTemperature => "get_4k_stage_temperature",
            SimOp::GetReservoirTemperature => "get_reservoir_temperature",
            SimOp::GetProportionalGain => "get_proportional_gain",
            SimOp::SetProportionalGain => "set_proportional_gain",
            SimOp::ToggleSampleSpaceValve => "toggle_sample_space_valve",
            SimOp::GetSampleSpaceValve => "get_sample_space_valve",
            SimOp::TogglePump => "toggle_pump",
            SimOp::IsPumping => "is_pumping",
            SimOp::StartLogging => "start_logging",
            SimOp::StopLogging => "stop_logging",
            SimOp::GetErrorStatus => "get_error_status",
            SimOp::GetErrorMessage => "get_error_message",
        }
    }
}

/// Bookkeeping for an active logging session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    /// Path of the log file.
    pub path: String,
    /// Capture interval of the session.
    pub interval: LogInterval,
    /// Whether the session overwrites or appends.
    pub mode: LogMode,
}

/// A simulated attoDRY for tests and demos.
///
/// The device starts disconnected with the sample space at room
/// temperature, the valve closed, and no error condition. Readiness and
/// setpoint settling are deliberate delays: the device reports itself
/// initialized only after a configurable number of polls, and a user
/// temperature setpoint becomes visible only on the n-th capability call
/// after the set, mirroring the status-message round trip of the real
/// instrument.
///
/// # Example
///
/// ```
/// use attodry_client::{AttoDryDevice, DeviceModel, SimAttoDry, SimOp};
///
/// let mut device = SimAttoDry::new();
/// device.fail_with(SimOp::Connect, 7);
///
/// device.begin(DeviceModel::AttoDry800).unwrap();
/// let err = device.connect("COM6").unwrap_err();
/// assert_eq!(err.exit_code(), 7);
/// ```
pub struct SimAttoDry {
    begun: bool,
    connected: bool,
    last_port: Option<String>,
    polls_until_ready: u32,
    polls_seen: u32,
    user_temperature: Temperature,
    pending_setpoint: Option<(Temperature, u32)>,
    settle_calls: u32,
    sample_temperature: Temperature,
    stage_temperature: Temperature,
    reservoir_temperature: Temperature,
    proportional_gain: f64,
    sample_space_valve: ValveState,
    valve_toggles: u32,
    pumping: bool,
    log_target: Option<LogTarget>,
    error_status: u8,
    error_message: String,
    failures: HashMap<SimOp, i32>,
    calls: Vec<SimOp>,
}

impl SimAttoDry {
    /// Create a new simulated device in its idle state.
    pub fn new() -> Self {
        SimAttoDry {
            begun: false,
            connected: false,
            last_port: None,
            polls_until_ready: 3,
            polls_seen: 0,
            user_temperature: Temperature::from_kelvin(295.0),
            pending_setpoint: None,
            settle_calls: 4,
            sample_temperature: Temperature::from_kelvin(295.0),
            stage_temperature: Temperature::from_kelvin(4.2),
            reservoir_temperature: Temperature::from_kelvin(4.5),
            proportional_gain: 25.0,
            sample_space_valve: ValveState::Closed,
            valve_toggles: 0,
            pumping: false,
            log_target: None,
            error_status: 0,
            error_message: String::new(),
            failures: HashMap::new(),
            calls: Vec::new(),
        }
    }

    /// Script the given operation to fail with a device error code.
    ///
    /// The failure is sticky: every call of the operation fails until the
    /// simulator is dropped.
    pub fn fail_with(&mut self, op: SimOp, code: i32) {
        self.failures.insert(op, code);
    }

    /// Number of readiness polls before the device reports initialized.
    pub fn set_polls_until_ready(&mut self, polls: u32) {
        self.polls_until_ready = polls;
    }

    /// On which capability call after a set the user temperature setpoint
    /// becomes visible.
    pub fn set_settle_calls(&mut self, calls: u32) {
        self.settle_calls = calls;
    }

    /// Script the device error status byte and error message.
    pub fn set_device_error(&mut self, status: u8, message: &str) {
        self.error_status = status;
        self.error_message = message.to_string();
    }

    /// The recorded call sequence so far.
    pub fn calls(&self) -> &[SimOp] {
        &self.calls
    }

    /// How often the given operation was called, failed calls included.
    pub fn call_count(&self, op: SimOp) -> usize {
        self.calls.iter().filter(|&&c| c == op).count()
    }

    /// Whether the control server is running.
    pub fn begun(&self) -> bool {
        self.begun
    }

    /// Whether a connection is currently open.
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// The port name of the last connect call.
    pub fn last_port(&self) -> Option<&str> {
        self.last_port.as_deref()
    }

    /// The user temperature as the device currently reports it.
    pub fn user_temperature(&self) -> Temperature {
        self.user_temperature
    }

    /// Current state of the sample space valve.
    pub fn sample_space_valve(&self) -> ValveState {
        self.sample_space_valve
    }

    /// How often the sample space valve was toggled.
    pub fn valve_toggle_count(&self) -> u32 {
        self.valve_toggles
    }

    /// The active logging session, if any.
    pub fn log_target(&self) -> Option<&LogTarget> {
        self.log_target.as_ref()
    }

    /// Record an operation, fail it if scripted, and advance the device
    /// model one step.
    fn call(&mut self, op: SimOp) -> Result<(), AttoDryError> {
        self.calls.push(op);
        if let Some(code) = self.failures.get(&op).copied() {
            return Err(AttoDryError::DeviceCall {
                call: op.name(),
                code,
            });
        }
        self.settle_setpoint();
        Ok(())
    }

    /// Bring a pending setpoint one call closer to being visible.
    fn settle_setpoint(&mut self) {
        if let Some((value, remaining)) = self.pending_setpoint {
            if remaining <= 1 {
                self.user_temperature = value;
                self.pending_setpoint = None;
            } else {
                self.pending_setpoint = Some((value, remaining - 1));
            }
        }
    }

    fn require_connected(&self, call: &'static str) {
        assert!(self.connected, "{call} called while not connected");
    }
}

impl Default for SimAttoDry {
    fn default() -> Self {
        SimAttoDry::new()
    }
}

impl AttoDryDevice for SimAttoDry {
    fn begin(&mut self, _model: DeviceModel) -> Result<(), AttoDryError> {
        assert!(
            !self.begun,
            "begin called while the control server is already running"
        );
        self.call(SimOp::Begin)?;
        self.begun = true;
        Ok(())
    }

    fn connect(&mut self, port: &str) -> Result<(), AttoDryError> {
        assert!(self.begun, "connect called before begin");
        self.call(SimOp::Connect)?;
        self.connected = true;
        self.last_port = Some(port.to_string());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), AttoDryError> {
        self.call(SimOp::Disconnect)?;
        self.connected = false;
        Ok(())
    }

    fn end(&mut self) -> Result<(), AttoDryError> {
        self.call(SimOp::End)?;
        self.begun = false;
        Ok(())
    }

    fn is_device_initialised(&mut self) -> Result<bool, AttoDryError> {
        self.require_connected("is_device_initialised");
        self.call(SimOp::IsDeviceInitialised)?;
        self.polls_seen += 1;
        Ok(self.polls_seen >= self.polls_until_ready)
    }

    fn is_device_connected(&mut self) -> Result<bool, AttoDryError> {
        self.call(SimOp::IsDeviceConnected)?;
        Ok(self.connected)
    }

    fn set_user_temperature(&mut self, temperature: Temperature) -> Result<(), AttoDryError> {
        self.require_connected("set_user_temperature");
        self.call(SimOp::SetUserTemperature)?;
        self.pending_setpoint = Some((temperature, self.settle_calls));
        Ok(())
    }

    fn get_user_temperature(&mut self) -> Result<Temperature, AttoDryError> {
        self.require_connected("get_user_temperature");
        self.call(SimOp::GetUserTemperature)?;
        Ok(self.user_temperature)
    }

    fn get_sample_temperature(&mut self) -> Result<Temperature, AttoDryError> {
        self.require_connected("get_sample_temperature");
        self.call(SimOp::GetSampleTemperature)?;
        Ok(self.sample_temperature)
    }

    fn get_4k_stage_temperature(&mut self) -> Result<Temperature, AttoDryError> {
        self.require_connected("get_4k_stage_temperature");
        self.call(SimOp::Get4kStageTemperature)?;
        Ok(self.stage_temperature)
    }

    fn get_reservoir_temperature(&mut self) -> Result<Temperature, AttoDryError> {
        self.require_connected("get_reservoir_temperature");
        self.call(SimOp::GetReservoirTemperature)?;
        Ok(self.reservoir_temperature)
    }

    fn get_proportional_gain(&mut self) -> Result<f64, AttoDryError> {
        self.require_connected("get_proportional_gain");
        self.call(SimOp::GetProportionalGain)?;
        Ok(self.proportional_gain)
    }

    fn set_proportional_gain(&mut self, gain: f64) -> Result<(), AttoDryError> {
        self.require_connected("set_proportional_gain");
        self.call(SimOp::SetProportionalGain)?;
        self.proportional_gain = gain;
        Ok(())
    }

    fn toggle_sample_space_valve(&mut self) -> Result<(), AttoDryError> {
        self.require_connected("toggle_sample_space_valve");
        self.call(SimOp::ToggleSampleSpaceValve)?;
        self.sample_space_valve = self.sample_space_valve.toggled();
        self.valve_toggles += 1;
        Ok(())
    }

    fn get_sample_space_valve(&mut self) -> Result<ValveState, AttoDryError> {
        self.require_connected("get_sample_space_valve");
        self.call(SimOp::GetSampleSpaceValve)?;
        Ok(self.sample_space_valve)
    }

    fn toggle_pump(&mut self) -> Result<(), AttoDryError> {
        self.require_connected("toggle_pump");
        self.call(SimOp::TogglePump)?;
        self.pumping = !self.pumping;
        Ok(())
    }

    fn is_pumping(&mut self) -> Result<bool, AttoDryError> {
        self.require_connected("is_pumping");
        self.call(SimOp::IsPumping)?;
        Ok(self.pumping)
    }

    fn start_logging(
        &mut self,
        path: &str,
        interval: LogInterval,
        mode: LogMode,
    ) -> Result<(), AttoDryError> {
        self.require_connected("start_logging");
        assert!(
            self.log_target.is_none(),
            "start_logging called while a logging session is active"
        );
        self.call(SimOp::StartLogging)?;
        self.log_target = Some(LogTarget {
            path: path.to_string(),
            interval,
            mode,
        });
        Ok(())
    }

    fn stop_logging(&mut self) -> Result<(), AttoDryError> {
        self.require_connected("stop_logging");
        assert!(
            self.log_target.is_some(),
            "stop_logging called with no active logging session"
        );
        self.call(SimOp::StopLogging)?;
        self.log_target = None;
        Ok(())
    }

    fn get_error_status(&mut self) -> Result<u8, AttoDryError> {
        self.require_connected("get_error_status");
        self.call(SimOp::GetErrorStatus)?;
        Ok(self.error_status)
    }

    fn get_error_message(&mut self, max_len: usize) -> Result<String, AttoDryError> {
        self.require_connected("get_error_message");
        self.call(SimOp::GetErrorMessage)?;
        let mut message = self.error_message.clone();
        if message.len() > max_len {
            let mut cut = max_len;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        Ok(message)
    }
}

// Tests of internal functionality; the capability set itself is covered by
// the integration tests.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_countdown() {
        let mut sim = SimAttoDry::new();
        sim.pending_setpoint = Some((Temperature::from_kelvin(77.0), 2));

        sim.settle_setpoint();
        assert!(sim.pending_setpoint.is_some());
        assert_eq!(sim.user_temperature.as_kelvin(), 295.0);

        sim.settle_setpoint();
        assert!(sim.pending_setpoint.is_none());
        assert_eq!(sim.user_temperature.as_kelvin(), 77.0);
    }

    #[test]
    fn test_message_cap_respects_char_boundary() {
        let mut sim = SimAttoDry::new();
        sim.connected = true;
        sim.set_device_error(1, "ab\u{00e9}cd");

        // The cap falls inside the two-byte character, which is dropped.
        let message = sim.get_error_message(3).unwrap();
        assert_eq!(message, "ab");
    }
}
