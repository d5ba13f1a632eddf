//! The capability set exposed by the attoDRY control interface.
//!
//! The vendor library is consumed as an opaque set of blocking calls:
//! session begin/end, connect/disconnect, parameter get/set, valve
//! toggling, and logging start/stop. [`AttoDryDevice`] captures that
//! surface so the session runner can be driven against real hardware or
//! against the [`crate::SimAttoDry`] simulator.

use std::{fmt::Display, time::Duration};

use measurements::Temperature;

use crate::AttoDryError;

/// The attoDRY models supported by the control interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceModel {
    /// The attoDRY1100 cryostat.
    AttoDry1100,
    /// The attoDRY2100 cryostat.
    AttoDry2100,
    /// The attoDRY800 optical cryostat.
    AttoDry800,
}

impl Display for DeviceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceModel::AttoDry1100 => write!(f, "attoDRY1100"),
            DeviceModel::AttoDry2100 => write!(f, "attoDRY2100"),
            DeviceModel::AttoDry800 => write!(f, "attoDRY800"),
        }
    }
}

/// Telemetry capture intervals accepted by the logging facility.
///
/// These are the discrete choices the control interface offers; arbitrary
/// intervals are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogInterval {
    /// One sample per second.
    OneSecond,
    /// One sample every five seconds.
    FiveSeconds,
    /// One sample every thirty seconds.
    ThirtySeconds,
    /// One sample per minute.
    OneMinute,
    /// One sample every five minutes.
    FiveMinutes,
}

impl LogInterval {
    /// The wall-clock duration between two samples for this interval.
    pub fn duration(&self) -> Duration {
        match self {
            LogInterval::OneSecond => Duration::from_secs(1),
            LogInterval::FiveSeconds => Duration::from_secs(5),
            LogInterval::ThirtySeconds => Duration::from_secs(30),
            LogInterval::OneMinute => Duration::from_secs(60),
            LogInterval::FiveMinutes => Duration::from_secs(300),
        }
    }
}

/// Whether a new logging session replaces or extends an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Start a fresh log file, replacing any existing content.
    Overwrite,
    /// Append to the log file if it already exists.
    Append,
}

/// The state of a valve on the cryostat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    /// The valve is closed.
    Closed,
    /// The valve is open.
    Open,
}

impl ValveState {
    /// The state this valve ends up in after one toggle.
    pub fn toggled(&self) -> Self {
        match self {
            ValveState::Closed => ValveState::Open,
            ValveState::Open => ValveState::Closed,
        }
    }
}

impl Display for ValveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValveState::Closed => write!(f, "Closed"),
            ValveState::Open => write!(f, "Open"),
        }
    }
}

/// The blocking capability set of the attoDRY control interface.
///
/// Every call blocks until the device responds and returns either `Ok` or
/// an [`AttoDryError::DeviceCall`] carrying the bare error code of the
/// interface. There is no transient/permanent distinction; callers decide
/// what a failure means for them.
///
/// Two behavioral notes carried over from the vendor surface:
/// - A get after a set is not guaranteed to reflect the new value yet. The
///   device applies changes on its own schedule, observable only after a
///   device-controlled delay.
/// - Valve toggling is not idempotent. Toggling twice physically reverses
///   the valve back to its original state.
pub trait AttoDryDevice {
    /// Start the control server for the given device model.
    ///
    /// This must be called before any other command is sent or received.
    fn begin(&mut self, model: DeviceModel) -> Result<(), AttoDryError>;

    /// Connect to the attoDRY on the given COM port.
    fn connect(&mut self, port: &str) -> Result<(), AttoDryError>;

    /// Disconnect from the attoDRY. Should be called before [`Self::end`].
    fn disconnect(&mut self) -> Result<(), AttoDryError>;

    /// Stop the control server. The device should be disconnected first.
    fn end(&mut self) -> Result<(), AttoDryError>;

    /// Whether the device has finished initializing after a connect.
    ///
    /// Callers are expected to poll this until it returns `true` or fails.
    fn is_device_initialised(&mut self) -> Result<bool, AttoDryError>;

    /// Whether a device is currently connected.
    fn is_device_connected(&mut self) -> Result<bool, AttoDryError>;

    /// Set the user temperature setpoint.
    fn set_user_temperature(&mut self, temperature: Temperature) -> Result<(), AttoDryError>;

    /// Get the user temperature setpoint as the device currently knows it.
    fn get_user_temperature(&mut self) -> Result<Temperature, AttoDryError>;

    /// Get the sample temperature.
    fn get_sample_temperature(&mut self) -> Result<Temperature, AttoDryError>;

    /// Get the temperature of the 4 K stage.
    fn get_4k_stage_temperature(&mut self) -> Result<Temperature, AttoDryError>;

    /// Get the temperature of the helium reservoir.
    fn get_reservoir_temperature(&mut self) -> Result<Temperature, AttoDryError>;

    /// Get the proportional gain of the temperature control loop.
    fn get_proportional_gain(&mut self) -> Result<f64, AttoDryError>;

    /// Set the proportional gain of the temperature control loop.
    fn set_proportional_gain(&mut self, gain: f64) -> Result<(), AttoDryError>;

    /// Toggle the sample space valve.
    fn toggle_sample_space_valve(&mut self) -> Result<(), AttoDryError>;

    /// Get the current state of the sample space valve.
    fn get_sample_space_valve(&mut self) -> Result<ValveState, AttoDryError>;

    /// Toggle the pump on or off.
    fn toggle_pump(&mut self) -> Result<(), AttoDryError>;

    /// Whether the system is currently pumping.
    fn is_pumping(&mut self) -> Result<bool, AttoDryError>;

    /// Start periodic telemetry logging to the given file path.
    ///
    /// Overlapping start calls are not supported; stop an active logging
    /// session first.
    fn start_logging(
        &mut self,
        path: &str,
        interval: LogInterval,
        mode: LogMode,
    ) -> Result<(), AttoDryError>;

    /// Stop the active telemetry logging session.
    fn stop_logging(&mut self) -> Result<(), AttoDryError>;

    /// Get the device error status byte. Zero means no error.
    fn get_error_status(&mut self) -> Result<u8, AttoDryError>;

    /// Get the device error message, capped at `max_len` bytes.
    ///
    /// The returned text is truncated on a character boundary if the device
    /// reports a longer message.
    fn get_error_message(&mut self, max_len: usize) -> Result<String, AttoDryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_interval_durations() {
        assert_eq!(LogInterval::OneSecond.duration(), Duration::from_secs(1));
        assert_eq!(LogInterval::FiveSeconds.duration(), Duration::from_secs(5));
        assert_eq!(
            LogInterval::ThirtySeconds.duration(),
            Duration::from_secs(30)
        );
        assert_eq!(LogInterval::OneMinute.duration(), Duration::from_secs(60));
        assert_eq!(LogInterval::FiveMinutes.duration(), Duration::from_secs(300));
    }

    #[test]
    fn test_valve_state_toggled() {
        assert_eq!(ValveState::Closed.toggled(), ValveState::Open);
        assert_eq!(ValveState::Open.toggled(), ValveState::Closed);
        assert_eq!(ValveState::Closed.toggled().toggled(), ValveState::Closed);
    }

    #[test]
    fn test_display_impls() {
        assert_eq!(DeviceModel::AttoDry800.to_string(), "attoDRY800");
        assert_eq!(ValveState::Open.to_string(), "Open");
    }
}
