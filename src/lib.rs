//! A Rust client for the attoCube attoDRY cryostat control interface.
//!
//! The attoDRY family of cryostats is controlled through a closed-source
//! vendor library that owns the wire protocol entirely. This crate models
//! that library as a capability trait, [`AttoDryDevice`], and provides a
//! [`Session`] runner that drives one full device lifecycle through it:
//! begin, connect, wait for initialization, set a user temperature, cycle
//! the sample space valve, read the proportional gain, log telemetry to a
//! file, read back status and error information, and tear everything down
//! again. Any failing call aborts the remaining sequence.
//!
//! Since no open implementation of the vendor protocol exists, the crate
//! ships with [`SimAttoDry`], a scriptable simulator that implements the
//! same trait. It is used by the test suite and by the bundled binary, and
//! it is the seam where a binding to the real vendor library would plug in.
//!
//! # Example
//!
//! ```
//! use std::{io::Cursor, time::Duration};
//!
//! use attodry_client::{Session, SessionConfig, SimAttoDry};
//!
//! let mut config = SessionConfig::default();
//! // The default delays mirror the real instrument; zero them for the demo.
//! config.valve_delay = Duration::ZERO;
//! config.log_capture_delay = Duration::ZERO;
//! config.poll_interval = Duration::ZERO;
//!
//! let mut session = Session::new(SimAttoDry::new(), config);
//! let mut input = Cursor::new("COM6\nE:\\myLog.txt\n77\n");
//! let mut output = Vec::new();
//! session.run(&mut input, &mut output).unwrap();
//!
//! let printed = String::from_utf8(output).unwrap();
//! assert!(printed.contains("GetUserTemperature 77"));
//! ```

#![warn(missing_docs)]

mod interface;
mod session;
mod simulator;

pub use interface::{AttoDryDevice, DeviceModel, LogInterval, LogMode, ValveState};
pub use session::{Session, SessionConfig};
pub use simulator::{LogTarget, SimAttoDry, SimOp};

use thiserror::Error;

/// The error enum for the attoDRY client.
///
/// Device calls fail with a bare error code, which is all the vendor
/// interface exposes. [`AttoDryError`] makes it easy to propagate failures
/// with the `?` operator; the session runner maps them to the process exit
/// status via [`AttoDryError::exit_code`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttoDryError {
    /// A call into the device control interface returned a non-zero error
    /// code. The code carries no further structure.
    #[error("Device call '{call}' failed with error code {code}")]
    DeviceCall {
        /// Name of the failed call.
        call: &'static str,
        /// The error code reported by the control interface.
        code: i32,
    },
    /// Error when reading from or writing to the console. See
    /// [`std::io::Error`] for more details.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AttoDryError {
    /// The process exit status for this error.
    ///
    /// Device errors forward their code unchanged; console I/O errors map
    /// to a generic 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            AttoDryError::DeviceCall { code, .. } => *code,
            AttoDryError::Io(_) => 1,
        }
    }
}
