//! Interactive attoDRY session client.
//!
//! Prompts for the COM port, the log file path, and the desired user
//! temperature, then drives one full session. The binary runs against the
//! bundled simulator; a binding to the real vendor library would implement
//! [`attodry_client::AttoDryDevice`] and slot in here unchanged.

use std::{io, process};

use attodry_client::{Session, SessionConfig, SimAttoDry};

fn main() {
    let mut session = Session::new(SimAttoDry::new(), SessionConfig::default());

    let stdin = io::stdin();
    let stdout = io::stdout();
    let result = session.run(&mut stdin.lock(), &mut stdout.lock());

    let code = match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            err.exit_code()
        }
    };
    process::exit(code);
}
