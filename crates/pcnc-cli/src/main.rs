//! Entrypoint for the `pcnc` controller command tool.
//!
//! All work is delegated to [`pcnc_cli::run`] so tests can drive the runtime
//! with substituted streams.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    pcnc_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
