// sie-netif: concrete NetBackend implementations per OS family.
//
// Each backend drives the native interface tooling (`ip` on Linux,
// `ifconfig` on FreeBSD) through a CommandRunner seam so the command
// sequences are testable without touching the host.

pub mod cmd;
pub mod freebsd;
pub mod linux;

pub use cmd::{CommandOutput, CommandRunner, ShellRunner};
pub use freebsd::FreebsdBackend;
pub use linux::LinuxBackend;

use sie_core::{NetBackend, UpdateError};

/// Select the backend for the running operating system, once at
/// startup.
pub fn detect() -> Result<Box<dyn NetBackend>, UpdateError> {
    match std::env::consts::OS {
        "linux" => Ok(Box::new(LinuxBackend::new())),
        "freebsd" => Ok(Box::new(FreebsdBackend::new())),
        os => Err(UpdateError::UnsupportedOs { os: os.into() }),
    }
}
