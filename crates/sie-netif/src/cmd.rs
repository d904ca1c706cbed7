//! External command execution seam.
//!
//! Backends never spawn processes directly; they go through a
//! [`CommandRunner`] so tests can script command outcomes and inspect
//! the exact sequences issued.

use tracing::debug;

use sie_core::UpdateError;

/// Captured result of one external command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs an external command and captures its outcome. A non-zero exit
/// status is not an error at this level; callers that require success
/// use [`checked`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, UpdateError>;
}

/// Production runner backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, UpdateError> {
        debug!(command = %render(program, args), "running command");
        let output = std::process::Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            // A signal-terminated child has no exit code.
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a command that must succeed; non-zero exit becomes
/// [`UpdateError::CommandFailed`].
pub(crate) fn checked<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    args: &[&str],
) -> Result<CommandOutput, UpdateError> {
    let output = runner.run(program, args)?;
    if !output.success() {
        return Err(UpdateError::CommandFailed {
            command: render(program, args),
            status: output.status,
            stderr: output.stderr,
        });
    }
    Ok(output)
}

pub(crate) fn render(program: &str, args: &[&str]) -> String {
    let mut command = String::from(program);
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    command
}

// ── Test support ─────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{render, CommandOutput, CommandRunner};
    use sie_core::UpdateError;

    /// Scripted runner: responds per exact command line, records every
    /// invocation, and defaults to a clean empty success.
    #[derive(Debug, Default)]
    pub struct FakeRunner {
        responses: Mutex<HashMap<String, CommandOutput>>,
        log: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        pub fn respond(&self, command: &str, status: i32, stdout: &str) {
            self.responses.lock().unwrap().insert(
                command.into(),
                CommandOutput {
                    status,
                    stdout: stdout.into(),
                    stderr: String::new(),
                },
            );
        }

        pub fn commands(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, UpdateError> {
            let command = render(program, args);
            self.log.lock().unwrap().push(command.clone());
            Ok(self
                .responses
                .lock()
                .unwrap()
                .get(&command)
                .cloned()
                .unwrap_or_default())
        }
    }
}
