//! Utility functions for use in other parts of quay
use crate::{Error, Result};
use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use std::process::{Child, Command, Stdio};
use tracing::info;

/// Run an external command, detached.
///
/// The command line is split on whitespace and the process stdout and
/// stderr are redirected to /dev/null.
pub fn spawn<S: Into<String>>(cmd: S) -> Result<()> {
    let s = cmd.into();
    let mut parts = s.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| Error::Raw("empty command".into()))?;

    Command::new(program)
        .args(parts)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    Ok(())
}

/// Run an external command with its stdout piped back to us.
///
/// The caller owns the returned [Child]: its stdout descriptor joins the
/// main poll set and the child is reaped on EOF.
pub fn spawn_piped(cmd: &str) -> std::io::Result<Child> {
    info!(?cmd, "spawning subprocess with piped stdout");
    let parts: Vec<&str> = cmd.split_whitespace().collect();
    if parts.len() > 1 {
        Command::new(parts[0])
            .args(&parts[1..])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
    } else {
        Command::new(parts[0])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
    }
}

/// Send SIGINT to a child process, asking it to wind down.
pub fn interrupt(child: &Child) -> Result<()> {
    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT)
        .map_err(|e| Error::Raw(format!("unable to signal child: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_piped_captures_output() {
        let mut child = spawn_piped("echo hello").unwrap();
        let mut out = String::new();

        use std::io::Read;
        child
            .stdout
            .take()
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        child.wait().unwrap();

        assert_eq!(out, "hello\n");
    }

    #[test]
    fn spawn_missing_binary_is_an_error() {
        assert!(spawn("/nonexistent/quay-test-binary").is_err());
    }

    #[test]
    fn spawn_empty_command_is_an_error() {
        assert!(spawn("   ").is_err());
    }
}
