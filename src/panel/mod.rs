//! The panel variable sampler.
//!
//! External commands are run on their configured intervals; their stdout is
//! drained into per-command buffers and complete `KEY value` lines are
//! committed to a shared variable table consumed by status widgets. A
//! command configured with an assignment target instead commits the last
//! complete line as that variable's value.
use crate::{util, Result};
use std::{
    collections::HashMap,
    io::Read,
    os::fd::{AsRawFd, RawFd},
    process::Child,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// Longest interval a failing command is backed off to.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// The shared variable table.
#[derive(Debug, Default, Clone)]
pub struct VarData {
    vars: HashMap<String, String>,
}

impl VarData {
    /// The value of `var`, empty when it was never set.
    pub fn get(&self, var: &str) -> &str {
        self.vars.get(var).map(String::as_str).unwrap_or("")
    }

    /// Set `var` to `value`.
    pub fn set(&mut self, var: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(var.into(), value.into());
    }

    /// Number of set variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True when no variable has been set.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Configuration of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The command line to run
    pub command: String,
    /// How often to run it
    pub interval: Duration,
    /// When set, the last complete output line is committed to this
    /// variable instead of parsing `KEY value` records
    pub assign: Option<String>,
}

impl CommandSpec {
    /// A `KEY value` producing command on the given interval.
    pub fn new(command: impl Into<String>, interval: Duration) -> Self {
        Self {
            command: command.into(),
            interval,
            assign: None,
        }
    }

    /// A command committing its last output line to `var`.
    pub fn assigned(command: impl Into<String>, interval: Duration, var: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            interval,
            assign: Some(var.into()),
        }
    }
}

#[derive(Debug)]
struct CommandState {
    spec: CommandSpec,
    next_due: Instant,
    // doubled on spawn failure, reset on success
    current_interval: Duration,
    child: Option<Child>,
    buf: String,
}

/// The external command table and its scheduling state.
#[derive(Debug, Default)]
pub struct ExternalCommandData {
    commands: Vec<CommandState>,
    var_data: VarData,
}

impl ExternalCommandData {
    /// Build the command table; every command is due immediately.
    pub fn new(specs: Vec<CommandSpec>) -> Self {
        let now = Instant::now();
        let commands = specs
            .into_iter()
            .map(|spec| CommandState {
                current_interval: spec.interval,
                spec,
                next_due: now,
                child: None,
                buf: String::new(),
            })
            .collect();

        Self {
            commands,
            var_data: VarData::default(),
        }
    }

    /// The current variable table.
    pub fn var_data(&self) -> &VarData {
        &self.var_data
    }

    /// When the next command is due, for the outer poll deadline.
    pub fn next_due(&self) -> Option<Instant> {
        self.commands.iter().map(|c| c.next_due).min()
    }

    /// Launch every command whose next-due time has passed.
    ///
    /// A command whose previous run is still in flight is skipped and its
    /// next run pushed out one interval (at most one in-flight instance per
    /// command). A spawn failure doubles the command's interval up to
    /// [MAX_BACKOFF].
    pub fn tick(&mut self, now: Instant) {
        for cmd in self.commands.iter_mut() {
            if cmd.next_due > now {
                continue;
            }

            if cmd.child.is_some() {
                debug!(command = %cmd.spec.command, "previous run still in flight: skipping");
                cmd.next_due = now + cmd.current_interval;
                continue;
            }

            match util::spawn_piped(&cmd.spec.command) {
                Ok(child) => {
                    cmd.child = Some(child);
                    cmd.current_interval = cmd.spec.interval;
                }
                Err(e) => {
                    cmd.current_interval = (cmd.current_interval * 2).min(MAX_BACKOFF);
                    warn!(
                        command = %cmd.spec.command,
                        %e,
                        backoff = ?cmd.current_interval,
                        "failed to spawn sampler command"
                    );
                }
            }

            cmd.next_due = now + cmd.current_interval;
        }
    }

    /// The stdout descriptors of all in-flight commands, for the outer
    /// poll set.
    pub fn pollable_fds(&self) -> Vec<RawFd> {
        self.commands
            .iter()
            .filter_map(|c| c.child.as_ref())
            .filter_map(|child| child.stdout.as_ref())
            .map(|out| out.as_raw_fd())
            .collect()
    }

    /// Drain any command whose stdout descriptor is in `ready`, committing
    /// complete lines and reaping finished children.
    pub fn drain_ready(&mut self, ready: &[RawFd]) -> Result<()> {
        for i in 0..self.commands.len() {
            let is_ready = matches!(
                self.commands[i]
                    .child
                    .as_ref()
                    .and_then(|c| c.stdout.as_ref())
                    .map(|out| out.as_raw_fd()),
                Some(fd) if ready.contains(&fd)
            );
            if !is_ready {
                continue;
            }

            let mut chunk = [0u8; 4096];
            let n = match self.commands[i]
                .child
                .as_mut()
                .and_then(|c| c.stdout.as_mut())
            {
                Some(out) => out.read(&mut chunk)?,
                None => continue,
            };

            if n == 0 {
                // EOF: reap the child and flush any trailing partial line
                if let Some(mut child) = self.commands[i].child.take() {
                    let _ = child.wait();
                }
                self.commands[i].buf.clear();
            } else {
                let data = String::from_utf8_lossy(&chunk[..n]).into_owned();
                let assign = self.commands[i].spec.assign.clone();
                let mut buf = std::mem::take(&mut self.commands[i].buf);
                append(&mut buf, &data, assign.as_deref(), &mut self.var_data);
                self.commands[i].buf = buf;
            }
        }

        Ok(())
    }

    /// Interrupt every in-flight command with SIGINT and await each one
    /// with a bounded deadline.
    pub fn shutdown(&mut self) {
        let deadline = Instant::now() + Duration::from_secs(2);

        for cmd in self.commands.iter_mut() {
            if let Some(mut child) = cmd.child.take() {
                let _ = util::interrupt(&child);

                loop {
                    match child.try_wait() {
                        Ok(Some(_)) => break,
                        Ok(None) if Instant::now() < deadline => {
                            std::thread::sleep(Duration::from_millis(20));
                        }
                        _ => {
                            let _ = child.kill();
                            let _ = child.wait();
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Run the sampler loop until `keep_running` returns false.
    ///
    /// Single threaded: every iteration launches due commands, polls the
    /// in-flight stdout descriptors with the next-due time as the deadline
    /// and drains whatever became readable.
    pub fn run<F>(&mut self, mut keep_running: F) -> Result<()>
    where
        F: FnMut(&VarData) -> bool,
    {
        use nix::poll::{poll, PollFd, PollFlags};

        while keep_running(&self.var_data) {
            let now = Instant::now();
            self.tick(now);

            let fds = self.pollable_fds();
            let timeout_ms: i32 = self
                .next_due()
                .map(|due| {
                    due.saturating_duration_since(Instant::now())
                        .as_millis()
                        .min(i32::MAX as u128) as i32
                })
                .unwrap_or(1000);

            if fds.is_empty() {
                std::thread::sleep(Duration::from_millis(timeout_ms.max(1) as u64));
                continue;
            }

            let mut poll_fds: Vec<PollFd> = fds
                .iter()
                .map(|&fd| PollFd::new(fd, PollFlags::POLLIN))
                .collect();
            match poll(&mut poll_fds, timeout_ms) {
                Ok(n) if n > 0 => {
                    let ready: Vec<_> = poll_fds
                        .iter()
                        .zip(fds.iter())
                        .filter(|(p, _)| {
                            p.revents()
                                .map(|r| {
                                    r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP)
                                })
                                .unwrap_or(false)
                        })
                        .map(|(_, &fd)| fd)
                        .collect();
                    self.drain_ready(&ready)?;
                }
                Ok(_) => (),
                Err(nix::errno::Errno::EINTR) => (),
                Err(e) => {
                    warn!(%e, "sampler poll failed");
                }
            }
        }

        self.shutdown();

        Ok(())
    }

    #[cfg(test)]
    fn append_for_test(&mut self, index: usize, data: &str) {
        let assign = self.commands[index].spec.assign.clone();
        let mut buf = std::mem::take(&mut self.commands[index].buf);
        append(&mut buf, data, assign.as_deref(), &mut self.var_data);
        self.commands[index].buf = buf;
    }
}

/// Append command output to `buf`, committing every complete line.
///
/// With an assignment target each complete line overwrites the target
/// variable, so the last complete line wins. Without one, lines are parsed
/// as `KEY value` records; lines without a key are ignored. Partial lines
/// remain buffered.
pub(crate) fn append(buf: &mut String, data: &str, assign: Option<&str>, vars: &mut VarData) {
    buf.push_str(data);

    while let Some(nl) = buf.find('\n') {
        let line = buf[..nl].to_string();
        buf.drain(..=nl);

        match assign {
            Some(var) => vars.set(var, line),
            None => {
                if let Some((key, value)) = line.split_once(' ') {
                    if !key.is_empty() {
                        vars.set(key, value);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(assign: Option<&str>) -> ExternalCommandData {
        let spec = match assign {
            Some(var) => CommandSpec::assigned("true", Duration::from_secs(1), var),
            None => CommandSpec::new("true", Duration::from_secs(1)),
        };

        ExternalCommandData::new(vec![spec])
    }

    #[test]
    fn append_without_newline_commits_nothing() {
        let mut ecd = table(None);

        ecd.append_for_test(0, "var value");

        assert_eq!(ecd.var_data().get("var"), "");
    }

    #[test]
    fn append_commits_single_line() {
        let mut ecd = table(None);

        ecd.append_for_test(0, "var single\n");

        assert_eq!(ecd.var_data().get("var"), "single");
    }

    #[test]
    fn append_commits_multiple_lines() {
        let mut ecd = table(None);

        ecd.append_for_test(0, "var1 1\nvar2 2\nvar3 3\n");

        assert_eq!(ecd.var_data().get("var1"), "1");
        assert_eq!(ecd.var_data().get("var2"), "2");
        assert_eq!(ecd.var_data().get("var3"), "3");
    }

    #[test]
    fn partial_line_completes_across_appends() {
        let mut ecd = table(None);

        ecd.append_for_test(0, "var val");
        ecd.append_for_test(0, "ue\n");

        assert_eq!(ecd.var_data().get("var"), "value");
    }

    #[test]
    fn assign_ignores_incomplete_line() {
        let mut ecd = table(Some("var"));

        ecd.append_for_test(0, "incomplete line");

        assert_eq!(ecd.var_data().get("var"), "");
    }

    #[test]
    fn assign_commits_whole_line() {
        let mut ecd = table(Some("var"));

        ecd.append_for_test(0, "single line\n");

        assert_eq!(ecd.var_data().get("var"), "single line");
    }

    #[test]
    fn assign_last_complete_line_wins() {
        let mut ecd = table(Some("var"));

        ecd.append_for_test(0, "first line\nsecond line\n");

        assert_eq!(ecd.var_data().get("var"), "second line");
    }

    #[test]
    fn assign_partial_then_lines() {
        let mut ecd = table(Some("var"));

        ecd.append_for_test(0, "partial");
        ecd.append_for_test(0, "first\nsecond\n");

        assert_eq!(ecd.var_data().get("var"), "second");
    }

    #[test]
    fn in_flight_commands_are_skipped() {
        let now = Instant::now();
        let mut ecd = ExternalCommandData::new(vec![CommandSpec::new(
            "sleep 10",
            Duration::from_secs(1),
        )]);

        // simulate an in-flight child
        ecd.commands[0].child = Some(util::spawn_piped("sleep 10").unwrap());
        ecd.commands[0].next_due = now;

        ecd.tick(now);

        // still only the original child, next run pushed out one interval
        assert!(ecd.commands[0].child.is_some());
        assert_eq!(ecd.commands[0].next_due, now + Duration::from_secs(1));

        ecd.shutdown();
    }

    #[test]
    fn spawn_failure_doubles_interval_up_to_cap() {
        let mut now = Instant::now();
        let mut ecd = ExternalCommandData::new(vec![CommandSpec::new(
            "/nonexistent/quay-sampler-cmd",
            Duration::from_secs(100),
        )]);

        ecd.tick(now);
        assert_eq!(ecd.commands[0].current_interval, Duration::from_secs(200));

        now = ecd.commands[0].next_due;
        ecd.tick(now);
        assert_eq!(ecd.commands[0].current_interval, MAX_BACKOFF);
    }

    #[test]
    fn run_commits_last_complete_line_to_assign_target() {
        let mut ecd = ExternalCommandData::new(vec![CommandSpec::assigned(
            "printf first\\nsecond\\n",
            Duration::from_secs(1),
            "var",
        )]);

        let mut iterations = 0;
        ecd.run(|vars| {
            iterations += 1;
            iterations < 20 && vars.get("var") != "second"
        })
        .unwrap();

        assert_eq!(ecd.var_data().get("var"), "second");
    }

    #[test]
    fn next_due_is_earliest_command() {
        let mut ecd = ExternalCommandData::new(vec![
            CommandSpec::new("a", Duration::from_secs(5)),
            CommandSpec::new("b", Duration::from_secs(1)),
        ]);
        let now = Instant::now();
        ecd.commands[0].next_due = now + Duration::from_secs(5);
        ecd.commands[1].next_due = now + Duration::from_secs(1);

        assert_eq!(ecd.next_due(), Some(now + Duration::from_secs(1)));
    }
}
