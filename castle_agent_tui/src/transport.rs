//! Talks to an external game program over its standard streams.

use std::{
    ffi::OsStr,
    io::{self, BufRead, BufReader, Write},
    process::{Child, ChildStdin, Command, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::Duration,
};

use castle_agent_core::{
    Action,
    session::{Transport, TransportError},
};
use serde_json::Value;
use tracing::{debug, info};

/// A spawned game: actions go to its stdin, JSON records come from its
/// stdout.
///
/// A reader thread forwards stdout line by line so that waiting for a record
/// can time out. The child is killed when the transport is dropped.
pub struct ProcessTransport {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<io::Result<String>>,
    timeout: Duration,
}

impl ProcessTransport {
    pub fn spawn<S: AsRef<OsStr>>(program: S, args: &[String], timeout: Duration) -> io::Result<Self> {
        let program = program.as_ref();
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        info!(program = %program.to_string_lossy(), ?args, pid = child.id(), "spawned game");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("game stdin is not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("game stdout is not piped"))?;

        let (sender, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                if sender.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(ProcessTransport {
            child,
            stdin,
            lines,
            timeout,
        })
    }
}

impl Transport for ProcessTransport {
    /// Skips chatter until a line opens a JSON object, then reads lines until
    /// the object is complete.
    fn receive(&mut self) -> Result<Value, TransportError> {
        let mut buffer = String::new();
        loop {
            let line = match self.lines.recv_timeout(self.timeout) {
                Ok(line) => line?,
                Err(RecvTimeoutError::Timeout) => return Err(TransportError::Timeout(self.timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
            };

            if buffer.is_empty() && !line.trim_start().starts_with('{') {
                debug!(%line, "skipping game output");
                continue;
            }
            buffer.push_str(&line);
            buffer.push('\n');

            match serde_json::from_str(&buffer) {
                Ok(record) => return Ok(record),
                Err(err) if err.is_eof() => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn send(&mut self, action: &Action) -> Result<(), TransportError> {
        writeln!(self.stdin, "{action}")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        // The game may already have exited.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
