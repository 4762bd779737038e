//! [`Acme`] over plan9port's `9p` and `plumb` commands.
//!
//! One-shot reads and writes run `9p read|write acme/...`. An open window
//! keeps two helpers alive for its whole lifetime: `9p read .../event`,
//! which diverts the window's events to us, and `9p rdwr .../addr`, which
//! holds the addr file open so that `addr=dot` written to ctl survives long
//! enough to be read back. Events handed back to Acme go through a third,
//! `9p write .../event`, started on first use and restarted whenever Acme
//! refuses a message and it exits. All of them are killed when the window
//! is dropped.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::{parse_index, Acme, AcmeWindow, Event, EventDecoder, LogEvent, LogReader, WinFile, WinInfo};
use crate::error::{BridgeError, Result};

/// Runs `9p` against the `acme` service.
#[derive(Debug, Clone)]
struct NineP {
    binary: PathBuf,
    service: String,
}

impl NineP {
    fn path(&self, file: &str) -> String {
        format!("{}/{}", self.service, file)
    }

    fn command(&self, verb: &str, file: &str) -> Command {
        let mut command = Command::new(&self.binary);
        command.arg(verb).arg(self.path(file)).kill_on_drop(true);
        command
    }

    async fn read(&self, file: &str) -> Result<Vec<u8>> {
        let output = self
            .command("read", file)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(BridgeError::Acme(format!(
                "9p read {}: {}",
                self.path(file),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    async fn write(&self, file: &str, data: &[u8]) -> Result<()> {
        let mut child = self
            .command("write", file)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(data).await?;
            stdin.shutdown().await?;
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(BridgeError::Acme(format!(
                "9p write {}: {}",
                self.path(file),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn stream(&self, verb: &str, file: &str, stdin: Stdio) -> Result<Child> {
        Ok(self
            .command(verb, file)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?)
    }
}

/// A running Acme reached through plan9port.
#[derive(Debug, Clone)]
pub struct Plan9Acme {
    ninep: NineP,
    plumb: PathBuf,
}

impl Plan9Acme {
    pub fn new() -> Self {
        Self::with_binaries("9p", "plumb")
    }

    pub fn with_binaries(ninep: impl Into<PathBuf>, plumb: impl Into<PathBuf>) -> Self {
        Self {
            ninep: NineP {
                binary: ninep.into(),
                service: "acme".to_string(),
            },
            plumb: plumb.into(),
        }
    }
}

impl Default for Plan9Acme {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Acme for Plan9Acme {
    async fn windows(&self) -> Result<Vec<WinInfo>> {
        let index = self.ninep.read("index").await?;
        Ok(parse_index(&String::from_utf8_lossy(&index)))
    }

    async fn log(&self) -> Result<Box<dyn LogReader>> {
        let mut child = self.ninep.stream("read", "log", Stdio::null())?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Acme("acme/log has no stdout".to_string()))?;
        Ok(Box::new(Plan9Log {
            _child: child,
            lines: BufReader::new(stdout).lines(),
        }))
    }

    async fn open(&self, id: usize) -> Result<Box<dyn AcmeWindow>> {
        let mut addr = self.ninep.stream("rdwr", &format!("{}/addr", id), Stdio::piped())?;
        let addr_in = addr
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Acme("addr helper has no stdin".to_string()))?;
        let addr_out = addr
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Acme("addr helper has no stdout".to_string()))?;
        let mut addr_out = BufReader::new(addr_out);

        // rdwr prints the current addr once before waiting for input.
        let mut initial = String::new();
        addr_out.read_line(&mut initial).await?;

        let mut events = self.ninep.stream("read", &format!("{}/event", id), Stdio::null())?;
        let events_out = events
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Acme("event helper has no stdout".to_string()))?;

        tracing::debug!("Opened acme window {}", id);
        Ok(Box::new(Plan9Window {
            id,
            ninep: self.ninep.clone(),
            _addr_child: addr,
            addr_in,
            addr_out,
            _events_child: events,
            events_out,
            decoder: EventDecoder::new(),
            event_writer: EventWriter::default(),
        }))
    }

    async fn plumb(&self, location: &str) -> Result<()> {
        tracing::debug!("Plumbing {}", location);
        let output = Command::new(&self.plumb)
            .arg(location)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(BridgeError::Acme(format!(
                "plumb {}: {}",
                location,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

struct Plan9Log {
    _child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

#[async_trait]
impl LogReader for Plan9Log {
    async fn next(&mut self) -> Result<Option<LogEvent>> {
        match self.lines.next_line().await? {
            Some(line) => LogEvent::parse(&line).map(Some),
            None => Ok(None),
        }
    }
}

/// Long-lived `9p write` on a window's event file.
#[derive(Debug, Default)]
struct EventWriter {
    helper: Option<(Child, ChildStdin)>,
}

impl EventWriter {
    async fn send(&mut self, ninep: &NineP, file: &str, message: &[u8]) -> Result<()> {
        let running = match self.helper.take() {
            Some((mut child, stdin)) => match child.try_wait() {
                Ok(None) => Some((child, stdin)),
                _ => None,
            },
            None => None,
        };
        let (child, mut stdin) = match running {
            Some(helper) => helper,
            None => {
                let mut child = ninep
                    .command("write", file)
                    .stdin(Stdio::piped())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()?;
                let stdin = child
                    .stdin
                    .take()
                    .ok_or_else(|| BridgeError::Acme("event writer has no stdin".to_string()))?;
                (child, stdin)
            }
        };
        stdin.write_all(message).await?;
        stdin.flush().await?;
        self.helper = Some((child, stdin));
        Ok(())
    }
}

struct Plan9Window {
    id: usize,
    ninep: NineP,
    _addr_child: Child,
    addr_in: ChildStdin,
    addr_out: BufReader<ChildStdout>,
    _events_child: Child,
    events_out: ChildStdout,
    decoder: EventDecoder,
    event_writer: EventWriter,
}

impl Plan9Window {
    fn file(&self, file: WinFile) -> String {
        format!("{}/{}", self.id, file.as_str())
    }

    /// Writes one line to the addr helper and returns the addr it reads back.
    async fn exchange_addr(&mut self, line: &str) -> Result<(usize, usize)> {
        self.addr_in.write_all(line.as_bytes()).await?;
        self.addr_in.write_all(b"\n").await?;
        self.addr_in.flush().await?;

        let mut reply = String::new();
        if self.addr_out.read_line(&mut reply).await? == 0 {
            return Err(BridgeError::Acme(format!("addr helper for window {} exited", self.id)));
        }
        let mut fields = reply.split_whitespace().map(str::parse::<usize>);
        match (fields.next(), fields.next()) {
            (Some(Ok(q0)), Some(Ok(q1))) => Ok((q0, q1)),
            _ => Err(BridgeError::Acme(format!("unexpected addr reply: {:?}", reply))),
        }
    }
}

#[async_trait]
impl AcmeWindow for Plan9Window {
    fn id(&self) -> usize {
        self.id
    }

    async fn read(&mut self, file: WinFile) -> Result<Vec<u8>> {
        self.ninep.read(&self.file(file)).await
    }

    async fn write(&mut self, file: WinFile, data: &[u8]) -> Result<()> {
        self.ninep.write(&self.file(file), data).await
    }

    async fn set_addr(&mut self, addr: &str) -> Result<()> {
        self.exchange_addr(addr).await.map(|_| ())
    }

    async fn dot(&mut self) -> Result<(usize, usize)> {
        self.ctl("addr=dot").await?;
        // "." evaluates to the addr just set from dot.
        self.exchange_addr(".").await
    }

    async fn next_event(&mut self) -> Result<Option<Event>> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(event) = self.decoder.next_event()? {
                return Ok(Some(event));
            }
            let n = self.events_out.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.decoder.push(&chunk[..n]);
        }
    }

    async fn write_event(&mut self, event: &Event) -> Result<()> {
        let file = self.file(WinFile::Event);
        let message = event.write_back_message();
        self.event_writer.send(&self.ninep, &file, message.as_bytes()).await
    }
}
