//! The editor side: what this crate needs from Acme.
//!
//! [`Acme`] and [`AcmeWindow`] are the only way the IDE logic touches the
//! editor. [`plan9::Plan9Acme`] implements them on top of plan9port.

pub mod event;
pub mod plan9;

pub use event::{Event, EventDecoder, RawEvent, FLAG_BUILTIN, FLAG_CHORDED, FLAG_EXPANDED};
pub use plan9::Plan9Acme;

use async_trait::async_trait;

use crate::error::{BridgeError, Result};

/// Files in a window's directory (`acme/<id>/<file>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WinFile {
    Addr,
    Body,
    Ctl,
    Data,
    Errors,
    Event,
    Tag,
}

impl WinFile {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinFile::Addr => "addr",
            WinFile::Body => "body",
            WinFile::Ctl => "ctl",
            WinFile::Data => "data",
            WinFile::Errors => "errors",
            WinFile::Event => "event",
            WinFile::Tag => "tag",
        }
    }
}

/// A row of `acme/index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinInfo {
    pub id: usize,
    pub name: String,
    pub dirty: bool,
}

/// A line of `acme/log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub id: usize,
    pub op: String,
    pub name: String,
}

impl LogEvent {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches('\n');
        let mut parts = line.splitn(3, ' ');
        let id = parts
            .next()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| BridgeError::Acme(format!("bad log line: {:?}", line)))?;
        let op = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BridgeError::Acme(format!("bad log line: {:?}", line)))?;
        let name = parts.next().unwrap_or("");
        Ok(Self {
            id,
            op: op.to_string(),
            name: name.to_string(),
        })
    }
}

/// Parses `acme/index`: five numeric columns followed by the tag.
///
/// The window name is the tag's first word; a tag that starts with a blank
/// belongs to an unnamed window.
pub fn parse_index(content: &str) -> Vec<WinInfo> {
    content.lines().filter_map(parse_index_line).collect()
}

fn parse_index_line(line: &str) -> Option<WinInfo> {
    let mut rest = line;
    let mut columns = [0usize; 5];
    for column in columns.iter_mut() {
        rest = rest.trim_start_matches(' ');
        let end = rest.find(' ').unwrap_or(rest.len());
        *column = rest[..end].parse().ok()?;
        rest = &rest[end..];
    }
    let tag = rest.strip_prefix(' ').unwrap_or(rest);
    let name = if tag.starts_with(char::is_whitespace) {
        ""
    } else {
        tag.split_whitespace().next().unwrap_or("")
    };
    Some(WinInfo {
        id: columns[0],
        name: name.to_string(),
        dirty: columns[4] == 1,
    })
}

/// Parses a window's `ctl` line and reports the dirty column.
pub fn parse_ctl_dirty(content: &str) -> Result<bool> {
    content
        .split_whitespace()
        .nth(4)
        .map(|field| field == "1")
        .ok_or_else(|| BridgeError::Acme(format!("short ctl line: {:?}", content)))
}

/// A stream of window lifecycle notifications.
#[async_trait]
pub trait LogReader: Send {
    /// Next entry, or `None` once Acme has gone away.
    async fn next(&mut self) -> Result<Option<LogEvent>>;
}

/// The running editor.
#[async_trait]
pub trait Acme: Send + Sync {
    async fn windows(&self) -> Result<Vec<WinInfo>>;

    async fn log(&self) -> Result<Box<dyn LogReader>>;

    /// Opens a window for exclusive event handling.
    async fn open(&self, id: usize) -> Result<Box<dyn AcmeWindow>>;

    /// Sends `location` (e.g. `/a.py:3-+#1`) to the plumber.
    async fn plumb(&self, location: &str) -> Result<()>;
}

/// One open window. Dropping it releases everything it holds.
#[async_trait]
pub trait AcmeWindow: Send {
    fn id(&self) -> usize;

    async fn read(&mut self, file: WinFile) -> Result<Vec<u8>>;

    async fn write(&mut self, file: WinFile, data: &[u8]) -> Result<()>;

    /// Sets the window's addr by evaluating `addr` against it.
    async fn set_addr(&mut self, addr: &str) -> Result<()>;

    /// Current selection as rune offsets into the body.
    async fn dot(&mut self) -> Result<(usize, usize)>;

    /// Next event, or `None` when the window has closed.
    async fn next_event(&mut self) -> Result<Option<Event>>;

    /// Hands an event back to Acme unchanged.
    async fn write_event(&mut self, event: &Event) -> Result<()>;

    async fn ctl(&mut self, message: &str) -> Result<()> {
        self.write(WinFile::Ctl, message.as_bytes()).await
    }

    async fn is_dirty(&mut self) -> Result<bool> {
        let ctl = self.read(WinFile::Ctl).await?;
        parse_ctl_dirty(&String::from_utf8_lossy(&ctl))
    }

    async fn write_errors(&mut self, text: &str) -> Result<()> {
        self.write(WinFile::Errors, text.as_bytes()).await
    }
}
