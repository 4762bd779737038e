//! Acme window event messages.
//!
//! Each message on a window's `event` file is
//! `c1 c2 q0 ' ' q1 ' ' flag ' ' nr ' ' text '\n'` where `text` is exactly
//! `nr` runes and may itself contain newlines. Flag bit 2 means one more
//! message follows carrying the expansion of a null selection; flag bit 8
//! means two more follow carrying a chorded argument and its location.

use std::collections::VecDeque;

use crate::error::{BridgeError, Result};

/// Acme handles the event itself (built-in command or simple look).
pub const FLAG_BUILTIN: u32 = 1;
/// An expansion message follows.
pub const FLAG_EXPANDED: u32 = 2;
/// Argument and location messages follow.
pub const FLAG_CHORDED: u32 = 8;

/// One message exactly as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub c1: char,
    pub c2: char,
    pub q0: usize,
    pub q1: usize,
    pub flag: u32,
    pub text: String,
}

/// A complete event with any follow-up messages folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Who caused it: `M` mouse, `K` keyboard, `E` body/tag file, `F` other file.
    pub c1: char,
    /// What happened: `x`/`X` execute, `l`/`L` look, `i`/`I` insert, `d`/`D` delete.
    /// Lowercase for the tag, uppercase for the body.
    pub c2: char,
    pub q0: usize,
    pub q1: usize,
    /// Addresses from the first message, used when handing the event back.
    pub orig_q0: usize,
    pub orig_q1: usize,
    pub flag: u32,
    pub text: String,
    pub arg: String,
    pub loc: String,
}

impl Event {
    /// Builds a single-message event.
    pub fn new(c1: char, c2: char, q0: usize, q1: usize, flag: u32, text: impl Into<String>) -> Self {
        Self {
            c1,
            c2,
            q0,
            q1,
            orig_q0: q0,
            orig_q1: q1,
            flag,
            text: text.into(),
            arg: String::new(),
            loc: String::new(),
        }
    }

    /// The message that returns this event to Acme for default handling.
    pub fn write_back_message(&self) -> String {
        format!("{}{}{} {} \n", self.c1, self.c2, self.orig_q0, self.orig_q1)
    }
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        Event::new(raw.c1, raw.c2, raw.q0, raw.q1, raw.flag, raw.text)
    }
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

fn parse_number(buf: &[u8], pos: &mut usize) -> Result<Option<usize>> {
    let start = *pos;
    while *pos < buf.len() && buf[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == buf.len() {
        return Ok(None);
    }
    if buf[*pos] != b' ' || *pos == start {
        return Err(BridgeError::Acme(format!(
            "malformed event field: {:?}",
            String::from_utf8_lossy(&buf[start..=*pos])
        )));
    }
    let value = std::str::from_utf8(&buf[start..*pos])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| BridgeError::Acme("event number out of range".to_string()))?;
    *pos += 1;
    Ok(Some(value))
}

/// Parses one message from the front of `buf`.
///
/// Returns `Ok(None)` when `buf` holds only part of a message, otherwise the
/// message and the number of bytes it used.
pub fn parse_raw_event(buf: &[u8]) -> Result<Option<(RawEvent, usize)>> {
    if buf.len() < 2 {
        return Ok(None);
    }
    if !buf[0].is_ascii() || !buf[1].is_ascii() {
        return Err(BridgeError::Acme("event origin/type must be ASCII".to_string()));
    }
    let c1 = buf[0] as char;
    let c2 = buf[1] as char;
    let mut pos = 2;

    let mut fields = [0usize; 4];
    for field in fields.iter_mut() {
        match parse_number(buf, &mut pos)? {
            Some(n) => *field = n,
            None => return Ok(None),
        }
    }
    let [q0, q1, flag, nr] = fields;

    let text_start = pos;
    for _ in 0..nr {
        if pos >= buf.len() {
            return Ok(None);
        }
        pos += utf8_width(buf[pos]);
    }
    if pos >= buf.len() {
        return Ok(None);
    }
    let text = std::str::from_utf8(&buf[text_start..pos])
        .map_err(|e| BridgeError::Acme(format!("event text is not UTF-8: {}", e)))?
        .to_string();
    if buf[pos] != b'\n' {
        return Err(BridgeError::Acme(format!(
            "event text longer than {} runes",
            nr
        )));
    }

    let flag = u32::try_from(flag).map_err(|_| BridgeError::Acme("event flag too large".to_string()))?;
    Ok(Some((
        RawEvent {
            c1,
            c2,
            q0,
            q1,
            flag,
            text,
        },
        pos + 1,
    )))
}

/// Incremental decoder over the bytes of an `event` file.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buf: Vec<u8>,
    pending: VecDeque<RawEvent>,
    /// Dropping input until the newline that ends a malformed message.
    resyncing: bool,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn drain_messages(&mut self) {
        let mut consumed = 0;
        loop {
            if self.resyncing {
                match self.buf[consumed..].iter().position(|&b| b == b'\n') {
                    Some(end) => {
                        consumed += end + 1;
                        self.resyncing = false;
                    }
                    None => {
                        consumed = self.buf.len();
                        break;
                    }
                }
            }
            match parse_raw_event(&self.buf[consumed..]) {
                Ok(Some((raw, used))) => {
                    self.pending.push_back(raw);
                    consumed += used;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Skipping malformed acme event: {}", e);
                    self.resyncing = true;
                }
            }
        }
        self.buf.drain(..consumed);
    }

    /// Next complete event, or `None` until more bytes arrive. A malformed
    /// message is dropped through its trailing newline.
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        self.drain_messages();

        let Some(first) = self.pending.front() else {
            return Ok(None);
        };
        let mut needed = 1;
        if first.flag & FLAG_EXPANDED != 0 {
            needed += 1;
        }
        if first.flag & FLAG_CHORDED != 0 {
            needed += 2;
        }
        if self.pending.len() < needed {
            return Ok(None);
        }

        let Some(first) = self.pending.pop_front() else {
            return Ok(None);
        };
        let mut event = Event::from(first);

        if event.flag & FLAG_EXPANDED != 0 {
            if let Some(expansion) = self.pending.pop_front() {
                if event.q0 == event.q1 {
                    let (orig_q0, orig_q1, flag) = (event.orig_q0, event.orig_q1, event.flag);
                    event = Event::from(expansion);
                    event.orig_q0 = orig_q0;
                    event.orig_q1 = orig_q1;
                    event.flag = flag;
                }
            }
        }
        if event.flag & FLAG_CHORDED != 0 {
            if let (Some(arg), Some(loc)) = (self.pending.pop_front(), self.pending.pop_front()) {
                event.arg = arg.text;
                event.loc = loc.text;
            }
        }

        Ok(Some(event))
    }
}
