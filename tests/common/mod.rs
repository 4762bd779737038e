//! Shared fixtures: an in-memory Acme and a scripted ycmd.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use acme_ide::acme::{Acme, AcmeWindow, Event, LogEvent, LogReader, WinFile, WinInfo};
use acme_ide::session::{Session, YcmdSettings};
use acme_ide::{BridgeError, Result, YcmdClient};

pub const SECRET: &str = "p0dvfvuavPGx5vvQTsimYQ==";

// ============================================================================
// Fake Acme
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FakeWindow {
    pub name: String,
    pub tag: String,
    pub body: String,
    pub dirty: bool,
    pub dot: (usize, usize),
    pub events: VecDeque<Event>,
    /// Unreadable events reported before the scripted ones.
    pub garbled: usize,
    /// Refuse write-backs of anything but mouse events, as Acme does.
    pub mouse_only_write_back: bool,
    pub errors: String,
    pub ctl: Vec<String>,
    pub addrs: Vec<String>,
    pub written_events: Vec<Event>,
    pub data_writes: usize,
    pub open_count: usize,
    pub released: usize,
}

impl FakeWindow {
    pub fn new(name: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: format!("{} Del Snarf | Look ", name),
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn dirty(mut self) -> Self {
        self.dirty = true;
        self
    }

    pub fn with_dot(mut self, q0: usize, q1: usize) -> Self {
        self.dot = (q0, q1);
        self
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events.into();
        self
    }

    pub fn with_garbled(mut self, count: usize) -> Self {
        self.garbled = count;
        self
    }

    pub fn mouse_only_write_back(mut self) -> Self {
        self.mouse_only_write_back = true;
        self
    }
}

#[derive(Default)]
struct FakeState {
    windows: BTreeMap<usize, FakeWindow>,
    plumbed: Vec<String>,
    log_tx: Option<mpsc::UnboundedSender<LogEvent>>,
    log_rx: Option<mpsc::UnboundedReceiver<LogEvent>>,
}

/// Records everything the bridge does to the editor. Clones share state.
#[derive(Clone)]
pub struct FakeAcme {
    state: Arc<Mutex<FakeState>>,
}

impl FakeAcme {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = FakeState {
            log_tx: Some(tx),
            log_rx: Some(rx),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn add_window(&self, id: usize, window: FakeWindow) {
        self.state.lock().unwrap().windows.insert(id, window);
    }

    pub fn window(&self, id: usize) -> FakeWindow {
        self.state.lock().unwrap().windows[&id].clone()
    }

    pub fn plumbed(&self) -> Vec<String> {
        self.state.lock().unwrap().plumbed.clone()
    }

    /// Announces a window in `acme/log`.
    pub fn log_new(&self, id: usize, window: FakeWindow) {
        let name = window.name.clone();
        self.add_window(id, window);
        self.push_log(LogEvent {
            id,
            op: "new".to_string(),
            name,
        });
    }

    pub fn push_log(&self, entry: LogEvent) {
        if let Some(tx) = &self.state.lock().unwrap().log_tx {
            let _ = tx.send(entry);
        }
    }

    /// Ends the log stream, as when Acme exits.
    pub fn close_log(&self) {
        self.state.lock().unwrap().log_tx = None;
    }
}

#[async_trait]
impl Acme for FakeAcme {
    async fn windows(&self) -> Result<Vec<WinInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .windows
            .iter()
            .map(|(id, w)| WinInfo {
                id: *id,
                name: w.name.clone(),
                dirty: w.dirty,
            })
            .collect())
    }

    async fn log(&self) -> Result<Box<dyn LogReader>> {
        let rx = self
            .state
            .lock()
            .unwrap()
            .log_rx
            .take()
            .ok_or_else(|| BridgeError::Acme("log already open".to_string()))?;
        Ok(Box::new(FakeLog { rx }))
    }

    async fn open(&self, id: usize) -> Result<Box<dyn AcmeWindow>> {
        let mut state = self.state.lock().unwrap();
        let window = state
            .windows
            .get_mut(&id)
            .ok_or_else(|| BridgeError::Acme(format!("no window {}", id)))?;
        window.open_count += 1;
        Ok(Box::new(FakeHandle {
            id,
            state: self.state.clone(),
        }))
    }

    async fn plumb(&self, location: &str) -> Result<()> {
        self.state.lock().unwrap().plumbed.push(location.to_string());
        Ok(())
    }
}

struct FakeLog {
    rx: mpsc::UnboundedReceiver<LogEvent>,
}

#[async_trait]
impl LogReader for FakeLog {
    async fn next(&mut self) -> Result<Option<LogEvent>> {
        Ok(self.rx.recv().await)
    }
}

struct FakeHandle {
    id: usize,
    state: Arc<Mutex<FakeState>>,
}

impl FakeHandle {
    fn with<T>(&self, f: impl FnOnce(&mut FakeWindow) -> T) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        let window = state
            .windows
            .get_mut(&self.id)
            .ok_or_else(|| BridgeError::Acme(format!("window {} deleted", self.id)))?;
        Ok(f(window))
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        let _ = self.with(|w| w.released += 1);
    }
}

#[async_trait]
impl AcmeWindow for FakeHandle {
    fn id(&self) -> usize {
        self.id
    }

    async fn read(&mut self, file: WinFile) -> Result<Vec<u8>> {
        self.with(|w| match file {
            WinFile::Tag => Ok(w.tag.clone().into_bytes()),
            WinFile::Body => Ok(w.body.clone().into_bytes()),
            WinFile::Errors => Ok(w.errors.clone().into_bytes()),
            WinFile::Ctl => Ok(format!(
                "{:>11} {:>11} {:>11} {:>11} {:>11} {:>11} /lib/font/bit/lucsans/euro.8.font 4 ",
                self.id,
                w.tag.chars().count(),
                w.body.chars().count(),
                0,
                if w.dirty { 1 } else { 0 },
                600
            )
            .into_bytes()),
            other => Err(BridgeError::Acme(format!("fake cannot read {}", other.as_str()))),
        })?
    }

    async fn write(&mut self, file: WinFile, data: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(data).into_owned();
        self.with(|w| match file {
            WinFile::Tag => {
                w.tag.push_str(&text);
                Ok(())
            }
            WinFile::Data => {
                // Only whole-body replacement is modelled.
                if w.addrs.last().map(String::as_str) == Some(",") {
                    w.body = text;
                    w.dirty = true;
                    w.data_writes += 1;
                    Ok(())
                } else {
                    Err(BridgeError::Acme("data write without addr ,".to_string()))
                }
            }
            WinFile::Ctl => {
                if let Some(name) = text.strip_prefix("name ") {
                    w.name = name.trim().to_string();
                } else if text == "clean" {
                    w.dirty = false;
                }
                w.ctl.push(text);
                Ok(())
            }
            WinFile::Errors => {
                w.errors.push_str(&text);
                Ok(())
            }
            other => Err(BridgeError::Acme(format!("fake cannot write {}", other.as_str()))),
        })?
    }

    async fn set_addr(&mut self, addr: &str) -> Result<()> {
        self.with(|w| w.addrs.push(addr.to_string()))
    }

    async fn dot(&mut self) -> Result<(usize, usize)> {
        self.with(|w| w.dot)
    }

    async fn next_event(&mut self) -> Result<Option<Event>> {
        self.with(|w| {
            if w.garbled > 0 {
                w.garbled -= 1;
                return Err(BridgeError::Acme("malformed event field: \"x\"".to_string()));
            }
            Ok(w.events.pop_front())
        })?
    }

    async fn write_event(&mut self, event: &Event) -> Result<()> {
        self.with(|w| {
            if w.mouse_only_write_back && event.c1 != 'M' {
                return Err(BridgeError::Acme("bad event syntax".to_string()));
            }
            w.written_events.push(event.clone());
            Ok(())
        })?
    }
}

// ============================================================================
// Scripted ycmd
// ============================================================================

/// One HTTP request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub hmac: Option<String>,
    pub body: Vec<u8>,
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0;
    let mut hmac = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("x-ycm-hmac") {
                hmac = Some(value.to_string());
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(SeenRequest {
        method,
        path,
        hmac,
        body: buf[header_end..].to_vec(),
    })
}

/// Serves `responses` (status, JSON body) in order, one per connection, and
/// records what it was asked.
pub async fn spawn_mock_ycmd(responses: Vec<(u16, String)>) -> (u16, Arc<Mutex<Vec<SeenRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let port = listener.local_addr().expect("local addr").port();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.expect("accept");
            if let Some(request) = read_request(&mut socket).await {
                record.lock().unwrap().push(request);
            }
            let reason = if status == 200 { "OK" } else { "Internal Server Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (port, seen)
}

/// A client signed with the golden secret, pointed at `port`.
pub fn client_for_port(port: u16) -> YcmdClient {
    let session = Session::from_base64_secret(YcmdSettings::default(), SECRET).expect("secret");
    session.set_port(port);
    YcmdClient::new(Arc::new(session), Duration::from_secs(5)).expect("client")
}
