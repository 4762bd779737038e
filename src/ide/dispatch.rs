//! Watching windows and turning tag clicks into ycmd commands.
//!
//! Every watched window gets its own task running a [`WindowWatcher`].
//! Events within a window are handled strictly in order; a command blocks
//! that window's stream until its answer has been applied.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::classify::{is_command_event, IdeCommand, WindowClassifier};
use super::navigate::{apply_resolution, Resolution};
use super::position::{line_and_column, rune_to_byte_offset};
use super::{IdeHandler, IdeRegistry};
use crate::acme::{Acme, AcmeWindow, WinFile};
use crate::error::{BridgeError, Result};
use crate::ycmd::{YcmdClient, YcmdRequest};

/// Consecutive unreadable events tolerated before a watcher gives up.
const MAX_BAD_EVENTS: usize = 16;

/// Where a window is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Unwatched,
    Setup,
    Watching,
    Dispatching,
    Closed,
}

/// Appends `tag` to the window tag unless it is already there.
///
/// Returns whether anything was written.
pub async fn ensure_tag(win: &mut dyn AcmeWindow, tag: &str) -> Result<bool> {
    let current = win.read(WinFile::Tag).await?;
    let current = String::from_utf8_lossy(&current);
    if current.contains(tag) {
        return Ok(false);
    }
    let addition = if current.is_empty() || current.ends_with(char::is_whitespace) {
        tag.to_string()
    } else {
        format!(" {}", tag)
    };
    win.write(WinFile::Tag, addition.as_bytes()).await?;
    Ok(true)
}

/// Builds the request for `arguments` from the window's current body and dot.
pub async fn build_request(
    win: &mut dyn AcmeWindow,
    filepath: &str,
    handler: &dyn IdeHandler,
    arguments: Vec<String>,
) -> Result<YcmdRequest> {
    let body = win.read(WinFile::Body).await?;
    let body = String::from_utf8_lossy(&body).into_owned();
    let (q0, _) = win.dot().await?;
    let offset = rune_to_byte_offset(&body, q0);
    let position = line_and_column(body.as_bytes(), offset);
    tracing::debug!(
        "window {}: dot {} is line {} column {}",
        win.id(),
        q0,
        position.line,
        position.column
    );

    let mut request = YcmdRequest::new(position.line, position.column, filepath, body)
        .with_filetypes(handler.filetypes().iter().copied())
        .with_command_arguments(arguments);
    if let Some(target) = handler.completer_target() {
        request = request.with_completer_target(target);
    }
    Ok(request)
}

/// Drives one window from setup until it closes.
pub struct WindowWatcher {
    id: usize,
    name: String,
    handler: Arc<dyn IdeHandler>,
    acme: Arc<dyn Acme>,
    client: YcmdClient,
    state: WatchState,
}

impl WindowWatcher {
    pub fn new(
        id: usize,
        name: impl Into<String>,
        handler: Arc<dyn IdeHandler>,
        acme: Arc<dyn Acme>,
        client: YcmdClient,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            handler,
            acme,
            client,
            state: WatchState::Unwatched,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    fn transition(&mut self, next: WatchState) {
        tracing::debug!("window {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    /// Opens the window and makes sure our commands are in its tag.
    pub async fn setup(&mut self) -> Result<Box<dyn AcmeWindow>> {
        self.transition(WatchState::Setup);
        let mut win = self.acme.open(self.id).await?;
        if ensure_tag(win.as_mut(), self.handler.tag()).await? {
            tracing::debug!("window {}: added {} tag", self.id, self.handler.name());
        }
        Ok(win)
    }

    /// Watches until the window's event stream ends. The window is released
    /// on every return path.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!("Watching {} ({})", self.name, self.handler.name());
        let mut win = match self.setup().await {
            Ok(win) => win,
            Err(e) => {
                self.transition(WatchState::Closed);
                return Err(e);
            }
        };
        self.watch(win.as_mut()).await;
        self.transition(WatchState::Closed);
        tracing::info!("Finished watching {}", self.name);
        Ok(())
    }

    async fn watch(&mut self, win: &mut dyn AcmeWindow) {
        self.transition(WatchState::Watching);
        let mut bad_events = 0;
        loop {
            let event = match win.next_event().await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(BridgeError::Acme(e)) if bad_events < MAX_BAD_EVENTS => {
                    bad_events += 1;
                    tracing::warn!("window {}: skipping unreadable event: {}", self.id, e);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("window {}: event stream failed: {}", self.id, e);
                    break;
                }
            };
            bad_events = 0;

            if !is_command_event(&event, self.handler.commands()) {
                if let Err(e) = win.write_event(&event).await {
                    // Acme only takes back mouse events; the rest are refused.
                    if event.c1 == 'M' {
                        tracing::warn!("window {}: could not hand event back: {}", self.id, e);
                    } else {
                        tracing::debug!(
                            "window {}: {}{} event not taken back: {}",
                            self.id,
                            event.c1,
                            event.c2,
                            e
                        );
                    }
                }
                continue;
            }

            self.transition(WatchState::Dispatching);
            let command = IdeCommand::from_event(&event);
            if let Err(e) = self.dispatch(win, &command).await {
                tracing::warn!("window {}: {} failed: {}", self.id, command.command, e);
            }
            self.transition(WatchState::Watching);
        }
    }

    /// Runs one command against ycmd and applies the answer.
    pub async fn dispatch(&mut self, win: &mut dyn AcmeWindow, command: &IdeCommand) -> Result<()> {
        let Some(arguments) = self.handler.command_arguments(command) else {
            tracing::debug!(
                "window {}: nothing bound to {} {:?}",
                self.id,
                command.command,
                command.button
            );
            return Ok(());
        };

        let request = build_request(win, &self.name, self.handler.as_ref(), arguments).await?;
        let response = self.client.run_completer_command(&request).await;
        let resolution = Resolution::from_response(response);
        if let Some(name) = apply_resolution(resolution, &self.name, self.acme.as_ref(), win).await? {
            tracing::debug!("window {}: now showing {}", self.id, name);
            self.name = name;
        }
        Ok(())
    }
}

/// Finds windows worth watching and spawns a task for each.
#[derive(Clone)]
pub struct Dispatcher {
    acme: Arc<dyn Acme>,
    client: YcmdClient,
    registry: Arc<IdeRegistry>,
    classifier: Arc<WindowClassifier>,
}

impl Dispatcher {
    pub fn new(
        acme: Arc<dyn Acme>,
        client: YcmdClient,
        registry: Arc<IdeRegistry>,
        classifier: Arc<WindowClassifier>,
    ) -> Self {
        Self {
            acme,
            client,
            registry,
            classifier,
        }
    }

    /// A watcher for the window, if its kind has a handler.
    pub fn watcher_for(&self, id: usize, name: &str) -> Option<WindowWatcher> {
        let kind = self.classifier.classify(name);
        let Some(handler) = self.registry.get(kind) else {
            tracing::debug!("Ignoring window {} {:?} ({:?})", id, name, kind);
            return None;
        };
        Some(WindowWatcher::new(
            id,
            name,
            handler,
            self.acme.clone(),
            self.client.clone(),
        ))
    }

    pub fn spawn_watch(&self, id: usize, name: &str) -> Option<JoinHandle<()>> {
        let watcher = self.watcher_for(id, name)?;
        Some(tokio::spawn(async move {
            let id = watcher.id();
            if let Err(e) = watcher.run().await {
                tracing::warn!("window {}: watch ended with error: {}", id, e);
            }
        }))
    }

    /// Spawns watchers for every window open right now.
    pub async fn watch_existing(&self) -> Result<Vec<JoinHandle<()>>> {
        let windows = self.acme.windows().await?;
        tracing::info!("Found {} open windows", windows.len());
        Ok(windows
            .iter()
            .filter_map(|info| self.spawn_watch(info.id, &info.name))
            .collect())
    }

    /// Watches existing windows, then every window Acme reports as new, until
    /// Acme's log ends or `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        // Open the log first so a window created while listing is not missed.
        let mut log = self.acme.log().await?;
        let mut tasks = self.watch_existing().await?;

        loop {
            let entry = tokio::select! {
                _ = shutdown.cancelled() => {
                    for task in tasks {
                        task.abort();
                    }
                    return Ok(());
                }
                entry = log.next() => entry,
            };
            match entry {
                Ok(Some(entry)) if entry.op == "new" => {
                    tasks.retain(|task| !task.is_finished());
                    if let Some(task) = self.spawn_watch(entry.id, &entry.name) {
                        tasks.push(task);
                    }
                }
                Ok(Some(entry)) => tracing::debug!("acme log: {} {} {}", entry.id, entry.op, entry.name),
                Ok(None) => {
                    tracing::info!("Acme log closed");
                    break;
                }
                Err(BridgeError::Acme(e)) => tracing::warn!("Bad acme log entry: {}", e),
                Err(e) => {
                    for task in tasks {
                        task.abort();
                    }
                    return Err(e);
                }
            }
        }

        // Watchers end on their own once their windows close.
        for task in tasks {
            let _ = task.await;
        }
        Ok(())
    }
}
