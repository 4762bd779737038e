pub mod acme;
pub mod config;
pub mod error;
pub mod ide;
pub mod session;
pub mod ycmd;

pub use acme::{Acme, AcmeWindow, Event, LogEvent, LogReader, Plan9Acme, WinFile, WinInfo};
pub use config::Config;
pub use error::{BridgeError, Result};
pub use ide::{
    Dispatcher, IdeCommand, IdeHandler, IdeRegistry, PythonIde, Resolution, WatchState,
    WindowClassifier, WindowKind, WindowWatcher,
};
pub use session::{Session, YcmdSettings};
pub use ycmd::{GoToResponse, Location, ServerConfig, YcmdClient, YcmdRequest, YcmdServer};
