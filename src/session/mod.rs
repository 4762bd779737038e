//! Session state shared between the ycmd supervisor and window tasks.
//!
//! Holds the HMAC secret, the port ycmd was started on, and the options
//! blob that is handed to ycmd at launch.

pub mod settings;
pub mod state;

pub use settings::{YcmdSettings, DEFAULT_SETTINGS_JSON};
pub use state::{generate_secret, Session, HMAC_SECRET_LENGTH};
