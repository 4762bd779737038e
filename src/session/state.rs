//! Process-wide session shared by every window task.

use std::sync::{Mutex, MutexGuard, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;

use super::settings::YcmdSettings;
use crate::error::{BridgeError, Result};

/// Length in bytes of the generated HMAC secret.
pub const HMAC_SECRET_LENGTH: usize = 16;

/// Fills a fresh secret from the thread-local CSPRNG.
pub fn generate_secret() -> [u8; HMAC_SECRET_LENGTH] {
    let mut secret = [0u8; HMAC_SECRET_LENGTH];
    rand::rng().fill_bytes(&mut secret);
    secret
}

#[derive(Debug)]
struct SessionState {
    settings: YcmdSettings,
    secret: Vec<u8>,
    port: Option<u16>,
}

/// Secret, port and settings for the one ycmd this process talks to.
///
/// A session always holds a secret, so nothing can be signed before the
/// secret exists. The port stays unset until the server has been given one.
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(settings: YcmdSettings, secret: &[u8]) -> Self {
        let mut settings = settings;
        settings.hmac_secret = STANDARD.encode(secret);
        Self {
            state: Mutex::new(SessionState {
                settings,
                secret: secret.to_vec(),
                port: None,
            }),
        }
    }

    /// Creates a session with a freshly generated secret.
    pub fn generate(settings: YcmdSettings) -> Self {
        Self::new(settings, &generate_secret())
    }

    pub fn from_base64_secret(settings: YcmdSettings, secret: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(secret.trim())
            .map_err(|e| BridgeError::Secret(format!("secret is not valid base64: {}", e)))?;
        if bytes.is_empty() {
            return Err(BridgeError::Secret("secret is empty".to_string()));
        }
        Ok(Self::new(settings, &bytes))
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn secret(&self) -> Vec<u8> {
        self.lock().secret.clone()
    }

    pub fn set_secret(&self, secret: &[u8]) {
        let mut state = self.lock();
        state.settings.hmac_secret = STANDARD.encode(secret);
        state.secret = secret.to_vec();
    }

    /// The port ycmd listens on, once assigned.
    pub fn port(&self) -> Result<u16> {
        self.lock().port.ok_or(BridgeError::NotStarted)
    }

    pub fn set_port(&self, port: u16) {
        self.lock().port = Some(port);
    }

    pub fn base_url(&self) -> Result<String> {
        Ok(format!("http://localhost:{}", self.port()?))
    }

    pub fn settings(&self) -> YcmdSettings {
        self.lock().settings.clone()
    }

    /// Replaces the settings blob, keeping the current secret in it.
    pub fn update_settings(&self, settings: YcmdSettings) {
        let mut state = self.lock();
        let secret = STANDARD.encode(&state.secret);
        state.settings = settings;
        state.settings.hmac_secret = secret;
    }

    /// Settings serialized for ycmd's options file.
    pub fn settings_json(&self) -> Result<String> {
        let settings = self.settings();
        settings.to_json()
    }
}
