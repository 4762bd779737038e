use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Request, Url};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::hmac::{sign_base64, verify_response, HMAC_HEADER};
use super::request::YcmdRequest;
use crate::error::{BridgeError, Result};
use crate::session::Session;

pub const READY_HANDLER: &str = "ready";
pub const COMPLETER_COMMAND_HANDLER: &str = "run_completer_command";

/// Signed HTTP client for the local ycmd instance.
///
/// Cheap to clone; every clone shares the session and connection pool.
#[derive(Clone)]
pub struct YcmdClient {
    session: Arc<Session>,
    http: reqwest::Client,
}

impl YcmdClient {
    pub fn new(session: Arc<Session>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { session, http })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn handler_url(&self, handler: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.session.base_url()?, handler);
        Url::parse(&raw).map_err(|e| BridgeError::Protocol(format!("bad url {}: {}", raw, e)))
    }

    fn build(&self, method: Method, handler: &str, body: Vec<u8>) -> Result<Request> {
        let url = self.handler_url(handler)?;
        let secret = self.session.secret();
        tracing::debug!("Signing {} {}", method, url.path());
        let tag = sign_base64(method.as_str(), url.path(), &body, &secret);

        let mut builder = self
            .http
            .request(method, url)
            .header(HMAC_HEADER, tag)
            .header(CONTENT_TYPE, "application/json");
        if !body.is_empty() {
            builder = builder.body(body);
        }
        Ok(builder.build()?)
    }

    /// GET request for `handler`, signed over an empty body.
    pub fn build_get(&self, handler: &str) -> Result<Request> {
        self.build(Method::GET, handler, Vec::new())
    }

    /// POST request for `handler`, signed over exactly `body`.
    pub fn build_post(&self, handler: &str, body: Vec<u8>) -> Result<Request> {
        self.build(Method::POST, handler, body)
    }

    /// Executes a request and decodes the JSON answer.
    ///
    /// Non-success statuses become [`BridgeError::Server`] carrying ycmd's raw
    /// error payload.
    pub async fn send(&self, request: Request) -> Result<Value> {
        let response = self.http.execute(request).await?;
        let status = response.status();
        let tag = response
            .headers()
            .get(HMAC_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let blob = response.bytes().await?;
        tracing::debug!("ycmd answered {} ({} bytes)", status, blob.len());

        match tag {
            Some(tag) => {
                if !verify_response(&blob, &tag, &self.session.secret()) {
                    return Err(BridgeError::Protocol(
                        "response HMAC does not match body".to_string(),
                    ));
                }
            }
            None => tracing::debug!("ycmd response carried no {} header", HMAC_HEADER),
        }

        if !status.is_success() {
            return Err(BridgeError::Server {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&blob).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&blob)?)
    }

    pub async fn get_handler(&self, handler: &str) -> Result<Value> {
        let request = self.build_get(handler)?;
        self.send(request).await
    }

    pub async fn post_handler<T: Serialize + ?Sized>(&self, handler: &str, body: &T) -> Result<Value> {
        let body = serde_json::to_vec(body)?;
        tracing::debug!("POST /{}: {}", handler, String::from_utf8_lossy(&body));
        let request = self.build_post(handler, body)?;
        self.send(request).await
    }

    pub async fn run_completer_command(&self, request: &YcmdRequest) -> Result<Value> {
        self.post_handler(COMPLETER_COMMAND_HANDLER, request).await
    }

    /// One `/ready` probe.
    pub async fn is_ready(&self) -> Result<bool> {
        match self.get_handler(READY_HANDLER).await? {
            Value::Bool(ready) => Ok(ready),
            other => Err(BridgeError::Decode(format!("/ready returned {}", other))),
        }
    }

    /// Probes `/ready` every `interval` until ycmd answers, returning its answer.
    ///
    /// Transport failures are retried indefinitely; callers bound the wait
    /// themselves (for example by racing it against the server exiting).
    pub async fn poll_ready(&self, interval: Duration) -> bool {
        loop {
            tokio::time::sleep(interval).await;
            match self.is_ready().await {
                Ok(ready) => return ready,
                Err(e) => tracing::debug!("ycmd not ready yet: {}", e),
            }
        }
    }

    /// Pings `/ready` every `interval` until `shutdown` is cancelled, which
    /// keeps ycmd's idle-suicide timer from firing.
    pub fn spawn_keepalive(&self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("keep-alive stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        match client.is_ready().await {
                            Ok(true) => {}
                            Ok(false) => tracing::warn!("ycmd reports it is not ready"),
                            Err(e) => tracing::warn!("ycmd keep-alive failed: {}", e),
                        }
                    }
                }
            }
        })
    }
}
