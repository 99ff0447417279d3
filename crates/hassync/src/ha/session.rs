//! Authenticated request/response session over a [`Transport`].

use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::protocol::AuthMessage;
use super::protocol::Command;
use super::protocol::Incoming;
use super::protocol::ResultEnvelope;
use super::transport::Transport;
use super::transport::WsTransport;
use crate::config::ConnectionConfig;
use crate::error::ConnectionError;
use crate::error::Error;
use crate::error::Result;

/// Path every WebSocket API address must end with
pub const API_PATH: &str = "/api/websocket";

/// Rewrite an HTTP(S) base address into the WebSocket API address.
///
/// `http://host:8123` becomes `ws://host:8123/api/websocket`; addresses that
/// already carry a WebSocket scheme or the API path are left as they are.
pub fn normalize_url(address: &str) -> String {
    let address = address.trim();
    let mut url = if let Some(rest) = address.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = address.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        address.to_string()
    };

    if !url.ends_with(API_PATH) {
        url = format!("{}{}", url.trim_end_matches('/'), API_PATH);
    }
    url
}

/// One authenticated connection to the remote registry.
///
/// Requests are strictly one at a time: `request` takes `&mut self` and does
/// not return until the reply carrying the same id has arrived.
pub struct Session<T: Transport> {
    transport: T,
    next_id: u64,
    timeout: Option<Duration>,
    ha_version: Option<String>,
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("next_id", &self.next_id)
            .field("timeout", &self.timeout)
            .field("ha_version", &self.ha_version)
            .finish_non_exhaustive()
    }
}

impl Session<WsTransport> {
    /// Connect to the configured address and authenticate.
    pub async fn open(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let url = normalize_url(&config.url);
        let timeout = config.request_timeout();
        info!("Connecting to {}", url);

        let transport = with_timeout(timeout, WsTransport::connect(&url)).await?;
        Self::handshake(transport, &config.token, timeout).await
    }
}

impl<T: Transport> Session<T> {
    /// Run the auth exchange on a freshly connected transport.
    ///
    /// The remote speaks first with an unsolicited greeting, which is
    /// discarded. Anything other than `auth_ok` in reply to our token closes
    /// the transport and fails with [`Error::Auth`].
    pub async fn handshake(
        mut transport: T,
        token: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let greeting = recv_frame(&mut transport, timeout).await?;
        match Incoming::parse(&greeting) {
            Ok(Incoming::AuthRequired { ha_version }) => {
                debug!("Remote greeting received (version {:?})", ha_version)
            }
            Ok(other) => debug!("Discarding unexpected greeting: {:?}", other),
            Err(e) => debug!("Discarding unparseable greeting: {}", e),
        }

        let auth = serde_json::to_string(&AuthMessage::Auth {
            access_token: token.to_string(),
        })
        .map_err(ConnectionError::from)?;
        transport.send(auth).await?;

        let reply = recv_frame(&mut transport, timeout).await?;
        let rejection = match Incoming::parse(&reply)? {
            Incoming::AuthOk { ha_version } => {
                info!("Authenticated (remote version {:?})", ha_version);
                return Ok(Self {
                    transport,
                    next_id: 1,
                    timeout,
                    ha_version,
                });
            }
            Incoming::AuthInvalid { message } => {
                message.unwrap_or_else(|| "credential rejected".to_string())
            }
            other => format!("expected auth_ok, got {:?}", other),
        };

        if let Err(e) = transport.close().await {
            warn!("Failed to close rejected session: {}", e);
        }
        Err(Error::Auth(rejection))
    }

    /// Version string the remote reported on auth, if any
    pub fn ha_version(&self) -> Option<&str> {
        self.ha_version.as_deref()
    }

    /// The id the next request will carry
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Make the next request use at least `base` as its id.
    ///
    /// Never moves backwards, so ids are not reused within a session.
    pub fn advance_ids_to(&mut self, base: u64) {
        self.next_id = self.next_id.max(base);
    }

    /// Send `command` with the next id and wait for its result.
    ///
    /// Messages that arrive in between (events, results for other ids) are
    /// skipped.
    pub async fn request(&mut self, command: &Command) -> Result<ResultEnvelope> {
        let id = self.next_id;
        self.next_id += 1;

        let frame = command.to_frame(id)?;
        debug!(id, "Sending {}", frame);
        self.transport.send(frame).await?;

        loop {
            let frame = recv_frame(&mut self.transport, self.timeout).await?;
            match Incoming::parse(&frame)? {
                Incoming::Result(envelope) if envelope.id == id => {
                    debug!(id, success = envelope.success, "Received result");
                    return Ok(envelope);
                }
                Incoming::Result(envelope) => {
                    debug!("Skipping result for id {} while waiting for {}", envelope.id, id)
                }
                other => debug!("Skipping {:?} while waiting for {}", other, id),
            }
        }
    }

    /// Close the underlying transport
    pub async fn close(mut self) -> Result<()> {
        self.transport.close().await?;
        Ok(())
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

async fn with_timeout<F, V>(
    timeout: Option<Duration>,
    fut: F,
) -> std::result::Result<V, ConnectionError>
where
    F: std::future::Future<Output = std::result::Result<V, ConnectionError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ConnectionError::Timeout(limit))?,
        None => fut.await,
    }
}

async fn recv_frame<T: Transport>(
    transport: &mut T,
    timeout: Option<Duration>,
) -> std::result::Result<String, ConnectionError> {
    with_timeout(timeout, transport.recv())
        .await?
        .ok_or(ConnectionError::Closed)
}
