//! Home Assistant WebSocket API client.
//!
//! This module provides the authenticated session used to read the device,
//! entity and area registries and to push device renames back.

pub mod protocol;
pub mod session;
pub mod transport;

pub use protocol::Command;
pub use protocol::ResultEnvelope;
pub use session::Session;
pub use transport::Transport;
pub use transport::WsTransport;
