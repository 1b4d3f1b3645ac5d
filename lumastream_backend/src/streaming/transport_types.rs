use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, io, net::SocketAddr};
use thiserror::Error;

/// Credentials for the entertainment handshake
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKey {
	/// Application key (the bridge "username")
	pub app_key: String,
	/// Pre-shared client key, hex encoded
	pub client_key: String,
}

impl SessionKey {
	pub fn new(app_key: impl Into<String>, client_key: impl Into<String>) -> Self {
		return SessionKey {
			app_key: app_key.into(),
			client_key: client_key.into(),
		};
	}
}

impl fmt::Debug for SessionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionKey")
			.field("app_key", &self.app_key)
			.field("client_key", &"<redacted>")
			.finish()
	}
}

/// Trait indicating how to reach a lighting controller over a secured channel.
///
/// The handshake itself belongs to the implementation. The streaming client
/// only calls `open` once per connection and then `send` once per frame.
#[async_trait]
pub trait StreamTransport: Send + Sync + 'static {
	/// Opens a channel to `endpoint`, completing any handshake before returning
	async fn open(
		&self,
		endpoint: SocketAddr,
		key: &SessionKey,
	) -> Result<Box<dyn SecuredChannel>, TransportError>;
}

/// An open, already secured point-to-point channel
#[async_trait]
pub trait SecuredChannel: Send + Sync + 'static {
	/// Sends one frame
	async fn send(&self, frame: &[u8]) -> Result<(), TransportError>;

	/// Closes the channel. Sends after this fail with `TransportError::Closed`.
	async fn close(&self);
}

#[derive(Debug, Error)]
pub enum TransportError {
	#[error("Transport I/O error: {0}")]
	Io(#[from] io::Error),
	#[error("The channel is closed")]
	Closed,
	#[error("The controller rejected the connection: {0}")]
	Rejected(String),
	#[error("Only {sent} of {expected} bytes were sent")]
	PartialWrite { sent: usize, expected: usize },
}
