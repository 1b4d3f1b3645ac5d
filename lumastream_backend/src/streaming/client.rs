use std::{net::SocketAddr, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
	sync::{watch, Mutex},
	time,
};
use tracing::{info, warn};

use crate::{config::StreamingConfig, group::Group};

use super::{
	session::{Session, SessionState},
	transport_types::{SessionKey, StreamTransport, TransportError},
};

#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("The connect timeout must be longer than zero")]
	InvalidTimeout,
	#[error("The handshake did not complete within {0:?}")]
	Timeout(Duration),
	#[error("The handshake failed: {0}")]
	Handshake(#[source] TransportError),
	#[error("A session is already connected")]
	AlreadyConnected,
}

/// Holds the client in `Connecting` for the length of a handshake
struct ConnectingGuard<'a> {
	state: &'a watch::Sender<SessionState>,
	connected: bool,
}

impl<'a> ConnectingGuard<'a> {
	fn enter(state: &'a watch::Sender<SessionState>) -> Self {
		state.send_replace(SessionState::Connecting);
		return ConnectingGuard { state, connected: false };
	}

	fn connected(mut self) {
		self.connected = true;
		self.state.send_replace(SessionState::Connected);
	}
}

impl Drop for ConnectingGuard<'_> {
	fn drop(&mut self) {
		if !self.connected {
			self.state.send_replace(SessionState::Disconnected);
		}
	}
}

struct ClientInner {
	endpoint: SocketAddr,
	key: SessionKey,
	transport: Box<dyn StreamTransport>,
	config: StreamingConfig,
	state: Arc<watch::Sender<SessionState>>,
	/// The session from the last successful `connect`. Also held while connecting
	/// so two connects never race.
	active: Mutex<Option<Session>>,
}

/// Owns the connection to one controller.
///
/// At most one session is open at a time. A session that ended, by
/// `disconnect` or by losing its transport, is replaced by the next `connect`.
#[derive(Clone)]
pub struct StreamingClient(Arc<ClientInner>);

impl StreamingClient {
	pub fn new<T: StreamTransport>(
		endpoint: SocketAddr,
		key: SessionKey,
		transport: T,
		config: StreamingConfig,
	) -> Self {
		let (state, _) = watch::channel(SessionState::Disconnected);
		return StreamingClient(Arc::new(ClientInner {
			endpoint,
			key,
			transport: Box::new(transport),
			config,
			state: Arc::new(state),
			active: Mutex::new(None),
		}));
	}

	pub fn endpoint(&self) -> SocketAddr {
		return self.0.endpoint;
	}

	pub fn config(&self) -> &StreamingConfig {
		return &self.0.config;
	}

	pub fn state(&self) -> SessionState {
		return *self.0.state.borrow();
	}

	pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
		return self.0.state.subscribe();
	}

	/// Opens a session streaming `group` to the entertainment area `area_id`.
	///
	/// Fails right away with `InvalidTimeout` when `timeout` is zero, without
	/// touching the transport. Otherwise the handshake gets `timeout` to
	/// complete; the client only reports `Connected` once it has.
	pub async fn connect(
		&self,
		group: &Group,
		area_id: impl Into<String>,
		timeout: Duration,
	) -> Result<Session, ConnectionError> {
		if timeout.is_zero() {
			return Err(ConnectionError::InvalidTimeout);
		}

		let mut active = self.0.active.lock().await;
		if let Some(ref session) = *active {
			if !session.is_closed() {
				return Err(ConnectionError::AlreadyConnected);
			}
		}

		let area_id = area_id.into();
		let connecting = ConnectingGuard::enter(&self.0.state);
		info!(endpoint = %self.0.endpoint, area = %area_id, "connecting");

		// Every early return, and a dropped future, leaves the state Disconnected through the guard
		let channel = match time::timeout(timeout, self.0.transport.open(self.0.endpoint, &self.0.key)).await {
			Ok(Ok(channel)) => channel,
			Ok(Err(err)) => {
				warn!(endpoint = %self.0.endpoint, error = %err, "handshake failed");
				return Err(ConnectionError::Handshake(err));
			}
			Err(_) => {
				warn!(endpoint = %self.0.endpoint, ?timeout, "handshake timed out");
				return Err(ConnectionError::Timeout(timeout));
			}
		};

		let session = Session::new(
			area_id,
			self.0.endpoint,
			group.clone(),
			channel,
			self.0.config.clone(),
			Arc::clone(&self.0.state),
		);
		connecting.connected();
		info!(session = %session.id(), area = %session.area_id(), "connected");
		*active = Some(session.clone());
		return Ok(session);
	}

	/// `connect` with the configured timeout
	pub async fn connect_default(
		&self,
		group: &Group,
		area_id: impl Into<String>,
	) -> Result<Session, ConnectionError> {
		return self.connect(group, area_id, self.0.config.connect_timeout()).await;
	}

	/// The open session, if any
	pub async fn session(&self) -> Option<Session> {
		return self
			.0
			.active
			.lock()
			.await
			.as_ref()
			.filter(|session| !session.is_closed())
			.cloned();
	}

	/// Disconnects the open session. Calling it without one does nothing.
	pub async fn disconnect(&self) {
		let session = self.0.active.lock().await.take();
		if let Some(session) = session {
			session.disconnect().await;
		}
	}
}
