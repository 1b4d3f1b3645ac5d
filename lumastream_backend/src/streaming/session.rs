use std::{
	fmt,
	net::SocketAddr,
	sync::{
		atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering},
		Arc, Mutex, PoisonError,
	},
	time::Duration,
};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{config::StreamingConfig, group::Group};

use super::{
	auto_update,
	frame::FrameEncoder,
	transport_types::{SecuredChannel, TransportError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
	Disconnected,
	Connecting,
	Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Why a session gave up on its channel
pub struct SessionFailure {
	pub consecutive_failures: u32,
	pub last_error: String,
}

impl fmt::Display for SessionFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} frames in a row failed to send, last error: {}",
			self.consecutive_failures, self.last_error
		)
	}
}

#[derive(Debug, Error)]
pub enum StreamError {
	#[error("The session is not connected")]
	NotConnected,
	#[error("The frame interval must be longer than zero")]
	InvalidInterval,
	#[error("Could not send frame: {0}")]
	SendFailure(#[from] TransportError),
	#[error("Transport lost: {0}")]
	TransportLost(SessionFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
	pub frames_sent: u64,
	pub frames_failed: u64,
	pub consecutive_failures: u32,
	/// Sequence id the next frame will carry
	pub next_sequence: u8,
}

struct AutoUpdateTask {
	token: CancellationToken,
	handle: JoinHandle<()>,
}

struct SessionInner {
	id: Uuid,
	area_id: String,
	endpoint: SocketAddr,
	group: Group,
	channel: Box<dyn SecuredChannel>,
	encoder: FrameEncoder,
	config: StreamingConfig,
	state: Arc<watch::Sender<SessionState>>,
	/// Cancelled once the session ends. The AutoUpdate loop runs under a child of this token.
	shutdown: CancellationToken,
	closed: AtomicBool,
	auto_update: Mutex<Option<AutoUpdateTask>>,
	/// Frame buffer, also serializing sends so sequence ids leave in order
	frame: tokio::sync::Mutex<Vec<u8>>,
	sequence: AtomicU8,
	frames_sent: AtomicU64,
	frames_failed: AtomicU64,
	consecutive_failures: AtomicU32,
	fatal: Mutex<Option<SessionFailure>>,
}

/// An open streaming channel to a controller, bound to one group.
///
/// The handle is cheap to clone. The session ends on `disconnect` or when
/// too many frames in a row fail to send; either way it never reopens, and
/// the client has to `connect` again.
#[derive(Clone)]
pub struct Session(Arc<SessionInner>);

impl Session {
	pub(crate) fn new(
		area_id: String,
		endpoint: SocketAddr,
		group: Group,
		channel: Box<dyn SecuredChannel>,
		config: StreamingConfig,
		state: Arc<watch::Sender<SessionState>>,
	) -> Self {
		return Session(Arc::new(SessionInner {
			id: Uuid::new_v4(),
			area_id,
			endpoint,
			group,
			channel,
			encoder: FrameEncoder::new(config.color_space),
			config,
			state,
			shutdown: CancellationToken::new(),
			closed: AtomicBool::new(false),
			auto_update: Mutex::new(None),
			frame: tokio::sync::Mutex::new(Vec::new()),
			sequence: AtomicU8::new(0),
			frames_sent: AtomicU64::new(0),
			frames_failed: AtomicU64::new(0),
			consecutive_failures: AtomicU32::new(0),
			fatal: Mutex::new(None),
		}));
	}

	pub fn id(&self) -> Uuid {
		return self.0.id;
	}

	pub fn area_id(&self) -> &str {
		return &self.0.area_id;
	}

	pub fn endpoint(&self) -> SocketAddr {
		return self.0.endpoint;
	}

	pub fn group(&self) -> &Group {
		return &self.0.group;
	}

	pub fn config(&self) -> &StreamingConfig {
		return &self.0.config;
	}

	pub fn is_closed(&self) -> bool {
		return self.0.closed.load(Ordering::Acquire);
	}

	pub fn state(&self) -> SessionState {
		if self.is_closed() {
			return SessionState::Disconnected;
		}
		return SessionState::Connected;
	}

	pub fn stats(&self) -> SessionStats {
		return SessionStats {
			frames_sent: self.0.frames_sent.load(Ordering::Relaxed),
			frames_failed: self.0.frames_failed.load(Ordering::Relaxed),
			consecutive_failures: self.0.consecutive_failures.load(Ordering::Relaxed),
			next_sequence: self.0.sequence.load(Ordering::Relaxed),
		};
	}

	/// The failure that ended this session, if it did not end by `disconnect`
	pub fn fatal_error(&self) -> Option<SessionFailure> {
		return self.0.fatal.lock().unwrap_or_else(PoisonError::into_inner).clone();
	}

	/// Resolves once the session has ended, with the failure that ended it if any
	pub async fn wait_closed(&self) -> Option<SessionFailure> {
		self.0.shutdown.cancelled().await;
		return self.fatal_error();
	}

	/// Starts sending a frame every `interval`.
	///
	/// Calling this while a loop is already running leaves that loop alone.
	pub fn start_auto_update(&self, interval: Duration) -> Result<(), StreamError> {
		if self.is_closed() {
			return Err(StreamError::NotConnected);
		}
		if interval.is_zero() {
			return Err(StreamError::InvalidInterval);
		}

		let mut auto_update = self.0.auto_update.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(ref task) = *auto_update {
			if !task.handle.is_finished() {
				debug!(session = %self.0.id, "auto update already running");
				return Ok(());
			}
		}

		let token = self.0.shutdown.child_token();
		let handle = tokio::spawn(auto_update::run(self.clone(), interval, token.clone()));
		*auto_update = Some(AutoUpdateTask { token, handle });
		return Ok(());
	}

	/// Starts the AutoUpdate loop at the configured frame interval
	pub fn start_auto_update_default(&self) -> Result<(), StreamError> {
		return self.start_auto_update(self.0.config.frame_interval());
	}

	pub fn is_auto_updating(&self) -> bool {
		return match *self.0.auto_update.lock().unwrap_or_else(PoisonError::into_inner) {
			Some(ref task) => !task.handle.is_finished(),
			None => false,
		};
	}

	/// Stops the AutoUpdate loop and waits for it to exit. Does nothing if it is not running.
	pub async fn stop_auto_update(&self) {
		let task = self.0.auto_update.lock().unwrap_or_else(PoisonError::into_inner).take();
		if let Some(task) = task {
			task.token.cancel();
			task.handle.await.ok();
		}
	}

	/// Sends the current state of the group once
	pub async fn send_frame(&self) -> Result<(), StreamError> {
		if self.is_closed() {
			return Err(StreamError::NotConnected);
		}
		return self.transmit().await;
	}

	/// Stops the AutoUpdate loop and closes the channel. Calling it again does nothing.
	pub async fn disconnect(&self) {
		if self.0.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		// Must precede the awaits below, a newer session may own the state by then
		self.0.state.send_replace(SessionState::Disconnected);
		self.0.shutdown.cancel();
		self.stop_auto_update().await;
		self.0.channel.close().await;
		info!(session = %self.0.id, area = %self.0.area_id, "disconnected");
	}

	/// Snapshots, encodes and sends one frame, keeping the failure counters.
	///
	/// Once `max_consecutive_failures` sends in a row have failed the session
	/// ends and reports `TransportLost`.
	pub(crate) async fn transmit(&self) -> Result<(), StreamError> {
		let result = {
			let mut frame = self.0.frame.lock().await;
			let sequence = self.0.sequence.fetch_add(1, Ordering::Relaxed);
			let snapshot = self.0.group.snapshot();
			self.0.encoder.encode_into(&snapshot, sequence, &mut frame);
			self.0.channel.send(&frame).await
		};

		return match result {
			Ok(()) => {
				self.0.frames_sent.fetch_add(1, Ordering::Relaxed);
				self.0.consecutive_failures.store(0, Ordering::Relaxed);
				Ok(())
			}
			Err(err) => {
				self.0.frames_failed.fetch_add(1, Ordering::Relaxed);
				let consecutive_failures = self.0.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
				if consecutive_failures >= self.0.config.max_consecutive_failures {
					let failure = SessionFailure {
						consecutive_failures,
						last_error: err.to_string(),
					};
					self.fail(failure.clone()).await;
					return Err(StreamError::TransportLost(failure));
				}
				Err(StreamError::SendFailure(err))
			}
		};
	}

	async fn fail(&self, failure: SessionFailure) {
		if self.0.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		error!(session = %self.0.id, area = %self.0.area_id, %failure, "transport lost");
		*self.0.fatal.lock().unwrap_or_else(PoisonError::into_inner) = Some(failure);
		self.0.state.send_replace(SessionState::Disconnected);
		self.0.shutdown.cancel();
		self.0.channel.close().await;
	}
}
