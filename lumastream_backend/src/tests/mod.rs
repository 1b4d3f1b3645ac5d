use async_trait::async_trait;
use std::{
	net::SocketAddr,
	sync::{
		atomic::{AtomicBool, AtomicUsize, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};
use tokio::sync::mpsc;

use crate::{
	config::StreamingConfig,
	group::Group,
	light_utils::store::StoreWrite,
	registry::LightPosition,
	streaming::{
		client::StreamingClient,
		transport_types::{SecuredChannel, SessionKey, StreamTransport, TransportError},
	},
};

mod frame;
mod store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
	Complete,
	Reject,
	Hang,
}

/// Transport double recording every frame. Sends fail while `failing` is set.
#[derive(Clone)]
pub struct TestTransport {
	pub handshake: Handshake,
	pub opens: Arc<AtomicUsize>,
	pub frames: Arc<Mutex<Vec<Vec<u8>>>>,
	pub failing: Arc<AtomicBool>,
	pub closed: Arc<AtomicBool>,
}

impl TestTransport {
	pub fn new(handshake: Handshake) -> Self {
		return TestTransport {
			handshake,
			opens: Arc::new(AtomicUsize::new(0)),
			frames: Arc::new(Mutex::new(Vec::new())),
			failing: Arc::new(AtomicBool::new(false)),
			closed: Arc::new(AtomicBool::new(false)),
		};
	}

	pub fn frames(&self) -> Vec<Vec<u8>> {
		return self.frames.lock().unwrap().clone();
	}

	pub fn frame_count(&self) -> usize {
		return self.frames.lock().unwrap().len();
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}
}

#[async_trait]
impl StreamTransport for TestTransport {
	async fn open(
		&self,
		_endpoint: SocketAddr,
		_key: &SessionKey,
	) -> Result<Box<dyn SecuredChannel>, TransportError> {
		self.opens.fetch_add(1, Ordering::SeqCst);
		match self.handshake {
			Handshake::Complete => {}
			Handshake::Reject => return Err(TransportError::Rejected(String::from("bad client key"))),
			Handshake::Hang => std::future::pending::<()>().await,
		}
		self.closed.store(false, Ordering::SeqCst);
		return Ok(Box::new(TestChannel {
			frames: Arc::clone(&self.frames),
			failing: Arc::clone(&self.failing),
			closed: Arc::clone(&self.closed),
		}));
	}
}

struct TestChannel {
	frames: Arc<Mutex<Vec<Vec<u8>>>>,
	failing: Arc<AtomicBool>,
	closed: Arc<AtomicBool>,
}

#[async_trait]
impl SecuredChannel for TestChannel {
	async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(TransportError::Closed);
		}
		if self.failing.load(Ordering::SeqCst) {
			return Err(TransportError::Io(std::io::Error::new(
				std::io::ErrorKind::ConnectionRefused,
				"connection refused",
			)));
		}
		self.frames.lock().unwrap().push(frame.to_vec());
		return Ok(());
	}

	async fn close(&self) {
		self.closed.store(true, Ordering::SeqCst);
	}
}

pub fn endpoint() -> SocketAddr {
	return SocketAddr::from(([127, 0, 0, 1], 2100));
}

pub fn client(transport: &TestTransport, config: StreamingConfig) -> StreamingClient {
	return StreamingClient::new(
		endpoint(),
		SessionKey::new("aSimulatedUser", "01234567890123456789012345678901"),
		transport.clone(),
		config,
	);
}

/// Two lights, left and right of the room
pub fn pair() -> Group {
	return Group::build([
		(1u16, LightPosition::new(-1.0, 0.0, 0.0)),
		(2u16, LightPosition::new(1.0, 0.0, 0.0)),
	])
	.unwrap();
}

/// `count` lights spread evenly along the x axis
pub fn row(count: u16) -> Group {
	return Group::build((1..=count).map(|id| {
		let x = if count == 1 {
			0.0
		} else {
			-1.0 + 2.0 * (id - 1) as f64 / (count - 1) as f64
		};
		(id, LightPosition::new(x, 0.0, 0.0))
	}))
	.unwrap();
}

/// Everything the receiver currently holds, without waiting
pub fn drain(receiver: &mut mpsc::UnboundedReceiver<StoreWrite>) -> Vec<StoreWrite> {
	let mut writes = Vec::new();
	while let Ok(write) = receiver.try_recv() {
		writes.push(write);
	}
	return writes;
}

pub fn millis(ms: u64) -> Duration {
	return Duration::from_millis(ms);
}
