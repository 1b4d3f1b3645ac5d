//! Plain UDP transport.
//!
//! Frames are sent unencrypted, which suits simulators and links secured by
//! something else. Controllers that require the DTLS handshake need a
//! transport that performs it.

use async_trait::async_trait;
use std::{
	net::{Ipv4Addr, Ipv6Addr, SocketAddr},
	sync::atomic::{AtomicBool, Ordering},
};
use tokio::net::UdpSocket;
use tracing::debug;

use super::transport_types::{SecuredChannel, SessionKey, StreamTransport, TransportError};

/// Default entertainment streaming port
pub const STREAMING_PORT: u16 = 2100;

#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransport;

impl UdpTransport {
	pub fn new() -> Self {
		return UdpTransport;
	}
}

#[async_trait]
impl StreamTransport for UdpTransport {
	async fn open(
		&self,
		endpoint: SocketAddr,
		key: &SessionKey,
	) -> Result<Box<dyn SecuredChannel>, TransportError> {
		let bind: SocketAddr = match endpoint {
			SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
			SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
		};
		let socket = UdpSocket::bind(bind).await?;
		socket.connect(endpoint).await?;
		debug!(%endpoint, app_key = %key.app_key, "opened udp channel");
		return Ok(Box::new(UdpChannel {
			socket,
			closed: AtomicBool::new(false),
		}));
	}
}

pub struct UdpChannel {
	socket: UdpSocket,
	closed: AtomicBool,
}

#[async_trait]
impl SecuredChannel for UdpChannel {
	async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
		if self.closed.load(Ordering::Acquire) {
			return Err(TransportError::Closed);
		}
		let sent = self.socket.send(frame).await?;
		if sent != frame.len() {
			return Err(TransportError::PartialWrite {
				sent,
				expected: frame.len(),
			});
		}
		return Ok(());
	}

	async fn close(&self) {
		self.closed.store(true, Ordering::Release);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn delivers_frames_to_the_endpoint() {
		let receiver = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
		let endpoint = receiver.local_addr().unwrap();

		let channel = UdpTransport::new()
			.open(endpoint, &SessionKey::new("app", "00"))
			.await
			.unwrap();
		channel.send(b"HueStream").await.unwrap();

		let mut buffer = [0u8; 64];
		let received = receiver.recv(&mut buffer).await.unwrap();
		assert_eq!(&buffer[..received], b"HueStream");

		channel.close().await;
		assert!(matches!(channel.send(b"x").await, Err(TransportError::Closed)));
	}
}
