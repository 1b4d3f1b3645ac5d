//! The AutoUpdate loop: once per interval, recompute spatial effects, then
//! snapshot, encode and send.

use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::{Session, StreamError};

pub(super) async fn run(session: Session, interval: Duration, token: CancellationToken) {
	info!(
		session = %session.id(),
		interval_ms = interval.as_millis() as u64,
		"auto update started"
	);

	loop {
		if token.is_cancelled() {
			break;
		}
		let started_loop = Instant::now();

		// Spatial effects finish their pass before the snapshot so a frame never mixes two passes
		if session.config().auto_calculate_effects {
			session.group().recalculate_effects();
		}

		match session.transmit().await {
			Ok(()) => {}
			Err(StreamError::SendFailure(err)) => {
				warn!(
					session = %session.id(),
					consecutive_failures = session.stats().consecutive_failures,
					error = %err,
					"skipped a frame"
				);
			}
			Err(StreamError::TransportLost(_)) => break,
			Err(err) => {
				debug!(session = %session.id(), error = %err, "auto update stopping");
				break;
			}
		}

		let sleep_duration = interval.saturating_sub(started_loop.elapsed());
		tokio::select! {
			biased;
			_ = token.cancelled() => break,
			_ = time::sleep(sleep_duration) => {},
		}
	}

	info!(session = %session.id(), "auto update stopped");
}
