//! Everything between the state store and the wire: the frame codec, the
//! transport seam, sessions with their AutoUpdate loop, and the client that
//! owns the connection.

mod auto_update;
pub mod client;
pub mod frame;
pub mod session;
pub mod transport_types;
#[cfg(feature = "udp-transport")]
pub mod udp;

pub use client::{ConnectionError, StreamingClient};
pub use frame::{decode_frame, ColorSpace, DecodedFrame, FrameEncoder, FrameError};
pub use session::{Session, SessionFailure, SessionState, SessionStats, StreamError};
pub use transport_types::{SecuredChannel, SessionKey, StreamTransport, TransportError};
#[cfg(feature = "udp-transport")]
pub use udp::UdpTransport;
