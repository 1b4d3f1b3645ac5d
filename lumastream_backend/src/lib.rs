//! A real-time light streaming engine.
//!
//! A [`Group`] holds the lights of an entertainment area and the state each
//! of them should show. Effects write into the group; a [`Session`] opened by
//! a [`StreamingClient`] sends the group to the controller, frame by frame.

pub mod collaborators;
pub mod config;
pub mod effects;
pub mod group;
pub mod light_utils;
pub mod registry;
pub mod streaming;
pub mod utilities;

#[cfg(test)]
mod tests;

pub use config::StreamingConfig;
pub use effects::{EffectError, EffectHandle, EffectStatus, IteratorEffect, IteratorEffectMode};
pub use group::Group;
pub use light_utils::{color::RgbColor, state::LightState};
pub use registry::{Light, LightId, LightPosition, LightRegistry};
pub use streaming::{ConnectionError, Session, SessionKey, SessionState, StreamingClient};
pub use tokio_util::sync::CancellationToken;
