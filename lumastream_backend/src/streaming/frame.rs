//! The streaming wire format.
//!
//! A frame is a 16 byte header followed by one 9 byte block per light,
//! every multi-byte field big-endian:
//!
//! ```text
//! "HueStream" | major | minor | sequence | 0 0 | color space | 0
//! device type | light id (2) | channel 1 (2) | channel 2 (2) | channel 3 (2)
//! ```
//!
//! Channels are RGB, or x, y and brightness when the xy color space is
//! selected, each quantized from `[0, 1]` to the full `u16` range.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use thiserror::Error;

use crate::{
	light_utils::{color::clamp_unit, store::Snapshot},
	registry::LightId,
};

pub const PROTOCOL_MAGIC: &[u8; 9] = b"HueStream";
pub const PROTOCOL_VERSION: (u8, u8) = (1, 0);
pub const HEADER_LEN: usize = 16;
pub const BLOCK_LEN: usize = 9;

/// Device type byte for a single light
pub const DEVICE_TYPE_LIGHT: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ColorSpace {
	Rgb = 0x00,
	Xy = 0x01,
}

impl TryFrom<u8> for ColorSpace {
	type Error = FrameError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		return match value {
			0x00 => Ok(ColorSpace::Rgb),
			0x01 => Ok(ColorSpace::Xy),
			other => Err(FrameError::UnknownColorSpace(other)),
		};
	}
}

/// Maps `[0, 1]` onto `0..=65535`, saturating outside of that range
pub fn quantize(value: f64) -> u16 {
	return (clamp_unit(value) * u16::MAX as f64).round() as u16;
}

pub fn dequantize(value: u16) -> f64 {
	return value as f64 / u16::MAX as f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEncoder {
	pub color_space: ColorSpace,
}

impl FrameEncoder {
	pub fn new(color_space: ColorSpace) -> Self {
		return FrameEncoder { color_space };
	}

	pub fn frame_len(light_count: usize) -> usize {
		return HEADER_LEN + light_count * BLOCK_LEN;
	}

	/// Encodes the rendered output of every light in the snapshot, in snapshot order
	pub fn encode(&self, snapshot: &Snapshot, sequence: u8) -> Vec<u8> {
		let mut frame = Vec::new();
		self.encode_into(snapshot, sequence, &mut frame);
		return frame;
	}

	/// Same as `encode`, reusing `frame`'s allocation
	pub fn encode_into(&self, snapshot: &Snapshot, sequence: u8, frame: &mut Vec<u8>) {
		frame.clear();
		frame.resize(Self::frame_len(snapshot.len()), 0);

		frame[0..9].copy_from_slice(PROTOCOL_MAGIC);
		frame[9] = PROTOCOL_VERSION.0;
		frame[10] = PROTOCOL_VERSION.1;
		frame[11] = sequence;
		// 12 and 13 reserved
		frame[14] = self.color_space as u8;
		// 15 reserved

		for (index, entry) in snapshot.entries().iter().enumerate() {
			let block = &mut frame[HEADER_LEN + index * BLOCK_LEN..HEADER_LEN + (index + 1) * BLOCK_LEN];
			let channels = match self.color_space {
				ColorSpace::Rgb => [entry.output.r, entry.output.g, entry.output.b],
				ColorSpace::Xy => {
					let xy = entry.output.to_xy();
					[xy.x, xy.y, xy.brightness]
				}
			};
			block[0] = DEVICE_TYPE_LIGHT;
			BigEndian::write_u16(&mut block[1..3], entry.light.0);
			BigEndian::write_u16(&mut block[3..5], quantize(channels[0]));
			BigEndian::write_u16(&mut block[5..7], quantize(channels[1]));
			BigEndian::write_u16(&mut block[7..9], quantize(channels[2]));
		}
	}
}

impl Default for FrameEncoder {
	fn default() -> Self {
		return FrameEncoder::new(ColorSpace::Rgb);
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
	#[error("Frame does not start with the protocol magic")]
	BadMagic,
	#[error("Unsupported protocol version {0}.{1}")]
	UnsupportedVersion(u8, u8),
	#[error("Frame is truncated")]
	Truncated,
	#[error("Unknown color space {0:#04x}")]
	UnknownColorSpace(u8),
}

impl From<std::io::Error> for FrameError {
	fn from(_: std::io::Error) -> Self {
		// Reads only come from an in-memory cursor, so the only failure is running out of bytes
		return FrameError::Truncated;
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedBlock {
	pub device_type: u8,
	pub light: LightId,
	pub channels: [u16; 3],
}

impl DecodedBlock {
	pub fn channels_f64(&self) -> [f64; 3] {
		return self.channels.map(dequantize);
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
	pub version: (u8, u8),
	pub sequence: u8,
	pub color_space: ColorSpace,
	pub blocks: Vec<DecodedBlock>,
}

/// Parses a frame back into its fields. Used by simulators and tests.
pub fn decode_frame(frame: &[u8]) -> Result<DecodedFrame, FrameError> {
	if frame.len() < HEADER_LEN {
		return Err(FrameError::Truncated);
	}
	if (frame.len() - HEADER_LEN) % BLOCK_LEN != 0 {
		return Err(FrameError::Truncated);
	}

	let mut reader = Cursor::new(frame);
	let mut magic = [0u8; 9];
	reader.read_exact(&mut magic)?;
	if &magic != PROTOCOL_MAGIC {
		return Err(FrameError::BadMagic);
	}
	let version = (reader.read_u8()?, reader.read_u8()?);
	if version.0 != PROTOCOL_VERSION.0 {
		return Err(FrameError::UnsupportedVersion(version.0, version.1));
	}
	let sequence = reader.read_u8()?;
	reader.read_u16::<BigEndian>()?;
	let color_space = ColorSpace::try_from(reader.read_u8()?)?;
	reader.read_u8()?;

	let mut blocks = Vec::with_capacity((frame.len() - HEADER_LEN) / BLOCK_LEN);
	while (reader.position() as usize) < frame.len() {
		blocks.push(DecodedBlock {
			device_type: reader.read_u8()?,
			light: LightId(reader.read_u16::<BigEndian>()?),
			channels: [
				reader.read_u16::<BigEndian>()?,
				reader.read_u16::<BigEndian>()?,
				reader.read_u16::<BigEndian>()?,
			],
		});
	}

	return Ok(DecodedFrame {
		version,
		sequence,
		color_space,
		blocks,
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quantize_saturates() {
		assert_eq!(quantize(-0.5), 0);
		assert_eq!(quantize(0.0), 0);
		assert_eq!(quantize(1.0), u16::MAX);
		assert_eq!(quantize(7.0), u16::MAX);
		assert_eq!(quantize(f64::NAN), 0);
		assert_eq!(quantize(0.5), 32768);
	}

	#[test]
	fn rejects_malformed_frames() {
		assert_eq!(decode_frame(b"HueStream"), Err(FrameError::Truncated));

		let mut frame = Vec::from(&b"NotStream"[..]);
		frame.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0]);
		assert_eq!(decode_frame(&frame), Err(FrameError::BadMagic));

		frame[0..9].copy_from_slice(PROTOCOL_MAGIC);
		frame[14] = 7;
		assert_eq!(decode_frame(&frame), Err(FrameError::UnknownColorSpace(7)));

		frame[14] = 0;
		frame[9] = 2;
		assert_eq!(decode_frame(&frame), Err(FrameError::UnsupportedVersion(2, 0)));

		frame[9] = 1;
		frame.extend_from_slice(&[0, 0, 1, 0xff]);
		assert_eq!(decode_frame(&frame), Err(FrameError::Truncated));
	}
}
