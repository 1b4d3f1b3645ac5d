use super::pair;
use crate::{
	light_utils::{color::RgbColor, state::LightState},
	registry::LightId,
	streaming::frame::{
		decode_frame, ColorSpace, FrameEncoder, BLOCK_LEN, DEVICE_TYPE_LIGHT, HEADER_LEN, PROTOCOL_MAGIC,
	},
};

#[test]
fn header_and_blocks_follow_the_wire_layout() {
	let group = pair();
	group.set_state([1u16], LightState::new(RgbColor::WHITE, 1.0)).unwrap();
	let frame = FrameEncoder::new(ColorSpace::Rgb).encode(&group.snapshot(), 7);

	assert_eq!(frame.len(), HEADER_LEN + 2 * BLOCK_LEN);
	assert_eq!(&frame[0..9], PROTOCOL_MAGIC);
	assert_eq!(&frame[9..16], &[0x01, 0x00, 7, 0x00, 0x00, 0x00, 0x00]);
	assert_eq!(
		&frame[16..25],
		&[DEVICE_TYPE_LIGHT, 0x00, 0x01, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
	);
	assert_eq!(&frame[25..34], &[DEVICE_TYPE_LIGHT, 0x00, 0x02, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn encoding_is_deterministic() {
	let group = pair();
	group
		.set_state([1u16, 2], LightState::new(RgbColor::new(0.2, 0.4, 0.6), 0.8))
		.unwrap();
	let snapshot = group.snapshot();
	let encoder = FrameEncoder::default();
	assert_eq!(encoder.encode(&snapshot, 3), encoder.encode(&snapshot, 3));

	let mut buffer = vec![0xaa; 100];
	encoder.encode_into(&snapshot, 3, &mut buffer);
	assert_eq!(buffer, encoder.encode(&snapshot, 3));
}

#[test]
fn decoding_recovers_channels_within_one_step() {
	let group = pair();
	let colors = [RgbColor::new(0.123, 0.456, 0.789), RgbColor::new(1.0, 0.333, 0.0001)];
	group.store().set(LightId(1), LightState::new(colors[0], 1.0)).unwrap();
	group.store().set(LightId(2), LightState::new(colors[1], 0.5)).unwrap();
	let snapshot = group.snapshot();

	let decoded = decode_frame(&FrameEncoder::default().encode(&snapshot, 200)).unwrap();
	assert_eq!(decoded.sequence, 200);
	assert_eq!(decoded.version, (1, 0));
	assert_eq!(decoded.color_space, ColorSpace::Rgb);
	assert_eq!(decoded.blocks.len(), 2);

	for (block, entry) in decoded.blocks.iter().zip(snapshot.entries()) {
		assert_eq!(block.light, entry.light);
		let expected = [entry.output.r, entry.output.g, entry.output.b];
		for (channel, expected) in block.channels_f64().iter().zip(expected) {
			assert!((channel - expected).abs() <= 1.0 / 65535.0);
		}
	}
}

#[test]
fn xy_frames_carry_chromaticity_and_brightness() {
	let group = pair();
	group.set_state([2u16], LightState::new(RgbColor::WHITE, 1.0)).unwrap();
	let frame = FrameEncoder::new(ColorSpace::Xy).encode(&group.snapshot(), 0);
	let decoded = decode_frame(&frame).unwrap();
	assert_eq!(decoded.color_space, ColorSpace::Xy);

	let [x, y, brightness] = decoded.blocks[1].channels_f64();
	// D65 white point
	assert!((x - 0.3127).abs() < 1e-3);
	assert!((y - 0.3290).abs() < 1e-3);
	assert!((brightness - 1.0).abs() < 1e-3);
	assert_eq!(decoded.blocks[0].channels, [0, 0, 0]);
}
