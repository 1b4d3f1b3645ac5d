use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error;

/// Data type used to hold a serialized instance of an arbitrary data type.
///
/// Config and group definitions are read into this first so the same loader
/// handles either encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedData {
	Cbor(Vec<u8>),
	JSON(serde_json::Value),
}

impl SerializedData {
	/// Reads a file, picking the codec by extension: `.cbor` is CBOR, anything else JSON
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
		let path = path.as_ref();
		let bytes = fs::read(path)?;
		let is_cbor = path
			.extension()
			.and_then(|extension| extension.to_str())
			.map(|extension| extension.eq_ignore_ascii_case("cbor"))
			.unwrap_or(false);
		if is_cbor {
			return Ok(SerializedData::Cbor(bytes));
		}
		return Ok(SerializedData::JSON(serde_json::from_slice(&bytes).map_err(DeserializeError::from)?));
	}

	pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, DeserializeError> {
		let value: T = match self {
			SerializedData::Cbor(data) => ciborium::de::from_reader::<T, &[u8]>(&data)?,
			SerializedData::JSON(data) => serde_json::from_value(data)?,
		};

		return Ok(value);
	}
}

/// Struct used to support `?` syntax for casting to `Err(...)`.
///
/// Returned when there is an error deserializing `SerializedData`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DeserializeError(pub String);

impl<T> From<ciborium::de::Error<T>> for DeserializeError {
	fn from(err: ciborium::de::Error<T>) -> Self {
		return DeserializeError(match err {
			ciborium::de::Error::Syntax(offset) => format!("Syntax error at offset {}", offset),
			ciborium::de::Error::Semantic(_, err) => err,
			_ => String::from("An unknown error occurred while deserializing"),
		});
	}
}

impl From<serde_json::Error> for DeserializeError {
	fn from(err: serde_json::Error) -> Self {
		return DeserializeError(err.to_string());
	}
}

#[derive(Debug, Error)]
pub enum LoadError {
	#[error("Could not read file: {0}")]
	Io(#[from] io::Error),
	#[error("Could not decode file: {0}")]
	Decode(#[from] DeserializeError),
}

/// Reads and decodes a JSON or CBOR file in one go
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, LoadError> {
	return Ok(SerializedData::from_path(path)?.deserialize()?);
}

#[macro_export]
macro_rules! impl_deserialize_err {
	($type:ty, $output:expr) => {
		impl From<$crate::utilities::serialized_data::DeserializeError> for $type {
			fn from(err: $crate::utilities::serialized_data::DeserializeError) -> Self {
				return $output(err.0);
			}
		}
	};
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde::Deserialize;

	#[derive(Debug, Deserialize, PartialEq)]
	struct Sample {
		name: String,
		count: u32,
	}

	#[test]
	fn decodes_both_codecs() {
		let json = SerializedData::JSON(serde_json::json!({ "name": "a", "count": 2 }));
		assert_eq!(
			json.deserialize::<Sample>().unwrap(),
			Sample { name: String::from("a"), count: 2 }
		);

		let mut cbor = Vec::new();
		ciborium::ser::into_writer(&serde_json::json!({ "name": "b", "count": 3 }), &mut cbor).unwrap();
		assert_eq!(
			SerializedData::Cbor(cbor).deserialize::<Sample>().unwrap(),
			Sample { name: String::from("b"), count: 3 }
		);
	}

	#[test]
	fn reports_decode_errors() {
		let json = SerializedData::JSON(serde_json::json!({ "name": 4 }));
		assert!(json.deserialize::<Sample>().is_err());
	}
}
