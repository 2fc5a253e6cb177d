use prost_reflect::{Cardinality, DynamicMessage, MessageDescriptor, ReflectMessage, Value};

use crate::error::ProtoParquetError;

/// Wire encoding a payload was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Protobuf JSON mapping.
    Json,
    /// Native protobuf binary encoding.
    Binary,
}

/// Outcome of decoding one payload.
#[derive(Debug)]
pub enum Decoded {
    Message(DynamicMessage, Encoding),
    /// Neither encoding accepted the payload; both failures are kept.
    Unrecognized {
        message: String,
        json: String,
        binary: String,
    },
}

impl Decoded {
    pub fn into_result(self) -> Result<DynamicMessage, ProtoParquetError> {
        match self {
            Decoded::Message(message, _) => Ok(message),
            Decoded::Unrecognized {
                message,
                json,
                binary,
            } => Err(ProtoParquetError::Undecodable {
                message,
                json,
                binary,
            }),
        }
    }
}

/// Decode `payload` as `descriptor`: JSON first, then binary.
///
/// Unknown JSON fields are rejected, so a JSON document written for another
/// message type does not silently decode.
pub fn decode_message(descriptor: &MessageDescriptor, payload: &[u8]) -> Decoded {
    let json_err = match decode_json(descriptor, payload) {
        Ok(message) => return Decoded::Message(message, Encoding::Json),
        Err(e) => e,
    };
    tracing::trace!(
        message = descriptor.full_name(),
        error = %json_err,
        "payload is not JSON, decoding as binary"
    );

    match DynamicMessage::decode(descriptor.clone(), payload) {
        Ok(message) => Decoded::Message(message, Encoding::Binary),
        Err(binary_err) => Decoded::Unrecognized {
            message: descriptor.full_name().to_string(),
            json: json_err.to_string(),
            binary: binary_err.to_string(),
        },
    }
}

fn decode_json(
    descriptor: &MessageDescriptor,
    payload: &[u8],
) -> Result<DynamicMessage, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_slice(payload);
    let message = DynamicMessage::deserialize(descriptor.clone(), &mut deserializer)?;
    deserializer.end()?;
    Ok(message)
}

/// Check that `message` is a `expected` and that every proto2 `required`
/// field is set, at any depth.
pub fn validate_message(
    expected: &MessageDescriptor,
    message: &DynamicMessage,
) -> Result<(), ProtoParquetError> {
    let actual = message.descriptor();
    if actual.full_name() != expected.full_name() {
        return Err(ProtoParquetError::Validation(format!(
            "expected message '{}', got '{}'",
            expected.full_name(),
            actual.full_name()
        )));
    }
    check_required(message, expected.full_name())
}

fn check_required(message: &DynamicMessage, path: &str) -> Result<(), ProtoParquetError> {
    for field in message.descriptor().fields() {
        let field_path = format!("{path}.{}", field.name());
        let present = message.has_field(&field);
        if field.cardinality() == Cardinality::Required && !present {
            return Err(ProtoParquetError::Validation(format!(
                "required field '{field_path}' is not set"
            )));
        }
        if !present {
            continue;
        }
        match &*message.get_field(&field) {
            Value::Message(nested) => check_required(nested, &field_path)?,
            Value::List(items) => {
                for item in items {
                    if let Value::Message(nested) = item {
                        check_required(nested, &field_path)?;
                    }
                }
            }
            Value::Map(entries) => {
                for value in entries.values() {
                    if let Value::Message(nested) = value {
                        check_required(nested, &field_path)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}
