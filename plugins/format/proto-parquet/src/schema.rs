use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Fields, Schema};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parquet::format::KeyValue;
use prost_reflect::{DescriptorPool, FieldDescriptor, Kind, MessageDescriptor};

use crate::error::ProtoParquetError;

/// Parquet key/value metadata entry holding the message's full name.
pub const PROTO_CLASS_KEY: &str = "parquet.proto.class";
/// Parquet key/value metadata entry holding the base64 FileDescriptorSet.
pub const PROTO_DESCRIPTOR_KEY: &str = "parquet.proto.descriptor";

/// Name of the element field inside list columns.
pub(crate) const LIST_ITEM: &str = "item";

// ════════════════════════════════════════════════════════════════
//  Message → Arrow schema
// ════════════════════════════════════════════════════════════════

/// Arrow schema with one top-level column per message field.
///
/// | protobuf                         | arrow                        |
/// |----------------------------------|------------------------------|
/// | double / float                   | Float64 / Float32            |
/// | int32, sint32, sfixed32, enum    | Int32                        |
/// | int64, sint64, sfixed64          | Int64                        |
/// | uint32, fixed32                  | UInt32                       |
/// | uint64, fixed64                  | UInt64                       |
/// | bool / string / bytes            | Boolean / Utf8 / Binary      |
/// | message                          | Struct                       |
/// | repeated T                       | List<T>                      |
/// | map<K, V>                        | List<Struct{key, value}>     |
///
/// Columns are nullable exactly when the field tracks presence. Recursive
/// and field-less message types have no columnar shape and are rejected.
pub fn arrow_schema(descriptor: &MessageDescriptor) -> Result<Schema, ProtoParquetError> {
    let fields = message_fields(descriptor, &mut Vec::new())?;
    Ok(Schema::new(fields))
}

fn message_fields(
    descriptor: &MessageDescriptor,
    stack: &mut Vec<String>,
) -> Result<Fields, ProtoParquetError> {
    let name = descriptor.full_name();
    if stack.iter().any(|s| s == name) {
        return Err(ProtoParquetError::Schema(format!(
            "message '{name}' is recursive ({} -> {name})",
            stack.join(" -> ")
        )));
    }
    if descriptor.fields().next().is_none() {
        return Err(ProtoParquetError::Schema(format!("message '{name}' has no fields")));
    }

    stack.push(name.to_string());
    let fields = descriptor
        .fields()
        .map(|field| arrow_field(&field, stack))
        .collect::<Result<Vec<_>, _>>()?;
    stack.pop();
    Ok(Fields::from(fields))
}

fn arrow_field(
    field: &FieldDescriptor,
    stack: &mut Vec<String>,
) -> Result<Field, ProtoParquetError> {
    let value_type = kind_type(&field.kind(), stack)?;
    if field.is_list() || field.is_map() {
        let item = Field::new(LIST_ITEM, value_type, false);
        Ok(Field::new(field.name(), DataType::List(Arc::new(item)), false))
    } else {
        Ok(Field::new(field.name(), value_type, field.supports_presence()))
    }
}

fn kind_type(kind: &Kind, stack: &mut Vec<String>) -> Result<DataType, ProtoParquetError> {
    Ok(match kind {
        Kind::Double => DataType::Float64,
        Kind::Float => DataType::Float32,
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 | Kind::Enum(_) => DataType::Int32,
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => DataType::Int64,
        Kind::Uint32 | Kind::Fixed32 => DataType::UInt32,
        Kind::Uint64 | Kind::Fixed64 => DataType::UInt64,
        Kind::Bool => DataType::Boolean,
        Kind::String => DataType::Utf8,
        Kind::Bytes => DataType::Binary,
        Kind::Message(message) => DataType::Struct(message_fields(message, stack)?),
    })
}

// ════════════════════════════════════════════════════════════════
//  Stored schema (Parquet key/value metadata)
// ════════════════════════════════════════════════════════════════

/// Metadata entries that let a reader rebuild `descriptor` from the file
/// alone.
pub fn descriptor_metadata(descriptor: &MessageDescriptor) -> Vec<KeyValue> {
    let descriptor_set = descriptor.parent_pool().encode_to_vec();
    vec![
        KeyValue::new(PROTO_CLASS_KEY.to_string(), descriptor.full_name().to_string()),
        KeyValue::new(PROTO_DESCRIPTOR_KEY.to_string(), BASE64.encode(descriptor_set)),
    ]
}

/// Inverse of [`descriptor_metadata`].
pub fn stored_descriptor(
    metadata: Option<&Vec<KeyValue>>,
) -> Result<MessageDescriptor, ProtoParquetError> {
    let lookup = |key: &str| {
        metadata
            .and_then(|entries| entries.iter().find(|kv| kv.key == key))
            .and_then(|kv| kv.value.as_deref())
            .ok_or_else(|| ProtoParquetError::StoredSchema(format!("metadata key '{key}' missing")))
    };

    let class = lookup(PROTO_CLASS_KEY)?;
    let encoded = lookup(PROTO_DESCRIPTOR_KEY)?;
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| ProtoParquetError::StoredSchema(format!("descriptor set: {e}")))?;
    let pool = DescriptorPool::decode(bytes.as_slice())
        .map_err(|e| ProtoParquetError::StoredSchema(format!("descriptor set: {e}")))?;
    pool.get_message_by_name(class).ok_or_else(|| {
        ProtoParquetError::StoredSchema(format!("message '{class}' not in stored descriptor set"))
    })
}
