use arrow::array::{Array, AsArray, StructArray};
use arrow::datatypes::{Float32Type, Float64Type, Int32Type, Int64Type, UInt32Type, UInt64Type};
use prost::Message;
use prost::bytes::Bytes;
use prost::encoding::{WireType, encode_key, encode_varint};
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, Value};

use crate::error::ProtoParquetError;

/// Binary protobuf encoding of the message stored at `row` of `array`.
///
/// Fields come out in field-number order. Map entries come out in the
/// order they are stored in the column, which is the order the writer
/// encoded them in, so the payload matches the one that was written byte
/// for byte. Null columns and default values of fields without presence
/// are omitted.
pub(crate) fn encode_row(
    descriptor: &MessageDescriptor,
    array: &StructArray,
    row: usize,
) -> Result<Vec<u8>, ProtoParquetError> {
    let mut buf = Vec::new();
    encode_message(descriptor, array, row, &mut buf)?;
    Ok(buf)
}

fn encode_message(
    descriptor: &MessageDescriptor,
    array: &StructArray,
    row: usize,
    buf: &mut Vec<u8>,
) -> Result<(), ProtoParquetError> {
    let mut fields: Vec<FieldDescriptor> = descriptor.fields().collect();
    fields.sort_by_key(|field| field.number());

    for field in fields {
        let column = array.column_by_name(field.name()).ok_or_else(|| {
            ProtoParquetError::Convert(format!(
                "column '{}' of '{}' missing",
                field.name(),
                descriptor.full_name()
            ))
        })?;
        if column.is_null(row) {
            continue;
        }

        match field.kind() {
            Kind::Message(_) if field.is_map() => encode_map(&field, column.as_ref(), row, buf)?,
            Kind::Message(nested) if field.is_list() => {
                let list = column.as_list_opt::<i32>().ok_or_else(|| not_a_list(&field))?;
                let items = list.value(row);
                let items = items.as_struct_opt().ok_or_else(|| not_a_list(&field))?;
                for i in 0..items.len() {
                    encode_nested(&field, &nested, items, i, buf)?;
                }
            }
            Kind::Message(nested) => {
                let nested_array = column
                    .as_struct_opt()
                    .ok_or_else(|| mismatch(&field.kind(), column.as_ref()))?;
                encode_nested(&field, &nested, nested_array, row, buf)?;
            }
            kind if field.is_list() => {
                let list = column.as_list_opt::<i32>().ok_or_else(|| not_a_list(&field))?;
                let items = list.value(row);
                let values = (0..items.len())
                    .map(|i| read_value(&kind, items.as_ref(), i))
                    .collect::<Result<Vec<_>, _>>()?;
                encode_field(descriptor, &field, Value::List(values), buf)?;
            }
            kind => {
                let value = read_value(&kind, column.as_ref(), row)?;
                encode_field(descriptor, &field, value, buf)?;
            }
        }
    }
    Ok(())
}

/// Scalar or packed field, encoded exactly as prost-reflect encodes it
/// inside a message of `descriptor`.
fn encode_field(
    descriptor: &MessageDescriptor,
    field: &FieldDescriptor,
    value: Value,
    buf: &mut Vec<u8>,
) -> Result<(), ProtoParquetError> {
    if !field.supports_presence() && value.is_default_for_field(field) {
        return Ok(());
    }
    let mut single = DynamicMessage::new(descriptor.clone());
    single
        .try_set_field(field, value)
        .map_err(|e| ProtoParquetError::Convert(format!("field '{}': {e}", field.full_name())))?;
    buf.extend_from_slice(&single.encode_to_vec());
    Ok(())
}

fn encode_nested(
    field: &FieldDescriptor,
    nested: &MessageDescriptor,
    array: &StructArray,
    row: usize,
    buf: &mut Vec<u8>,
) -> Result<(), ProtoParquetError> {
    let mut body = Vec::new();
    encode_message(nested, array, row, &mut body)?;
    if field.is_group() {
        encode_key(field.number(), WireType::StartGroup, buf);
        buf.extend_from_slice(&body);
        encode_key(field.number(), WireType::EndGroup, buf);
    } else {
        encode_length_delimited(field.number(), &body, buf);
    }
    Ok(())
}

fn encode_map(
    field: &FieldDescriptor,
    column: &dyn Array,
    row: usize,
    buf: &mut Vec<u8>,
) -> Result<(), ProtoParquetError> {
    let Kind::Message(entry) = field.kind() else {
        return Err(not_a_list(field));
    };
    let list = column.as_list_opt::<i32>().ok_or_else(|| not_a_list(field))?;
    let entries = list.value(row);
    let entries = entries.as_struct_opt().ok_or_else(|| not_a_list(field))?;

    let key_field = entry.map_entry_key_field();
    let value_field = entry.map_entry_value_field();
    let entry_column = |name: &str| {
        entries.column_by_name(name).ok_or_else(|| {
            let map = field.full_name();
            ProtoParquetError::Convert(format!("map '{map}' has no '{name}' column"))
        })
    };
    let keys = entry_column(key_field.name())?;
    let values = entry_column(value_field.name())?;

    for i in 0..entries.len() {
        let mut body = Vec::new();
        let key = read_value(&key_field.kind(), keys.as_ref(), i)?;
        encode_field(&entry, &key_field, key, &mut body)?;

        match value_field.kind() {
            Kind::Message(_) if values.is_null(i) => {
                encode_length_delimited(value_field.number(), &[], &mut body);
            }
            Kind::Message(nested) => {
                let nested_array = values
                    .as_struct_opt()
                    .ok_or_else(|| mismatch(&value_field.kind(), values.as_ref()))?;
                encode_nested(&value_field, &nested, nested_array, i, &mut body)?;
            }
            kind => {
                let value = if values.is_null(i) {
                    Value::default_value_for_field(&value_field)
                } else {
                    read_value(&kind, values.as_ref(), i)?
                };
                encode_field(&entry, &value_field, value, &mut body)?;
            }
        }
        encode_length_delimited(field.number(), &body, buf);
    }
    Ok(())
}

fn encode_length_delimited(number: u32, body: &[u8], buf: &mut Vec<u8>) {
    encode_key(number, WireType::LengthDelimited, buf);
    encode_varint(body.len() as u64, buf);
    buf.extend_from_slice(body);
}

fn read_value(kind: &Kind, column: &dyn Array, row: usize) -> Result<Value, ProtoParquetError> {
    let wrong = || mismatch(kind, column);
    Ok(match kind {
        Kind::Double => {
            Value::F64(column.as_primitive_opt::<Float64Type>().ok_or_else(wrong)?.value(row))
        }
        Kind::Float => {
            Value::F32(column.as_primitive_opt::<Float32Type>().ok_or_else(wrong)?.value(row))
        }
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            Value::I32(column.as_primitive_opt::<Int32Type>().ok_or_else(wrong)?.value(row))
        }
        Kind::Enum(_) => Value::EnumNumber(
            column.as_primitive_opt::<Int32Type>().ok_or_else(wrong)?.value(row),
        ),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            Value::I64(column.as_primitive_opt::<Int64Type>().ok_or_else(wrong)?.value(row))
        }
        Kind::Uint32 | Kind::Fixed32 => {
            Value::U32(column.as_primitive_opt::<UInt32Type>().ok_or_else(wrong)?.value(row))
        }
        Kind::Uint64 | Kind::Fixed64 => {
            Value::U64(column.as_primitive_opt::<UInt64Type>().ok_or_else(wrong)?.value(row))
        }
        Kind::Bool => Value::Bool(column.as_boolean_opt().ok_or_else(wrong)?.value(row)),
        Kind::String => Value::String(
            column.as_string_opt::<i32>().ok_or_else(wrong)?.value(row).to_string(),
        ),
        Kind::Bytes => Value::Bytes(Bytes::copy_from_slice(
            column.as_binary_opt::<i32>().ok_or_else(wrong)?.value(row),
        )),
        Kind::Message(_) => return Err(wrong()),
    })
}

fn mismatch(kind: &Kind, column: &dyn Array) -> ProtoParquetError {
    ProtoParquetError::Convert(format!(
        "column of type {} cannot hold {kind:?}",
        column.data_type()
    ))
}

fn not_a_list(field: &FieldDescriptor) -> ProtoParquetError {
    ProtoParquetError::Convert(format!("column '{}' is not a list", field.full_name()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, ListArray};
    use arrow::buffer::OffsetBuffer;
    use arrow::datatypes::{DataType, Field, Fields};
    use prost_reflect::{MapKey, ReflectMessage};

    use super::*;
    use crate::batch::MessageBatchBuilder;
    use crate::schema::arrow_schema;
    use crate::testing;

    fn round_trip(messages: &[DynamicMessage]) -> Vec<Vec<u8>> {
        let descriptor = messages[0].descriptor();
        let schema = Arc::new(arrow_schema(&descriptor).unwrap());
        let mut builder = MessageBatchBuilder::new(descriptor.clone(), schema).unwrap();
        for message in messages {
            builder.append(message, None).unwrap();
        }
        let array = StructArray::from(builder.finish().unwrap());
        (0..array.len())
            .map(|row| encode_row(&descriptor, &array, row).unwrap())
            .collect()
    }

    fn item(sku: &str, quantity: u32) -> Value {
        let mut item = DynamicMessage::new(testing::descriptor("colog.test.Item"));
        item.set_field_by_name("sku", Value::String(sku.into()));
        item.set_field_by_name("quantity", Value::U32(quantity));
        Value::Message(item)
    }

    #[test]
    fn test_full_order_round_trip() {
        let mut order = DynamicMessage::new(testing::descriptor("colog.test.Order"));
        order.set_field_by_name("id", Value::String("o-1".into()));
        order.set_field_by_name("amount", Value::F64(12.5));
        order.set_field_by_name("kind", Value::EnumNumber(2));
        order.set_field_by_name(
            "tags",
            Value::List(vec![Value::String("gift".into()), Value::String("rush".into())]),
        );
        order.set_field_by_name("primary", item("a-1", 2));
        order.set_field_by_name("items", Value::List(vec![item("a-1", 2), item("b-2", 5)]));
        let mut counters = HashMap::new();
        counters.insert(MapKey::String("views".into()), Value::I64(9));
        order.set_field_by_name("counters", Value::Map(counters));
        order.set_field_by_name("blob", Value::Bytes(Bytes::from_static(b"\x00\x01")));
        order.set_field_by_name("gift", Value::Bool(true));
        order.set_field_by_name("weight", Value::F32(0.25));
        order.set_field_by_name("seq", Value::U64(u64::MAX));
        order.set_field_by_name("delta", Value::I32(-3));
        order.set_field_by_name("checksum", Value::U64(42));

        let read = round_trip(std::slice::from_ref(&order));
        assert_eq!(read[0], order.encode_to_vec());
    }

    #[test]
    fn test_map_entries_keep_written_order() {
        let mut counters = HashMap::new();
        for n in 0..12 {
            counters.insert(MapKey::String(format!("counter-{n}")), Value::I64(n * 7));
        }
        let mut order = DynamicMessage::new(testing::descriptor("colog.test.Order"));
        order.set_field_by_name("id", Value::String("o-9".into()));
        order.set_field_by_name("counters", Value::Map(counters));

        let read = round_trip(std::slice::from_ref(&order));
        assert_eq!(read[0], order.encode_to_vec());
    }

    #[test]
    fn test_presence_survives() {
        let descriptor = testing::descriptor("colog.test.Order");
        let empty = DynamicMessage::new(descriptor.clone());
        let mut zero_amount = DynamicMessage::new(descriptor.clone());
        zero_amount.set_field_by_name("amount", Value::F64(0.0));

        let read = round_trip(&[empty, zero_amount.clone()]);
        assert!(read[0].is_empty());
        assert_eq!(read[1], zero_amount.encode_to_vec());

        let decoded = DynamicMessage::decode(descriptor, read[1].as_slice()).unwrap();
        assert!(decoded.has_field_by_name("amount"));
        assert!(!decoded.has_field_by_name("primary"));
    }

    #[test]
    fn test_rows_are_independent() {
        let descriptor = testing::descriptor("colog.test.Order");
        let mut first = DynamicMessage::new(descriptor.clone());
        first.set_field_by_name("items", Value::List(vec![item("a-1", 1)]));
        let second = DynamicMessage::new(descriptor.clone());
        let mut third = DynamicMessage::new(descriptor);
        third.set_field_by_name("items", Value::List(vec![item("c-1", 3), item("c-2", 4)]));

        let read = round_trip(&[first.clone(), second, third.clone()]);
        assert_eq!(read[0], first.encode_to_vec());
        assert!(read[1].is_empty());
        assert_eq!(read[2], third.encode_to_vec());
    }

    #[test]
    fn test_proto2_optional_default_kept() {
        let mut account = DynamicMessage::new(testing::descriptor("colog.legacy.Account"));
        account.set_field_by_name("id", Value::String("acc-1".into()));
        account.set_field_by_name("level", Value::I32(0));

        let read = round_trip(std::slice::from_ref(&account));
        assert_eq!(read[0], account.encode_to_vec());
    }

    #[test]
    fn test_map_key_column_type_mismatch() {
        let descriptor = testing::descriptor("colog.test.Order");
        let entry_fields = Fields::from(vec![
            Field::new("key", DataType::Float64, false),
            Field::new("value", DataType::Int64, false),
        ]);
        let entries = StructArray::new(
            entry_fields.clone(),
            vec![
                Arc::new(Float64Array::from(vec![1.5])) as ArrayRef,
                Arc::new(arrow::array::Int64Array::from(vec![3])) as ArrayRef,
            ],
            None,
        );
        let column = ListArray::new(
            Arc::new(Field::new("item", DataType::Struct(entry_fields), false)),
            OffsetBuffer::from_lengths([1]),
            Arc::new(entries),
            None,
        );
        let field = descriptor.get_field_by_name("counters").unwrap();
        let err = encode_map(&field, &column, 0, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, ProtoParquetError::Convert(_)), "{err}");
    }
}
