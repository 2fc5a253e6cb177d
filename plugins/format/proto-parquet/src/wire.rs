use std::collections::{HashMap, HashSet};

use prost::bytes::Buf;
use prost::encoding::{DecodeContext, WireType, decode_key, decode_varint, skip_field};
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, Value};

use crate::error::ProtoParquetError;

/// Order in which map entries appear in a binary payload, for every map
/// reachable from the top-level message.
///
/// A decoded `DynamicMessage` keeps map entries in a hash map and loses
/// this order. The batch builder uses it to store entries as they arrived.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WireOrder {
    fields: HashMap<u32, FieldOrder>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldOrder {
    /// Map keys in arrival order, each with the order inside its entry.
    Entries(Vec<(MapKey, WireOrder)>),
    /// One order per element of a repeated message field; a singular field
    /// has a single order merged over all of its occurrences.
    Messages(Vec<WireOrder>),
}

impl FieldOrder {
    pub(crate) fn entries(&self) -> &[(MapKey, WireOrder)] {
        match self {
            FieldOrder::Entries(entries) => entries,
            FieldOrder::Messages(_) => &[],
        }
    }

    pub(crate) fn message(&self, index: usize) -> Option<&WireOrder> {
        match self {
            FieldOrder::Messages(messages) => messages.get(index),
            FieldOrder::Entries(_) => None,
        }
    }
}

impl WireOrder {
    /// Scan `payload`, an encoded `descriptor` message.
    pub fn scan(descriptor: &MessageDescriptor, payload: &[u8]) -> Result<Self, ProtoParquetError> {
        let mut order = WireOrder::default();
        order.merge(descriptor, payload)?;
        Ok(order)
    }

    pub(crate) fn field(&self, number: u32) -> Option<&FieldOrder> {
        self.fields.get(&number)
    }

    fn merge(
        &mut self,
        descriptor: &MessageDescriptor,
        mut buf: &[u8],
    ) -> Result<(), ProtoParquetError> {
        while buf.has_remaining() {
            let (number, wire_type) = decode_key(&mut buf).map_err(wire_err)?;
            let field = descriptor
                .get_field(number)
                .filter(|field| wire_type == WireType::LengthDelimited && carries_maps(field));
            let Some(field) = field else {
                skip_field(wire_type, number, &mut buf, DecodeContext::default())
                    .map_err(wire_err)?;
                continue;
            };

            let len = decode_varint(&mut buf).map_err(wire_err)? as usize;
            if len > buf.len() {
                return Err(ProtoParquetError::Convert(format!(
                    "payload truncated inside field '{}'",
                    field.full_name()
                )));
            }
            let (body, rest) = buf.split_at(len);
            buf = rest;
            self.record(&field, body)?;
        }
        Ok(())
    }

    fn record(&mut self, field: &FieldDescriptor, body: &[u8]) -> Result<(), ProtoParquetError> {
        let Kind::Message(nested) = field.kind() else {
            return Ok(());
        };

        if field.is_map() {
            let entry = DynamicMessage::decode(nested.clone(), body).map_err(wire_err)?;
            let key = map_key(entry.get_field(&nested.map_entry_key_field()).into_owned())?;
            let inner = WireOrder::scan(&nested, body)?;
            match self
                .fields
                .entry(field.number())
                .or_insert_with(|| FieldOrder::Entries(Vec::new()))
            {
                FieldOrder::Entries(entries) => entries.push((key, inner)),
                FieldOrder::Messages(_) => return Err(shape_err(field)),
            }
        } else {
            let FieldOrder::Messages(messages) = self
                .fields
                .entry(field.number())
                .or_insert_with(|| FieldOrder::Messages(Vec::new()))
            else {
                return Err(shape_err(field));
            };
            if field.is_list() || messages.is_empty() {
                messages.push(WireOrder::default());
            }
            if let Some(last) = messages.last_mut() {
                last.merge(&nested, body)?;
            }
        }
        Ok(())
    }
}

/// Whether any map field is reachable from `descriptor`.
pub(crate) fn has_maps(descriptor: &MessageDescriptor) -> bool {
    fn walk(descriptor: &MessageDescriptor, seen: &mut HashSet<String>) -> bool {
        if !seen.insert(descriptor.full_name().to_string()) {
            return false;
        }
        descriptor.fields().any(|field| match field.kind() {
            Kind::Message(nested) => field.is_map() || walk(&nested, seen),
            _ => false,
        })
    }
    walk(descriptor, &mut HashSet::new())
}

fn carries_maps(field: &FieldDescriptor) -> bool {
    match field.kind() {
        Kind::Message(nested) => field.is_map() || has_maps(&nested),
        _ => false,
    }
}

fn map_key(value: Value) -> Result<MapKey, ProtoParquetError> {
    Ok(match value {
        Value::Bool(v) => MapKey::Bool(v),
        Value::I32(v) => MapKey::I32(v),
        Value::I64(v) => MapKey::I64(v),
        Value::U32(v) => MapKey::U32(v),
        Value::U64(v) => MapKey::U64(v),
        Value::String(v) => MapKey::String(v),
        other => {
            return Err(ProtoParquetError::Convert(format!(
                "{other:?} is not a valid map key"
            )));
        }
    })
}

fn wire_err(e: prost::DecodeError) -> ProtoParquetError {
    ProtoParquetError::Convert(format!("payload: {e}"))
}

fn shape_err(field: &FieldDescriptor) -> ProtoParquetError {
    ProtoParquetError::Convert(format!("field '{}' seen as map and message", field.full_name()))
}
