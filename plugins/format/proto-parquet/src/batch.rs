use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, ArrowPrimitiveType, BinaryBuilder, BooleanBuilder, Float32Builder, Float64Builder,
    Int32Builder, Int64Builder, ListArray, PrimitiveBuilder, StringBuilder, StructArray,
    UInt32Builder, UInt64Builder,
};
use arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{DataType, FieldRef, Fields, SchemaRef};
use arrow::record_batch::RecordBatch;
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, ReflectMessage, Value,
};

use crate::error::ProtoParquetError;
use crate::wire::{FieldOrder, WireOrder};

/// Accumulates messages of one type as Arrow columns.
///
/// The column tree mirrors [`crate::schema::arrow_schema`] for the same
/// descriptor; every column holds exactly `len()` rows between calls.
pub(crate) struct MessageBatchBuilder {
    descriptor: MessageDescriptor,
    schema: SchemaRef,
    root: StructColumn,
    rows: usize,
}

impl MessageBatchBuilder {
    pub(crate) fn new(
        descriptor: MessageDescriptor,
        schema: SchemaRef,
    ) -> Result<Self, ProtoParquetError> {
        let root = StructColumn::new(&descriptor, schema.fields())?;
        Ok(Self {
            descriptor,
            schema,
            root,
            rows: 0,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.rows
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Append one row. Messages of another type are refused before any
    /// column is touched.
    ///
    /// Map entries are stored in `order` where it lists them, otherwise in
    /// the map's own iteration order.
    pub(crate) fn append(
        &mut self,
        message: &DynamicMessage,
        order: Option<&WireOrder>,
    ) -> Result<(), ProtoParquetError> {
        if message.descriptor().full_name() != self.descriptor.full_name() {
            return Err(ProtoParquetError::Validation(format!(
                "expected message '{}', got '{}'",
                self.descriptor.full_name(),
                message.descriptor().full_name()
            )));
        }
        self.root.append_message(message, order)?;
        self.rows += 1;
        Ok(())
    }

    /// Drain the buffered rows into a record batch.
    pub(crate) fn finish(&mut self) -> Result<RecordBatch, ProtoParquetError> {
        let (_, columns, _) = self.root.finish(false)?.into_parts();
        self.rows = 0;
        Ok(RecordBatch::try_new(self.schema.clone(), columns)?)
    }
}

// ════════════════════════════════════════════════════════════════
//  Columns
// ════════════════════════════════════════════════════════════════

struct Column {
    nullable: bool,
    data: ColumnData,
}

enum ColumnData {
    Bool(BooleanBuilder),
    Int32(Int32Builder),
    Int64(Int64Builder),
    UInt32(UInt32Builder),
    UInt64(UInt64Builder),
    Float32(Float32Builder),
    Float64(Float64Builder),
    Utf8(StringBuilder),
    Binary(BinaryBuilder),
    Struct(StructColumn),
    List(ListColumn),
}

impl Column {
    fn for_field(field: &FieldDescriptor, arrow: &FieldRef) -> Result<Self, ProtoParquetError> {
        if field.is_list() || field.is_map() {
            let DataType::List(item) = arrow.data_type() else {
                return Err(schema_mismatch(arrow));
            };
            let entry = match (field.is_map(), field.kind()) {
                (true, Kind::Message(entry)) => Some(entry),
                _ => None,
            };
            let values = Column::for_kind(&field.kind(), item, false)?;
            return Ok(Column {
                nullable: false,
                data: ColumnData::List(ListColumn {
                    item: item.clone(),
                    values: Box::new(values),
                    offsets: vec![0],
                    entry,
                }),
            });
        }
        Column::for_kind(&field.kind(), arrow, field.supports_presence())
    }

    fn for_kind(kind: &Kind, arrow: &FieldRef, nullable: bool) -> Result<Self, ProtoParquetError> {
        let data = match kind {
            Kind::Double => ColumnData::Float64(Float64Builder::new()),
            Kind::Float => ColumnData::Float32(Float32Builder::new()),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 | Kind::Enum(_) => {
                ColumnData::Int32(Int32Builder::new())
            }
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => ColumnData::Int64(Int64Builder::new()),
            Kind::Uint32 | Kind::Fixed32 => ColumnData::UInt32(UInt32Builder::new()),
            Kind::Uint64 | Kind::Fixed64 => ColumnData::UInt64(UInt64Builder::new()),
            Kind::Bool => ColumnData::Bool(BooleanBuilder::new()),
            Kind::String => ColumnData::Utf8(StringBuilder::new()),
            Kind::Bytes => ColumnData::Binary(BinaryBuilder::new()),
            Kind::Message(message) => {
                let DataType::Struct(fields) = arrow.data_type() else {
                    return Err(schema_mismatch(arrow));
                };
                ColumnData::Struct(StructColumn::new(message, fields)?)
            }
        };
        Ok(Column { nullable, data })
    }

    fn append(
        &mut self,
        value: &Value,
        order: Option<&FieldOrder>,
    ) -> Result<(), ProtoParquetError> {
        match (&mut self.data, value) {
            (ColumnData::Bool(b), Value::Bool(v)) => b.append_value(*v),
            (ColumnData::Int32(b), Value::I32(v) | Value::EnumNumber(v)) => b.append_value(*v),
            (ColumnData::Int64(b), Value::I64(v)) => b.append_value(*v),
            (ColumnData::UInt32(b), Value::U32(v)) => b.append_value(*v),
            (ColumnData::UInt64(b), Value::U64(v)) => b.append_value(*v),
            (ColumnData::Float32(b), Value::F32(v)) => b.append_value(*v),
            (ColumnData::Float64(b), Value::F64(v)) => b.append_value(*v),
            (ColumnData::Utf8(b), Value::String(v)) => b.append_value(v),
            (ColumnData::Binary(b), Value::Bytes(v)) => b.append_value(v),
            (ColumnData::Struct(s), Value::Message(m)) => {
                s.append_message(m, order.and_then(|o| o.message(0)))?
            }
            (ColumnData::List(l), Value::List(items)) => l.append_items(items, order)?,
            (ColumnData::List(l), Value::Map(entries)) => l.append_entries(entries, order)?,
            (_, other) => {
                return Err(ProtoParquetError::Convert(format!(
                    "value {other:?} does not fit its column"
                )));
            }
        }
        Ok(())
    }

    /// List element or map entry. A message element carries its own order.
    fn append_item(
        &mut self,
        value: &Value,
        order: Option<&WireOrder>,
    ) -> Result<(), ProtoParquetError> {
        if let (ColumnData::Struct(s), Value::Message(m)) = (&mut self.data, value) {
            return s.append_message(m, order);
        }
        self.append(value, None)
    }

    /// Absent value: null where the column allows it, otherwise the
    /// protobuf default (zero, empty string, empty list).
    fn append_null(&mut self) {
        let nullable = self.nullable;
        match &mut self.data {
            ColumnData::Bool(b) => {
                if nullable {
                    b.append_null()
                } else {
                    b.append_value(false)
                }
            }
            ColumnData::Int32(b) => null_or_default(b, nullable),
            ColumnData::Int64(b) => null_or_default(b, nullable),
            ColumnData::UInt32(b) => null_or_default(b, nullable),
            ColumnData::UInt64(b) => null_or_default(b, nullable),
            ColumnData::Float32(b) => null_or_default(b, nullable),
            ColumnData::Float64(b) => null_or_default(b, nullable),
            ColumnData::Utf8(b) => {
                if nullable {
                    b.append_null()
                } else {
                    b.append_value("")
                }
            }
            ColumnData::Binary(b) => {
                if nullable {
                    b.append_null()
                } else {
                    b.append_value(b"")
                }
            }
            ColumnData::Struct(s) => s.append_absent(),
            ColumnData::List(l) => l.close_row(),
        }
    }

    fn finish(&mut self) -> Result<ArrayRef, ProtoParquetError> {
        Ok(match &mut self.data {
            ColumnData::Bool(b) => Arc::new(b.finish()),
            ColumnData::Int32(b) => Arc::new(b.finish()),
            ColumnData::Int64(b) => Arc::new(b.finish()),
            ColumnData::UInt32(b) => Arc::new(b.finish()),
            ColumnData::UInt64(b) => Arc::new(b.finish()),
            ColumnData::Float32(b) => Arc::new(b.finish()),
            ColumnData::Float64(b) => Arc::new(b.finish()),
            ColumnData::Utf8(b) => Arc::new(b.finish()),
            ColumnData::Binary(b) => Arc::new(b.finish()),
            ColumnData::Struct(s) => Arc::new(s.finish(self.nullable)?),
            ColumnData::List(l) => Arc::new(l.finish()?),
        })
    }
}

fn null_or_default<T: ArrowPrimitiveType>(builder: &mut PrimitiveBuilder<T>, nullable: bool) {
    if nullable {
        builder.append_null();
    } else {
        builder.append_value(T::Native::default());
    }
}

fn schema_mismatch(arrow: &FieldRef) -> ProtoParquetError {
    ProtoParquetError::Schema(format!(
        "column '{}' has unexpected type {}",
        arrow.name(),
        arrow.data_type()
    ))
}

// ── Struct ──

struct StructColumn {
    fields: Fields,
    children: Vec<(FieldDescriptor, Column)>,
    validity: Vec<bool>,
}

impl StructColumn {
    fn new(descriptor: &MessageDescriptor, fields: &Fields) -> Result<Self, ProtoParquetError> {
        let children = descriptor
            .fields()
            .zip(fields.iter())
            .map(|(field, arrow)| Ok((field.clone(), Column::for_field(&field, arrow)?)))
            .collect::<Result<Vec<_>, ProtoParquetError>>()?;
        if children.len() != fields.len() {
            return Err(ProtoParquetError::Schema(format!(
                "message '{}' has {} fields, schema has {}",
                descriptor.full_name(),
                children.len(),
                fields.len()
            )));
        }
        Ok(Self {
            fields: fields.clone(),
            children,
            validity: Vec::new(),
        })
    }

    fn append_message(
        &mut self,
        message: &DynamicMessage,
        order: Option<&WireOrder>,
    ) -> Result<(), ProtoParquetError> {
        for (field, column) in &mut self.children {
            let repeated = field.is_list() || field.is_map();
            if !repeated && field.supports_presence() && !message.has_field(field) {
                column.append_null();
            } else {
                let field_order = order.and_then(|o| o.field(field.number()));
                column.append(&message.get_field(field), field_order)?;
            }
        }
        self.validity.push(true);
        Ok(())
    }

    fn append_absent(&mut self) {
        for (_, column) in &mut self.children {
            column.append_null();
        }
        self.validity.push(false);
    }

    fn finish(&mut self, nullable: bool) -> Result<StructArray, ProtoParquetError> {
        let columns = self
            .children
            .iter_mut()
            .map(|(_, column)| column.finish())
            .collect::<Result<Vec<_>, _>>()?;
        let validity = mem::take(&mut self.validity);
        let nulls = nullable.then(|| NullBuffer::from(validity));
        Ok(StructArray::try_new(self.fields.clone(), columns, nulls)?)
    }
}

// ── List ──

struct ListColumn {
    item: FieldRef,
    values: Box<Column>,
    offsets: Vec<i32>,
    /// Entry type when the list stores a map field.
    entry: Option<MessageDescriptor>,
}

impl ListColumn {
    fn append_items(
        &mut self,
        items: &[Value],
        order: Option<&FieldOrder>,
    ) -> Result<(), ProtoParquetError> {
        for (i, item) in items.iter().enumerate() {
            self.values.append_item(item, order.and_then(|o| o.message(i)))?;
        }
        self.push_offset(items.len())
    }

    fn append_entries(
        &mut self,
        entries: &HashMap<MapKey, Value>,
        order: Option<&FieldOrder>,
    ) -> Result<(), ProtoParquetError> {
        let Some(entry) = self.entry.clone() else {
            return Err(ProtoParquetError::Convert("map value in a list column".into()));
        };
        let key_field = entry.map_entry_key_field();
        let value_field = entry.map_entry_value_field();

        // Keys seen on the wire first, in arrival order, then anything else.
        let mut placed = HashSet::with_capacity(entries.len());
        let mut ordered = Vec::with_capacity(entries.len());
        for (key, inner) in order.map(FieldOrder::entries).unwrap_or_default() {
            if let Some((key, value)) = entries.get_key_value(key) {
                if placed.insert(key) {
                    ordered.push((key, value, Some(inner)));
                }
            }
        }
        for (key, value) in entries {
            if !placed.contains(key) {
                ordered.push((key, value, None));
            }
        }

        for (key, value, inner) in ordered {
            let mut message = DynamicMessage::new(entry.clone());
            message.try_set_field(&key_field, map_key_value(key)).map_err(entry_err)?;
            message.try_set_field(&value_field, value.clone()).map_err(entry_err)?;
            self.values.append_item(&Value::Message(message), inner)?;
        }
        self.push_offset(entries.len())
    }

    /// Empty list for the current row.
    fn close_row(&mut self) {
        let last = self.offsets.last().copied().unwrap_or(0);
        self.offsets.push(last);
    }

    fn push_offset(&mut self, added: usize) -> Result<(), ProtoParquetError> {
        let last = self.offsets.last().copied().unwrap_or(0);
        let next = i32::try_from(added)
            .ok()
            .and_then(|added| last.checked_add(added))
            .ok_or_else(|| ProtoParquetError::Convert("list column exceeds i32 offsets".into()))?;
        self.offsets.push(next);
        Ok(())
    }

    fn finish(&mut self) -> Result<ListArray, ProtoParquetError> {
        let values = self.values.finish()?;
        let offsets = mem::replace(&mut self.offsets, vec![0]);
        let offsets = OffsetBuffer::new(ScalarBuffer::from(offsets));
        Ok(ListArray::try_new(self.item.clone(), offsets, values, None)?)
    }
}

fn entry_err(e: impl std::fmt::Display) -> ProtoParquetError {
    ProtoParquetError::Convert(format!("map entry: {e}"))
}

fn map_key_value(key: &MapKey) -> Value {
    match key {
        MapKey::Bool(v) => Value::Bool(*v),
        MapKey::I32(v) => Value::I32(*v),
        MapKey::I64(v) => Value::I64(*v),
        MapKey::U32(v) => Value::U32(*v),
        MapKey::U64(v) => Value::U64(*v),
        MapKey::String(v) => Value::String(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Int64Type, UInt32Type};

    use super::*;
    use crate::schema::arrow_schema;
    use crate::testing;

    fn builder(name: &str) -> MessageBatchBuilder {
        let descriptor = testing::descriptor(name);
        let schema = Arc::new(arrow_schema(&descriptor).unwrap());
        MessageBatchBuilder::new(descriptor, schema).unwrap()
    }

    #[test]
    fn test_click_events_become_columns() {
        let mut batch = builder("colog.test.ClickEvent");
        let descriptor = testing::descriptor("colog.test.ClickEvent");
        for (user_id, ts) in [(1, 1000), (2, 1001), (3, 1002)] {
            let mut message = DynamicMessage::new(descriptor.clone());
            message.set_field_by_name("user_id", Value::I64(user_id));
            message.set_field_by_name("ts", Value::I64(ts));
            batch.append(&message, None).unwrap();
        }
        assert_eq!(batch.len(), 3);

        let records = batch.finish().unwrap();
        assert!(batch.is_empty());
        assert_eq!(records.num_rows(), 3);
        let ts = records.column(1).as_primitive::<Int64Type>();
        assert_eq!(ts.values().to_vec(), vec![1000, 1001, 1002]);
    }

    #[test]
    fn test_absent_fields() {
        let mut batch = builder("colog.test.Order");
        let order = DynamicMessage::new(testing::descriptor("colog.test.Order"));
        batch.append(&order, None).unwrap();

        let records = batch.finish().unwrap();
        let column = |name: &str| records.column_by_name(name).unwrap().clone();
        assert!(column("amount").is_null(0));
        assert!(column("primary").is_null(0));
        assert!(!column("id").is_null(0));
        assert_eq!(column("id").as_string::<i32>().value(0), "");
        assert_eq!(column("tags").as_list::<i32>().value_length(0), 0);
    }

    #[test]
    fn test_nested_and_repeated_values() {
        let descriptor = testing::descriptor("colog.test.Order");
        let item = testing::descriptor("colog.test.Item");
        let mut first = DynamicMessage::new(item.clone());
        first.set_field_by_name("sku", Value::String("a-1".into()));
        first.set_field_by_name("quantity", Value::U32(2));
        let mut second = DynamicMessage::new(item);
        second.set_field_by_name("sku", Value::String("b-2".into()));
        second.set_field_by_name("quantity", Value::U32(5));

        let mut order = DynamicMessage::new(descriptor);
        order.set_field_by_name("primary", Value::Message(first.clone()));
        order.set_field_by_name(
            "items",
            Value::List(vec![Value::Message(first), Value::Message(second)]),
        );
        order.set_field_by_name("tags", Value::List(vec![Value::String("gift".into())]));

        let mut batch = builder("colog.test.Order");
        batch.append(&order, None).unwrap();
        let records = batch.finish().unwrap();

        let items = records.column_by_name("items").unwrap().as_list::<i32>();
        assert_eq!(items.value_length(0), 2);
        let entries = items.value(0);
        let quantities = entries.as_struct().column(1).as_primitive::<UInt32Type>();
        assert_eq!(quantities.values().to_vec(), vec![2, 5]);

        let primary = records.column_by_name("primary").unwrap();
        assert!(!primary.is_null(0));
    }

    #[test]
    fn test_map_entries() {
        let descriptor = testing::descriptor("colog.test.Order");
        let mut order = DynamicMessage::new(descriptor);
        let mut counters = HashMap::new();
        counters.insert(MapKey::String("views".into()), Value::I64(9));
        order.set_field_by_name("counters", Value::Map(counters));

        let mut batch = builder("colog.test.Order");
        batch.append(&order, None).unwrap();
        let records = batch.finish().unwrap();

        let counters = records.column_by_name("counters").unwrap().as_list::<i32>();
        let entries = counters.value(0);
        let entries = entries.as_struct();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.column(0).as_string::<i32>().value(0), "views");
        assert_eq!(entries.column(1).as_primitive::<Int64Type>().value(0), 9);
    }

    #[test]
    fn test_wrong_message_type_refused() {
        let mut batch = builder("colog.test.Order");
        let click = DynamicMessage::new(testing::descriptor("colog.test.ClickEvent"));
        let err = batch.append(&click, None).unwrap_err();
        assert!(matches!(err, ProtoParquetError::Validation(_)));
        assert!(batch.is_empty());
    }
}
