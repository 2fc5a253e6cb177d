//! Shared fixtures: a small descriptor set and a factory over a scratch
//! directory.
//!
//! ```proto
//! // events.proto (proto3)
//! package events;
//! message ClickEvent { int64 user_id = 1; int64 ts = 2; }
//! message Item { string sku = 1; uint32 quantity = 2; }
//! message Order {
//!   string id = 1;
//!   optional double amount = 2;
//!   repeated string tags = 3;
//!   Item primary = 4;
//!   repeated Item items = 5;
//!   map<string, int64> counters = 6;
//! }
//!
//! // accounts.proto (proto2)
//! package accounts;
//! message Account { required string id = 1; optional int32 level = 2; }
//! ```

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use colog_api::{CompressionCodec, FileReaderWriterFactory, KeyValue, LogFilePath};
use colog_format_proto_parquet::{
    MessageRegistry, ParquetConfig, ProtobufParquetFileReaderWriterFactory,
};
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet, MessageOptions,
    OneofDescriptorProto,
};
use tempfile::TempDir;

fn field(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Message, label)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

pub fn file_descriptor_set() -> FileDescriptorSet {
    use Label::{Optional, Repeated, Required};

    let mut amount = field("amount", 2, Type::Double, Optional);
    amount.proto3_optional = Some(true);
    amount.oneof_index = Some(0);

    let counters_entry = DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(
            "CountersEntry",
            vec![
                field("key", 1, Type::String, Optional),
                field("value", 2, Type::Int64, Optional),
            ],
        )
    };
    let order = DescriptorProto {
        nested_type: vec![counters_entry],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("_amount".to_string()),
            ..Default::default()
        }],
        ..message(
            "Order",
            vec![
                field("id", 1, Type::String, Optional),
                amount,
                field("tags", 3, Type::String, Repeated),
                message_field("primary", 4, ".events.Item", Optional),
                message_field("items", 5, ".events.Item", Repeated),
                message_field("counters", 6, ".events.Order.CountersEntry", Repeated),
            ],
        )
    };

    let events = FileDescriptorProto {
        name: Some("events.proto".to_string()),
        package: Some("events".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message(
                "ClickEvent",
                vec![
                    field("user_id", 1, Type::Int64, Optional),
                    field("ts", 2, Type::Int64, Optional),
                ],
            ),
            message(
                "Item",
                vec![
                    field("sku", 1, Type::String, Optional),
                    field("quantity", 2, Type::Uint32, Optional),
                ],
            ),
            order,
        ],
        ..Default::default()
    };
    let accounts = FileDescriptorProto {
        name: Some("accounts.proto".to_string()),
        package: Some("accounts".to_string()),
        syntax: Some("proto2".to_string()),
        message_type: vec![message(
            "Account",
            vec![
                field("id", 1, Type::String, Required),
                field("level", 2, Type::Int32, Optional),
            ],
        )],
        ..Default::default()
    };

    FileDescriptorSet {
        file: vec![events, accounts],
    }
}

pub fn pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(file_descriptor_set()).unwrap()
}

pub fn descriptor(name: &str) -> MessageDescriptor {
    pool().get_message_by_name(name).unwrap()
}

pub fn click(user_id: i64, ts: i64) -> DynamicMessage {
    let mut message = DynamicMessage::new(descriptor("events.ClickEvent"));
    message.set_field_by_name("user_id", Value::I64(user_id));
    message.set_field_by_name("ts", Value::I64(ts));
    message
}

// ---------------------------------------------------------------
// Factory over a scratch directory
// ---------------------------------------------------------------

pub struct Fixture {
    pub dir: TempDir,
    pub factory: ProtobufParquetFileReaderWriterFactory,
}

impl Fixture {
    pub fn new(topics: &[(&str, &str)]) -> Self {
        Self::with_config(topics, ParquetConfig::default())
    }

    pub fn with_config(topics: &[(&str, &str)], parquet: ParquetConfig) -> Self {
        let topics: BTreeMap<String, String> = topics
            .iter()
            .map(|(t, m)| (t.to_string(), m.to_string()))
            .collect();
        let registry = MessageRegistry::new(&pool(), &topics).unwrap();
        let factory =
            ProtobufParquetFileReaderWriterFactory::new(Arc::new(registry), parquet).unwrap();
        Self {
            dir: tempfile::tempdir().unwrap(),
            factory,
        }
    }

    pub fn path(&self, topic: &str, offset: u64) -> LogFilePath {
        LogFilePath::new(
            self.dir.path(),
            topic,
            vec!["dt=2024-01-01".to_string()],
            1,
            0,
            offset,
            ".parquet",
        )
    }

    /// Write `payloads` as consecutive records starting at `path.offset()`.
    pub fn write_all(
        &self,
        path: &LogFilePath,
        codec: Option<&CompressionCodec>,
        payloads: &[Vec<u8>],
    ) {
        let mut writer = self.factory.build_file_writer(path, codec).unwrap();
        for (i, payload) in payloads.iter().enumerate() {
            writer
                .write(&KeyValue::new(path.offset() + i as u64, payload.clone()))
                .unwrap();
        }
        writer.close().unwrap();
    }

    pub fn read_all(&self, path: &LogFilePath) -> Vec<KeyValue> {
        let mut reader = self.factory.build_file_reader(path, None).unwrap();
        let mut records = Vec::new();
        while let Some(record) = reader.next().unwrap() {
            records.push(record);
        }
        reader.close().unwrap();
        records
    }
}
