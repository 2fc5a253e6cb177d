//! Descriptor fixtures for unit tests.
//!
//! ```proto
//! syntax = "proto3";
//! package colog.test;
//!
//! enum Kind { KIND_UNKNOWN = 0; KIND_VIEW = 1; KIND_BUY = 2; }
//! message ClickEvent { int64 user_id = 1; int64 ts = 2; }
//! message Item { string sku = 1; uint32 quantity = 2; }
//! message Order {
//!   string id = 1;
//!   optional double amount = 2;
//!   Kind kind = 3;
//!   repeated string tags = 4;
//!   Item primary = 5;
//!   repeated Item items = 6;
//!   map<string, int64> counters = 7;
//!   bytes blob = 8;
//!   bool gift = 9;
//!   float weight = 10;
//!   uint64 seq = 11;
//!   sint32 delta = 12;
//!   fixed64 checksum = 13;
//! }
//! message Node { string name = 1; Node child = 2; }
//! message Empty {}
//! ```
//!
//! plus a proto2 file `colog.legacy` with
//! `message Account { required string id = 1; optional int32 level = 2; }`.

use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, OneofDescriptorProto,
};

fn field(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn typed(name: &str, number: i32, ty: Type, type_name: &str, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, ty, label)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

pub(crate) fn file_descriptor_set() -> FileDescriptorSet {
    use Label::{Optional, Repeated, Required};

    let kind = EnumDescriptorProto {
        name: Some("Kind".to_string()),
        value: ["KIND_UNKNOWN", "KIND_VIEW", "KIND_BUY"]
            .iter()
            .enumerate()
            .map(|(i, name)| EnumValueDescriptorProto {
                name: Some(name.to_string()),
                number: Some(i as i32),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

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
                typed("kind", 3, Type::Enum, ".colog.test.Kind", Optional),
                field("tags", 4, Type::String, Repeated),
                typed("primary", 5, Type::Message, ".colog.test.Item", Optional),
                typed("items", 6, Type::Message, ".colog.test.Item", Repeated),
                typed(
                    "counters",
                    7,
                    Type::Message,
                    ".colog.test.Order.CountersEntry",
                    Repeated,
                ),
                field("blob", 8, Type::Bytes, Optional),
                field("gift", 9, Type::Bool, Optional),
                field("weight", 10, Type::Float, Optional),
                field("seq", 11, Type::Uint64, Optional),
                field("delta", 12, Type::Sint32, Optional),
                field("checksum", 13, Type::Fixed64, Optional),
            ],
        )
    };

    let proto3 = FileDescriptorProto {
        name: Some("colog_test.proto".to_string()),
        package: Some("colog.test".to_string()),
        syntax: Some("proto3".to_string()),
        enum_type: vec![kind],
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
            message(
                "Node",
                vec![
                    field("name", 1, Type::String, Optional),
                    typed("child", 2, Type::Message, ".colog.test.Node", Optional),
                ],
            ),
            message("Empty", vec![]),
        ],
        ..Default::default()
    };

    let proto2 = FileDescriptorProto {
        name: Some("colog_legacy.proto".to_string()),
        package: Some("colog.legacy".to_string()),
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
        file: vec![proto3, proto2],
    }
}

pub(crate) fn pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(file_descriptor_set()).unwrap()
}

pub(crate) fn descriptor(name: &str) -> MessageDescriptor {
    pool().get_message_by_name(name).unwrap()
}
