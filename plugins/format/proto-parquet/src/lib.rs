//! Protobuf ⇄ Parquet log files.
//!
//! Writers decode each record payload (protobuf JSON or binary) with the
//! message type registered for the file's topic and append it as one
//! Parquet row. Readers turn rows back into binary protobuf payloads and
//! number them from the file's starting offset.

mod batch;
pub mod codec;
pub mod config;
pub mod decode;
pub mod error;
pub mod factory;
pub mod reader;
pub mod registry;
mod rows;
pub mod schema;
pub mod wire;
pub mod writer;

#[cfg(test)]
mod testing;

pub use codec::CodecName;
pub use config::{ParquetConfig, ProtoParquetConfig, ProtobufConfig};
pub use decode::{Decoded, Encoding};
pub use error::ProtoParquetError;
pub use factory::{
    ProtobufParquetFileReader, ProtobufParquetFileReaderWriterFactory, ProtobufParquetFileWriter,
};
pub use reader::ProtoParquetReader;
pub use registry::MessageRegistry;
pub use wire::WireOrder;
pub use writer::{MessageSink, ProtoParquetWriter, WriteCompliantProtoParquetWriter};

/// Rows per Arrow record batch, on both the write and the read path.
pub(crate) const BATCH_ROWS: usize = 1024;

/// Upper bound on the encoded size of one buffered write batch.
pub(crate) const BATCH_BYTES: usize = 16 * 1024 * 1024;
