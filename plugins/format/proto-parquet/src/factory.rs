use std::sync::Arc;

use colog_api::{
    CompressionCodec, FileReader, FileReaderWriterFactory, FileWriter, KeyValue, LogFileError,
    LogFilePath,
};
use prost_reflect::MessageDescriptor;

use crate::codec::CodecName;
use crate::config::{ParquetConfig, ProtoParquetConfig};
use crate::decode::{Decoded, Encoding, decode_message, validate_message};
use crate::error::ProtoParquetError;
use crate::reader::ProtoParquetReader;
use crate::registry::MessageRegistry;
use crate::wire::{WireOrder, has_maps};
use crate::writer::{MessageSink, ProtoParquetWriter, WriteCompliantProtoParquetWriter};

/// Builds Parquet readers and writers for protobuf log files.
///
/// Holds only immutable state and can be shared across threads; every
/// reader and writer it builds is independent.
#[derive(Debug, Clone)]
pub struct ProtobufParquetFileReaderWriterFactory {
    registry: Arc<MessageRegistry>,
    parquet: ParquetConfig,
}

impl ProtobufParquetFileReaderWriterFactory {
    pub fn new(
        registry: Arc<MessageRegistry>,
        parquet: ParquetConfig,
    ) -> Result<Self, ProtoParquetError> {
        parquet.validate()?;
        Ok(Self { registry, parquet })
    }

    /// Load the descriptor set named in `config` and build the factory.
    pub fn from_config(config: &ProtoParquetConfig) -> Result<Self, ProtoParquetError> {
        let registry = MessageRegistry::from_config(&config.protobuf)?;
        Self::new(Arc::new(registry), config.parquet)
    }

    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }
}

impl FileReaderWriterFactory for ProtobufParquetFileReaderWriterFactory {
    /// Parquet records the codec per column chunk, so `codec` is not
    /// needed to read.
    fn build_file_reader(
        &self,
        path: &LogFilePath,
        _codec: Option<&CompressionCodec>,
    ) -> Result<Box<dyn FileReader>, LogFileError> {
        let file = path.log_file_path();
        let reader = ProtoParquetReader::open(&file)
            .map_err(|e| LogFileError::from(e).with_context(file.display()))?;
        Ok(Box::new(ProtobufParquetFileReader {
            reader,
            offset: path.offset(),
        }))
    }

    fn build_file_writer(
        &self,
        path: &LogFilePath,
        codec: Option<&CompressionCodec>,
    ) -> Result<Box<dyn FileWriter>, LogFileError> {
        let topic = path.topic();
        let descriptor = self.registry.message_descriptor(topic)?.clone();
        let codec = CodecName::from_codec(codec)?;
        let file = path.log_file_path();
        let writer = ProtoParquetWriter::create(&file, descriptor.clone(), codec, &self.parquet)
            .map_err(|e| LogFileError::from(e).with_context(file.display()))?;

        Ok(Box::new(ProtobufParquetFileWriter {
            topic: topic.to_string(),
            keep_map_order: has_maps(&descriptor),
            descriptor,
            validating: self.parquet.validating,
            writer: Box::new(WriteCompliantProtoParquetWriter::new(writer)),
        }))
    }
}

// ════════════════════════════════════════════════════════════════
//  Reader
// ════════════════════════════════════════════════════════════════

/// Log file reader handing out binary protobuf payloads. Offsets count up
/// from the file's starting offset, one per row.
pub struct ProtobufParquetFileReader {
    reader: ProtoParquetReader,
    offset: u64,
}

impl FileReader for ProtobufParquetFileReader {
    fn next(&mut self) -> Result<Option<KeyValue>, LogFileError> {
        let Some(payload) = self.reader.read()? else {
            return Ok(None);
        };
        let record = KeyValue::new(self.offset, payload);
        self.offset += 1;
        Ok(Some(record))
    }

    fn close(self: Box<Self>) -> Result<(), LogFileError> {
        self.reader.close()?;
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════
//  Writer
// ════════════════════════════════════════════════════════════════

/// Log file writer accepting protobuf JSON or binary payloads for one
/// topic.
pub struct ProtobufParquetFileWriter {
    topic: String,
    descriptor: MessageDescriptor,
    /// Binary payloads of this type contain maps whose entry order must be
    /// read off the wire.
    keep_map_order: bool,
    validating: bool,
    writer: Box<dyn MessageSink>,
}

impl FileWriter for ProtobufParquetFileWriter {
    fn length(&self) -> u64 {
        self.writer.data_size()
    }

    fn write(&mut self, record: &KeyValue) -> Result<(), LogFileError> {
        let context = || format!("topic '{}' offset {}", self.topic, record.offset);
        let decoded = decode_message(&self.descriptor, &record.value);
        let encoding = match &decoded {
            Decoded::Message(_, encoding) => Some(*encoding),
            Decoded::Unrecognized { .. } => None,
        };
        if let Some(encoding) = encoding {
            tracing::trace!(
                topic = %self.topic,
                offset = record.offset,
                ?encoding,
                "record decoded"
            );
        }
        let message = decoded
            .into_result()
            .map_err(|e| LogFileError::from(e).with_context(context()))?;
        if self.validating {
            validate_message(&self.descriptor, &message)
                .map_err(|e| LogFileError::from(e).with_context(context()))?;
        }
        let order = match encoding {
            Some(Encoding::Binary) if self.keep_map_order => Some(
                WireOrder::scan(&self.descriptor, &record.value)
                    .map_err(|e| LogFileError::from(e).with_context(context()))?,
            ),
            _ => None,
        };
        self.writer.write(&message, order.as_ref())?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), LogFileError> {
        self.writer.close()?;
        Ok(())
    }
}
