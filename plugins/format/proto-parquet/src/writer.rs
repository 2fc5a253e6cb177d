use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};

use crate::batch::MessageBatchBuilder;
use crate::codec::CodecName;
use crate::config::ParquetConfig;
use crate::error::ProtoParquetError;
use crate::schema::{arrow_schema, descriptor_metadata};
use crate::wire::WireOrder;
use crate::{BATCH_BYTES, BATCH_ROWS};

/// Destination for decoded messages of one type.
pub trait MessageSink: Send {
    /// Append one message. `order` is the map entry order of the payload
    /// the message was decoded from, when known. A message that cannot be
    /// appended leaves the sink unchanged.
    fn write(
        &mut self,
        message: &DynamicMessage,
        order: Option<&WireOrder>,
    ) -> Result<(), ProtoParquetError>;

    /// Bytes accounted to the file so far.
    fn data_size(&self) -> u64;

    /// Flush everything and write the footer.
    fn close(self: Box<Self>) -> Result<(), ProtoParquetError>;
}

// ════════════════════════════════════════════════════════════════
//  ProtoParquetWriter
// ════════════════════════════════════════════════════════════════

/// Parquet file writer for messages of a single protobuf type.
///
/// Messages are buffered as Arrow columns and handed to the engine once
/// the buffer holds [`BATCH_ROWS`] rows or its encoded size reaches
/// `block_size` (capped at [`BATCH_BYTES`]). The engine's row group is
/// closed once its in-memory size reaches `block_size`. `data_size` counts
/// only bytes that reached the file.
///
/// If the engine rejects a batch, the buffered rows are gone and the file
/// cannot be completed: every later `write` and `close` fails.
pub struct ProtoParquetWriter<W: Write + Send = File> {
    path: PathBuf,
    rows: MessageBatchBuilder,
    writer: ArrowWriter<W>,
    block_size: usize,
    /// Encoded size of the messages sitting in `rows`.
    buffered_bytes: u64,
    total_rows: u64,
    failed: bool,
}

impl ProtoParquetWriter<File> {
    /// Create a new file at `path`. Existing files are never overwritten.
    ///
    /// The schema and codec are checked before the file is created, so a
    /// failure here leaves nothing behind on disk.
    pub fn create(
        path: &Path,
        descriptor: MessageDescriptor,
        codec: CodecName,
        config: &ParquetConfig,
    ) -> Result<Self, ProtoParquetError> {
        let (schema, props) = layout(&descriptor, codec, config)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create_new(path)?;
        let writer = Self::open(path, file, descriptor.clone(), schema, props, config)?;

        tracing::debug!(
            path = %path.display(),
            message = descriptor.full_name(),
            codec = %codec,
            block_size = config.block_size,
            page_size = config.page_size,
            dictionary = config.enable_dictionary,
            "parquet writer opened"
        );
        Ok(writer)
    }
}

/// Arrow schema and engine properties for files of `descriptor`.
fn layout(
    descriptor: &MessageDescriptor,
    codec: CodecName,
    config: &ParquetConfig,
) -> Result<(SchemaRef, WriterProperties), ProtoParquetError> {
    let schema = Arc::new(
        arrow_schema(descriptor)
            .map_err(|e| e.with_context(format!("message '{}'", descriptor.full_name())))?,
    );
    let props = WriterProperties::builder()
        .set_compression(codec.compression()?)
        .set_data_page_size_limit(config.page_size)
        .set_dictionary_page_size_limit(config.page_size)
        .set_dictionary_enabled(config.enable_dictionary)
        .set_key_value_metadata(Some(descriptor_metadata(descriptor)))
        .build();
    Ok((schema, props))
}

impl<W: Write + Send> ProtoParquetWriter<W> {
    fn open(
        path: &Path,
        output: W,
        descriptor: MessageDescriptor,
        schema: SchemaRef,
        props: WriterProperties,
        config: &ParquetConfig,
    ) -> Result<Self, ProtoParquetError> {
        let rows = MessageBatchBuilder::new(descriptor, schema.clone())?;
        let writer = ArrowWriter::try_new(output, schema, Some(props))?;
        Ok(Self {
            path: path.to_path_buf(),
            rows,
            writer,
            block_size: config.block_size,
            buffered_bytes: 0,
            total_rows: 0,
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows accepted so far, flushed or not.
    pub fn rows(&self) -> u64 {
        self.total_rows
    }

    /// Bytes written to the file.
    pub fn bytes_written(&self) -> u64 {
        self.writer.bytes_written() as u64
    }

    /// Bytes held in memory: the open row group plus rows not yet handed
    /// to the engine.
    pub fn buffered_size(&self) -> u64 {
        self.writer.in_progress_size() as u64 + self.buffered_bytes
    }

    fn ensure_usable(&self) -> Result<(), ProtoParquetError> {
        if self.failed {
            return Err(ProtoParquetError::Failed(self.path.display().to_string()));
        }
        Ok(())
    }

    fn batch_full(&self) -> bool {
        let byte_limit = self.block_size.min(BATCH_BYTES) as u64;
        self.rows.len() >= BATCH_ROWS || self.buffered_bytes >= byte_limit
    }

    fn flush_rows(&mut self) -> Result<(), ProtoParquetError> {
        if self.rows.is_empty() {
            return Ok(());
        }
        let result = self.write_batch();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn write_batch(&mut self) -> Result<(), ProtoParquetError> {
        let batch = self.rows.finish()?;
        self.buffered_bytes = 0;
        self.writer.write(&batch)?;
        if self.writer.in_progress_size() >= self.block_size {
            tracing::trace!(
                path = %self.path.display(),
                rows = self.writer.in_progress_rows(),
                size = self.writer.in_progress_size(),
                "closing row group"
            );
            self.writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write + Send> MessageSink for ProtoParquetWriter<W> {
    fn write(
        &mut self,
        message: &DynamicMessage,
        order: Option<&WireOrder>,
    ) -> Result<(), ProtoParquetError> {
        self.ensure_usable()?;
        if self.batch_full() {
            self.flush_rows()?;
        }
        self.rows.append(message, order)?;
        self.buffered_bytes += message.encoded_len() as u64;
        self.total_rows += 1;
        Ok(())
    }

    fn data_size(&self) -> u64 {
        self.bytes_written()
    }

    fn close(mut self: Box<Self>) -> Result<(), ProtoParquetError> {
        self.ensure_usable()?;
        self.flush_rows()?;
        let Self {
            path,
            writer,
            total_rows,
            ..
        } = *self;
        let metadata = writer.close()?;
        tracing::info!(
            path = %path.display(),
            rows = total_rows,
            row_groups = metadata.row_groups.len(),
            "parquet file closed"
        );
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════
//  WriteCompliantProtoParquetWriter
// ════════════════════════════════════════════════════════════════

/// [`ProtoParquetWriter`] whose `data_size` also counts buffered data.
///
/// Reports flushed plus buffered bytes, so the size grows with every
/// write even while the first row group is still open. Closing a row group
/// can shrink the estimate once the data is compressed; the reported value
/// holds at its previous maximum until the real size catches up.
pub struct WriteCompliantProtoParquetWriter {
    inner: ProtoParquetWriter,
    reported: u64,
}

impl WriteCompliantProtoParquetWriter {
    pub fn new(inner: ProtoParquetWriter) -> Self {
        let reported = inner.bytes_written() + inner.buffered_size();
        Self { inner, reported }
    }

    pub fn inner(&self) -> &ProtoParquetWriter {
        &self.inner
    }
}

impl MessageSink for WriteCompliantProtoParquetWriter {
    fn write(
        &mut self,
        message: &DynamicMessage,
        order: Option<&WireOrder>,
    ) -> Result<(), ProtoParquetError> {
        self.inner.write(message, order)?;
        let current = self.inner.bytes_written() + self.inner.buffered_size();
        self.reported = self.reported.max(current);
        Ok(())
    }

    fn data_size(&self) -> u64 {
        self.reported
    }

    fn close(self: Box<Self>) -> Result<(), ProtoParquetError> {
        Box::new(self.inner).close()
    }
}
