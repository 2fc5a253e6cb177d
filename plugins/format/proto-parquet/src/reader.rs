use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, StructArray};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use prost_reflect::MessageDescriptor;

use crate::BATCH_ROWS;
use crate::error::ProtoParquetError;
use crate::rows::encode_row;
use crate::schema::stored_descriptor;

/// Reads the messages of a Parquet file written by
/// [`crate::ProtoParquetWriter`], in file order, as binary protobuf
/// payloads.
///
/// The message type comes from the file's own metadata.
pub struct ProtoParquetReader {
    path: PathBuf,
    descriptor: MessageDescriptor,
    batches: ParquetRecordBatchReader,
    current: Option<StructArray>,
    row: usize,
    exhausted: bool,
}

impl ProtoParquetReader {
    pub fn open(path: &Path) -> Result<Self, ProtoParquetError> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let file_metadata = builder.metadata().file_metadata();
        let descriptor = stored_descriptor(file_metadata.key_value_metadata())
            .map_err(|e| e.with_context(path.display()))?;
        let rows = file_metadata.num_rows();
        let batches = builder.with_batch_size(BATCH_ROWS).build()?;

        tracing::debug!(
            path = %path.display(),
            message = descriptor.full_name(),
            rows,
            "parquet reader opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            descriptor,
            batches,
            current: None,
            row: 0,
            exhausted: false,
        })
    }

    /// Message type stored in the file.
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    /// Next payload, or `None` once every row has been read.
    pub fn read(&mut self) -> Result<Option<Vec<u8>>, ProtoParquetError> {
        loop {
            if self.exhausted {
                return Ok(None);
            }
            if let Some(array) = &self.current {
                if self.row < array.len() {
                    let payload = encode_row(&self.descriptor, array, self.row)?;
                    self.row += 1;
                    return Ok(Some(payload));
                }
            }
            match self.batches.next() {
                Some(batch) => {
                    self.current = Some(StructArray::from(batch?));
                    self.row = 0;
                }
                None => {
                    self.current = None;
                    self.exhausted = true;
                }
            }
        }
    }

    pub fn close(self) -> Result<(), ProtoParquetError> {
        tracing::debug!(path = %self.path.display(), "parquet reader closed");
        Ok(())
    }
}
