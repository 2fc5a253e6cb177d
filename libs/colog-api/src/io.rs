use crate::codec::CompressionCodec;
use crate::error::LogFileError;
use crate::path::LogFilePath;
use crate::record::KeyValue;

/// Sequential, single-pass reader over one log file.
///
/// `close()` consumes the reader, so it can run at most once and no
/// `next()` can follow it.
pub trait FileReader: Send {
    /// Next record, or `None` once the file is exhausted. Keeps returning
    /// `None` on further calls.
    fn next(&mut self) -> Result<Option<KeyValue>, LogFileError>;

    /// Release the underlying file.
    fn close(self: Box<Self>) -> Result<(), LogFileError>;
}

/// Sequential, single-pass writer producing one log file.
pub trait FileWriter: Send {
    /// Amount of data written so far. An estimate until `close()`; never
    /// decreases between writes.
    fn length(&self) -> u64;

    /// Append one record. On error nothing from this record is appended.
    fn write(&mut self, record: &KeyValue) -> Result<(), LogFileError>;

    /// Flush buffered data and finalize the file.
    fn close(self: Box<Self>) -> Result<(), LogFileError>;
}

/// Creates readers and writers for one on-disk format.
///
/// Implementations hold only immutable, process-wide settings and may be
/// shared across threads; every reader/writer they hand out is independent.
pub trait FileReaderWriterFactory: Send + Sync {
    fn build_file_reader(
        &self,
        path: &LogFilePath,
        codec: Option<&CompressionCodec>,
    ) -> Result<Box<dyn FileReader>, LogFileError>;

    fn build_file_writer(
        &self,
        path: &LogFilePath,
        codec: Option<&CompressionCodec>,
    ) -> Result<Box<dyn FileWriter>, LogFileError>;
}
