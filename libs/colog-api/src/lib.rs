pub mod codec;
pub mod error;
pub mod io;
pub mod path;
pub mod record;

pub use codec::CompressionCodec;
pub use error::{ErrorKind, LogFileError};
pub use io::{FileReader, FileReaderWriterFactory, FileWriter};
pub use path::LogFilePath;
pub use record::KeyValue;
