use colog_api::LogFileError;

#[derive(Debug, thiserror::Error)]
pub enum ProtoParquetError {
    #[error("config error: {0}")]
    Config(String),

    #[error("no message type registered for topic '{0}'")]
    UnknownTopic(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("stored schema unreadable: {0}")]
    StoredSchema(String),

    #[error("unsupported compression codec '{0}'")]
    UnsupportedCodec(String),

    #[error("payload is neither JSON nor binary {message}: json: {json}; binary: {binary}")]
    Undecodable {
        message: String,
        json: String,
        binary: String,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("column conversion: {0}")]
    Convert(String),

    #[error("writer for '{0}' failed earlier; the file cannot be completed")]
    Failed(String),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtoParquetError {
    /// Add context to the error.
    ///
    /// String-carrying variants get the context prepended; wrapped library
    /// errors are left as they are.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            ProtoParquetError::Config(msg) => ProtoParquetError::Config(format!("{ctx}: {msg}")),
            ProtoParquetError::Schema(msg) => ProtoParquetError::Schema(format!("{ctx}: {msg}")),
            ProtoParquetError::StoredSchema(msg) => {
                ProtoParquetError::StoredSchema(format!("{ctx}: {msg}"))
            }
            ProtoParquetError::Validation(msg) => {
                ProtoParquetError::Validation(format!("{ctx}: {msg}"))
            }
            ProtoParquetError::Convert(msg) => ProtoParquetError::Convert(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

impl From<ProtoParquetError> for LogFileError {
    fn from(e: ProtoParquetError) -> Self {
        let message = e.to_string();
        match e {
            ProtoParquetError::Config(_) => LogFileError::config(message),
            ProtoParquetError::UnknownTopic(_) | ProtoParquetError::Schema(_) => {
                LogFileError::schema(message)
            }
            ProtoParquetError::UnsupportedCodec(_) => LogFileError::codec(message),
            ProtoParquetError::Undecodable { .. } | ProtoParquetError::Validation(_) => {
                LogFileError::decode(message)
            }
            ProtoParquetError::StoredSchema(_)
            | ProtoParquetError::Convert(_)
            | ProtoParquetError::Failed(_)
            | ProtoParquetError::Parquet(_)
            | ProtoParquetError::Arrow(_)
            | ProtoParquetError::Io(_) => LogFileError::io(message),
        }
    }
}
