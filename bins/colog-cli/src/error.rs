#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Format(#[from] colog_format_proto_parquet::ProtoParquetError),

    #[error("{0}")]
    LogFile(#[from] colog_api::LogFileError),

    #[error("line {line}: {detail}")]
    Input { line: usize, detail: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
