pub mod dump;
pub mod import;

use std::path::Path;

use colog_format_proto_parquet::{ProtoParquetConfig, ProtobufParquetFileReaderWriterFactory};

use crate::error::CliError;

/// Load the TOML config and build the factory from it.
pub fn factory(config: &Path) -> Result<ProtobufParquetFileReaderWriterFactory, CliError> {
    let config = ProtoParquetConfig::load(config)?;
    tracing::debug!(
        descriptor_set = %config.protobuf.descriptor_set.display(),
        topics = config.protobuf.topics.len(),
        "loaded config"
    );
    Ok(ProtobufParquetFileReaderWriterFactory::from_config(&config)?)
}
