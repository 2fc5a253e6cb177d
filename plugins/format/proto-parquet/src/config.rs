use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ProtoParquetError;

/// Root configuration, parsed from TOML.
///
/// ```toml
/// [parquet]
/// block_size = 134217728
/// page_size = 1048576
/// enable_dictionary = true
/// validating = false
///
/// [protobuf]
/// descriptor_set = "schemas.bin"
///
/// [protobuf.topics]
/// clicks = "events.ClickEvent"
/// "*" = "events.Generic"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ProtoParquetConfig {
    #[serde(default)]
    pub parquet: ParquetConfig,
    pub protobuf: ProtobufConfig,
}

/// Physical layout of every file a factory writes. Read once, never
/// changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParquetConfig {
    /// Row group size target in bytes.
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Data and dictionary page size limit in bytes.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_enable_dictionary")]
    pub enable_dictionary: bool,

    /// Check message type and proto2 `required` fields before appending.
    #[serde(default)]
    pub validating: bool,
}

fn default_block_size() -> usize {
    128 * 1024 * 1024
}

fn default_page_size() -> usize {
    1024 * 1024
}

fn default_enable_dictionary() -> bool {
    true
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            page_size: default_page_size(),
            enable_dictionary: default_enable_dictionary(),
            validating: false,
        }
    }
}

impl ParquetConfig {
    pub fn validate(&self) -> Result<(), ProtoParquetError> {
        if self.block_size == 0 {
            return Err(ProtoParquetError::Config("parquet.block_size must be positive".into()));
        }
        if self.page_size == 0 {
            return Err(ProtoParquetError::Config("parquet.page_size must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtobufConfig {
    /// Path to FileDescriptorSet (.bin from `protoc --descriptor_set_out`).
    pub descriptor_set: PathBuf,

    /// Topic → fully-qualified message type name. `"*"` applies to every
    /// topic without its own entry.
    #[serde(default)]
    pub topics: BTreeMap<String, String>,
}

impl ProtoParquetConfig {
    /// Load configuration from a TOML file. A relative `descriptor_set` is
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ProtoParquetError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProtoParquetError::Config(format!("{}: {e}", path.display())))?;
        let mut config = Self::parse(&content).map_err(|e| e.with_context(path.display()))?;
        if config.protobuf.descriptor_set.is_relative() {
            if let Some(dir) = path.parent() {
                config.protobuf.descriptor_set = dir.join(&config.protobuf.descriptor_set);
            }
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ProtoParquetError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ProtoParquetError::Config(e.to_string()))?;
        config.parquet.validate()?;
        Ok(config)
    }
}
