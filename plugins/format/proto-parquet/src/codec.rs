use colog_api::CompressionCodec;
use parquet::basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel};

use crate::error::ProtoParquetError;

/// Compression codec names known to the Parquet engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecName {
    Uncompressed,
    Snappy,
    Gzip,
    Lzo,
    Brotli,
    Lz4,
    Zstd,
    Lz4Raw,
}

/// Accepted spellings per codec: short name first, then codec class names
/// as they appear in Hadoop-style configuration.
const ALIASES: &[(CodecName, &[&str])] = &[
    (CodecName::Uncompressed, &["uncompressed", "none"]),
    (
        CodecName::Snappy,
        &[
            "snappy",
            "org.apache.hadoop.io.compress.SnappyCodec",
            "org.apache.parquet.hadoop.codec.SnappyCodec",
        ],
    ),
    (
        CodecName::Gzip,
        &["gzip", "gz", "org.apache.hadoop.io.compress.GzipCodec"],
    ),
    (CodecName::Lzo, &["lzo", "com.hadoop.compression.lzo.LzoCodec"]),
    (
        CodecName::Brotli,
        &["brotli", "org.apache.hadoop.io.compress.BrotliCodec"],
    ),
    (CodecName::Lz4, &["lz4", "org.apache.hadoop.io.compress.Lz4Codec"]),
    (
        CodecName::Zstd,
        &[
            "zstd",
            "org.apache.hadoop.io.compress.ZStandardCodec",
            "org.apache.parquet.hadoop.codec.ZstandardCodec",
        ],
    ),
    (
        CodecName::Lz4Raw,
        &["lz4_raw", "org.apache.parquet.hadoop.codec.Lz4RawCodec"],
    ),
];

impl CodecName {
    /// Map the caller's codec to an engine codec name. No codec means
    /// uncompressed; a name nobody recognises is an error.
    pub fn from_codec(codec: Option<&CompressionCodec>) -> Result<Self, ProtoParquetError> {
        let Some(codec) = codec else {
            return Ok(CodecName::Uncompressed);
        };
        ALIASES
            .iter()
            .find(|(_, names)| names.iter().any(|n| n.eq_ignore_ascii_case(codec.name())))
            .map(|(name, _)| *name)
            .ok_or_else(|| ProtoParquetError::UnsupportedCodec(codec.name().to_string()))
    }

    /// Short lowercase name, as accepted by `from_codec`.
    pub fn as_str(self) -> &'static str {
        ALIASES
            .iter()
            .find(|(name, _)| *name == self)
            .map(|(_, names)| names[0])
            .unwrap_or("uncompressed")
    }

    /// Engine compression setting. LZO is a valid Parquet codec but the
    /// engine cannot write it.
    pub fn compression(self) -> Result<Compression, ProtoParquetError> {
        Ok(match self {
            CodecName::Uncompressed => Compression::UNCOMPRESSED,
            CodecName::Snappy => Compression::SNAPPY,
            CodecName::Gzip => Compression::GZIP(GzipLevel::default()),
            CodecName::Lzo => {
                return Err(ProtoParquetError::UnsupportedCodec(self.as_str().to_string()));
            }
            CodecName::Brotli => Compression::BROTLI(BrotliLevel::default()),
            CodecName::Lz4 => Compression::LZ4,
            CodecName::Zstd => Compression::ZSTD(ZstdLevel::default()),
            CodecName::Lz4Raw => Compression::LZ4_RAW,
        })
    }
}

impl std::fmt::Display for CodecName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
