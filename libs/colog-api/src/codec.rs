use std::fmt;

/// Compression codec requested by the caller.
///
/// Opaque to this crate: only the name travels. Format plugins map it to
/// their own codec enumeration and reject names they do not know. Names
/// may be short (`gzip`) or the Hadoop codec class
/// (`org.apache.hadoop.io.compress.GzipCodec`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompressionCodec {
    name: String,
}

impl CompressionCodec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
