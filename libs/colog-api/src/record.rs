/// A single log record: position within the source partition plus an
/// opaque payload. Neither the reader nor the writer stores `offset` in the
/// file; it is reconstructed from the file's starting offset on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub offset: u64,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(offset: u64, value: impl Into<Vec<u8>>) -> Self {
        Self { offset, value: value.into() }
    }
}
