use std::path::{Path, PathBuf};

use crate::error::LogFileError;

/// Identity of one log file: where it lives, which topic it belongs to and
/// the offset of its first record.
///
/// On disk:
/// ```text
/// {prefix}/{topic}/{partition...}/{generation}_{kafka_partition}_{offset:020}{extension}
/// ```
///
/// A file outside that layout can still be addressed with
/// [`LogFilePath::from_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilePath {
    /// Explicit location overriding the layout.
    location: Option<PathBuf>,
    prefix: PathBuf,
    topic: String,
    partitions: Vec<String>,
    generation: u32,
    kafka_partition: u32,
    offset: u64,
    extension: String,
}

impl LogFilePath {
    pub fn new(
        prefix: impl Into<PathBuf>,
        topic: impl Into<String>,
        partitions: Vec<String>,
        generation: u32,
        kafka_partition: u32,
        offset: u64,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            location: None,
            prefix: prefix.into(),
            topic: topic.into(),
            partitions,
            generation,
            kafka_partition,
            offset,
            extension: extension.into(),
        }
    }

    /// Identity of a file at an arbitrary location.
    pub fn from_path(path: impl Into<PathBuf>, topic: impl Into<String>, offset: u64) -> Self {
        let location = path.into();
        let extension = location
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .and_then(|name| name.find('.').map(|pos| name[pos..].to_string()))
            .unwrap_or_default();
        Self {
            prefix: location.parent().map(Path::to_path_buf).unwrap_or_default(),
            location: Some(location),
            topic: topic.into(),
            partitions: Vec::new(),
            generation: 0,
            kafka_partition: 0,
            offset,
            extension,
        }
    }

    /// Recover the identity from a full file path under `prefix`.
    pub fn parse(prefix: &Path, path: &Path) -> Result<Self, LogFileError> {
        let display = path.display();
        let relative = path
            .strip_prefix(prefix)
            .map_err(|_| LogFileError::path(format!("'{display}' is not under '{}'", prefix.display())))?;

        let mut elements: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if elements.len() < 2 {
            return Err(LogFileError::path(format!("'{display}': expected topic and file name")));
        }
        let file_name = elements.pop().unwrap_or_default();
        let topic = elements.remove(0);

        let (basename, extension) = match file_name.find('.') {
            Some(pos) => (&file_name[..pos], &file_name[pos..]),
            None => (file_name.as_str(), ""),
        };
        let fields: Vec<&str> = basename.split('_').collect();
        let [generation, kafka_partition, offset] = fields.as_slice() else {
            return Err(LogFileError::path(format!(
                "'{display}': file name must be generation_partition_offset"
            )));
        };
        let number = |s: &str| {
            s.parse::<u64>()
                .map_err(|e| LogFileError::path(format!("'{display}': bad number '{s}': {e}")))
        };
        let narrow = |v: u64| {
            u32::try_from(v).map_err(|e| LogFileError::path(format!("'{display}': {e}")))
        };

        Ok(Self {
            location: None,
            prefix: prefix.to_path_buf(),
            topic,
            partitions: elements,
            generation: narrow(number(*generation)?)?,
            kafka_partition: narrow(number(*kafka_partition)?)?,
            offset: number(*offset)?,
            extension: extension.to_string(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partitions(&self) -> &[String] {
        &self.partitions
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn kafka_partition(&self) -> u32 {
        self.kafka_partition
    }

    /// Offset of the first record in the file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Directory holding the file: `{prefix}/{topic}/{partition...}`.
    pub fn log_file_dir(&self) -> PathBuf {
        if let Some(parent) = self.location.as_deref().and_then(Path::parent) {
            return parent.to_path_buf();
        }
        let mut dir = self.prefix.join(&self.topic);
        for partition in &self.partitions {
            dir.push(partition);
        }
        dir
    }

    /// File name without directory and extension.
    pub fn log_file_basename(&self) -> String {
        format!("{}_{}_{:020}", self.generation, self.kafka_partition, self.offset)
    }

    /// Full path of the file.
    pub fn log_file_path(&self) -> PathBuf {
        if let Some(location) = &self.location {
            return location.clone();
        }
        self.log_file_dir()
            .join(format!("{}{}", self.log_file_basename(), self.extension))
    }
}
