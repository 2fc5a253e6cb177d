use std::collections::{BTreeMap, HashMap};

use prost_reflect::{DescriptorPool, MessageDescriptor};

use crate::config::ProtobufConfig;
use crate::error::ProtoParquetError;

/// Topic key that applies to every topic without its own entry.
pub const ALL_TOPICS: &str = "*";

/// Topic → message type, fixed at startup.
///
/// Every configured type name is resolved against the descriptor pool up
/// front, so a typo fails construction instead of the first write.
#[derive(Debug, Clone)]
pub struct MessageRegistry {
    by_topic: HashMap<String, MessageDescriptor>,
    all_topics: Option<MessageDescriptor>,
}

impl MessageRegistry {
    pub fn new(
        pool: &DescriptorPool,
        topics: &BTreeMap<String, String>,
    ) -> Result<Self, ProtoParquetError> {
        let mut by_topic = HashMap::with_capacity(topics.len());
        let mut all_topics = None;

        for (topic, type_name) in topics {
            let descriptor = pool.get_message_by_name(type_name).ok_or_else(|| {
                ProtoParquetError::Config(format!(
                    "topic '{topic}': message type '{type_name}' not found in descriptor set"
                ))
            })?;
            if topic == ALL_TOPICS {
                all_topics = Some(descriptor);
            } else {
                by_topic.insert(topic.clone(), descriptor);
            }
        }

        tracing::debug!(
            topics = by_topic.len(),
            wildcard = all_topics.is_some(),
            "message registry built"
        );
        Ok(Self { by_topic, all_topics })
    }

    /// Read the descriptor set named in the config and resolve its topics.
    pub fn from_config(config: &ProtobufConfig) -> Result<Self, ProtoParquetError> {
        let path = config.descriptor_set.display();
        let bytes = std::fs::read(&config.descriptor_set).map_err(|e| {
            ProtoParquetError::Config(format!("failed to read descriptor set '{path}': {e}"))
        })?;
        let pool = DescriptorPool::decode(bytes.as_slice()).map_err(|e| {
            ProtoParquetError::Config(format!("failed to parse descriptor set '{path}': {e}"))
        })?;
        Self::new(&pool, &config.topics)
    }

    /// Message type for `topic`.
    pub fn message_descriptor(&self, topic: &str) -> Result<&MessageDescriptor, ProtoParquetError> {
        self.by_topic
            .get(topic)
            .or(self.all_topics.as_ref())
            .ok_or_else(|| ProtoParquetError::UnknownTopic(topic.to_string()))
    }
}
