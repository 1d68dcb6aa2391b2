use crate::error::{Error, Result};

/// Builder for the MQTT topics a device publishes to.
///
/// Topics follow the pattern `<prefix>/<device_id>/<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBuilder {
    prefix: String,
    device_id: String,
}

impl TopicBuilder {
    /// Create a new topic builder.
    pub fn new(prefix: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            device_id: device_id.into(),
        }
    }

    /// Build a topic for a suffix.
    ///
    /// # Example
    /// ```
    /// use solarsight_common::topic::TopicBuilder;
    ///
    /// let topics = TopicBuilder::new("deye", "deyesun600");
    /// assert_eq!(topics.build("events").unwrap(), "deye/deyesun600/events");
    /// ```
    pub fn build(&self, suffix: &str) -> Result<String> {
        let topic = if suffix.is_empty() {
            format!("{}/{}", self.prefix, self.device_id)
        } else {
            format!("{}/{}/{}", self.prefix, self.device_id, suffix)
        };
        validate_topic(&topic)?;
        Ok(topic)
    }
}

/// Check that a topic is valid for publishing.
///
/// Publish topics must be non-empty and must not contain the `+` or `#`
/// wildcards or a NUL character.
pub fn validate_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(Error::Topic("topic is empty".to_string()));
    }
    if let Some(c) = topic.chars().find(|c| matches!(c, '+' | '#' | '\0')) {
        return Err(Error::Topic(format!(
            "'{}' contains forbidden character {:?}",
            topic, c
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_topic() {
        let topics = TopicBuilder::new("prefix", "device123");

        assert_eq!(topics.build("suffix").unwrap(), "prefix/device123/suffix");
        assert_eq!(
            topics.build("ac/l1/voltage").unwrap(),
            "prefix/device123/ac/l1/voltage"
        );
    }

    #[test]
    fn test_empty_suffix() {
        let topics = TopicBuilder::new("prefix", "device123");
        assert_eq!(topics.build("").unwrap(), "prefix/device123");
    }

    #[test]
    fn test_wildcards_rejected() {
        let topics = TopicBuilder::new("prefix", "device+");
        assert!(matches!(topics.build("x"), Err(Error::Topic(_))));
        assert!(validate_topic("a/#").is_err());
        assert!(validate_topic("").is_err());
    }
}
