//! Relay tuning

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::handlers::RelayOptions;

/// Per-turn relay limits
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Bound of each turn's outbound channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Maximum user message length, in characters
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

impl RelayConfig {
    pub fn options(&self) -> RelayOptions {
        RelayOptions {
            channel_capacity: self.channel_capacity,
            max_message_length: self.max_message_length,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel_capacity == 0 || self.channel_capacity > 4096 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        if self.max_message_length == 0 {
            return Err(ValidationError::InvalidMessageLength);
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            max_message_length: default_max_message_length(),
        }
    }
}

fn default_channel_capacity() -> usize {
    64
}

fn default_max_message_length() -> usize {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        assert_eq!(RelayConfig::default().options(), RelayOptions::default());
    }

    #[test]
    fn test_capacity_bounds() {
        for capacity in [0, 5000] {
            let config = RelayConfig {
                channel_capacity: capacity,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(ValidationError::InvalidChannelCapacity));
        }
    }

    #[test]
    fn test_zero_message_length_rejected() {
        let config = RelayConfig {
            max_message_length: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidMessageLength));
    }
}
