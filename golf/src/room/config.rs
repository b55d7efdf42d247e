//! Room configuration: queue sizes and WebSocket heartbeat timings.

use std::time::Duration;

/// Per-room and per-connection limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Capacity of the room's inbox
    pub inbox_capacity: usize,

    /// Capacity of each connection's outbound queue. A connection whose
    /// queue is full is dropped.
    pub outbound_capacity: usize,

    /// How often the writer pings an idle peer
    pub ping_interval: Duration,

    /// How long a peer may stay silent before it is dropped
    pub pong_wait: Duration,

    /// Deadline for a single socket write
    pub write_wait: Duration,

    /// Largest inbound frame accepted
    pub max_message_bytes: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: 100,
            outbound_capacity: 64,
            ping_interval: Duration::from_secs(20),
            pong_wait: Duration::from_secs(90),
            write_wait: Duration::from_secs(10),
            max_message_bytes: 512 * 1024,
        }
    }
}

impl RoomConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.inbox_capacity == 0 || self.outbound_capacity == 0 {
            return Err("Queue capacities must be greater than 0".to_string());
        }

        if self.ping_interval >= self.pong_wait {
            return Err("Ping interval must be shorter than pong wait".to_string());
        }

        if self.max_message_bytes == 0 {
            return Err("Max message size must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RoomConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_message_bytes, 524_288);
    }

    #[test]
    fn test_ping_must_beat_pong_wait() {
        let config = RoomConfig {
            ping_interval: Duration::from_secs(90),
            ..RoomConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = RoomConfig {
            outbound_capacity: 0,
            ..RoomConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
