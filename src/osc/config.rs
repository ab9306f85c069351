use std::fmt;

use serde::{Deserialize, Serialize};

use super::osc_handler::OscError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 12021;

/// Destination of the outgoing OSC stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    pub host: String,
    pub port: u16,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for OscConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl OscConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn validate(&self) -> Result<(), OscError> {
        if self.host.trim().is_empty() {
            return Err(OscError::InvalidTarget("host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(OscError::InvalidTarget(
                "port must be between 1 and 65535".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_usual_receiver() {
        let config = OscConfig::default();
        assert_eq!(config.to_string(), "127.0.0.1:12021");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_host_and_port_zero_are_rejected() {
        assert!(OscConfig::new("  ", 9000).validate().is_err());
        assert!(OscConfig::new("localhost", 0).validate().is_err());
        assert!(OscConfig::new("localhost", 65535).validate().is_ok());
    }
}
