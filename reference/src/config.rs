use pipeline::config::{GcpConfig, Listener, ValidationError};
use pipeline::loader::TableId;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Serves both the customer stub and the load trigger
    pub listener: Listener,
    /// Endpoint the load job pulls customers from
    pub api_url: Url,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub destination: TableId,
    pub gcp: GcpConfig,
    #[serde(default = "default_poll_interval_ms")]
    pub load_poll_interval_ms: u64,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.gcp.validate()?;
        if self.load_poll_interval_ms == 0 {
            return Err(ValidationError::InvalidPollInterval);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn load_poll_interval(&self) -> Duration {
        Duration::from_millis(self.load_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
listener:
    host: "0.0.0.0"
    port: 8090
api_url: "https://us-central1-sapiens-assessment-pipiline.cloudfunctions.net/get-clientes-api"
destination: sapiens-assessment-pipiline.sapiens_data.clientes
gcp:
    type: memory
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.load_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.destination.table, "clientes");
        assert_eq!(
            config.api_url.host_str(),
            Some("us-central1-sapiens-assessment-pipiline.cloudfunctions.net")
        );
    }

    #[test]
    fn test_invalid_port() {
        let yaml = r#"
listener: {host: "0.0.0.0", port: 0}
api_url: "http://127.0.0.1:8090/api/customers"
timeout_secs: 5
destination: p.d.clientes
gcp: {type: memory}
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.validate(), Err(ValidationError::InvalidPort));
    }
}
