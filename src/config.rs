use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub dns: DnsConfig,
    pub disposable: DisposableConfig,
    pub scoring: ScoringConfig,
    pub auth: AuthConfig,
    pub plans: BTreeMap<String, PlanConfig>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsMode {
    /// No MX lookups; `mx_record` is omitted from results
    Off,
    /// Deterministic answers without touching the network
    Mock,
    /// Live lookups through the system resolver
    Dns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    pub mode: DnsMode,
    pub timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisposableConfig {
    /// Extra disposable domains, one per line, `#` starts a comment
    pub domains_file: Option<String>,
    pub extra_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_score: u8,
    pub disposable_score: u8,
    pub role_penalty: u8,
    pub no_mx_penalty: u8,
    pub popular_floor: u8,
    pub low_score_threshold: u8,
    pub popular_domains: Vec<String>,
    pub role_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub database_path: String,
    pub header_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub strict_mode: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            cors_enabled: true,
            max_batch_size: 100,
        }
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            mode: DnsMode::Off,
            timeout_seconds: 3,
            cache_ttl_seconds: 3600,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: 85,
            disposable_score: 30,
            role_penalty: 20,
            no_mx_penalty: 30,
            popular_floor: 95,
            low_score_threshold: 50,
            popular_domains: vec![
                "gmail.com".to_string(),
                "yahoo.com".to_string(),
                "outlook.com".to_string(),
                "hotmail.com".to_string(),
            ],
            role_prefixes: vec![
                "admin".to_string(),
                "info".to_string(),
                "support".to_string(),
                "sales".to_string(),
                "contact".to_string(),
            ],
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database_path: "/var/lib/verimail/keys.db".to_string(),
            header_name: "X-API-Key".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut plans = BTreeMap::new();
        plans.insert(
            "free".to_string(),
            PlanConfig {
                strict_mode: false,
                description: "100 requests/day".to_string(),
            },
        );
        plans.insert(
            "basic".to_string(),
            PlanConfig {
                strict_mode: true,
                description: "10,000 requests/month".to_string(),
            },
        );
        plans.insert(
            "pro".to_string(),
            PlanConfig {
                strict_mode: true,
                description: "50,000 requests/month".to_string(),
            },
        );
        plans.insert(
            "enterprise".to_string(),
            PlanConfig {
                strict_mode: true,
                description: "Custom".to_string(),
            },
        );

        Self {
            server: ServerConfig::default(),
            dns: DnsConfig::default(),
            disposable: DisposableConfig::default(),
            scoring: ScoringConfig::default(),
            auth: AuthConfig::default(),
            plans,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {path}"))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {path}"))?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {path}"))?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    /// Strict scoring is honoured only when the plan exists and allows it
    pub fn plan_allows_strict(&self, plan: &str) -> bool {
        self.plans
            .get(plan)
            .map(|p| p.strict_mode)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.server.port, 8000);
        assert_eq!(parsed.dns.mode, DnsMode::Off);
        assert_eq!(parsed.plans.len(), 4);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "server:\n  port: 9090\ndns:\n  mode: mock\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.max_batch_size, 100);
        assert_eq!(config.dns.mode, DnsMode::Mock);
        assert_eq!(config.dns.timeout_seconds, 3);
        assert_eq!(config.scoring.base_score, 85);
        assert!(!config.auth.enabled);
    }

    #[test]
    fn test_plan_allows_strict() {
        let config = Config::default();
        assert!(!config.plan_allows_strict("free"));
        assert!(config.plan_allows_strict("pro"));
        assert!(!config.plan_allows_strict("unknown"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verimail.yaml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.server.port = 8181;
        config.to_file(path).unwrap();

        let loaded = Config::from_file(path).unwrap();
        assert_eq!(loaded.server.port, 8181);
        assert_eq!(loaded.bind_addr(), "0.0.0.0:8181");
    }
}
