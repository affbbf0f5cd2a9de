use crate::error::MembershipResult;
use config::{Config, Environment, File};
use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `MEMBERSHIP__DOWNSTREAM__BASE_URL`
pub const ENV_PREFIX: &str = "MEMBERSHIP";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipConfig {
    /// PostgreSQL connection string; the in-memory store is used when absent
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub downstream: DownstreamConfig,
    pub logging: LoggerConfig,
}

/// Downstream benefit-management endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownstreamConfig {
    pub base_url: String,
    pub create_benefit_path: String,
    pub suspend_benefits_path: String,
    pub activate_benefits_path: String,
    pub deactivate_benefits_path: String,
    pub timeout_secs: u64,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            run_migrations: true,
            downstream: DownstreamConfig::default(),
            logging: LoggerConfig::default(),
        }
    }
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            create_benefit_path: "/api/v1/benefit".to_string(),
            suspend_benefits_path: "/api/v1/visit/suspendBenefits/".to_string(),
            activate_benefits_path: "/api/v1/visit/activateBenefits/".to_string(),
            deactivate_benefits_path: "/api/v1/visit/deactivateBenefits/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl DownstreamConfig {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl MembershipConfig {
    /// Layer defaults, an optional config file, then `MEMBERSHIP__*` variables
    pub fn load(path: Option<&str>) -> MembershipResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
