use std::env;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Generative-AI advisor configuration
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub advisor: AdvisorConfig,
    pub log_level: String,
    pub log_format: String,
    pub grpc_port: u16,
    pub environment: String,
    pub activation_sweep_interval_secs: u64,
    pub currency: String,
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS").unwrap_or(10);
        let acquire_timeout_secs = env_parse("DATABASE_ACQUIRE_TIMEOUT_SECS").unwrap_or(30);
        let idle_timeout_secs = env_parse("DATABASE_IDLE_TIMEOUT_SECS").unwrap_or(600); // 10 minutes
        let max_lifetime_secs = env_parse("DATABASE_MAX_LIFETIME_SECS").unwrap_or(1800); // 30 minutes
        let test_before_acquire = env_parse("DATABASE_TEST_BEFORE_ACQUIRE").unwrap_or(true);

        let config = Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pool cannot work with
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if self.acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/equb".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl AdvisorConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";
    pub const DEFAULT_API_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Create advisor config from environment variables. A missing key disables the advisor.
    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        Self {
            api_key,
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string()),
            api_url: env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| Self::DEFAULT_API_URL.to_string()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::DEFAULT_MODEL.to_string(),
            api_url: Self::DEFAULT_API_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let advisor = AdvisorConfig::from_env();

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
        let grpc_port = env_parse("GRPC_PORT").unwrap_or(50051);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let activation_sweep_interval_secs =
            env_parse("ACTIVATION_SWEEP_INTERVAL_SECS").unwrap_or(30);
        let currency = env::var("CURRENCY").unwrap_or_else(|_| "ETB".to_string());

        let config = Self {
            database,
            advisor,
            log_level: log_level.to_lowercase(),
            log_format: log_format.to_lowercase(),
            grpc_port,
            environment: environment.to_lowercase(),
            activation_sweep_interval_secs,
            currency,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate enumerated settings
    pub fn validate(&self) -> Result<(), String> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                self.log_level, valid_log_levels
            ));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.log_format.as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                self.log_format, valid_log_formats
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.environment.as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                self.environment, valid_environments
            ));
        }

        if self.currency.trim().is_empty() {
            return Err("CURRENCY must not be empty".to_string());
        }

        self.database.validate()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Whether logs should be emitted as JSON lines
    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }

    /// Interval of the background activation sweep, `None` when disabled
    pub fn activation_sweep_interval(&self) -> Option<Duration> {
        match self.activation_sweep_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Get database URL (convenience method)
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            advisor: AdvisorConfig::default(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            grpc_port: 50051,
            environment: "development".to_string(),
            activation_sweep_interval_secs: 30,
            currency: "ETB".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config_rejects_zero_connections() {
        let config = DatabaseConfig {
            max_connections: 0,
            ..DatabaseConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.grpc_port, 50051);
        assert_eq!(config.currency, "ETB");
        assert!(config.is_development());
        assert!(!config.is_production());
        assert!(!config.json_logs());
        assert!(!config.advisor.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let config = AppConfig {
            log_level: "verbose".to_string(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("LOG_LEVEL"));
    }

    #[test]
    fn test_activation_sweep_can_be_disabled() {
        let config = AppConfig {
            activation_sweep_interval_secs: 0,
            ..AppConfig::default()
        };
        assert!(config.activation_sweep_interval().is_none());

        let config = AppConfig::default();
        assert_eq!(config.activation_sweep_interval(), Some(Duration::from_secs(30)));
    }
}
