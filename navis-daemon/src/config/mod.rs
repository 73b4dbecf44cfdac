use navis_core::config as core_config;
use navis_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub pairing: PairingSettings,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct PairingSettings {
    pub qr_token_ttl_seconds: u64,
    pub manual_token_ttl_seconds: u64,
    pub wait_timeout_seconds: u64,
    pub api_base_url: String,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub enabled: SwaggerMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwaggerMode {
    Public,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
    pub pairing_attempts: u32,
    pub pairing_window_seconds: u64,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = DaemonConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("navis-daemon"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            pairing: PairingSettings {
                qr_token_ttl_seconds: get_env("PAIRING_QR_TOKEN_TTL_SECONDS", Some("300"), is_prod)?
                    .parse()
                    .unwrap_or(300),
                manual_token_ttl_seconds: get_env(
                    "PAIRING_MANUAL_TOKEN_TTL_SECONDS",
                    Some("600"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(600),
                wait_timeout_seconds: get_env("PAIRING_WAIT_TIMEOUT_SECONDS", Some("120"), is_prod)?
                    .parse()
                    .unwrap_or(120),
                api_base_url: get_env(
                    "API_BASE_URL",
                    Some(&format!("http://localhost:{}", common_config.port)),
                    is_prod,
                )?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            swagger: SwaggerConfig {
                enabled: get_env("ENABLE_SWAGGER", Some("public"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            rate_limit: RateLimitConfig {
                global_ip_limit: get_env("RATE_LIMIT_GLOBAL_IP_LIMIT", Some("300"), is_prod)?
                    .parse()
                    .unwrap_or(300),
                global_ip_window_seconds: get_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(60),
                pairing_attempts: get_env("RATE_LIMIT_PAIRING_ATTEMPTS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                pairing_window_seconds: get_env(
                    "RATE_LIMIT_PAIRING_WINDOW_SECONDS",
                    Some("300"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(300),
            },
            common: common_config,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn pairing_config(&self) -> crate::services::PairingConfig {
        crate::services::PairingConfig {
            qr_token_ttl: Duration::from_secs(self.pairing.qr_token_ttl_seconds),
            manual_token_ttl: Duration::from_secs(self.pairing.manual_token_ttl_seconds),
            wait_timeout: Duration::from_secs(self.pairing.wait_timeout_seconds),
            api_base_url: self.pairing.api_base_url.clone(),
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.pairing.wait_timeout_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PAIRING_WAIT_TIMEOUT_SECONDS must be greater than 0"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.swagger.enabled == SwaggerMode::Public {
                tracing::warn!("Swagger is publicly accessible in production");
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for SwaggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(SwaggerMode::Public),
            "disabled" => Ok(SwaggerMode::Disabled),
            _ => Err(format!("Invalid swagger mode: {}", s)),
        }
    }
}
