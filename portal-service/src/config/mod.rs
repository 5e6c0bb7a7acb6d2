use portal_core::config as core_config;
use portal_core::error::AppError;
use std::env;

/// Default answer model; the original deployment pinned this generation.
const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Login-throttle defaults: attempts per window per source address.
const DEFAULT_LOGIN_ATTEMPTS: u32 = 10;
const DEFAULT_LOGIN_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub models: ModelConfig,
    pub login: LoginThrottleConfig,
    /// Raw tenant database blob; parsed by `TenantDirectory::from_json`.
    pub tenant_database_json: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Gemini API key.
    pub api_key: String,
    /// Service-account credential blob for Drive access.
    pub service_account_json: String,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub text_model: String,
}

#[derive(Debug, Clone)]
pub struct LoginThrottleConfig {
    pub attempts: u32,
    pub window_seconds: u64,
}

impl PortalConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(PortalConfig {
            common: common_config,
            google: GoogleConfig {
                api_key: get_env("GEMINI_API_KEY", None, is_prod)?,
                service_account_json: get_env("GOOGLE_SERVICE_ACCOUNT_JSON", None, is_prod)?,
            },
            models: ModelConfig {
                text_model: get_env("PORTAL_TEXT_MODEL", Some(DEFAULT_TEXT_MODEL), is_prod)?,
            },
            login: LoginThrottleConfig {
                attempts: get_env(
                    "PORTAL_LOGIN_ATTEMPTS",
                    Some(&DEFAULT_LOGIN_ATTEMPTS.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_LOGIN_ATTEMPTS),
                window_seconds: get_env(
                    "PORTAL_LOGIN_WINDOW_SECONDS",
                    Some(&DEFAULT_LOGIN_WINDOW_SECONDS.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_LOGIN_WINDOW_SECONDS),
            },
            tenant_database_json: get_env("TENANT_DATABASE_JSON", None, is_prod)?,
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
