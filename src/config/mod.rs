use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

// Root configuration, one section per collaborator
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub mercadopago: MercadoPagoConfig,
    pub email: EmailConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// Origin of the web client, used for CORS.
    pub client_origin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Checkout gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct MercadoPagoConfig {
    pub access_token: String,
    pub public_key: String,
    pub api_url: String,
    pub currency: String,
    pub statement_descriptor: String,
    pub success_url: String,
    pub failure_url: String,
    pub pending_url: String,
    pub notification_url: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub api_url: String,
    /// Empty service id disables outbound email.
    pub service_id: String,
    pub public_key: String,
    pub private_key: Option<String>,
    pub app_name: String,
    pub templates: EmailTemplates,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailTemplates {
    pub welcome: String,
    pub booking_confirmation: String,
    pub checkin: String,
    pub payment_confirmation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub events_ttl_seconds: u64,
    pub settings_ttl_seconds: u64,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(name, default);
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let public_url = var_or("PUBLIC_URL", "http://localhost:8000");

        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: parse_or("PORT", "8000")?,
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "bikers_booking=debug,tower_http=debug"),
                client_origin: var_or("CLIENT_ORIGIN", "http://localhost:5173"),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parse_or("DB_POOL_SIZE", "10")?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
            },
            mercadopago: MercadoPagoConfig {
                access_token: required("MERCADOPAGO_ACCESS_TOKEN")?,
                public_key: var_or("MERCADOPAGO_PUBLIC_KEY", ""),
                api_url: var_or("MERCADOPAGO_API_URL", "https://api.mercadopago.com"),
                currency: var_or("MERCADOPAGO_CURRENCY", "ARS"),
                statement_descriptor: var_or("MERCADOPAGO_STATEMENT_DESCRIPTOR", "BIKERS MTB"),
                success_url: var_or(
                    "PAYMENT_SUCCESS_URL",
                    &format!("{}/api/payments/success", public_url),
                ),
                failure_url: var_or(
                    "PAYMENT_FAILURE_URL",
                    &format!("{}/api/payments/failure", public_url),
                ),
                pending_url: var_or(
                    "PAYMENT_PENDING_URL",
                    &format!("{}/api/payments/pending", public_url),
                ),
                notification_url: optional("PAYMENT_NOTIFICATION_URL"),
                timeout_seconds: parse_or("MERCADOPAGO_TIMEOUT_SECONDS", "30")?,
            },
            email: EmailConfig {
                api_url: var_or("EMAILJS_API_URL", "https://api.emailjs.com/api/v1.0/email/send"),
                service_id: var_or("EMAILJS_SERVICE_ID", ""),
                public_key: var_or("EMAILJS_PUBLIC_KEY", ""),
                private_key: optional("EMAILJS_PRIVATE_KEY"),
                app_name: var_or("APP_NAME", "BIKERS MTB"),
                templates: EmailTemplates {
                    welcome: var_or("EMAILJS_TEMPLATE_WELCOME", ""),
                    booking_confirmation: var_or("EMAILJS_TEMPLATE_BOOKING", ""),
                    checkin: var_or("EMAILJS_TEMPLATE_CHECKIN", ""),
                    payment_confirmation: var_or("EMAILJS_TEMPLATE_PAYMENT", ""),
                },
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: parse_or("CIRCUIT_BREAKER_FAILURE_THRESHOLD", "5")?,
                timeout_seconds: parse_or("CIRCUIT_BREAKER_TIMEOUT_SECONDS", "60")?,
            },
            cache: CacheConfig {
                events_ttl_seconds: parse_or("CACHE_EVENTS_TTL_SECONDS", "300")?,
                settings_ttl_seconds: parse_or("CACHE_SETTINGS_TTL_SECONDS", "600")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_to_default() {
        let port: u16 = parse_or("BIKERS_TEST_UNSET_PORT", "8000").unwrap();
        assert_eq!(port, 8000);
    }

    #[test]
    fn parse_or_reports_bad_values() {
        let err = parse_or::<u16>("BIKERS_TEST_UNSET_BAD", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BIKERS_TEST_UNSET_BAD", .. }));
    }

    #[test]
    fn missing_required_variable_is_an_error() {
        let err = required("BIKERS_TEST_DEFINITELY_MISSING").unwrap_err();
        assert_eq!(err.to_string(), "BIKERS_TEST_DEFINITELY_MISSING must be set");
    }
}
