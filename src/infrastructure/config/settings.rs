use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub webpush: WebPushConfig,
    #[serde(default)]
    pub saas: SaasConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Admin API key. When unset, admin endpoints are open (development mode).
    pub key: Option<String>,
    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Subscription registry backend selection
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// "memory" (default), "redis" or "postgres"
    #[serde(default = "default_registry_backend")]
    pub backend: String,
    /// Key prefix for the Redis backend
    #[serde(default = "default_registry_prefix")]
    pub redis_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

/// Which push transport delivers notifications
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// "webpush" (default) or "saas"
    #[serde(default = "default_transport_kind")]
    pub kind: String,
}

/// Raw Web Push (VAPID) settings
#[derive(Debug, Clone, Deserialize)]
pub struct WebPushConfig {
    /// Uncompressed P-256 public key, base64url encoded (handed to browsers)
    pub vapid_public_key: Option<String>,
    /// PKCS#8 PEM private key matching `vapid_public_key`
    pub vapid_private_key_pem: Option<String>,
    /// Contact URI placed in the VAPID `sub` claim
    #[serde(default = "default_vapid_subject")]
    pub subject: String,
    /// Default TTL header when a request does not carry one
    #[serde(default = "default_webpush_ttl")]
    pub ttl_seconds: u32,
    #[serde(default = "default_send_timeout")]
    pub timeout_seconds: u64,
}

/// Hosted push SaaS settings
#[derive(Debug, Clone, Deserialize)]
pub struct SaasConfig {
    pub app_id: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_saas_api_url")]
    pub api_url: String,
    #[serde(default = "default_send_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on in-flight sends per dispatch
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    /// Minimum confidence (0-100) for a trading signal to notify
    #[serde(default = "default_trading_confidence_threshold")]
    pub trading_confidence_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// "text" (default) or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// OpenTelemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_otel_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_registry_backend() -> String {
    "memory".to_string()
}

fn default_registry_prefix() -> String {
    "push:subscriptions".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/push_relay".to_string()
}

fn default_pool_size() -> u32 {
    5
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    300
}

fn default_transport_kind() -> String {
    "webpush".to_string()
}

fn default_vapid_subject() -> String {
    "mailto:admin@localhost".to_string()
}

fn default_webpush_ttl() -> u32 {
    86_400 // 1 day
}

fn default_send_timeout() -> u64 {
    10
}

fn default_saas_api_url() -> String {
    "https://api.onesignal.com".to_string()
}

fn default_max_concurrent_sends() -> usize {
    50
}

fn default_trading_confidence_threshold() -> f64 {
    75.0
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "push-relay-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("registry.backend", "memory")?
            .set_default("transport.kind", "webpush")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, WEBPUSH__VAPID_PUBLIC_KEY, SAAS__API_KEY, ...
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            registry: RegistryConfig::default(),
            redis: RedisConfig::default(),
            database: DatabaseConfig::default(),
            transport: TransportConfig::default(),
            webpush: WebPushConfig::default(),
            saas: SaasConfig::default(),
            dispatch: DispatchConfig::default(),
            rules: RulesConfig::default(),
            logging: LoggingConfig::default(),
            otel: OtelConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: default_registry_backend(),
            redis_prefix: default_registry_prefix(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: default_transport_kind(),
        }
    }
}

impl Default for WebPushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: None,
            vapid_private_key_pem: None,
            subject: default_vapid_subject(),
            ttl_seconds: default_webpush_ttl(),
            timeout_seconds: default_send_timeout(),
        }
    }
}

impl Default for SaasConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            api_key: None,
            api_url: default_saas_api_url(),
            timeout_seconds: default_send_timeout(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sends: default_max_concurrent_sends(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            trading_confidence_threshold: default_trading_confidence_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_otel_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}
