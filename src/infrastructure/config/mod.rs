mod settings;

pub use settings::{
    ApiConfig, DatabaseConfig, DispatchConfig, LoggingConfig, OtelConfig, RedisConfig,
    RegistryConfig, RulesConfig, SaasConfig, ServerConfig, Settings, TransportConfig,
    WebPushConfig,
};
