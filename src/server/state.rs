use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::error::AppError;
use crate::notification::NotificationDispatcher;
use crate::postgres::PostgresPool;
use crate::redis::RedisPool;
use crate::registry::{create_subscription_store, RegistryError, SubscriptionStore};
use crate::transport::{create_transport, PushTransport};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn SubscriptionStore>,
    pub transport: Arc<dyn PushTransport>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub redis_pool: Option<Arc<RedisPool>>,
    pub postgres_pool: Option<Arc<PostgresPool>>,
    pub start_time: Instant,
}

impl AppState {
    /// Build state from configuration, connecting the selected registry backend.
    pub async fn new(settings: Settings) -> Result<Self, AppError> {
        let redis_pool = if settings.registry.backend == "redis" {
            let pool = RedisPool::new(settings.redis.clone()).map_err(RegistryError::from)?;
            if let Err(e) = pool.ping().await {
                tracing::warn!(error = %e, "Redis not reachable at startup, will retry on demand");
            }
            Some(Arc::new(pool))
        } else {
            None
        };

        let postgres_pool = if settings.registry.backend == "postgres" {
            let pool = PostgresPool::new(&settings.database)
                .await
                .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
            pool.ensure_schema()
                .await
                .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
            tracing::info!(url = %pool.database_url_masked(), "PostgreSQL registry ready");
            Some(Arc::new(pool))
        } else {
            None
        };

        let store = create_subscription_store(
            &settings.registry,
            redis_pool.clone(),
            postgres_pool.clone(),
        );
        let transport = create_transport(&settings)?;

        let mut state = Self::with_components(settings, store, transport);
        state.redis_pool = redis_pool;
        state.postgres_pool = postgres_pool;
        Ok(state)
    }

    /// Assemble state from prebuilt parts
    pub fn with_components(
        settings: Settings,
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        let dispatcher = Arc::new(NotificationDispatcher::with_concurrency(
            store.clone(),
            transport.clone(),
            settings.dispatch.max_concurrent_sends,
        ));

        Self {
            settings: Arc::new(settings),
            store,
            transport,
            dispatcher,
            redis_pool: None,
            postgres_pool: None,
            start_time: Instant::now(),
        }
    }
}
