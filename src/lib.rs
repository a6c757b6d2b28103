pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use anyhow::Context;
use std::sync::Arc;
use tokio::task;

use crate::services::{BookingFlow, EmailClient, MercadoPagoClient, Notifier};
use crate::store::PgBookingStore;

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub bookings: BookingFlow<PgBookingStore>,
    pub notifier: Notifier,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        tracing::info!("Database connected");

        db.run_migrations().await.context("failed to run migrations")?;

        let redis = redis_client::RedisClient::connect(&config.redis.url)
            .await
            .context("failed to connect to Redis")?;
        tracing::info!("Redis connected");

        let cache = cache::CacheService::new(redis.clone(), db.clone(), config.cache.clone());

        let gateway = MercadoPagoClient::from_config(&config.mercadopago, &config.circuit_breaker)
            .context("failed to build payment gateway client")?;
        let notifier = Notifier::new(
            EmailClient::new(config.email.clone()).context("failed to build email client")?,
        );
        if config.email.service_id.trim().is_empty() {
            tracing::warn!("EMAILJS_SERVICE_ID not set, outbound email disabled");
        }

        let store = Arc::new(PgBookingStore::new(db.pool.clone()));
        let bookings = BookingFlow::new(store, gateway, notifier.clone());

        let state = Arc::new(Self {
            db,
            redis,
            cache,
            config,
            bookings,
            notifier,
        });

        let state_for_bg = state.clone();
        task::spawn(async move {
            // Warm the cache in the background
            state_for_bg.cache.warmup_cache().await;
        });

        Ok(state)
    }
}
