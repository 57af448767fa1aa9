pub mod config;
pub mod database;
pub mod error;
pub mod repository;
pub mod models;
pub mod controllers;
pub mod middleware;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use tracing::info;

use crate::{
    repository::BuildingRepository,
    services::{
        notification::{MailgunClient, Notifier},
        payment::{PaymentGateway, PaymentGatewayClient},
    },
};

// Shared state для всего приложения. Все внешние зависимости передаются
// явно, чтобы в тестах их можно было подменить.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn BuildingRepository>,
    pub payments: Arc<dyn PaymentGateway>,
    pub notifier: Notifier,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        info!("Database connected");

        db.run_migrations().await?;

        let payments = PaymentGatewayClient::from_config(&config.payment)?;
        let mailer = MailgunClient::from_config(&config.mail)?;
        let notifier = Notifier::new(Arc::new(mailer), config.mail.recipient.clone());

        Ok(Arc::new(Self {
            repo: Arc::new(db),
            payments: Arc::new(payments),
            notifier,
            config,
        }))
    }
}
