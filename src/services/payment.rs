//! payment.rs
//!
//! Сервисный слой для взаимодействия с внешним платёжным провайдером
//! (API payment intents в стиле Stripe).
//!
//! Ключевые компоненты:
//! 1.  **PaymentGateway**: трейт, через который обработчики создают платёжные
//!     намерения. В `AppState` лежит `Arc<dyn PaymentGateway>`, в тестах его
//!     подменяет заглушка.
//! 2.  **PaymentGatewayClient**: HTTP-клиент провайдера. Сумма уходит в минимальных
//!     единицах валюты, способ оплаты ограничен картой. Повторов и ключа
//!     идемпотентности нет: двойная отправка с клиента создаст два намерения.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

use crate::config::PaymentConfig;

/// Переводит цену в основных единицах в минимальные (центы), отбрасывая дробную часть.
pub fn to_minor_units(price: f64) -> i64 {
    (price * 100.0) as i64
}

/// Ответ провайдера на создание платёжного намерения.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `amount`: в минимальных единицах валюты.
    async fn create_payment_intent(&self, amount: i64) -> Result<PaymentIntent, PaymentError>;
}

/// Клиент для взаимодействия с API платёжного провайдера.
#[derive(Clone)]
pub struct PaymentGatewayClient {
    /// Секретный ключ провайдера (Bearer).
    secret_key: String,
    /// Базовый URL API.
    base_url: String,
    /// Валюта всех платежей.
    currency: String,
    /// Асинхронный HTTP-клиент.
    http_client: reqwest::Client,
}

impl PaymentGatewayClient {
    /// Создает и конфигурирует клиент на основе настроек приложения.
    pub fn from_config(config: &PaymentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            secret_key: config.secret_key.clone(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30)) // Таймаут для HTTP-запросов.
                .build()?,
        })
    }
}

#[async_trait]
impl PaymentGateway for PaymentGatewayClient {
    async fn create_payment_intent(&self, amount: i64) -> Result<PaymentIntent, PaymentError> {
        info!("Creating payment intent: amount={}, currency={}", amount, self.currency);

        let form = [
            ("amount", amount.to_string()),
            ("currency", self.currency.clone()),
            ("payment_method_types[]", "card".to_string()),
        ];

        let response = self
            .http_client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ProviderErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            error!("Payment provider returned {}: {}", status, message);
            return Err(PaymentError::Rejected { status: status.as_u16(), message });
        }

        let intent = response.json::<PaymentIntent>().await?;
        info!("Payment intent created: id={}", intent.id);
        Ok(intent)
    }
}
