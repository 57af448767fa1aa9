use serde::Deserialize;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub payment: PaymentConfig,
    pub mail: MailConfig,
}

// Настройки приложения
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

// Настройки базы данных
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки JWT. Срок жизни токена фиксирован (см. services::token)
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

// Настройки платежного провайдера (payment intents)
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub secret_key: String,
    pub api_url: String,
    pub currency: String,
}

// Настройки почтового провайдера
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub domain: String,
    pub api_url: String,
    pub from: String,
    pub recipient: String,
}

/// Flat view of the process environment, as the `config` crate sees it
/// (variable names lowercased).
#[derive(Debug, Deserialize)]
struct EnvSettings {
    host: String,
    port: u16,
    rust_log: String,
    log_format: String,
    database_url: Option<String>,
    db_user: Option<String>,
    db_pass: Option<String>,
    db_host: String,
    db_name: String,
    db_pool_size: u32,
    access_token_secret: Option<String>,
    stripe_secret_key: String,
    stripe_api_url: String,
    payment_currency: String,
    mail_gun_api_key: String,
    mail_sending_domain: String,
    mailgun_api_url: String,
    mail_from: Option<String>,
    mail_recipient: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Only the database credentials and the token secret are required; provider
    /// keys default to empty strings and fail at call time.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings: EnvSettings = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000)?
            .set_default("rust_log", "building_api=debug,tower_http=debug")?
            .set_default("log_format", "pretty")?
            .set_default("db_host", "localhost:5432")?
            .set_default("db_name", "myBuilding")?
            .set_default("db_pool_size", 10)?
            .set_default("stripe_secret_key", "")?
            .set_default("stripe_api_url", "https://api.stripe.com")?
            .set_default("payment_currency", "usd")?
            .set_default("mail_gun_api_key", "")?
            .set_default("mail_sending_domain", "")?
            .set_default("mailgun_api_url", "https://api.mailgun.net")?
            .set_default("mail_recipient", "")?
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: EnvSettings) -> Result<Self, config::ConfigError> {
        let database_url = match settings.database_url {
            Some(url) => url,
            None => {
                let user = settings.db_user.ok_or(config::ConfigError::NotFound(
                    "DB_USER (or DATABASE_URL)".to_string(),
                ))?;
                let pass = settings.db_pass.ok_or(config::ConfigError::NotFound(
                    "DB_PASS (or DATABASE_URL)".to_string(),
                ))?;
                format!(
                    "postgres://{}:{}@{}/{}",
                    user, pass, settings.db_host, settings.db_name
                )
            }
        };

        let secret = settings
            .access_token_secret
            .filter(|s| !s.is_empty())
            .ok_or(config::ConfigError::NotFound("ACCESS_TOKEN_SECRET".to_string()))?;

        let log_format = match settings.log_format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let from = settings.mail_from.unwrap_or_else(|| {
            format!("Building Management <postmaster@{}>", settings.mail_sending_domain)
        });

        Ok(Config {
            app: AppConfig {
                host: settings.host,
                port: settings.port,
                rust_log: settings.rust_log,
                log_format,
            },
            database: DatabaseConfig {
                url: database_url,
                pool_size: settings.db_pool_size,
            },
            jwt: JwtConfig { secret },
            payment: PaymentConfig {
                secret_key: settings.stripe_secret_key,
                api_url: settings.stripe_api_url,
                currency: settings.payment_currency,
            },
            mail: MailConfig {
                api_key: settings.mail_gun_api_key,
                domain: settings.mail_sending_domain,
                api_url: settings.mailgun_api_url,
                from,
                recipient: settings.mail_recipient,
            },
        })
    }
}
