//! notification.rs
//!
//! Письма о решении по заявке на аренду.
//!
//! Отправка работает по принципу "отправил и забыл": [`Notifier::dispatch`]
//! запускает задачу tokio и сразу возвращает [`NotificationDispatch`] с каналом
//! результата. Обработчик HTTP явно вызывает `detach()`: ответ клиенту никогда
//! не ждёт почтового провайдера, ошибки только логируются. Очереди повторов нет.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::config::MailConfig;

/// Решение по заявке, для которого есть шаблон письма.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Rejected,
}

pub struct MailTemplate {
    pub subject: &'static str,
    pub text: &'static str,
    pub html: &'static str,
}

const ACCEPTED: MailTemplate = MailTemplate {
    subject: "Congratulations!",
    text: "Your agreement request has been accepted.",
    html: "<div><h2>Congratulations!</h2><h4>Your agreement request has been accepted.</h4></div>",
};

const REJECTED: MailTemplate = MailTemplate {
    subject: "Sorry",
    text: "Your agreement request has been rejected.",
    html: "<div><h2>Sorry</h2><h4>Your agreement request has been rejected.</h4></div>",
};

impl Decision {
    /// Шаблон выбирается только по строке `action` из запроса.
    /// Любое другое значение: письма нет.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "Accepted" => Some(Decision::Accepted),
            "Rejected" => Some(Decision::Rejected),
            _ => None,
        }
    }

    pub fn template(&self) -> &'static MailTemplate {
        match self {
            Decision::Accepted => &ACCEPTED,
            Decision::Rejected => &REJECTED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutgoingMail {
    pub fn for_decision(decision: Decision, to: &str) -> Self {
        let template = decision.template();
        Self {
            to: to.to_string(),
            subject: template.subject.to_string(),
            text: template.text.to_string(),
            html: template.html.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("notification task ended without reporting a result")]
    Abandoned,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Клиент API сообщений почтового провайдера (Mailgun).
#[derive(Clone)]
pub struct MailgunClient {
    api_key: String,
    domain: String,
    base_url: String,
    from: String,
    http_client: reqwest::Client,
}

impl MailgunClient {
    pub fn from_config(config: &MailConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            api_key: config.api_key.clone(),
            domain: config.domain.clone(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            from: config.from.clone(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
        })
    }
}

#[async_trait]
impl Mailer for MailgunClient {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let form = [
            ("from", self.from.as_str()),
            ("to", mail.to.as_str()),
            ("subject", mail.subject.as_str()),
            ("text", mail.text.as_str()),
            ("html", mail.html.as_str()),
        ];

        let response = self
            .http_client
            .post(format!("{}/v3/{}/messages", self.base_url, self.domain))
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status: status.as_u16(), message });
        }
        Ok(())
    }
}

/// Отправляет письма о решениях фиксированному получателю.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    recipient: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, recipient: impl Into<String>) -> Self {
        Self { mailer, recipient: recipient.into() }
    }

    /// Запускает отправку в отдельной задаче и сразу возвращает управление.
    pub fn dispatch(&self, decision: Decision) -> NotificationDispatch {
        let (tx, rx) = oneshot::channel();
        let mailer = self.mailer.clone();
        let mail = OutgoingMail::for_decision(decision, &self.recipient);

        tokio::spawn(async move {
            let result = mailer.send(&mail).await;
            match &result {
                Ok(()) => info!("Notification '{}' sent to {}", mail.subject, mail.to),
                Err(e) => error!("Failed to send notification '{}': {}", mail.subject, e),
            }
            // Получатель мог уже отказаться от результата
            if tx.send(result).is_err() {
                tracing::trace!("notification outcome dropped by caller");
            }
        });

        NotificationDispatch { outcome: rx }
    }
}

/// Ручка на запущенную отправку письма.
#[must_use = "call `detach()` to ignore the outcome or await `outcome()`"]
pub struct NotificationDispatch {
    outcome: oneshot::Receiver<Result<(), MailError>>,
}

impl NotificationDispatch {
    /// Результат отправки никого не интересует: он остаётся только в логах.
    pub fn detach(self) {}

    pub async fn outcome(self) -> Result<(), MailError> {
        match self.outcome.await {
            Ok(result) => result,
            Err(_) => {
                warn!("notification task dropped its result channel");
                Err(MailError::Abandoned)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _mail: &OutgoingMail) -> Result<(), MailError> {
            Err(MailError::Rejected { status: 401, message: "Forbidden".to_string() })
        }
    }

    fn mail_config(server: &MockServer) -> MailConfig {
        MailConfig {
            api_key: "key-123".to_string(),
            domain: "mg.example.com".to_string(),
            api_url: server.uri(),
            from: "Building <postmaster@mg.example.com>".to_string(),
            recipient: "office@example.com".to_string(),
        }
    }

    #[test]
    fn only_exact_actions_select_a_template() {
        assert_eq!(Decision::from_action("Accepted"), Some(Decision::Accepted));
        assert_eq!(Decision::from_action("Rejected"), Some(Decision::Rejected));
        assert_eq!(Decision::from_action("accepted"), None);
        assert_eq!(Decision::from_action(""), None);
    }

    #[test]
    fn templates_match_decisions() {
        let mail = OutgoingMail::for_decision(Decision::Accepted, "a@b.com");
        assert_eq!(mail.subject, "Congratulations!");
        assert!(mail.html.contains("has been accepted"));

        let mail = OutgoingMail::for_decision(Decision::Rejected, "a@b.com");
        assert_eq!(mail.subject, "Sorry");
        assert_eq!(mail.text, "Your agreement request has been rejected.");
    }

    #[tokio::test]
    async fn mailgun_client_posts_form_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mg.example.com/messages"))
            .and(header("authorization", "Basic YXBpOmtleS0xMjM="))
            .and(body_string_contains("subject=Congratulations%21"))
            .and(body_string_contains("to=office%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "<msg@mg.example.com>",
                "message": "Queued. Thank you."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = MailgunClient::from_config(&mail_config(&server)).unwrap();
        let mail = OutgoingMail::for_decision(Decision::Accepted, "office@example.com");
        client.send(&mail).await.unwrap();
    }

    #[tokio::test]
    async fn dispatch_reports_success_through_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = mail_config(&server);
        let notifier = Notifier::new(
            Arc::new(MailgunClient::from_config(&config).unwrap()),
            config.recipient.clone(),
        );
        assert!(notifier.dispatch(Decision::Rejected).outcome().await.is_ok());
    }

    #[tokio::test]
    async fn dispatch_failure_stays_in_the_channel() {
        let notifier = Notifier::new(Arc::new(FailingMailer), "office@example.com");
        let outcome = notifier.dispatch(Decision::Accepted).outcome().await;
        assert!(matches!(outcome, Err(MailError::Rejected { status: 401, .. })));
    }
}
