use async_trait::async_trait;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::plugins::traits::{NotificationResult, NotifierPlugin, SeatAlert};
use crate::utils::error::{AppError, Result};

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    /// `Ok(None)` when no SMTP host is configured.
    pub fn from_config(config: &SmtpConfig) -> Result<Option<Self>> {
        let Some(host) = config.host.as_deref() else {
            return Ok(None);
        };

        let to_address = config
            .to_address
            .as_deref()
            .ok_or_else(|| AppError::Validation("SMTP to_address is required".to_string()))?;
        let from_address = config
            .from_address
            .as_deref()
            .or(config.username.as_deref())
            .unwrap_or(to_address);

        let from = parse_mailbox(&format!("{} <{}>", config.from_name, from_address))?;
        let to = parse_mailbox(to_address)?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(|e| {
                AppError::Notifier {
                    notifier: "email".to_string(),
                    message: e.to_string(),
                }
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Some(Self {
            mailer: builder.build(),
            from,
            to,
        }))
    }

    fn format_subject(&self, alert: &SeatAlert) -> String {
        format!("Seat available: {}", alert.label)
    }

    fn format_text_body(&self, alert: &SeatAlert) -> String {
        let seats = alert
            .seats
            .map(|count| count.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let mut text = String::new();
        text.push_str("SEAT WATCHER ALERT\n\n");
        text.push_str(&format!("{}\n\n", alert.message));
        text.push_str(&format!("Course: {}\n", alert.label));
        text.push_str(&format!("Seats: {}\n", seats));
        text.push_str(&format!("Checked at: {}\n", alert.raised_at.to_rfc3339()));
        text.push_str(&format!("Page: {}\n", alert.check_url));
        text
    }

    fn build_message(&self, alert: &SeatAlert) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.format_subject(alert))
            .header(header::ContentType::TEXT_PLAIN)
            .body(self.format_text_body(alert))
            .map_err(|e| AppError::Notifier {
                notifier: "email".to_string(),
                message: e.to_string(),
            })
    }
}

fn parse_mailbox(value: &str) -> Result<Mailbox> {
    value
        .parse()
        .map_err(|e| AppError::Validation(format!("Invalid email address '{}': {}", value, e)))
}

#[async_trait]
impl NotifierPlugin for EmailNotifier {
    fn name(&self) -> &str {
        "Email Notifier"
    }

    fn plugin_type(&self) -> &str {
        "email"
    }

    async fn notify(&self, alert: &SeatAlert) -> Result<NotificationResult> {
        let email = self.build_message(alert)?;

        match self.mailer.send(email).await {
            Ok(_response) => Ok(NotificationResult::delivered(format!("email-{}", alert.id))),
            Err(e) => Ok(NotificationResult::failed(e.to_string())),
        }
    }
}
