//! Email delivery (SMTP)
//!
//! 辅助通知通道：投递失败只记日志，绝不阻塞主流程。
//! 未配置 SMTP 时服务降级为 no-op。

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::core::Config;

#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    sender: String,
    sender_name: String,
}

impl EmailService {
    pub fn new(config: &Config) -> Self {
        let mailer = if config.smtp_server.is_empty() || config.smtp_sender.is_empty() {
            tracing::warn!("SMTP not configured; outbound email disabled");
            None
        } else {
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server) {
                Ok(builder) => Some(
                    builder
                        .port(config.smtp_port)
                        .credentials(Credentials::new(
                            config.smtp_sender.clone(),
                            config.smtp_password.clone(),
                        ))
                        .build(),
                ),
                Err(e) => {
                    tracing::error!("Failed to build SMTP transport: {e}");
                    None
                }
            }
        };

        Self {
            mailer,
            sender: config.smtp_sender.clone(),
            sender_name: config.smtp_sender_name.clone(),
        }
    }

    /// Send one HTML mail. Errors are logged and swallowed.
    async fn send(&self, to: &str, subject: &str, html_body: String) {
        let Some(mailer) = &self.mailer else {
            tracing::debug!(to, subject, "email skipped (SMTP disabled)");
            return;
        };

        let from = format!("{} <{}>", self.sender_name, self.sender);
        let message = Message::builder()
            .from(match from.parse() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("Invalid sender address: {e}");
                    return;
                }
            })
            .to(match to.parse() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(to, "Invalid recipient address: {e}");
                    return;
                }
            })
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body);

        let message = match message {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Failed to build email: {e}");
                return;
            }
        };

        match mailer.send(message).await {
            Ok(_) => tracing::info!(to, subject, "email sent"),
            Err(e) => tracing::warn!(to, subject, "email delivery failed: {e}"),
        }
    }

    /// Registration OTP code, valid for five minutes
    pub async fn send_otp(&self, to: &str, code: &str) {
        let body = format!(
            "<html><body style='font-family: Arial, sans-serif;'>\
             <h2>Email verification</h2>\
             <p>Your verification code is:</p>\
             <p style='font-size: 28px; letter-spacing: 6px;'><b>{code}</b></p>\
             <p style='color: #666;'>The code expires in 5 minutes. \
             If you did not request it, ignore this email.</p>\
             </body></html>"
        );
        self.send(to, "Your verification code", body).await;
    }

    /// Triggered when an order transitions into Confirmed
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        customer_name: &str,
        order_id: i64,
        total_amount: f64,
    ) {
        let body = format!(
            "<html><body style='font-family: Arial, sans-serif;'>\
             <h2>Hello {customer_name}!</h2>\
             <p>Your order <b>#{order_id}</b> has been confirmed.</p>\
             <p>Order total: <b>{total_amount:.0}</b></p>\
             <p style='color: #666;'>We will notify you again when it ships.</p>\
             </body></html>"
        );
        self.send(to, &format!("Order #{order_id} confirmed"), body)
            .await;
    }
}
