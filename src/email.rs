//! Transactional email.
//!
//! Sends through the Resend API when `RESEND_API_KEY` is configured; otherwise
//! messages are logged and dropped.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Minutes a password reset link stays valid.
pub const RESET_LINK_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    Sent,
    /// No API key configured; the message was only logged
    NoApiKey,
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    text: String,
    html: String,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    #[allow(dead_code)]
    id: String,
}

#[derive(Clone)]
pub struct EmailService {
    api_key: Option<String>,
    from_email: String,
    http_client: Client,
}

impl EmailService {
    pub fn new(api_key: Option<String>, from_email: String, timeout: Duration) -> Self {
        Self {
            api_key,
            from_email,
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Log-only service for tests and unconfigured deployments.
    pub fn disabled() -> Self {
        Self::new(None, "noreply@localhost".into(), Duration::from_secs(10))
    }

    pub async fn send_password_reset(&self, to_email: &str, reset_url: &str) -> Result<EmailSendResult> {
        let subject = "Password Reset Request - JARVIS Omega".to_string();
        let text = format!(
            "Password Reset Request\n\nWe received a request to reset your JARVIS Omega account password.\n\nOpen this link to choose a new password:\n{}\n\nThis link expires in {} minutes. If you didn't request this, you can ignore this email; your password won't change.",
            reset_url, RESET_LINK_MINUTES
        );
        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #ff3333;">Password Reset Request</h2>
<p>We received a request to reset your JARVIS Omega account password. Click the button below to create a new password:</p>
<p style="text-align: center;"><a href="{}" style="display: inline-block; background: #ff3333; color: white; text-decoration: none; padding: 15px 40px; border-radius: 10px; font-weight: bold;">Reset Password</a></p>
<p style="color: #666;">This link expires in {} minutes. Your password won't change until you open the link and set a new one.</p>
<p style="color: #888; font-size: 14px;">If the button doesn't work, copy this link into your browser:<br>{}</p>
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<p style="color: #999; font-size: 12px;">If you didn't request this, you can ignore this email.</p>
</body>
</html>"#,
            reset_url, RESET_LINK_MINUTES, reset_url
        );

        self.send(to_email, subject, text, html).await
    }

    async fn send(
        &self,
        to_email: &str,
        subject: String,
        text: String,
        html: String,
    ) -> Result<EmailSendResult> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(to = %to_email, subject = %subject, "No Resend API key configured, email not sent");
            return Ok(EmailSendResult::NoApiKey);
        };

        let request = ResendEmailRequest {
            from: &self.from_email,
            to: vec![to_email],
            subject,
            text,
            html,
        };

        let response = self
            .http_client
            .post(RESEND_API_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to send request to Resend API");
                AppError::UpstreamUnavailable(format!("Email service error: {}", e))
            })?;

        if response.status().is_success() {
            let _result: ResendEmailResponse = response.json().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to parse Resend API response");
                AppError::UpstreamUnavailable("Email service response error".into())
            })?;

            tracing::info!(to = %to_email, "Email sent via Resend");
            Ok(EmailSendResult::Sent)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Resend API returned error");
            Err(AppError::UpstreamUnavailable(format!(
                "Email service error: {} - {}",
                status, body
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_without_api_key_only_logs() {
        let service = EmailService::disabled();
        let result = service
            .send_password_reset("user@example.com", "http://localhost/reset-password?token=abc")
            .await
            .unwrap();
        assert_eq!(result, EmailSendResult::NoApiKey);
    }
}
