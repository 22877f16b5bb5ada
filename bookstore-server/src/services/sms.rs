//! SMS delivery (eSMS-style JSON gateway)
//!
//! 与邮件一样是旁路通道：失败记日志后吞掉。

use serde::Serialize;

use crate::core::Config;

#[derive(Clone)]
pub struct SmsService {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    secret_key: String,
    brand_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SmsRequest<'a> {
    api_key: &'a str,
    secret_key: &'a str,
    phone: &'a str,
    content: String,
    /// 2 = brand-name OTP message
    sms_type: u8,
    brandname: &'a str,
}

impl SmsService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.sms_api_url.clone(),
            api_key: config.sms_api_key.clone(),
            secret_key: config.sms_secret_key.clone(),
            brand_name: config.sms_brand_name.clone(),
        }
    }

    /// Generate a 6-digit OTP code
    pub fn generate_otp() -> String {
        use rand::Rng;
        format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
    }

    /// Normalize to local format: +84xxx → 0xxx
    fn format_phone(phone: &str) -> String {
        let trimmed = phone.trim().replace(' ', "");
        if let Some(rest) = trimmed.strip_prefix("+84") {
            format!("0{rest}")
        } else if let Some(rest) = trimmed.strip_prefix("84") {
            format!("0{rest}")
        } else {
            trimmed
        }
    }

    /// Send an OTP text. Errors are logged and swallowed.
    pub async fn send_otp(&self, phone: &str, code: &str) {
        if self.api_key.is_empty() {
            tracing::debug!(phone, "sms skipped (gateway not configured)");
            return;
        }

        let request = SmsRequest {
            api_key: &self.api_key,
            secret_key: &self.secret_key,
            phone: &Self::format_phone(phone),
            content: format!("Your verification code is {code}. It expires in 5 minutes."),
            sms_type: 2,
            brandname: &self.brand_name,
        };

        match self.client.post(&self.api_url).json(&request).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(phone, "sms sent");
            }
            Ok(resp) => {
                tracing::warn!(phone, status = %resp.status(), "sms gateway rejected message");
            }
            Err(e) => {
                tracing::warn!(phone, "sms delivery failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_normalization() {
        assert_eq!(SmsService::format_phone("+84901234567"), "0901234567");
        assert_eq!(SmsService::format_phone("84901234567"), "0901234567");
        assert_eq!(SmsService::format_phone("0901234567"), "0901234567");
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let code = SmsService::generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
