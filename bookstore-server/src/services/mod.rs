//! 外部通知服务（邮件 / 短信）

pub mod email;
pub mod sms;

pub use email::EmailService;
pub use sms::SmsService;
