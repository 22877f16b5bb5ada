//! 服务器配置
//!
//! # 环境变量
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | DATABASE_PATH | bookstore.db | SQLite 数据库文件 |
//! | HTTP_PORT | 3000 | HTTP 服务端口 |
//! | ENVIRONMENT | development | 运行环境 |
//! | SESSION_TTL_MINUTES | 120 | 会话空闲超时 |
//! | LOG_DIR | (无) | 日志文件目录，未设置时仅输出到控制台 |
//! | SMTP_SERVER / SMTP_PORT / SMTP_SENDER / SMTP_PASSWORD / SMTP_SENDER_NAME | | 邮件投递 |
//! | SMS_API_URL / SMS_API_KEY / SMS_SECRET_KEY / SMS_BRAND_NAME | | 短信网关 |

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 数据库文件路径
    pub database_path: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 会话空闲超时（分钟）
    pub session_ttl_minutes: i64,
    /// 日志文件目录（可选）
    pub log_dir: Option<String>,

    // === 邮件 ===
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_sender: String,
    pub smtp_password: String,
    pub smtp_sender_name: String,

    // === 短信 ===
    pub sms_api_url: String,
    pub sms_api_key: String,
    pub sms_secret_key: String,
    pub sms_brand_name: String,
}

impl Config {
    /// 从环境变量加载配置，未设置时使用默认值
    pub fn from_env() -> Self {
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "bookstore.db".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            session_ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(120),
            log_dir: std::env::var("LOG_DIR").ok(),

            smtp_server: std::env::var("SMTP_SERVER").unwrap_or_default(),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            smtp_sender: std::env::var("SMTP_SENDER").unwrap_or_default(),
            smtp_password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            smtp_sender_name: std::env::var("SMTP_SENDER_NAME")
                .unwrap_or_else(|_| "Bookstore".into()),

            sms_api_url: std::env::var("SMS_API_URL").unwrap_or_else(|_| {
                "http://rest.esms.vn/MainService.svc/json/SendMultipleMessage_V4_post_json/".into()
            }),
            sms_api_key: std::env::var("SMS_API_KEY").unwrap_or_default(),
            sms_secret_key: std::env::var("SMS_SECRET_KEY").unwrap_or_default(),
            sms_brand_name: std::env::var("SMS_BRAND_NAME").unwrap_or_else(|_| "BOOKSTORE".into()),
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
