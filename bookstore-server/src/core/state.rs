//! 服务器状态 - 持有所有服务的单例引用

use sqlx::SqlitePool;

use crate::auth::SessionStore;
use crate::chat::ChatHub;
use crate::core::Config;
use crate::db::repository::notification;
use crate::db::DbService;
use crate::services::{EmailService, SmsService};

/// ServerState 是应用的核心数据结构，持有所有服务的共享引用。
/// 内部均为 Arc/池化资源，Clone 成本极低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | pool | SQLite 连接池 |
/// | sessions | 会话存储（认证 + 购物车） |
/// | chat | 聊天 hub（组管理 + 扇出） |
/// | email / sms | 旁路通知服务 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub sessions: SessionStore,
    pub chat: ChatHub,
    pub email: EmailService,
    pub sms: SmsService,
}

impl ServerState {
    /// 初始化服务器状态（打开数据库、跑迁移、装配服务）
    pub async fn initialize(config: &Config) -> Result<Self, crate::utils::AppError> {
        let db = DbService::new(&config.database_path).await?;
        Ok(Self::with_db(config.clone(), db))
    }

    /// 用现成的数据库装配状态（测试用）
    pub fn with_db(config: Config, db: DbService) -> Self {
        Self {
            sessions: SessionStore::new(config.session_ttl_minutes),
            chat: ChatHub::new(),
            email: EmailService::new(&config),
            sms: SmsService::new(&config),
            pool: db.pool,
            config,
        }
    }

    /// 启动后台任务（会话清理）
    pub fn start_background_tasks(&self) {
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                let removed = sessions.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept idle sessions");
                }
            }
        });
    }

    /// 写入站内通知；失败只记日志（旁路数据，不阻塞主事务）
    pub async fn notify_user(
        &self,
        user_id: i64,
        title: &str,
        message: &str,
        kind: &str,
        redirect_url: Option<&str>,
    ) {
        if let Err(e) =
            notification::insert(&self.pool, user_id, title, message, Some(kind), redirect_url)
                .await
        {
            tracing::warn!(user_id, title, "failed to insert notification: {e}");
        }
    }
}
