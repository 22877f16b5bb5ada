use bookstore_server::{Config, Server, ServerState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // 1. 加载配置
    let config = Config::from_env();

    // 2. 初始化日志
    bookstore_server::init_logger_with_file(None, config.log_dir.as_deref());

    tracing::info!("Bookstore server starting (env: {})", config.environment);

    // 3. 初始化服务器状态（数据库 + 迁移 + 服务装配）
    let state = ServerState::initialize(&config).await?;

    // 4. 启动 HTTP 服务器（后台任务随 run 启动）
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {e}");
        return Err(e);
    }

    Ok(())
}
