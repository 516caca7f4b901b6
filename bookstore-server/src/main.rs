use tower_http::trace::TraceLayer;

use bookstore_server::{Config, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境与日志
    dotenv::dotenv().ok();
    let config = Config::from_env();
    bookstore_server::init_logger_with_file(None, config.log_dir.as_deref());

    tracing::info!("Bookstore server starting...");

    // 2. 打开存储并装配服务
    let state = ServerState::initialize(&config).await?;

    // 3. 启动 HTTP 服务器
    let app = bookstore_server::api::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    tracing::info!(port = config.http_port, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
