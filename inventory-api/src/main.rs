use std::sync::Arc;

use inventory_api::config::Config;
use inventory_api::domain::repositories::product_repository::ProductRepository;
use inventory_api::domain::repositories::user_repository::UserRepository;
use inventory_api::domain::services::order_service::OrderQueue;
use inventory_api::domain::services::user_service::UserService;
use inventory_api::error::AppError;
use inventory_api::infrastructure::broadcast::Broadcaster;
use inventory_api::infrastructure::database::mysql::init_mysql;
use inventory_api::logging::init_logging;
use inventory_api::server::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    init_logging(&config)?;

    tracing::info!("Starting inventory service");

    // 初始化数据库连接
    let db_pool = init_mysql(&config).await?;
    let products = Arc::new(ProductRepository::new(db_pool.clone()));
    let users = Arc::new(UserRepository::new(db_pool));

    // 事件总线
    let broadcaster = Broadcaster::new(config.broadcast.channel_capacity);

    // 订单队列: 唯一的库存扣减入口, 单消费者任务串行处理
    let (queue, orders) = OrderQueue::new(
        config.orders.queue_capacity,
        products.clone(),
        broadcaster.clone(),
    );
    tokio::spawn(queue.run());

    // 创建应用状态
    let app_state = AppState {
        config: config.clone(),
        products,
        users,
        broadcaster,
        orders,
    };

    // 初始管理员账号
    UserService::new(Arc::new(app_state.clone()))
        .ensure_bootstrap_admin()
        .await?;

    // 创建并启动服务器
    let app = create_app(app_state).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", &addr);

    axum::serve(listener, app).await?;
    Ok(())
}
